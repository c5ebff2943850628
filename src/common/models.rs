use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Identity record, keyed by lowercase email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub full_name: String,
    pub has_profile_picture: bool,
}

impl User {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_lowercase(),
            full_name: format!("{} {}", first_name, last_name),
            has_profile_picture: false,
        }
    }
}

/// Snapshot of the most recent message, embedded in each conversation summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestMessage {
    pub date: i64,
    pub text: String,
    pub is_read: bool,
}

/// Per-owner record of a chat partner plus the latest message preview.
/// Each participant holds their own copy; the two mirror each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSummary {
    pub id: String,
    pub name: String,
    pub other_user_email: String,
    pub latest_message: LatestMessage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    AttributedText,
    Photo,
    Video,
    Location,
    Emoji,
    Audio,
    Contact,
    LinkPreview,
    Custom,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::AttributedText => "attributed_text",
            MessageKind::Photo => "photo",
            MessageKind::Video => "video",
            MessageKind::Location => "location",
            MessageKind::Emoji => "emoji",
            MessageKind::Audio => "audio",
            MessageKind::Contact => "contact",
            MessageKind::LinkPreview => "link",
            MessageKind::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "text" => MessageKind::Text,
            "attributed_text" => MessageKind::AttributedText,
            "photo" => MessageKind::Photo,
            "video" => MessageKind::Video,
            "location" => MessageKind::Location,
            "emoji" => MessageKind::Emoji,
            "audio" => MessageKind::Audio,
            "contact" => MessageKind::Contact,
            "link" => MessageKind::LinkPreview,
            _ => MessageKind::Custom,
        }
    }
}

/// One chat message. Append-only, no edit or delete.
///
/// The id concatenates the participant emails and the send timestamp, which is
/// not unique under clock skew or same-second sends; the store orders messages
/// by its own insertion sequence, never by this id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub sender_email: String,
    pub receiver_name: String,
    pub kind: MessageKind,
    pub content: String,
    pub sent_at: i64,
    pub is_read: bool,
}

impl Message {
    /// Build a text message the way the original client did:
    /// id = "<other>_<sender>_<timestamp>".
    pub fn new_text(sender_email: &str, other_email: &str, receiver_name: &str, content: &str) -> Self {
        let sent_at = Utc::now().timestamp();
        let sender_email = sender_email.to_lowercase();
        let other_email = other_email.to_lowercase();
        Self {
            id: format!("{}_{}_{}", other_email, sender_email, sent_at),
            sender_email,
            receiver_name: receiver_name.to_string(),
            kind: MessageKind::Text,
            content: content.to_string(),
            sent_at,
            is_read: false,
        }
    }

    /// Conversation ids are derived from the first message of the conversation.
    pub fn conversation_id(&self) -> String {
        format!("conversation_{}", self.id)
    }
}
