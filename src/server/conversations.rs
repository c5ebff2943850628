use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::common::models::{ConversationSummary, LatestMessage, Message, User};
use crate::server::database::Database;
use crate::server::error::ServiceError;

fn summary_from_row(row: &SqliteRow) -> ConversationSummary {
    ConversationSummary {
        id: row.get("id"),
        name: row.get("name"),
        other_user_email: row.get("other_user_email"),
        latest_message: LatestMessage {
            date: row.get("latest_date"),
            text: row.get("latest_text"),
            is_read: row.get::<i64, _>("latest_is_read") != 0,
        },
    }
}

/// Appends one summary to the owner's conversation list.
///
/// The original client fetched the owner's whole record, pushed onto a JSON
/// array and wrote everything back, so two concurrent appends could lose one.
/// Here each list entry is its own row and an append is a single INSERT.
pub async fn append_conversation(
    db: Arc<Database>,
    owner_email: &str,
    summary: &ConversationSummary,
) -> Result<(), ServiceError> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT INTO conversations (owner_email, id, other_user_email, name, latest_text, latest_date, latest_is_read, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(owner_email.to_lowercase())
    .bind(&summary.id)
    .bind(&summary.other_user_email)
    .bind(&summary.name)
    .bind(&summary.latest_message.text)
    .bind(summary.latest_message.date)
    .bind(summary.latest_message.is_read as i64)
    .bind(now)
    .execute(&db.pool)
    .await?;
    log::info!("[CONV] Appended conversation {} for {}", summary.id, owner_email);
    Ok(())
}

/// All summaries for the owner, oldest first. Empty list when none exist.
pub async fn list_conversations(
    db: Arc<Database>,
    owner_email: &str,
) -> Result<Vec<ConversationSummary>, ServiceError> {
    let rows = sqlx::query(
        "SELECT id, other_user_email, name, latest_text, latest_date, latest_is_read \
         FROM conversations WHERE owner_email = ? ORDER BY created_at ASC",
    )
    .bind(owner_email.to_lowercase())
    .fetch_all(&db.pool)
    .await
    .map_err(|e| {
        log::warn!("[CONV] Error listing conversations for {}: {}", owner_email, e);
        ServiceError::ConversationFetch
    })?;
    Ok(rows.iter().map(summary_from_row).collect())
}

/// The owner's summary for one conversation, used to resolve the counterpart
/// when sending into an existing conversation.
pub async fn find_for_owner(
    db: Arc<Database>,
    owner_email: &str,
    conversation_id: &str,
) -> Result<ConversationSummary, ServiceError> {
    let row = sqlx::query(
        "SELECT id, other_user_email, name, latest_text, latest_date, latest_is_read \
         FROM conversations WHERE owner_email = ? AND id = ?",
    )
    .bind(owner_email.to_lowercase())
    .bind(conversation_id)
    .fetch_optional(&db.pool)
    .await
    .map_err(|e| {
        log::warn!("[CONV] Error fetching conversation {}: {}", conversation_id, e);
        ServiceError::ConversationFetch
    })?;
    match row {
        Some(row) => Ok(summary_from_row(&row)),
        None => Err(ServiceError::ConversationNotFound(conversation_id.to_string())),
    }
}

/// Creates a conversation from its first message: one summary on the sender's
/// list, a mirror on the counterpart's, then the seeded message log.
///
/// The three writes are independent, with no rollback; a failure partway
/// leaves partial state and is reported to the caller, matching the original
/// contract. Returns the new conversation id.
pub async fn create_conversation(
    db: Arc<Database>,
    sender: &User,
    other: &User,
    first_message: &Message,
) -> Result<String, ServiceError> {
    let conversation_id = first_message.conversation_id();
    let latest = LatestMessage {
        date: first_message.sent_at,
        text: first_message.content.clone(),
        is_read: false,
    };

    let sender_side = ConversationSummary {
        id: conversation_id.clone(),
        name: other.full_name.clone(),
        other_user_email: other.email.clone(),
        latest_message: latest.clone(),
    };
    append_conversation(db.clone(), &sender.email, &sender_side).await?;

    let other_side = ConversationSummary {
        id: conversation_id.clone(),
        name: sender.full_name.clone(),
        other_user_email: sender.email.clone(),
        latest_message: latest,
    };
    append_conversation(db.clone(), &other.email, &other_side).await?;

    crate::server::messages::append_row(db.clone(), &conversation_id, first_message).await?;

    log::info!(
        "[CONV] Created conversation {} between {} and {}",
        conversation_id,
        sender.email,
        other.email
    );
    Ok(conversation_id)
}
