use thiserror::Error;

/// Closed set of failures the service reports. Everything the wire layer
/// renders as an `ERR:` line comes through here.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Profile search failed")]
    ProfileSearch,

    #[error("User fetch failed")]
    UserFetch,

    #[error("Conversation fetch failed")]
    ConversationFetch,

    #[error("Message fetch failed")]
    MessageFetch,

    #[error("Photo upload failed")]
    PhotoUpload,

    #[error("Download URL failed")]
    DownloadUrl,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Message too long (max {0} chars)")]
    MessageTooLong(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
