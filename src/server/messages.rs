use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::common::models::{Message, MessageKind};
use crate::server::config::ServerConfig;
use crate::server::database::Database;
use crate::server::error::ServiceError;

fn message_from_row(row: &SqliteRow) -> Message {
    Message {
        id: row.get("message_id"),
        sender_email: row.get("sender_email"),
        receiver_name: row.get("receiver_name"),
        kind: MessageKind::parse(&row.get::<String, _>("kind")),
        content: row.get("content"),
        sent_at: row.get("sent_at"),
        is_read: row.get::<i64, _>("is_read") != 0,
    }
}

/// Inserts one message row. The log is append-only; ordering comes from the
/// AUTOINCREMENT sequence, not from the client-derived message id.
pub(crate) async fn append_row(
    db: Arc<Database>,
    conversation_id: &str,
    message: &Message,
) -> Result<(), ServiceError> {
    sqlx::query(
        "INSERT INTO messages (conversation_id, message_id, sender_email, receiver_name, kind, content, sent_at, is_read) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(conversation_id)
    .bind(&message.id)
    .bind(&message.sender_email)
    .bind(&message.receiver_name)
    .bind(message.kind.as_str())
    .bind(&message.content)
    .bind(message.sent_at)
    .bind(message.is_read as i64)
    .execute(&db.pool)
    .await?;
    Ok(())
}

/// Appends a message to an existing conversation and refreshes the
/// latest-message snapshot on both participants' summary rows.
pub async fn append_message(
    db: Arc<Database>,
    conversation_id: &str,
    message: &Message,
    config: &ServerConfig,
) -> Result<(), ServiceError> {
    if message.content.chars().count() > config.max_message_length {
        return Err(ServiceError::MessageTooLong(config.max_message_length));
    }

    append_row(db.clone(), conversation_id, message).await?;

    // One statement covers both owners' rows for this conversation.
    let updated = sqlx::query(
        "UPDATE conversations SET latest_text = ?, latest_date = ?, latest_is_read = 0 WHERE id = ?",
    )
    .bind(&message.content)
    .bind(message.sent_at)
    .bind(conversation_id)
    .execute(&db.pool)
    .await?;
    if updated.rows_affected() == 0 {
        log::warn!("[MSG] No summaries to refresh for {}", conversation_id);
    }

    log::info!(
        "[MSG] Message appended to {} by {}",
        conversation_id,
        message.sender_email
    );
    Ok(())
}

/// The full message history, in insertion order. Fetched whole every time;
/// there is no pagination.
pub async fn list_messages(
    db: Arc<Database>,
    conversation_id: &str,
) -> Result<Vec<Message>, ServiceError> {
    let rows = sqlx::query(
        "SELECT message_id, sender_email, receiver_name, kind, content, sent_at, is_read \
         FROM messages WHERE conversation_id = ? ORDER BY seq ASC",
    )
    .bind(conversation_id)
    .fetch_all(&db.pool)
    .await
    .map_err(|e| {
        log::warn!("[MSG] Error listing messages for {}: {}", conversation_id, e);
        ServiceError::MessageFetch
    })?;
    Ok(rows.iter().map(message_from_row).collect())
}
