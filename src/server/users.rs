use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::common::models::User;
use crate::server::database::Database;
use crate::server::error::ServiceError;

fn user_from_row(row: &SqliteRow) -> User {
    User {
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        has_profile_picture: row.get::<i64, _>("has_profile_picture") != 0,
    }
}

/// Looks up one identity record, case-insensitively on email.
pub async fn get_user(db: Arc<Database>, email: &str) -> Result<User, ServiceError> {
    let email = email.to_lowercase();
    let row = sqlx::query("SELECT email, first_name, last_name, full_name, has_profile_picture FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::warn!("[USERS] Error fetching user {}: {}", email, e);
            ServiceError::UserFetch
        })?;
    match row {
        Some(row) => Ok(user_from_row(&row)),
        None => Err(ServiceError::UserNotFound(email)),
    }
}

/// Every identity record, for the "start new conversation" picker.
/// No pagination; scales linearly with total users.
pub async fn list_all(db: Arc<Database>, exclude_email: Option<&str>) -> Result<Vec<User>, ServiceError> {
    log::debug!("[USERS] Listing all users");
    let rows = sqlx::query("SELECT email, first_name, last_name, full_name, has_profile_picture FROM users ORDER BY email")
        .fetch_all(&db.pool)
        .await
        .map_err(|e| {
            log::warn!("[USERS] Error listing users: {}", e);
            ServiceError::UserFetch
        })?;
    let mut users: Vec<User> = rows.iter().map(user_from_row).collect();
    if let Some(exclude) = exclude_email {
        let exclude = exclude.to_lowercase();
        users.retain(|u| u.email != exclude);
    }
    Ok(users)
}

/// Users whose full name starts with the given prefix, case-insensitively.
/// Filtered in memory over the full list, as the original client did.
pub async fn search_by_name_prefix(db: Arc<Database>, prefix: &str) -> Result<Vec<User>, ServiceError> {
    let rows = sqlx::query("SELECT email, first_name, last_name, full_name, has_profile_picture FROM users ORDER BY email")
        .fetch_all(&db.pool)
        .await
        .map_err(|e| {
            log::warn!("[USERS] Error searching users: {}", e);
            ServiceError::ProfileSearch
        })?;
    let needle = prefix.to_lowercase();
    let users = rows
        .iter()
        .map(user_from_row)
        .filter(|u| u.full_name.to_lowercase().starts_with(&needle))
        .collect();
    Ok(users)
}

/// Records that the user now has a stored profile picture.
pub async fn mark_profile_picture(db: Arc<Database>, email: &str) -> Result<(), ServiceError> {
    let email = email.to_lowercase();
    let res = sqlx::query("UPDATE users SET has_profile_picture = 1 WHERE email = ?")
        .bind(&email)
        .execute(&db.pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(ServiceError::UserNotFound(email));
    }
    Ok(())
}

pub fn help() -> String {
    "Available commands:\n\
    /register <email> <password> <first_name> <last_name>\n\
    /login <email> <password>\n\
    /logout <session>\n\
    /validate_session <session>\n\
    /get_user <session> <email>\n\
    /all_users <session>\n\
    /search_users <session> <name_prefix>\n\
    /create_conversation <session> <other_email> <message>\n\
    /list_conversations <session>\n\
    /send_message <session> <conversation_id> <message>\n\
    /get_messages <session> <conversation_id>\n\
    /upload_photo <session> <filename> <base64_png>\n\
    /photo_url <session> <path>\n\
    /help\n\
    /quit\n"
        .to_string()
}
