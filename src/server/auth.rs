use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sqlx::Row;

use crate::common::models::User;
use crate::server::config::ServerConfig;
use crate::server::database::Database;
use crate::server::error::ServiceError;

/// Opaque session issued at sign-up/sign-in and revoked at sign-out.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub expires_at: i64,
}

fn hash_password(password: &str, salt_length: u32) -> String {
    let mut salt_bytes = vec![0u8; salt_length as usize];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).unwrap();
    let argon2 = Argon2::default();
    argon2.hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

fn verify_password(hash: &str, password: &str) -> bool {
    // The salt is embedded in the hash string
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

fn generate_session_token() -> String {
    let uuid = uuid::Uuid::new_v4().to_string();
    let mut random = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random);
    format!("{}-{:x}", uuid, md5::compute(random))
}

fn validate_signup(first_name: &str, last_name: &str, email: &str, password: &str) -> Result<(), ServiceError> {
    if first_name.trim().is_empty() || last_name.trim().is_empty() || email.trim().is_empty() {
        return Err(ServiceError::InvalidInput("all fields are required".to_string()));
    }
    if !email.contains('@') {
        return Err(ServiceError::InvalidInput("email must contain @".to_string()));
    }
    if password.chars().count() < 6 {
        return Err(ServiceError::InvalidInput("password must be at least 6 characters".to_string()));
    }
    Ok(())
}

/// Sign-up: creates the identity record and credentials, then issues an
/// initial session so the client is signed in right away.
pub async fn register(
    db: Arc<Database>,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
    config: &ServerConfig,
) -> Result<Session, ServiceError> {
    validate_signup(first_name, last_name, email, password)?;
    let user = User::new(first_name.trim(), last_name.trim(), email.trim());
    log::info!("[AUTH] Register attempt: {}", user.email);

    let created_at = chrono::Utc::now().timestamp();
    let password_hash = hash_password(password, config.argon2_salt_length);

    let mut tx = db.pool.begin().await?;
    let res = sqlx::query(
        "INSERT INTO users (email, first_name, last_name, full_name, has_profile_picture, created_at) VALUES (?, ?, ?, ?, 0, ?)",
    )
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.full_name)
    .bind(created_at)
    .execute(&mut *tx)
    .await;
    if let Err(e) = res {
        let err_str = e.to_string().to_lowercase();
        log::warn!("[AUTH] Registration failed for {}: {}", user.email, e);
        if err_str.contains("unique") || err_str.contains("constraint failed") {
            return Err(ServiceError::EmailTaken);
        }
        return Err(ServiceError::Database(e));
    }
    sqlx::query("INSERT INTO auth (email, password_hash) VALUES (?, ?)")
        .bind(&user.email)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

    let token = generate_session_token();
    let now = chrono::Utc::now().timestamp();
    let expires_at = now + 60 * 60 * 24 * config.session_expiry_days as i64;
    sqlx::query("INSERT INTO sessions (email, session_token, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&user.email)
        .bind(&token)
        .bind(now)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO session_events (email, event_type, created_at) VALUES (?, ?, ?)")
        .bind(&user.email)
        .bind("login_success")
        .bind(now)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    log::info!("[AUTH] Registered {} ({})", user.full_name, user.email);
    Ok(Session { token, email: user.email, expires_at })
}

/// Sign-in: verifies credentials and issues a fresh session. Any previous
/// sessions for the same user are dropped (single active session).
pub async fn login(
    db: Arc<Database>,
    email: &str,
    password: &str,
    config: &ServerConfig,
) -> Result<Session, ServiceError> {
    let email = email.trim().to_lowercase();
    log::info!("[AUTH] Login attempt: {}", email);

    let row = sqlx::query("SELECT password_hash FROM auth WHERE email = ?")
        .bind(&email)
        .fetch_optional(&db.pool)
        .await?;
    let row = match row {
        Some(row) => row,
        None => {
            log::warn!("[AUTH] Login failed for {}: user not found", email);
            return Err(ServiceError::UserNotFound(email));
        }
    };
    let password_hash: String = row.get("password_hash");
    if !verify_password(&password_hash, password) {
        log::warn!("[AUTH] Login failed for {}: wrong password", email);
        return Err(ServiceError::WrongPassword);
    }

    let mut tx = db.pool.begin().await?;
    let dropped = sqlx::query("DELETE FROM sessions WHERE email = ?")
        .bind(&email)
        .execute(&mut *tx)
        .await?;
    if dropped.rows_affected() > 0 {
        log::info!("[AUTH] Dropped {} old sessions for {}", dropped.rows_affected(), email);
    }

    let token = generate_session_token();
    let now = chrono::Utc::now().timestamp();
    let expires_at = now + 60 * 60 * 24 * config.session_expiry_days as i64;
    sqlx::query("INSERT INTO sessions (email, session_token, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&email)
        .bind(&token)
        .bind(now)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO session_events (email, event_type, created_at) VALUES (?, ?, ?)")
        .bind(&email)
        .bind("login_success")
        .bind(now)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    log::info!("[AUTH] Login success for {}", email);
    Ok(Session { token, email, expires_at })
}

/// Sign-out: revokes every session of the token's owner.
pub async fn logout(db: Arc<Database>, session_token: &str) -> Result<(), ServiceError> {
    let row = sqlx::query("SELECT email FROM sessions WHERE session_token = ?")
        .bind(session_token)
        .fetch_optional(&db.pool)
        .await?;
    let email: String = match row {
        Some(row) => row.get("email"),
        None => {
            log::warn!("[AUTH] Logout with unknown token");
            return Err(ServiceError::InvalidSession);
        }
    };

    let deleted = sqlx::query("DELETE FROM sessions WHERE email = ?")
        .bind(&email)
        .execute(&db.pool)
        .await?;
    log::info!("[AUTH] Deleted {} session rows for {}", deleted.rows_affected(), email);

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = sqlx::query("INSERT INTO session_events (email, event_type, created_at) VALUES (?, ?, ?)")
        .bind(&email)
        .bind("logout")
        .bind(now)
        .execute(&db.pool)
        .await
    {
        log::warn!("[AUTH] Failed to record logout event for {}: {}", email, e);
    }
    Ok(())
}

/// Maps a session token to the owning email. Expired tokens are refused.
pub async fn validate_session(db: Arc<Database>, session_token: &str) -> Option<String> {
    let now = chrono::Utc::now().timestamp();
    let row = sqlx::query("SELECT email FROM sessions WHERE session_token = ? AND expires_at > ?")
        .bind(session_token)
        .bind(now)
        .fetch_optional(&db.pool)
        .await
        .ok()?;
    match row {
        Some(row) => Some(row.get("email")),
        None => {
            log::debug!("[AUTH] validate_session: token invalid or expired");
            None
        }
    }
}

/// Removes expired sessions. Idempotent, safe to run periodically.
pub async fn cleanup_expired_sessions(db: Arc<Database>) {
    let now = chrono::Utc::now().timestamp();
    match sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(&db.pool)
        .await
    {
        Ok(res) => {
            if res.rows_affected() > 0 {
                log::info!("[AUTH] Cleaned up {} expired sessions", res.rows_affected());
            }
        }
        Err(e) => log::warn!("[AUTH] Failed to cleanup sessions: {}", e),
    }
}
