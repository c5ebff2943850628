use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        log::info!("🔗 Connecting to database: {}", database_url);

        // Extract file path from database URL to create directory if needed
        let file_path = if let Some(rest) = database_url.strip_prefix("sqlite://") {
            rest.split('?').next().unwrap_or(rest)
        } else if let Some(rest) = database_url.strip_prefix("sqlite:") {
            rest.split('?').next().unwrap_or(rest)
        } else {
            database_url
        };

        if file_path != ":memory:" {
            if let Some(parent) = std::path::Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| sqlx::Error::Configuration(Box::new(e)))?;
                    log::info!("📁 Created database directory: {:?}", parent);
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        log::info!("✅ Database connection successful");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        // Identity records, keyed by lowercase email
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS users (
                email TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                full_name TEXT NOT NULL,
                has_profile_picture INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );
        "#).execute(&self.pool).await?;

        // Credentials
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS auth (
                email TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL
            );
        "#).execute(&self.pool).await?;

        // Sessions
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS sessions (
                email TEXT NOT NULL,
                session_token TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
        "#).execute(&self.pool).await?;

        // Session events (login_success, logout)
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS session_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                event_type TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
        "#).execute(&self.pool).await?;

        // Conversation summaries, one row per (owner, conversation).
        // Per-item rows make an append a single INSERT, so concurrent appends
        // to the same owner's list cannot overwrite each other.
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS conversations (
                owner_email TEXT NOT NULL,
                id TEXT NOT NULL,
                other_user_email TEXT NOT NULL,
                name TEXT NOT NULL,
                latest_text TEXT NOT NULL,
                latest_date INTEGER NOT NULL,
                latest_is_read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (owner_email, id)
            );
        "#).execute(&self.pool).await?;

        // Message log. seq is the insertion order; message_id is the
        // client-derived id and is not assumed unique.
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                sender_email TEXT NOT NULL,
                receiver_name TEXT NOT NULL,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                sent_at INTEGER NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0
            );
        "#).execute(&self.pool).await?;

        Ok(())
    }
}
