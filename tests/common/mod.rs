#![allow(dead_code)]

use std::sync::Arc;

use messenger_service::common::models::User;
use messenger_service::server::config::ServerConfig;
use messenger_service::server::database::Database;
use messenger_service::server::{auth, users};
use tempfile::TempDir;

/// Fresh migrated database in a throwaway directory. Keep the returned
/// TempDir alive for the duration of the test.
pub async fn test_db() -> (Arc<Database>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("test.db");
    let url = format!("sqlite:{}", db_path.display());
    let db = Database::connect(&url).await.expect("connect");
    db.migrate().await.expect("migrate");
    (Arc::new(db), dir)
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: String::new(),
        storage_root: String::new(),
        public_base_url: None,
        enable_tls: false,
        log_level: "debug".to_string(),
        session_expiry_days: 7,
        argon2_salt_length: 16,
        max_message_length: 2048,
    }
}

pub async fn seed_user(
    db: &Arc<Database>,
    config: &ServerConfig,
    first: &str,
    last: &str,
    email: &str,
) -> User {
    auth::register(db.clone(), first, last, email, "secret99", config)
        .await
        .expect("register");
    users::get_user(db.clone(), email).await.expect("get_user")
}
