// Entry point for the messenger-server binary
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use messenger_service::server::{auth, config::ServerConfig, connection::Server, database::Database};
use messenger_service::utils::performance;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    std::env::set_var("RUST_LOG", &config.log_level);
    env_logger::init();

    if config.enable_tls {
        info!("TLS is enabled; set TLS_CERT_PATH and TLS_KEY_PATH env vars to point to cert and key PEM files.");
    } else {
        info!("TLS is disabled; connections will be plain TCP.");
    }

    let database = Arc::new(Database::connect(&config.database_url).await?);

    info!("🗄️ Running database migrations...");
    database.migrate().await.map_err(|e| {
        error!("Database migration failed: {}", e);
        e
    })?;
    info!("✅ Database migrations completed successfully");

    // Sweep expired sessions in the background
    let cleanup_db = database.clone();
    tokio::spawn(async move {
        loop {
            auth::cleanup_expired_sessions(cleanup_db.clone()).await;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    });

    // Start performance logger in background
    let perf_log_path = std::env::var("PERFORMANCE_LOG_PATH")
        .unwrap_or_else(|_| "data/messenger_performance.log".to_string());
    let perf_db = database.clone();
    tokio::spawn(async move {
        info!("📊 Starting performance logger - logging every 120 seconds to: {}", perf_log_path);
        performance::start_performance_logger(perf_db, &perf_log_path).await;
    });

    let server = Server::new(database, config.clone());
    server.run(&format!("{}:{}", config.host, config.port)).await?;
    Ok(())
}
