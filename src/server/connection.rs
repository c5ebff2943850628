use std::fs::File;
use std::io::BufReader as StdBufReader;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpListener;

// Optional TLS
use rustls::ServerConfig as RustlsConfig;
use rustls_pemfile::{certs, pkcs8_private_keys, rsa_private_keys};
use tokio_rustls::TlsAcceptor;

use crate::common::models::Message;
use crate::server::config::ServerConfig;
use crate::server::database::Database;
use crate::server::error::ServiceError;
use crate::server::storage::ObjectStore;
use crate::server::{auth, conversations, messages, users};

const ERR_SESSION: &str = "ERR: Invalid or expired session";

#[derive(Clone)]
pub struct Server {
    pub db: Arc<Database>,
    pub config: ServerConfig,
    pub store: ObjectStore,
}

fn ok_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => format!("OK: {}", json),
        Err(e) => {
            log::error!("[CONN] Response encoding failed: {}", e);
            "ERR: Response encoding failed".to_string()
        }
    }
}

fn err_line(e: ServiceError) -> String {
    format!("ERR: {}", e)
}

impl Server {
    pub fn new(db: Arc<Database>, config: ServerConfig) -> Self {
        let store = ObjectStore::new(&config.storage_root, config.public_base_url.clone());
        Self { db, config, store }
    }

    /// Configure TLS acceptor from environment variables
    fn setup_tls_acceptor(&self) -> anyhow::Result<Option<TlsAcceptor>> {
        if !self.config.enable_tls {
            log::info!("[TLS] TLS disabled in configuration");
            return Ok(None);
        }

        let cert_path = std::env::var("TLS_CERT_PATH")
            .map_err(|_| anyhow::anyhow!("TLS_CERT_PATH environment variable not set"))?;
        let key_path = std::env::var("TLS_KEY_PATH")
            .map_err(|_| anyhow::anyhow!("TLS_KEY_PATH environment variable not set"))?;

        log::info!("[TLS] Loading certificate from: {}", cert_path);
        log::info!("[TLS] Loading private key from: {}", key_path);

        let cert_file = File::open(&cert_path)
            .map_err(|e| anyhow::anyhow!("Failed to open certificate file '{}': {}", cert_path, e))?;
        let mut cert_reader = StdBufReader::new(cert_file);
        let cert_chain = certs(&mut cert_reader)?
            .into_iter()
            .map(rustls::Certificate)
            .collect::<Vec<_>>();

        if cert_chain.is_empty() {
            return Err(anyhow::anyhow!("No certificates found in {}", cert_path));
        }
        log::info!("[TLS] Loaded {} certificate(s)", cert_chain.len());

        let key_file = File::open(&key_path)
            .map_err(|e| anyhow::anyhow!("Failed to open private key file '{}': {}", key_path, e))?;
        let mut key_reader = StdBufReader::new(key_file);

        // Try PKCS8 first, then RSA
        let mut keys = pkcs8_private_keys(&mut key_reader)?;
        if keys.is_empty() {
            let key_file = File::open(&key_path)?;
            let mut key_reader = StdBufReader::new(key_file);
            keys = rsa_private_keys(&mut key_reader)?;
        }

        if keys.is_empty() {
            return Err(anyhow::anyhow!("No private keys found in {}", key_path));
        }

        let priv_key = rustls::PrivateKey(keys.remove(0));
        let rustls_cfg = RustlsConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_single_cert(cert_chain, priv_key)
            .map_err(|e| anyhow::anyhow!("TLS configuration error: {}", e))?;

        log::info!("[TLS] TLS configuration successful");
        Ok(Some(TlsAcceptor::from(Arc::new(rustls_cfg))))
    }

    pub async fn run(&self, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("[SERVER] Listening on {}", addr);

        let tls_acceptor = match self.setup_tls_acceptor() {
            Ok(acceptor) => acceptor,
            Err(e) => {
                log::warn!("[TLS] TLS configuration failed: {}", e);
                log::warn!("[TLS] Falling back to plain TCP");
                None
            }
        };

        loop {
            let (stream, peer) = listener.accept().await?;
            log::info!("[SERVER] New connection from {}", peer);
            let server = self.clone();
            let acceptor = tls_acceptor.clone();
            tokio::spawn(async move {
                if let Some(acceptor) = acceptor {
                    match acceptor.accept(stream).await {
                        Ok(tls_stream) => {
                            if let Err(e) = handle_client(server, tls_stream, peer).await {
                                log::warn!("[SERVER] Client error (tls {}): {}", peer, e);
                            }
                        }
                        Err(e) => log::warn!("[TLS] TLS accept failed: {}", e),
                    }
                } else if let Err(e) = handle_client(server, stream, peer).await {
                    log::warn!("[SERVER] Client error ({}): {}", peer, e);
                }
            });
        }
    }

    pub async fn handle_command(&self, cmd: &str, args: &[&str]) -> String {
        match cmd {
            // AUTH
            "/register" if args.len() >= 4 => {
                let email = args[0];
                let password = args[1];
                let first_name = args[2];
                let last_name = args[3..].join(" ");
                match auth::register(self.db.clone(), first_name, &last_name, email, password, &self.config).await {
                    Ok(session) => format!("OK: Registered as {} SESSION: {}", session.email, session.token),
                    Err(e) => err_line(e),
                }
            }
            "/login" if args.len() == 2 => {
                match auth::login(self.db.clone(), args[0], args[1], &self.config).await {
                    Ok(session) => format!("OK: Logged in as {} SESSION: {}", session.email, session.token),
                    Err(e) => err_line(e),
                }
            }
            "/logout" if args.len() == 1 => {
                match auth::logout(self.db.clone(), args[0]).await {
                    Ok(()) => "OK: Logged out".to_string(),
                    Err(e) => err_line(e),
                }
            }
            "/validate_session" if args.len() == 1 => {
                match auth::validate_session(self.db.clone(), args[0]).await {
                    Some(email) => format!("OK: {}", email),
                    None => ERR_SESSION.to_string(),
                }
            }
            // IDENTITY
            "/get_user" if args.len() == 2 => {
                if auth::validate_session(self.db.clone(), args[0]).await.is_some() {
                    match users::get_user(self.db.clone(), args[1]).await {
                        Ok(user) => ok_json(&user),
                        Err(e) => err_line(e),
                    }
                } else {
                    ERR_SESSION.to_string()
                }
            }
            "/all_users" if args.len() == 1 => {
                if auth::validate_session(self.db.clone(), args[0]).await.is_some() {
                    match users::list_all(self.db.clone(), None).await {
                        Ok(all) => ok_json(&all),
                        Err(e) => err_line(e),
                    }
                } else {
                    ERR_SESSION.to_string()
                }
            }
            "/search_users" if args.len() >= 2 => {
                if auth::validate_session(self.db.clone(), args[0]).await.is_some() {
                    let prefix = args[1..].join(" ");
                    match users::search_by_name_prefix(self.db.clone(), &prefix).await {
                        Ok(found) => ok_json(&found),
                        Err(e) => err_line(e),
                    }
                } else {
                    ERR_SESSION.to_string()
                }
            }
            // CONVERSATIONS
            "/create_conversation" if args.len() >= 3 => {
                if let Some(email) = auth::validate_session(self.db.clone(), args[0]).await {
                    let content = args[2..].join(" ");
                    match self.create_conversation(&email, args[1], &content).await {
                        Ok(conversation_id) => format!("OK: {}", conversation_id),
                        Err(e) => err_line(e),
                    }
                } else {
                    ERR_SESSION.to_string()
                }
            }
            "/list_conversations" if args.len() == 1 => {
                if let Some(email) = auth::validate_session(self.db.clone(), args[0]).await {
                    match conversations::list_conversations(self.db.clone(), &email).await {
                        Ok(list) => ok_json(&list),
                        Err(e) => err_line(e),
                    }
                } else {
                    ERR_SESSION.to_string()
                }
            }
            // MESSAGES
            "/send_message" if args.len() >= 3 => {
                if let Some(email) = auth::validate_session(self.db.clone(), args[0]).await {
                    let content = args[2..].join(" ");
                    match self.send_message(&email, args[1], &content).await {
                        Ok(_) => "OK: Message sent".to_string(),
                        Err(e) => err_line(e),
                    }
                } else {
                    ERR_SESSION.to_string()
                }
            }
            "/get_messages" if args.len() == 2 => {
                if auth::validate_session(self.db.clone(), args[0]).await.is_some() {
                    match messages::list_messages(self.db.clone(), args[1]).await {
                        Ok(log) => ok_json(&log),
                        Err(e) => err_line(e),
                    }
                } else {
                    ERR_SESSION.to_string()
                }
            }
            // PROFILE PICTURES
            "/upload_photo" if args.len() == 3 => {
                if let Some(email) = auth::validate_session(self.db.clone(), args[0]).await {
                    match self.upload_photo(&email, args[1], args[2]).await {
                        Ok(url) => format!("OK: {}", url),
                        Err(e) => err_line(e),
                    }
                } else {
                    ERR_SESSION.to_string()
                }
            }
            "/photo_url" if args.len() == 2 => {
                if auth::validate_session(self.db.clone(), args[0]).await.is_some() {
                    match self.store.download_url(args[1]) {
                        Ok(url) => format!("OK: {}", url),
                        Err(e) => err_line(e),
                    }
                } else {
                    ERR_SESSION.to_string()
                }
            }
            // SYSTEM
            "/help" => users::help(),
            "/quit" => "OK: Disconnected".to_string(),
            _ => "ERR: Unknown or invalid command".to_string(),
        }
    }

    /// First message between two users: resolves both identities, builds the
    /// message and creates the two-sided conversation plus its log.
    async fn create_conversation(&self, sender_email: &str, other_email: &str, content: &str) -> Result<String, ServiceError> {
        if content.chars().count() > self.config.max_message_length {
            return Err(ServiceError::MessageTooLong(self.config.max_message_length));
        }
        let sender = users::get_user(self.db.clone(), sender_email).await?;
        let other = users::get_user(self.db.clone(), other_email).await?;
        let first_message = Message::new_text(&sender.email, &other.email, &other.full_name, content);
        conversations::create_conversation(self.db.clone(), &sender, &other, &first_message).await
    }

    /// Message into an existing conversation: the counterpart comes from the
    /// sender's own summary row.
    async fn send_message(&self, sender_email: &str, conversation_id: &str, content: &str) -> Result<Message, ServiceError> {
        let summary = conversations::find_for_owner(self.db.clone(), sender_email, conversation_id).await?;
        let message = Message::new_text(sender_email, &summary.other_user_email, &summary.name, content);
        messages::append_message(self.db.clone(), conversation_id, &message, &self.config).await?;
        Ok(message)
    }

    async fn upload_photo(&self, email: &str, filename: &str, data_b64: &str) -> Result<String, ServiceError> {
        let bytes = general_purpose::STANDARD
            .decode(data_b64)
            .map_err(|_| ServiceError::InvalidInput("photo data is not valid base64".to_string()))?;
        let key = ObjectStore::profile_picture_key(email, filename);
        let url = self.store.put(&key, &bytes)?;
        users::mark_profile_picture(self.db.clone(), email).await?;
        Ok(url)
    }
}

async fn handle_client<S>(server: Server, stream: S, peer: std::net::SocketAddr) -> anyhow::Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            log::info!("[SERVER] Client disconnected: {}", peer);
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();
        // Arguments can carry credentials or photo payloads; log the verb only.
        log::debug!("[CONN] [{}] Cmd='{}'", peer, cmd);
        let response = server.handle_command(cmd, &args).await;
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        if cmd == "/quit" {
            log::info!("[SERVER] Client quit: {}", peer);
            break;
        }
    }
    Ok(())
}
