use keyring::Entry;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "messenger_app";
const USER: &str = "messenger_session";

/// Locally persisted signed-in state: the session token plus the display
/// fields the UI renders without a round trip. One object with one lifecycle:
/// saved at sign-in, cleared at sign-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub token: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

fn fallback_path() -> std::path::PathBuf {
    std::path::Path::new("data").join("session.json")
}

fn fallback_enabled() -> bool {
    std::env::var("KEYRING_FALLBACK").unwrap_or_default() == "true"
}

pub fn save_session(session: &StoredSession) -> anyhow::Result<()> {
    let json = serde_json::to_string(session)?;
    let entry = Entry::new(SERVICE, USER);
    match entry.set_password(&json) {
        Ok(()) => Ok(()),
        Err(_e) => {
            // Keyring failed. Optionally fall back to a local file when explicitly allowed
            if fallback_enabled() {
                let path = fallback_path();
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                std::fs::write(&path, &json)?;
                log::warn!("[SESSION_STORE] Keyring unavailable, persisted session to fallback file");
                Ok(())
            } else {
                Err(anyhow::anyhow!("keyring unavailable and file fallback disabled"))
            }
        }
    }
}

pub fn load_session() -> Option<StoredSession> {
    let entry = Entry::new(SERVICE, USER);
    match entry.get_password() {
        Ok(json) => serde_json::from_str(&json).ok(),
        Err(_e) => {
            if fallback_enabled() {
                let path = fallback_path();
                if path.exists() {
                    if let Ok(json) = std::fs::read_to_string(&path) {
                        return serde_json::from_str(&json).ok();
                    }
                }
            }
            None
        }
    }
}

pub fn clear_session() -> anyhow::Result<()> {
    let entry = Entry::new(SERVICE, USER);
    let _ = entry.delete_password();
    if fallback_enabled() {
        let path = fallback_path();
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
    }
    Ok(())
}
