use std::path::PathBuf;

use crate::server::error::ServiceError;

/// Key-based blob store for profile pictures, backed by a directory tree
/// under the configured storage root. Keys look like
/// `users/{email}/{filename}`, mirroring the original storage layout.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self { root: root.into(), public_base_url }
    }

    pub fn profile_picture_key(email: &str, filename: &str) -> String {
        format!("users/{}/{}", email.to_lowercase(), filename)
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, ServiceError> {
        // Keys come off the wire; refuse anything that could escape the root.
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return Err(ServiceError::InvalidInput(format!("bad storage key: {}", key)));
        }
        Ok(self.root.join(key))
    }

    /// Writes the blob and returns its download URL.
    pub fn put(&self, key: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        let path = self.blob_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                log::warn!("[STORE] Cannot create {:?}: {}", parent, e);
                ServiceError::PhotoUpload
            })?;
        }
        std::fs::write(&path, bytes).map_err(|e| {
            log::warn!("[STORE] Cannot write {}: {}", key, e);
            ServiceError::PhotoUpload
        })?;
        log::info!("[STORE] Stored {} ({} bytes)", key, bytes.len());
        self.download_url(key)
    }

    /// URL for an existing blob: the configured public base plus the key, or
    /// a file:// URL when no base is configured.
    pub fn download_url(&self, key: &str) -> Result<String, ServiceError> {
        let path = self.blob_path(key)?;
        if !path.exists() {
            log::warn!("[STORE] No blob at {}", key);
            return Err(ServiceError::DownloadUrl);
        }
        match &self.public_base_url {
            Some(base) => Ok(format!("{}/{}", base.trim_end_matches('/'), key)),
            None => {
                let abs = path.canonicalize().map_err(|e| {
                    log::warn!("[STORE] Cannot resolve {}: {}", key, e);
                    ServiceError::DownloadUrl
                })?;
                Ok(format!("file://{}", abs.display()))
            }
        }
    }
}
