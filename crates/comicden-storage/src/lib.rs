use anyhow::Result;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// Manages on-disk storage for uploaded comic files.
///
/// Files are opaque blobs stored flat under one directory. Each upload
/// gets a collision-resistant stored name of the form
/// `{uuid}_{sanitized original name}`; callers address files only by that
/// name. Contents are never inspected here; the extension allow-list and
/// size cap are the upload handler's concern.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// Path to a stored file.
    pub fn path(&self, stored_name: &str) -> PathBuf {
        self.dir.join(stored_name)
    }

    /// Write bytes to disk under a fresh stored name and return that name.
    pub async fn save(&self, bytes: &[u8], original_name: &str) -> Result<String> {
        let stored_name = format!("{}_{}", Uuid::new_v4(), sanitize_name(original_name));
        let path = self.path(&stored_name);
        fs::write(&path, bytes).await?;
        Ok(stored_name)
    }

    /// Read a stored file back in full.
    pub async fn read(&self, stored_name: &str) -> Result<Vec<u8>> {
        let path = self.path(stored_name);
        let bytes = fs::read(&path).await?;
        Ok(bytes)
    }

    /// Delete a stored file from disk.
    pub async fn delete(&self, stored_name: &str) -> Result<()> {
        let path = self.path(stored_name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted stored file {}", stored_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Stored file {} already gone", stored_name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Keep only the final path component of a client-supplied filename and
/// replace anything outside a conservative character set. Stored names
/// must never escape the storage directory.
fn sanitize_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['_', '.']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
