use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Filesystem-backed content store for downloaded images.
///
/// Objects are keyed by a digest of their source URL, so storing the same
/// image twice writes the same file. Orphaned objects are harmless and
/// nothing here ever needs a rollback.
pub struct ImageStore {
    root: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub objects: u64,
    pub bytes: u64,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the storage key for a resolved image URL.
    ///
    /// Stable across calls: the same URL always maps to the same key.
    pub fn storage_key(url: &Url) -> String {
        let digest = Sha256::digest(url.as_str().as_bytes());
        digest
            .iter()
            .take(8)
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Persist image bytes under the given filename, creating the store
    /// directory on first use. Overwrites are fine: identical keys carry
    /// identical content.
    pub async fn put(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.root.join(filename);
        tokio::fs::write(&path, bytes).await?;

        debug!("Stored {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    pub async fn exists(&self, filename: &str) -> bool {
        tokio::fs::try_exists(self.root.join(filename))
            .await
            .unwrap_or(false)
    }

    /// Count stored objects and their total size
    pub async fn stats(&self) -> Result<StoreStats> {
        let mut objects = 0;
        let mut bytes = 0;

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            // A store that has never been written to is just empty
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreStats { objects: 0, bytes: 0 })
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                objects += 1;
                bytes += metadata.len();
            }
        }

        Ok(StoreStats { objects, bytes })
    }
}
