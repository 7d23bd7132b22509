//! File-backed key slot.
//!
//! Persists the record as a single JSON file. Writes land in a sibling temp
//! file first and are renamed into place, so a crash mid-write cannot leave
//! a torn record behind. Unreadable or unparseable content loads as empty.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::store::{KeySlot, StoreError, StoredKeyRecord};

/// File-backed implementation of [`KeySlot`].
pub struct FileKeySlot {
    path: PathBuf,
}

impl FileKeySlot {
    /// Use `path` as the slot file. Parent directories are created on the
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The slot file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeySlot for FileKeySlot {
    async fn load(&self) -> Result<Option<StoredKeyRecord>, StoreError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                log::warn!("discarding unparseable key record: {e}");
                Ok(None)
            }
        }
    }

    async fn store(&self, record: &StoredKeyRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec(record)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
