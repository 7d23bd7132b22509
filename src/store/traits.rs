//! Key slot trait and the persisted record shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::JournalClientKey;

/// Error type for key slot operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("key record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("key storage unavailable: {0}")]
    Backend(String),
}

/// The single persisted record: one key, tagged with its owning user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredKeyRecord {
    /// Stable subject id of the owning user.
    pub user: String,
    /// The key record issued by the server.
    pub key: JournalClientKey,
}

/// Durable single-slot storage for the journal client key.
///
/// Implementations hold at most one record and need not be internally
/// synchronized; callers serialize access through the keyring lock.
#[async_trait]
pub trait KeySlot: Send + Sync {
    /// Read the stored record; `None` when the slot is empty or its content
    /// cannot be parsed.
    async fn load(&self) -> Result<Option<StoredKeyRecord>, StoreError>;

    /// Replace the slot content.
    async fn store(&self, record: &StoredKeyRecord) -> Result<(), StoreError>;

    /// Empty the slot. Succeeds when the slot is already empty.
    async fn clear(&self) -> Result<(), StoreError>;
}
