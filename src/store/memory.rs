//! In-memory key slot for tests and ephemeral processes.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::store::{KeySlot, StoreError, StoredKeyRecord};

/// In-memory implementation of [`KeySlot`].
#[derive(Default)]
pub struct MemoryKeySlot {
    record: RwLock<Option<StoredKeyRecord>>,
}

impl MemoryKeySlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeySlot for MemoryKeySlot {
    async fn load(&self) -> Result<Option<StoredKeyRecord>, StoreError> {
        let record = self
            .record
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(record.clone())
    }

    async fn store(&self, record: &StoredKeyRecord) -> Result<(), StoreError> {
        let mut slot = self
            .record
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        *slot = Some(record.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self
            .record
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}
