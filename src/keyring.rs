//! Cached, single-flight acquisition of the journal client key.
//!
//! The keyring owns the persisted key slot and serializes every operation
//! behind one async mutex, so concurrent callers trigger at most one key
//! exchange per process and never observe a half-written record.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::crypto::{Fernet, FernetError};
use crate::exchange::{KeyAgreement, SetupError};
use crate::store::{KeySlot, StoreError, StoredKeyRecord};
use crate::types::{AuthenticatedUser, JournalClientKey, Visitor, WrappedJournalClientKey};

/// Failure modes surfaced by keyring operations.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// The key exchange could not complete.
    #[error("failed to get key: {0}")]
    Setup(#[from] SetupError),
    /// Durable storage failed. Not masked by a fresh exchange, so persistent
    /// storage problems stay visible.
    #[error("key storage failed: {0}")]
    Storage(#[from] StoreError),
    /// Stored key material could not be parsed into a cipher.
    #[error("failed to create fernet key: {0}")]
    Key(#[from] FernetError),
}

/// Client-side cache of the per-user journal key.
pub struct ClientKeyring {
    slot: Arc<dyn KeySlot>,
    agreement: Arc<dyn KeyAgreement>,
    lock: Mutex<()>,
}

impl ClientKeyring {
    pub fn new(slot: Arc<dyn KeySlot>, agreement: Arc<dyn KeyAgreement>) -> Self {
        Self {
            slot,
            agreement,
            lock: Mutex::new(()),
        }
    }

    /// Get the cached key for `user`, or run a key exchange and cache the
    /// result.
    ///
    /// A cached key is returned as-is without an expiry check; validity is
    /// enforced per-token by the cipher's timestamp window. Cancelling the
    /// returned future mid-exchange leaves no partial record behind.
    pub async fn get_or_create(
        &self,
        user: &AuthenticatedUser,
        visitor: &Visitor,
    ) -> Result<JournalClientKey, KeyringError> {
        let _guard = self.lock.lock().await;

        if let Some(existing) = self.load_for(user).await? {
            log::debug!("journal client key cache hit ({})", existing.uid);
            return Ok(existing);
        }

        let created = self.agreement.create_key(user, visitor).await?;
        self.slot
            .store(&StoredKeyRecord {
                user: user.sub().to_string(),
                key: created.clone(),
            })
            .await?;
        Ok(created)
    }

    /// Like [`Self::get_or_create`], but wraps the raw key material in a
    /// ready-to-use [`Fernet`] cipher.
    pub async fn get_or_create_wrapped(
        &self,
        user: &AuthenticatedUser,
        visitor: &Visitor,
    ) -> Result<WrappedJournalClientKey, KeyringError> {
        let raw = self.get_or_create(user, visitor).await?;
        let fernet = Fernet::new(&raw.key)?;
        Ok(WrappedJournalClientKey {
            uid: raw.uid,
            fernet,
        })
    }

    /// Delete the cached key if it has the given uid; no-op otherwise.
    ///
    /// Used when the server reports that a key uid is no longer recognized.
    pub async fn delete(&self, uid: &str) -> Result<(), KeyringError> {
        let _guard = self.lock.lock().await;

        match self.slot.load().await? {
            Some(record) if record.key.uid == uid => Ok(self.slot.clear().await?),
            _ => Ok(()),
        }
    }

    /// Remove any cached key regardless of owner. Used on logout and account
    /// deletion.
    pub async fn purge_all(&self) -> Result<(), KeyringError> {
        let _guard = self.lock.lock().await;
        Ok(self.slot.clear().await?)
    }

    /// Read the slot, evicting a record owned by a different user.
    async fn load_for(
        &self,
        user: &AuthenticatedUser,
    ) -> Result<Option<JournalClientKey>, StoreError> {
        match self.slot.load().await? {
            Some(record) if record.user == user.sub() => Ok(Some(record.key)),
            Some(_) => {
                log::debug!("evicting journal client key owned by another user");
                self.slot.clear().await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::store::MemoryKeySlot;

    const TEST_KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

    struct CountingAgreement {
        calls: AtomicUsize,
    }

    impl CountingAgreement {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl KeyAgreement for CountingAgreement {
        async fn create_key(
            &self,
            _user: &AuthenticatedUser,
            _visitor: &Visitor,
        ) -> Result<JournalClientKey, SetupError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            // Hold the exchange open long enough for racing callers to pile
            // up on the lock.
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(JournalClientKey {
                uid: format!("jck_{call}"),
                key: TEST_KEY.to_string(),
            })
        }
    }

    struct FailingAgreement;

    #[async_trait]
    impl KeyAgreement for FailingAgreement {
        async fn create_key(
            &self,
            _user: &AuthenticatedUser,
            _visitor: &Visitor,
        ) -> Result<JournalClientKey, SetupError> {
            Err(SetupError::Status(503))
        }
    }

    fn keyring(agreement: Arc<dyn KeyAgreement>) -> Arc<ClientKeyring> {
        Arc::new(ClientKeyring::new(Arc::new(MemoryKeySlot::new()), agreement))
    }

    fn user(sub: &str) -> AuthenticatedUser {
        AuthenticatedUser::new(sub, "jwt")
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let agreement = Arc::new(CountingAgreement::new());
        let keyring = keyring(agreement.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let keyring = keyring.clone();
            handles.push(tokio::spawn(async move {
                keyring.get_or_create(&user("u_1"), &Visitor::new()).await
            }));
        }

        let mut keys = Vec::new();
        for handle in handles {
            keys.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(agreement.calls.load(Ordering::SeqCst), 1);
        assert!(keys.iter().all(|k| k == &keys[0]));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_exchange() {
        let agreement = Arc::new(CountingAgreement::new());
        let keyring = keyring(agreement.clone());

        let first = keyring
            .get_or_create(&user("u_1"), &Visitor::new())
            .await
            .unwrap();
        let second = keyring
            .get_or_create(&user("u_1"), &Visitor::new())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(agreement.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_user_switch_evicts_and_reexchanges() {
        let agreement = Arc::new(CountingAgreement::new());
        let keyring = keyring(agreement.clone());

        let key_a = keyring
            .get_or_create(&user("u_a"), &Visitor::new())
            .await
            .unwrap();
        let key_b = keyring
            .get_or_create(&user("u_b"), &Visitor::new())
            .await
            .unwrap();

        assert_ne!(key_a.uid, key_b.uid);
        assert_eq!(agreement.calls.load(Ordering::SeqCst), 2);

        // The slot now belongs to u_b; u_b hits the cache.
        let again = keyring
            .get_or_create(&user("u_b"), &Visitor::new())
            .await
            .unwrap();
        assert_eq!(again, key_b);
        assert_eq!(agreement.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_matching_uid_only() {
        let agreement = Arc::new(CountingAgreement::new());
        let keyring = keyring(agreement.clone());

        let key = keyring
            .get_or_create(&user("u_1"), &Visitor::new())
            .await
            .unwrap();

        // Wrong uid and empty-slot deletes are no-ops.
        keyring.delete("jck_other").await.unwrap();
        assert_eq!(
            keyring
                .get_or_create(&user("u_1"), &Visitor::new())
                .await
                .unwrap(),
            key
        );

        keyring.delete(&key.uid).await.unwrap();
        keyring.delete(&key.uid).await.unwrap();

        // Slot is empty now, so the next call exchanges again.
        keyring
            .get_or_create(&user("u_1"), &Visitor::new())
            .await
            .unwrap();
        assert_eq!(agreement.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_purge_all_removes_any_owner() {
        let agreement = Arc::new(CountingAgreement::new());
        let keyring = keyring(agreement.clone());

        keyring
            .get_or_create(&user("u_1"), &Visitor::new())
            .await
            .unwrap();
        keyring.purge_all().await.unwrap();

        keyring
            .get_or_create(&user("u_1"), &Visitor::new())
            .await
            .unwrap();
        assert_eq!(agreement.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wrapped_key_is_usable() {
        let keyring = keyring(Arc::new(CountingAgreement::new()));

        let wrapped = keyring
            .get_or_create_wrapped(&user("u_1"), &Visitor::new())
            .await
            .unwrap();

        let token = wrapped.fernet.encrypt(b"journal entry", 1_700_000_000_000);
        assert_eq!(
            wrapped.fernet.decrypt(&token, 1_700_000_000_000).unwrap(),
            b"journal entry"
        );
    }

    #[tokio::test]
    async fn test_exchange_failure_leaves_slot_empty() {
        let slot = Arc::new(MemoryKeySlot::new());
        let keyring = ClientKeyring::new(slot.clone(), Arc::new(FailingAgreement));

        let result = keyring.get_or_create(&user("u_1"), &Visitor::new()).await;
        assert!(matches!(
            result,
            Err(KeyringError::Setup(SetupError::Status(503)))
        ));
        assert_eq!(slot.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        struct BrokenSlot;

        #[async_trait]
        impl KeySlot for BrokenSlot {
            async fn load(&self) -> Result<Option<StoredKeyRecord>, StoreError> {
                Err(StoreError::Backend("disk on fire".to_string()))
            }
            async fn store(&self, _record: &StoredKeyRecord) -> Result<(), StoreError> {
                Err(StoreError::Backend("disk on fire".to_string()))
            }
            async fn clear(&self) -> Result<(), StoreError> {
                Err(StoreError::Backend("disk on fire".to_string()))
            }
        }

        let agreement = Arc::new(CountingAgreement::new());
        let keyring = ClientKeyring::new(Arc::new(BrokenSlot), agreement.clone());

        let result = keyring.get_or_create(&user("u_1"), &Visitor::new()).await;
        assert!(matches!(result, Err(KeyringError::Storage(_))));
        // The exchange never ran; storage problems are not masked by
        // repeated server round trips.
        assert_eq!(agreement.calls.load(Ordering::SeqCst), 0);
    }
}
