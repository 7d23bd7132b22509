//! journal-keys: client-side end-to-end encryption for journal entries.
//!
//! Establishes a per-user symmetric key with the backend via finite-field
//! Diffie-Hellman, derives a Fernet key from the shared secret with
//! HKDF-SHA256, and encrypts journal payloads as Fernet tokens carrying a
//! replay/clock-skew window. Keys are cached in a crash-safe local slot with
//! single-flight acquisition.
//!
//! ## Modules
//!
//! - `crypto` - DH group arithmetic, HKDF, and the Fernet token cipher
//! - `exchange` - the key-creation round trip against the backend
//! - `store` - durable single-slot key persistence
//! - `keyring` - cached, single-flight key acquisition
//! - `clock` - drift-corrected server time
//! - `conformance` - wire-format verification against the test endpoint

pub mod clock;
pub mod config;
pub mod conformance;
pub mod crypto;
pub mod exchange;
pub mod keyring;
pub mod store;
pub mod types;

pub use clock::{DriftCorrectedClock, ServerClock, SystemClock};
pub use config::JournalsConfig;
pub use crypto::{Fernet, FernetError};
pub use exchange::{HttpKeyAgreement, KeyAgreement, SetupError};
pub use keyring::{ClientKeyring, KeyringError};
pub use store::{FileKeySlot, KeySlot, MemoryKeySlot, StoreError, StoredKeyRecord};
pub use types::{AuthenticatedUser, JournalClientKey, Visitor, WrappedJournalClientKey};
