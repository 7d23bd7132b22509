//! Cryptographic primitives for journal encryption.
//!
//! This module provides the operations behind the client key lifecycle:
//! - finite-field Diffie-Hellman over MODP Group 14 (key agreement)
//! - HKDF-SHA256 (key derivation)
//! - the Fernet authenticated token cipher (payload encryption)

mod dh;
mod fernet;
mod hkdf;

pub use dh::{DhKeyPair, GROUP_14_GENERATOR, GROUP_14_PRIME, MODP_BYTES};
pub use fernet::{Fernet, FernetError, DEFAULT_TTL_SECONDS};
pub use hkdf::{derive_fernet_key, Hkdf, FERNET_KEY_BYTES};
