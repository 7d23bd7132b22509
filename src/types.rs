//! Core types shared across the key lifecycle.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::crypto::Fernet;

/// A journal client key as issued by the server.
///
/// Adds an extra layer of encryption when transferring journal entries
/// to/from the server. Created once per successful exchange and immutable
/// afterwards; removed locally on logout, explicit deletion, or replacement.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalClientKey {
    /// The unique identifier for this key record.
    pub uid: String,
    /// The fernet key, 32 bytes url-safe-base64 encoded.
    pub key: String,
}

impl std::fmt::Debug for JournalClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalClientKey")
            .field("uid", &self.uid)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// A [`JournalClientKey`] with its raw key material pre-parsed into a usable
/// [`Fernet`] instance.
///
/// Derived on demand from the raw key; never persisted directly.
#[derive(Debug, Clone)]
pub struct WrappedJournalClientKey {
    /// The unique identifier for this key record.
    pub uid: String,
    /// The cipher built from the key material.
    pub fernet: Fernet,
}

/// Identity of the authenticated user that key operations run on behalf of.
#[derive(Clone)]
pub struct AuthenticatedUser {
    sub: String,
    jwt: String,
}

impl AuthenticatedUser {
    pub fn new(sub: impl Into<String>, jwt: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            jwt: jwt.into(),
        }
    }

    /// Stable subject id; stored keys are tagged with this value.
    pub fn sub(&self) -> &str {
        &self.sub
    }

    /// Bearer token attached to backend requests.
    pub fn jwt(&self) -> &str {
        &self.jwt
    }
}

impl std::fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("sub", &self.sub)
            .field("jwt", &"[REDACTED]")
            .finish()
    }
}

/// Shared handle to the anonymous visitor id reported to the server.
///
/// The key-creation response may carry a replacement visitor id; the exchange
/// writes it back through this handle.
#[derive(Debug, Clone, Default)]
pub struct Visitor {
    uid: Arc<Mutex<Option<String>>>,
}

impl Visitor {
    /// A visitor with no known id yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A visitor with a previously assigned id.
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Arc::new(Mutex::new(Some(uid.into()))),
        }
    }

    /// The currently tracked visitor id, if any.
    pub fn uid(&self) -> Option<String> {
        self.uid.lock().unwrap().clone()
    }

    /// Replace the tracked visitor id.
    pub fn set_uid(&self, uid: impl Into<String>) {
        *self.uid.lock().unwrap() = Some(uid.into());
    }
}
