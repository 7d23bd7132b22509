//! Fernet token encryption for journal payloads.
//!
//! Implements the Fernet token format: `0x80 || timestamp || iv ||
//! ciphertext || hmac`, url-safe-base64 encoded. Tokens carry a
//! second-precision timestamp that decryption checks against a two-sided
//! validity window, so the time passed in must come from a clock that is
//! synchronized with the server (see [`crate::clock`]); raw device time
//! drifts enough to cause spurious expiry failures.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Token version byte.
const VERSION: u8 = 0x80;

/// version + timestamp + iv
const HEADER_LEN: usize = 1 + 8 + 16;
const SIGNATURE_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

/// Default two-sided replay/clock-skew window, in seconds.
///
/// Must match the window the server enforces; 120 seconds is the backend's
/// expectation.
pub const DEFAULT_TTL_SECONDS: u64 = 120;

/// Failure modes of token parsing and decryption.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FernetError {
    /// Key material was not 32 url-safe-base64 bytes.
    #[error("invalid fernet key")]
    InvalidKey,
    /// The token is structurally malformed.
    #[error("malformed fernet token: {0}")]
    Format(&'static str),
    /// The HMAC signature did not match.
    #[error("fernet token signature mismatch")]
    Authentication,
    /// The embedded timestamp falls outside the validity window.
    #[error("fernet token timestamp {token_time}s outside validity window (now {now}s)")]
    Expired {
        /// Timestamp embedded in the token, seconds since epoch.
        token_time: u64,
        /// Current time the caller supplied, seconds since epoch.
        now: u64,
    },
}

/// Fernet cipher instance with the signing and encryption subkeys split out
/// of the 32-byte key material.
///
/// Immutable once constructed; safe to share across concurrent encrypt and
/// decrypt calls.
#[derive(Clone)]
pub struct Fernet {
    signing_key: [u8; 16],
    encryption_key: [u8; 16],
    ttl_seconds: u64,
}

impl Fernet {
    /// Parse a url-safe-base64 32-byte key into subkeys: bytes 0-15 sign,
    /// bytes 16-31 encrypt.
    pub fn new(key: &str) -> Result<Self, FernetError> {
        let key_data = URL_SAFE.decode(key).map_err(|_| FernetError::InvalidKey)?;
        if key_data.len() != 32 {
            return Err(FernetError::InvalidKey);
        }

        let mut signing_key = [0u8; 16];
        let mut encryption_key = [0u8; 16];
        signing_key.copy_from_slice(&key_data[..16]);
        encryption_key.copy_from_slice(&key_data[16..]);

        Ok(Self {
            signing_key,
            encryption_key,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        })
    }

    /// Override the validity window. Only useful against a backend configured
    /// with a matching window; defaults to [`DEFAULT_TTL_SECONDS`].
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Encrypt `message` into a Fernet token stamped with `now_ms`.
    ///
    /// `now_ms` must be server-synchronized time in milliseconds since the
    /// Unix epoch.
    pub fn encrypt(&self, message: &[u8], now_ms: u64) -> String {
        let mut iv = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut iv);
        self.encrypt_with_iv(message, now_ms / 1000, iv)
    }

    fn encrypt_with_iv(&self, message: &[u8], timestamp: u64, iv: [u8; 16]) -> String {
        // PKCS#7 pads unconditionally: an aligned message gains a full
        // padding block, which keeps stripping unambiguous.
        let ciphertext = Aes128CbcEnc::new(&self.encryption_key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(message);

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + SIGNATURE_LEN);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&iv);
        token.extend_from_slice(&ciphertext);

        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC can take key of any size");
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());

        URL_SAFE.encode(token)
    }

    /// Decrypt a Fernet token, verifying its signature and validity window.
    pub fn decrypt(&self, token: &str, now_ms: u64) -> Result<Vec<u8>, FernetError> {
        let raw = URL_SAFE
            .decode(token)
            .map_err(|_| FernetError::Format("undecodable base64"))?;
        if raw.len() < HEADER_LEN + BLOCK_LEN + SIGNATURE_LEN {
            return Err(FernetError::Format("token too short"));
        }
        let (basic_parts, signature) = raw.split_at(raw.len() - SIGNATURE_LEN);

        if basic_parts[0] != VERSION {
            return Err(FernetError::Format("invalid version"));
        }

        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC can take key of any size");
        mac.update(basic_parts);
        mac.verify_slice(signature)
            .map_err(|_| FernetError::Authentication)?;

        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&basic_parts[1..9]);
        let token_time = u64::from_be_bytes(timestamp);
        let now = now_ms / 1000;
        if token_time + self.ttl_seconds < now || token_time > now + self.ttl_seconds {
            return Err(FernetError::Expired { token_time, now });
        }

        let mut iv = [0u8; 16];
        iv.copy_from_slice(&basic_parts[9..25]);
        let ciphertext = &basic_parts[25..];
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(FernetError::Format("ciphertext not block aligned"));
        }

        Aes128CbcDec::new(&self.encryption_key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| FernetError::Format("invalid padding"))
    }
}

impl std::fmt::Debug for Fernet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fernet")
            .field("signing_key", &"[REDACTED]")
            .field("encryption_key", &"[REDACTED]")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}
