//! HKDF (HMAC-based Key Derivation Function) for journal client keys.
//!
//! Combines the Diffie-Hellman shared secret with the per-exchange salt from
//! the server to produce the 32-byte Fernet key.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of the derived Fernet key material, in bytes.
pub const FERNET_KEY_BYTES: usize = 32;

/// HKDF-SHA256 key derivation.
pub struct Hkdf {
    prk: [u8; 32],
}

impl Hkdf {
    /// HKDF-Extract: compress the input key material under the given salt.
    pub fn new(salt: &[u8], ikm: &[u8]) -> Self {
        let mut mac = HmacSha256::new_from_slice(salt).expect("HMAC can take key of any size");
        mac.update(ikm);
        let prk: [u8; 32] = mac.finalize().into_bytes().into();

        Self { prk }
    }

    /// HKDF-Expand: stretch the extracted key to `length` bytes.
    pub fn expand(&self, length: usize) -> Vec<u8> {
        let mut output = Vec::with_capacity(length);
        let mut t = Vec::new();
        let mut counter = 1u8;

        while output.len() < length {
            let mut mac =
                HmacSha256::new_from_slice(&self.prk).expect("HMAC can take key of any size");
            mac.update(&t);
            mac.update(&[counter]);
            t = mac.finalize().into_bytes().to_vec();

            let remaining = length - output.len();
            output.extend_from_slice(&t[..remaining.min(t.len())]);

            counter += 1;
        }

        output
    }

    /// Extract and expand in one call.
    pub fn derive(salt: &[u8], ikm: &[u8], length: usize) -> Vec<u8> {
        Self::new(salt, ikm).expand(length)
    }
}

/// Derive the textual Fernet key from a shared secret and salt.
///
/// 32 bytes of HKDF output, url-safe-base64 encoded with padding retained.
pub fn derive_fernet_key(shared_secret: &[u8], salt: &[u8]) -> String {
    URL_SAFE.encode(Hkdf::derive(salt, shared_secret, FERNET_KEY_BYTES))
}
