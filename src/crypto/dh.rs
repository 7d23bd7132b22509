//! Finite-field Diffie-Hellman over the 2048-bit MODP Group 14.
//!
//! Key agreement with the server uses the RFC 3526 Group 14 prime with
//! generator 2. Group elements cross the wire as fixed-width 256-byte
//! big-endian buffers, left-padded with zeros.

use lazy_static::lazy_static;
use num_bigint::BigUint;
use rand::RngCore;

/// Width of serialized group elements and private exponents, in bytes.
pub const MODP_BYTES: usize = 256;

const GROUP_14_PRIME_HEX: &[u8] = b"\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

lazy_static! {
    /// The RFC 3526 Group 14 prime (2048-bit MODP).
    pub static ref GROUP_14_PRIME: BigUint =
        BigUint::parse_bytes(GROUP_14_PRIME_HEX, 16).expect("prime constant parses");

    /// The Group 14 generator.
    pub static ref GROUP_14_GENERATOR: BigUint = BigUint::from(2u32);
}

/// An ephemeral Diffie-Hellman key pair over Group 14.
#[derive(Clone)]
pub struct DhKeyPair {
    private: BigUint,
}

impl DhKeyPair {
    /// Generate a key pair from 256 securely random bytes.
    ///
    /// The private exponent keeps the full 256-byte width rather than being
    /// reduced toward the group order; the server derives the matching secret
    /// from the same serialization.
    pub fn generate() -> Self {
        let mut bytes = [0u8; MODP_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_private_bytes(&bytes)
    }

    /// Create a key pair from an existing private exponent, big-endian.
    pub fn from_private_bytes(bytes: &[u8]) -> Self {
        Self {
            private: BigUint::from_bytes_be(bytes),
        }
    }

    /// The public value `g^a mod P` as a fixed-width buffer.
    pub fn public_bytes(&self) -> [u8; MODP_BYTES] {
        to_fixed_width(&GROUP_14_GENERATOR.modpow(&self.private, &GROUP_14_PRIME))
    }

    /// The shared secret `B^a mod P` as a fixed-width buffer.
    pub fn shared_secret(&self, their_public: &BigUint) -> [u8; MODP_BYTES] {
        to_fixed_width(&their_public.modpow(&self.private, &GROUP_14_PRIME))
    }
}

impl std::fmt::Debug for DhKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhKeyPair")
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Left-pad a group element to exactly [`MODP_BYTES`] bytes big-endian.
fn to_fixed_width(value: &BigUint) -> [u8; MODP_BYTES] {
    let raw = value.to_bytes_be();
    let mut out = [0u8; MODP_BYTES];
    out[MODP_BYTES - raw.len()..].copy_from_slice(&raw);
    out
}
