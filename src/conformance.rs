//! Server round-trip verification of the token format.
//!
//! The backend exposes a test endpoint that decrypts a submitted token with
//! its copy of the key and checks the payload hash. Passing it proves the
//! local token format is byte-for-byte compatible with the server's
//! implementation. Test tooling only; production flows never call this.

use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::clock::ServerClock;
use crate::config::JournalsConfig;
use crate::crypto::FernetError;
use crate::types::{AuthenticatedUser, WrappedJournalClientKey};

const TEST_PATH: &str = "/api/1/journals/client_keys/test";

/// Failure modes of a conformance round trip.
#[derive(Debug, Error)]
pub enum ConformanceError {
    /// The locally produced token did not decrypt back to the payload.
    #[error("local round trip failed: {0}")]
    SelfCheck(#[from] FernetError),
    /// The request could not be sent.
    #[error("conformance request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The server could not verify the token (status code attached).
    #[error("server rejected token of {size} bytes (status {status})")]
    Rejected { size: usize, status: u16 },
}

#[derive(Debug, Serialize)]
struct TestKeyRequest<'a> {
    journal_client_key_uid: &'a str,
    encrypted_payload: &'a str,
    expected_sha256: String,
}

/// Encrypt `payload` and have the server decrypt and hash-check it.
pub async fn verify_with_server(
    http: &reqwest::Client,
    config: &JournalsConfig,
    user: &AuthenticatedUser,
    key: &WrappedJournalClientKey,
    payload: &[u8],
    now_ms: u64,
) -> Result<(), ConformanceError> {
    let token = key.fernet.encrypt(payload, now_ms);
    if key.fernet.decrypt(&token, now_ms)? != payload {
        return Err(ConformanceError::SelfCheck(FernetError::Format(
            "round trip produced different bytes",
        )));
    }

    let expected_sha256 = hex::encode(Sha256::digest(payload));
    let response = http
        .post(format!("{}{}", config.base_url, TEST_PATH))
        .header(reqwest::header::USER_AGENT, &config.user_agent)
        .bearer_auth(user.jwt())
        .json(&TestKeyRequest {
            journal_client_key_uid: &key.uid,
            encrypted_payload: &token,
            expected_sha256,
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ConformanceError::Rejected {
            size: payload.len(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

/// Run [`verify_with_server`] over random ASCII payloads of each size,
/// `repetitions` times per size, stopping at the first failure.
pub async fn run_matrix(
    http: &reqwest::Client,
    config: &JournalsConfig,
    user: &AuthenticatedUser,
    key: &WrappedJournalClientKey,
    sizes: &[usize],
    repetitions: usize,
    clock: &dyn ServerClock,
) -> Result<(), ConformanceError> {
    for &size in sizes {
        log::info!("verifying token format at payload size {size}");
        for _ in 0..repetitions {
            let payload = random_ascii(size);
            let now_ms = clock.now_ms().await;
            verify_with_server(http, config, user, key, &payload, now_ms).await?;
        }
    }
    Ok(())
}

/// Random printable-range ASCII payload (each byte in 0..128).
pub fn random_ascii(size: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    for byte in &mut bytes {
        *byte %= 128;
    }
    bytes
}
