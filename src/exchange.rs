//! Key-creation exchange with the journal backend.
//!
//! Runs one Diffie-Hellman round trip against the key-creation endpoint and
//! derives the Fernet key for the resulting key record. No partial state is
//! written here; persistence belongs to [`crate::keyring`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::JournalsConfig;
use crate::crypto::{derive_fernet_key, DhKeyPair};
use crate::types::{AuthenticatedUser, JournalClientKey, Visitor};

const CLIENT_KEYS_PATH: &str = "/api/1/journals/client_keys/";

/// Failure modes of the key-creation exchange.
///
/// None of these are retried internally; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The request could not be sent or the response body not read.
    #[error("key exchange request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server rejected key creation (status {0})")]
    Status(u16),
    /// A response field could not be decoded.
    #[error("malformed key creation response: bad {0}")]
    MalformedResponse(&'static str),
}

#[derive(Debug, Serialize)]
struct CreateKeyRequest<'a> {
    platform: &'a str,
    client_dh_public_key: String,
}

#[derive(Debug, Deserialize)]
struct CreateKeyResponse {
    uid: String,
    server_dh_public_key: String,
    salt: String,
    visitor: String,
}

/// One network round trip that produces a new [`JournalClientKey`].
///
/// Dropping the returned future cancels the exchange; implementations must
/// not persist anything.
#[async_trait]
pub trait KeyAgreement: Send + Sync {
    async fn create_key(
        &self,
        user: &AuthenticatedUser,
        visitor: &Visitor,
    ) -> Result<JournalClientKey, SetupError>;
}

/// [`KeyAgreement`] against the HTTP backend.
pub struct HttpKeyAgreement {
    http: reqwest::Client,
    config: JournalsConfig,
}

impl HttpKeyAgreement {
    pub fn new(config: JournalsConfig) -> Self {
        Self::with_http_client(reqwest::Client::new(), config)
    }

    /// Reuse an existing HTTP client (connection pooling, proxies, ...).
    pub fn with_http_client(http: reqwest::Client, config: JournalsConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl KeyAgreement for HttpKeyAgreement {
    async fn create_key(
        &self,
        user: &AuthenticatedUser,
        visitor: &Visitor,
    ) -> Result<JournalClientKey, SetupError> {
        let key_pair = DhKeyPair::generate();
        let client_public = STANDARD.encode(key_pair.public_bytes());

        let sent_visitor = visitor.uid();
        let mut request = self
            .http
            .post(format!("{}{}", self.config.base_url, CLIENT_KEYS_PATH))
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .bearer_auth(user.jwt())
            .json(&CreateKeyRequest {
                platform: &self.config.platform,
                client_dh_public_key: client_public,
            });
        if let Some(ref uid) = sent_visitor {
            request = request.header("Visitor", uid);
        }

        log::debug!("requesting journal client key for {}", user.sub());
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SetupError::Status(status.as_u16()));
        }
        let data: CreateKeyResponse = response.json().await?;

        if sent_visitor.as_deref() != Some(data.visitor.as_str()) {
            visitor.set_uid(&data.visitor);
        }

        let server_public = STANDARD
            .decode(&data.server_dh_public_key)
            .map_err(|_| SetupError::MalformedResponse("server_dh_public_key"))?;
        let salt = STANDARD
            .decode(&data.salt)
            .map_err(|_| SetupError::MalformedResponse("salt"))?;

        let shared_secret = key_pair.shared_secret(&BigUint::from_bytes_be(&server_public));
        let key = derive_fernet_key(&shared_secret, &salt);

        log::debug!("created journal client key {}", data.uid);
        Ok(JournalClientKey {
            uid: data.uid,
            key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = CreateKeyRequest {
            platform: "desktop",
            client_dh_public_key: "AAAA".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["platform"], "desktop");
        assert_eq!(json["client_dh_public_key"], "AAAA");
    }

    #[test]
    fn test_response_wire_shape() {
        let data: CreateKeyResponse = serde_json::from_str(
            r#"{
                "uid": "jck_42",
                "server_dh_public_key": "AgME",
                "salt": "c2FsdA==",
                "visitor": "v_9"
            }"#,
        )
        .unwrap();
        assert_eq!(data.uid, "jck_42");
        assert_eq!(data.server_dh_public_key, "AgME");
        assert_eq!(STANDARD.decode(&data.salt).unwrap(), b"salt");
        assert_eq!(data.visitor, "v_9");
    }

    // The full derivation both peers would perform, with the server side
    // simulated locally.
    #[test]
    fn test_exchange_derivation_matches_server_side() {
        let client = DhKeyPair::from_private_bytes(&[7u8; 256]);
        let server = DhKeyPair::from_private_bytes(&[11u8; 256]);
        let salt = b"per-exchange-salt";

        let client_secret =
            client.shared_secret(&BigUint::from_bytes_be(&server.public_bytes()));
        let server_secret =
            server.shared_secret(&BigUint::from_bytes_be(&client.public_bytes()));

        assert_eq!(
            derive_fernet_key(&client_secret, salt),
            derive_fernet_key(&server_secret, salt)
        );
    }
}
