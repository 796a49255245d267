//! # Service Account Authentication
//!
//! Implements the OAuth2 JWT bearer grant used by Google service accounts:
//! the key's RSA private key signs a short-lived assertion, which the token
//! endpoint exchanges for a bearer access token.

use super::api::{rejection, TokenResponse};
use crate::errors::FetchError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime of a signed assertion. Google rejects anything above one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The subset of a Google service account JSON key used for signing.
#[derive(Deserialize, Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Reads and parses a key file. Any failure is a `CredentialInvalid`.
    pub async fn from_file(path: &Path) -> Result<Self, FetchError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            FetchError::CredentialInvalid(format!(
                "failed to read key file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content).map_err(|e| match e {
            FetchError::CredentialInvalid(msg) => {
                FetchError::CredentialInvalid(format!("'{}': {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, FetchError> {
        let key: ServiceAccountKey = serde_json::from_str(content)
            .map_err(|e| FetchError::CredentialInvalid(format!("malformed key JSON: {e}")))?;
        if key.client_email.trim().is_empty() {
            return Err(FetchError::CredentialInvalid(
                "key has an empty client_email".to_string(),
            ));
        }
        Ok(key)
    }
}

/// Claims of the JWT assertion sent to the token endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs an RS256 assertion for `scope`, addressed to `audience`.
pub fn sign_assertion(
    key: &ServiceAccountKey,
    scope: &str,
    audience: &str,
    now: DateTime<Utc>,
) -> Result<String, FetchError> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| FetchError::CredentialInvalid(format!("invalid private key: {e}")))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: audience.to_string(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    encode(&header, &claims, &encoding_key)
        .map_err(|e| FetchError::CredentialInvalid(format!("failed to sign assertion: {e}")))
}

/// Exchanges a freshly signed assertion for an access token.
///
/// `token_uri_override` takes precedence over the key's own `token_uri`.
pub async fn request_access_token(
    client: &ReqwestClient,
    key: &ServiceAccountKey,
    scope: &str,
    token_uri_override: Option<&str>,
) -> Result<String, FetchError> {
    let token_uri = token_uri_override.unwrap_or(&key.token_uri);
    let assertion = sign_assertion(key, scope, token_uri, Utc::now())?;

    info!(
        "Requesting access token for '{}' from {token_uri}",
        key.client_email
    );
    let response = client
        .post(token_uri)
        .form(&[
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(rejection(status.as_u16(), &body));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| FetchError::MalformedResponse(format!("token response: {e}")))?;
    debug!(
        "Access token issued, expires in {:?} seconds.",
        token.expires_in
    );
    Ok(token.access_token)
}
