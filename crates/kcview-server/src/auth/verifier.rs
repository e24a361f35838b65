//! Bearer token verification.
//!
//! Two sources of keys:
//! - `SharedSecretVerifier`: HS256 with a configured secret (dev and tests)
//! - `JwksVerifier`: RS256/384/512 keys fetched from the realm's JWKS endpoint
//!
//! Both validate `exp` and, when configured, `iss`. Audience is not checked;
//! Keycloak access tokens for public clients usually carry `aud: account`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token header has no kid")]
    MissingKeyId,

    #[error("unsupported token algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),

    #[error("unknown key id {0}")]
    UnknownKeyId(String),

    #[error("failed to fetch JWKS: {0}")]
    Jwks(String),
}

/// Verifies a compact JWT and returns its claims.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Value, AuthError>;
}

fn validation(algorithm: Algorithm, issuer: Option<&str>) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_aud = false;
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }
    validation
}

pub struct SharedSecretVerifier {
    key: DecodingKey,
    issuer: Option<String>,
}

impl SharedSecretVerifier {
    pub fn new(secret: &str, issuer: Option<String>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }
}

#[async_trait]
impl TokenVerifier for SharedSecretVerifier {
    async fn verify(&self, token: &str) -> Result<Value, AuthError> {
        let validation = validation(Algorithm::HS256, self.issuer.as_deref());
        Ok(decode::<Value>(token, &self.key, &validation)?.claims)
    }
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// RSA keys from a JWKS endpoint, cached by `kid`.
///
/// A token signed with an unknown `kid` triggers a refetch, at most once per
/// cooldown period. After a failed fetch the wait grows exponentially from
/// `failure_backoff`, capped at the cooldown.
pub struct JwksVerifier {
    jwks_uri: String,
    issuer: Option<String>,
    http: reqwest::Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
    refresh_state: Mutex<RefreshState>,
    refresh_cooldown: Duration,
    failure_backoff: Duration,
}

#[derive(Debug, Default)]
struct RefreshState {
    last_attempt: Option<Instant>,
    consecutive_failures: u32,
}

impl JwksVerifier {
    pub fn new(jwks_uri: impl Into<String>, issuer: Option<String>) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            issuer,
            http: reqwest::Client::new(),
            keys: RwLock::new(HashMap::new()),
            refresh_state: Mutex::new(RefreshState::default()),
            refresh_cooldown: Duration::from_secs(30),
            failure_backoff: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    /// Minimum time between attempts given the current failure streak.
    fn retry_after(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.refresh_cooldown;
        }
        let exponent = (consecutive_failures - 1).min(10);
        self.failure_backoff
            .saturating_mul(1 << exponent)
            .min(self.refresh_cooldown)
    }

    async fn fetch_keys(&self) -> Result<HashMap<String, DecodingKey>, AuthError> {
        let response = self
            .http
            .get(&self.jwks_uri)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::Jwks(e.to_string()))?;
        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
                continue;
            };
            if jwk.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(err) => warn!(%kid, error = %err, "skipping invalid RSA key in JWKS"),
            }
        }

        if keys.is_empty() {
            return Err(AuthError::Jwks("no usable RSA keys in JWKS".to_string()));
        }
        Ok(keys)
    }

    /// Refetches the key set unless the last attempt is too recent.
    async fn refresh(&self) -> Result<(), AuthError> {
        let mut state = self.refresh_state.lock().await;
        if let Some(at) = state.last_attempt
            && at.elapsed() < self.retry_after(state.consecutive_failures)
        {
            debug!("JWKS refresh throttled");
            return Ok(());
        }
        state.last_attempt = Some(Instant::now());

        match self.fetch_keys().await {
            Ok(keys) => {
                state.consecutive_failures = 0;
                info!(count = keys.len(), uri = %self.jwks_uri, "JWKS keys loaded");
                *self.keys.write().await = keys;
                Ok(())
            }
            Err(err) => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                warn!(
                    failures = state.consecutive_failures,
                    uri = %self.jwks_uri,
                    error = %err,
                    "JWKS fetch failed"
                );
                Err(err)
            }
        }
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }
        self.refresh().await?;
        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Value, AuthError> {
        let header = decode_header(token)?;
        if !matches!(
            header.alg,
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512
        ) {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.key_for(&kid).await?;

        let validation = validation(header.alg, self.issuer.as_deref());
        Ok(decode::<Value>(token, &key, &validation)?.claims)
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    //! Token minting for tests.

    use std::time::{SystemTime, UNIX_EPOCH};

    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::{Value, json};

    use super::*;

    pub const SECRET: &str = "test-secret";
    pub const RSA_PRIVATE_PEM: &str = include_str!("testdata/rsa_private.pem");
    pub const JWKS_JSON: &str = include_str!("testdata/jwks.json");
    pub const RSA_KID: &str = "test-key";

    pub fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    /// Claims shaped like a Keycloak access token.
    pub fn claims(realm_roles: &[&str], exp_offset: i64) -> Value {
        json!({
            "sub": "7c4f1f56-1e8b-4a4a-9a43-2bd5d6cf3f10",
            "preferred_username": "alice",
            "iss": "http://localhost:8081/realms/continental",
            "aud": "account",
            "exp": now().saturating_add_signed(exp_offset),
            "realm_access": { "roles": realm_roles },
        })
    }

    pub fn hs256(claims: &Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    pub fn rs256(claims: &Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(
            &header,
            claims,
            &EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM.as_bytes()).unwrap(),
        )
        .unwrap()
    }
}
