//! Identity client contract and implementations.
//!
//! The view never talks to the identity provider directly. It holds an
//! `Arc<dyn IdentityClient>` and only calls `init`, `token`, `login` and
//! `logout`, mirroring the surface of a browser adapter such as keycloak-js.

pub mod callback;
pub mod keycloak;
pub mod pkce;

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

pub use keycloak::KeycloakClient;

/// What `init` should do when no session is known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnLoad {
    /// Check for an existing provider session without any interaction.
    #[default]
    CheckSso,
    /// Run an interactive login when no session exists.
    LoginRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitOptions {
    pub on_load: OnLoad,
}

impl InitOptions {
    pub fn check_sso() -> Self {
        Self {
            on_load: OnLoad::CheckSso,
        }
    }

    pub fn login_required() -> Self {
        Self {
            on_load: OnLoad::LoginRequired,
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("authorization failed: {error}")]
    Authorization {
        error: String,
        description: Option<String>,
    },

    #[error("state mismatch in authorization callback")]
    StateMismatch,

    #[error("timed out waiting for the authorization callback")]
    Timeout,

    #[error("authorization callback listener failed: {0}")]
    Callback(#[source] std::io::Error),

    #[error("identity provider rejected the request (HTTP {status}): {body}")]
    Endpoint { status: u16, body: String },

    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Unsupported(&'static str),
}

/// Authentication session lifecycle, as seen by the view.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Establishes the session state; resolves to whether a session exists.
    async fn init(&self, options: InitOptions) -> Result<bool, IdentityError>;

    /// Current access token, if any.
    fn token(&self) -> Option<String>;

    /// Interactive login.
    async fn login(&self) -> Result<(), IdentityError>;

    /// Ends the session at the provider and forgets local tokens.
    async fn logout(&self) -> Result<(), IdentityError>;
}

/// Identity client holding a pre-issued access token.
///
/// Used for scripted calls (`kcview call --token`) and in tests.
#[derive(Debug, Default)]
pub struct StaticTokenClient {
    token: Mutex<Option<String>>,
}

impl StaticTokenClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

#[async_trait]
impl IdentityClient for StaticTokenClient {
    async fn init(&self, _options: InitOptions) -> Result<bool, IdentityError> {
        Ok(self.token().is_some())
    }

    fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn login(&self) -> Result<(), IdentityError> {
        Err(IdentityError::Unsupported(
            "interactive login is not available with a static token",
        ))
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_client_with_token() {
        let client = StaticTokenClient::new(Some("T".to_string()));
        assert!(client.init(InitOptions::check_sso()).await.unwrap());
        assert_eq!(client.token().as_deref(), Some("T"));

        client.logout().await.unwrap();
        assert_eq!(client.token(), None);
        assert!(!client.init(InitOptions::check_sso()).await.unwrap());
    }

    #[tokio::test]
    async fn test_static_client_cannot_login() {
        let client = StaticTokenClient::new(None);
        assert!(matches!(
            client.login().await,
            Err(IdentityError::Unsupported(_))
        ));
    }
}
