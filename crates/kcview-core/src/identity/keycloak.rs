//! Keycloak identity client for native apps.
//!
//! Uses the authorization-code flow with PKCE and a loopback redirect
//! (`http://127.0.0.1:<port>/callback`). A silent session check is the same
//! round trip with `prompt=none`: the provider answers with a code when a
//! browser session exists and with `error=login_required` otherwise.
//!
//! Tokens live in memory only. They are never logged.

use std::{fmt, mem};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::callback::{self, CALLBACK_PATH, CallbackOutcome};
use super::pkce::{self, Pkce};
use super::{IdentityClient, IdentityError, InitOptions, OnLoad};
use crate::config::IdentityConfig;

/// Errors a `prompt=none` request uses to say "no session, interaction needed".
const SILENT_DENIALS: &[&str] = &["login_required", "interaction_required", "consent_required"];

type UrlNotifier = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone)]
struct Session {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

pub struct KeycloakClient {
    config: IdentityConfig,
    http: reqwest::Client,
    session: Mutex<Option<Session>>,
    notifier: Option<UrlNotifier>,
}

impl fmt::Debug for KeycloakClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeycloakClient")
            .field("realm_url", &self.config.realm_url())
            .field("client_id", &self.config.client_id)
            .finish_non_exhaustive()
    }
}

impl KeycloakClient {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            session: Mutex::new(None),
            notifier: None,
        }
    }

    /// Receives every authorization URL before the browser is asked to open it.
    ///
    /// With `open_browser = false` this is the only way the URL surfaces.
    #[must_use]
    pub fn with_url_notifier(mut self, notifier: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    fn current_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_session(&self, session: Option<Session>) -> Option<Session> {
        let mut guard = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        mem::replace(&mut *guard, session)
    }

    fn launch(&self, url: &str) {
        if let Some(notify) = &self.notifier {
            notify(url);
        }
        if self.config.open_browser {
            if let Err(err) = open::that(url) {
                warn!(error = %err, "failed to open browser for authorization");
            }
        } else {
            info!(%url, "browser launch disabled; open the authorization URL manually");
        }
    }

    /// Runs one authorization round trip.
    ///
    /// Returns `Ok(None)` when a silent request (`prompt=none`) finds no session.
    async fn authorize(
        &self,
        prompt: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<Session>, IdentityError> {
        let listener = TcpListener::bind(("127.0.0.1", self.config.callback_port))
            .await
            .map_err(IdentityError::Callback)?;
        let port = listener
            .local_addr()
            .map_err(IdentityError::Callback)?
            .port();
        let redirect_uri = callback::redirect_uri(port);

        let pkce = Pkce::generate();
        let state = pkce::generate_state();
        let url = pkce::build_auth_url(&self.config, &pkce, &state, &redirect_uri, prompt);
        debug!(port, silent = prompt.is_some(), "waiting for authorization callback");
        self.launch(&url);

        match callback::wait_for_callback(listener, CALLBACK_PATH, &state, timeout).await? {
            CallbackOutcome::Code(code) => {
                let session = self.exchange_code(&code, &pkce, &redirect_uri).await?;
                Ok(Some(session))
            }
            CallbackOutcome::Denied { error, .. }
                if prompt == Some("none") && SILENT_DENIALS.contains(&error.as_str()) =>
            {
                debug!(%error, "no provider session");
                Ok(None)
            }
            CallbackOutcome::Denied { error, description } => {
                Err(IdentityError::Authorization { error, description })
            }
            CallbackOutcome::StateMismatch => Err(IdentityError::StateMismatch),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce: &Pkce,
        redirect_uri: &str,
    ) -> Result<Session, IdentityError> {
        let response = self
            .http
            .post(self.config.oidc_endpoint("token"))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("code_verifier", pkce.verifier.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Endpoint { status, body });
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }
}

#[async_trait]
impl IdentityClient for KeycloakClient {
    async fn init(&self, options: InitOptions) -> Result<bool, IdentityError> {
        // A session obtained by a preceding login() is picked up as-is.
        if self.current_session().is_some() {
            return Ok(true);
        }

        let session = match options.on_load {
            OnLoad::CheckSso => {
                self.authorize(Some("none"), self.config.silent_check_timeout())
                    .await?
            }
            OnLoad::LoginRequired => self.authorize(None, self.config.login_timeout()).await?,
        };

        let authenticated = session.is_some();
        self.store_session(session);
        Ok(authenticated)
    }

    fn token(&self) -> Option<String> {
        self.current_session().map(|session| session.access_token)
    }

    async fn login(&self) -> Result<(), IdentityError> {
        match self.authorize(None, self.config.login_timeout()).await? {
            Some(session) => {
                self.store_session(Some(session));
                info!("interactive login completed");
                Ok(())
            }
            None => Err(IdentityError::Authorization {
                error: "login_required".to_string(),
                description: None,
            }),
        }
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        let Some(session) = self.store_session(None) else {
            return Ok(());
        };
        let Some(refresh_token) = session.refresh_token else {
            return Ok(());
        };

        let response = self
            .http
            .post(self.config.oidc_endpoint("logout"))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Endpoint { status, body });
        }
        info!("provider session ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const TOKEN_PATH: &str = "/realms/continental/protocol/openid-connect/token";
    const LOGOUT_PATH: &str = "/realms/continental/protocol/openid-connect/logout";

    fn config_for(server: &MockServer) -> IdentityConfig {
        IdentityConfig {
            server_url: server.uri(),
            open_browser: false,
            silent_check_timeout_secs: 5,
            login_timeout_secs: 5,
            ..IdentityConfig::default()
        }
    }

    /// Plays the browser: follows the authorization URL straight to the redirect URI.
    fn browser_answering(reply: &'static str) -> impl Fn(&str) + Send + Sync + 'static {
        move |auth_url: &str| {
            let params: HashMap<String, String> = url::Url::parse(auth_url)
                .unwrap()
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            let target = format!(
                "{}?{reply}&state={}",
                params["redirect_uri"], params["state"]
            );
            tokio::spawn(async move {
                let _ = reqwest::get(target).await;
            });
        }
    }

    async fn mount_token_endpoint(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 300,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_check_sso_with_provider_session() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        let client = KeycloakClient::new(config_for(&server))
            .with_url_notifier(browser_answering("code=the-code"));

        assert!(client.init(InitOptions::check_sso()).await.unwrap());
        assert_eq!(client.token().as_deref(), Some("access-1"));
    }

    #[tokio::test]
    async fn test_check_sso_without_provider_session() {
        let server = MockServer::start().await;
        let client = KeycloakClient::new(config_for(&server))
            .with_url_notifier(browser_answering("error=login_required"));

        assert!(!client.init(InitOptions::check_sso()).await.unwrap());
        assert_eq!(client.token(), None);
    }

    #[tokio::test]
    async fn test_check_sso_provider_error_is_an_error() {
        let server = MockServer::start().await;
        let client = KeycloakClient::new(config_for(&server))
            .with_url_notifier(browser_answering("error=invalid_client"));

        let err = client.init(InitOptions::check_sso()).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Authorization { ref error, .. } if error == "invalid_client"
        ));
    }

    #[tokio::test]
    async fn test_login_required_runs_interactive_authorization() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let answer = browser_answering("code=the-code");
        let recorder = Arc::clone(&seen);
        let client = KeycloakClient::new(config_for(&server)).with_url_notifier(move |url| {
            recorder.lock().unwrap().push(url.to_string());
            answer(url);
        });

        assert!(client.init(InitOptions::login_required()).await.unwrap());
        assert_eq!(client.token().as_deref(), Some("access-1"));

        let urls = seen.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(!urls[0].contains("prompt="));
    }

    #[tokio::test]
    async fn test_login_required_treats_login_required_as_error() {
        let server = MockServer::start().await;
        let client = KeycloakClient::new(config_for(&server))
            .with_url_notifier(browser_answering("error=login_required"));

        let err = client.init(InitOptions::login_required()).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Authorization { ref error, .. } if error == "login_required"
        ));
    }

    #[tokio::test]
    async fn test_token_endpoint_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let client = KeycloakClient::new(config_for(&server))
            .with_url_notifier(browser_answering("code=the-code"));

        let err = client.login().await.unwrap_err();
        assert!(matches!(err, IdentityError::Endpoint { status: 400, .. }));
        assert_eq!(client.token(), None);
    }

    #[tokio::test]
    async fn test_login_then_init_reuses_session() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        let client = KeycloakClient::new(config_for(&server))
            .with_url_notifier(browser_answering("code=the-code"));

        client.login().await.unwrap();
        // Second round trip would hit the token endpoint again and break expect(1).
        assert!(client.init(InitOptions::check_sso()).await.unwrap());
        assert_eq!(client.token().as_deref(), Some("access-1"));
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_token() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;
        Mock::given(method("POST"))
            .and(path(LOGOUT_PATH))
            .and(body_string_contains("refresh_token=refresh-1"))
            .and(body_string_contains("client_id=frontend-app"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = KeycloakClient::new(config_for(&server))
            .with_url_notifier(browser_answering("code=the-code"));
        client.login().await.unwrap();

        client.logout().await.unwrap();
        assert_eq!(client.token(), None);
    }

    #[tokio::test]
    async fn test_logout_without_session_is_noop() {
        let server = MockServer::start().await;
        let client = KeycloakClient::new(config_for(&server));
        client.logout().await.unwrap();
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
