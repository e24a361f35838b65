use std::sync::Arc;

use kcview_core::config::Config;
use tracing::info;

use crate::admin::KeycloakAdmin;
use crate::auth::{JwksVerifier, SharedSecretVerifier, TokenVerifier};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    /// Client whose `resource_access` roles count towards authorization.
    pub resource_client_id: String,
    pub admin_role: String,
    pub admin: Arc<KeycloakAdmin>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let server = &config.server;
        let verifier: Arc<dyn TokenVerifier> = if let Some(secret) = &server.jwt_secret {
            info!("verifying tokens with a shared HS256 secret");
            Arc::new(SharedSecretVerifier::new(secret, server.issuer.clone()))
        } else {
            let jwks_uri = config.jwks_uri();
            info!(%jwks_uri, "verifying tokens against JWKS");
            Arc::new(JwksVerifier::new(jwks_uri, server.issuer.clone()))
        };

        Self {
            verifier,
            resource_client_id: server.resource_client_id.clone(),
            admin_role: server.admin_role.clone(),
            admin: Arc::new(KeycloakAdmin::new(server.keycloak_admin.clone())),
        }
    }
}
