//! Request authentication.
//!
//! `AuthUser` requires a valid bearer token; `AdminUser` additionally
//! requires the configured admin role. Use them as handler parameters.

pub mod verifier;

use std::collections::BTreeSet;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde_json::Value;
use tracing::debug;

pub use verifier::{AuthError, JwksVerifier, SharedSecretVerifier, TokenVerifier};

use crate::error::ServerError;
use crate::state::AppState;

/// Identity carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: Option<String>,
    pub username: Option<String>,
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub fn from_claims(claims: &Value, resource_client_id: &str) -> Self {
        Self {
            subject: claims["sub"].as_str().map(ToString::to_string),
            username: claims["preferred_username"]
                .as_str()
                .map(ToString::to_string),
            roles: extract_roles(claims, resource_client_id),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

fn string_array(value: &Value) -> impl Iterator<Item = String> + '_ {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(ToString::to_string)
}

/// Union of Keycloak role locations: top-level `roles`,
/// `realm_access.roles` and `resource_access.<client>.roles`.
pub fn extract_roles(claims: &Value, resource_client_id: &str) -> BTreeSet<String> {
    let mut roles = BTreeSet::new();
    roles.extend(string_array(&claims["roles"]));
    roles.extend(string_array(&claims["realm_access"]["roles"]));
    roles.extend(string_array(
        &claims["resource_access"][resource_client_id]["roles"],
    ));
    roles
}

/// Token from `Authorization: Bearer <token>`, scheme matched case-insensitively.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ServerError::Unauthorized)?;
        let app_state = AppState::from_ref(state);

        let claims = app_state.verifier.verify(token).await.map_err(|err| {
            debug!(error = %err, path = %parts.uri.path(), "rejecting bearer token");
            ServerError::Unauthorized
        })?;

        Ok(Self(Principal::from_claims(
            &claims,
            &app_state.resource_client_id,
        )))
    }
}

/// Authenticated caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Principal);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);
        if principal.has_role(&app_state.admin_role) {
            Ok(Self(principal))
        } else {
            debug!(username = ?principal.username, "missing admin role");
            Err(ServerError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use serde_json::json;

    use super::*;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/private");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_roles_are_merged_from_all_locations() {
        let claims = json!({
            "roles": ["top"],
            "realm_access": { "roles": ["CONTINENTAL_ROLE_ADMIN", "offline_access"] },
            "resource_access": {
                "backend-app": { "roles": ["client-role"] },
                "other-app": { "roles": ["ignored"] }
            }
        });
        let roles = extract_roles(&claims, "backend-app");
        let expected: BTreeSet<String> = [
            "top",
            "CONTINENTAL_ROLE_ADMIN",
            "offline_access",
            "client-role",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(roles, expected);
    }

    #[test]
    fn test_missing_role_claims_yield_empty_set() {
        assert!(extract_roles(&json!({ "sub": "x" }), "backend-app").is_empty());
        let malformed = json!({ "realm_access": { "roles": "nope" } });
        assert!(extract_roles(&malformed, "backend-app").is_empty());
    }

    #[test]
    fn test_principal_from_claims() {
        let principal = Principal::from_claims(
            &json!({
                "sub": "abc",
                "preferred_username": "alice",
                "realm_access": { "roles": ["user"] }
            }),
            "backend-app",
        );
        assert_eq!(principal.subject.as_deref(), Some("abc"));
        assert_eq!(principal.username.as_deref(), Some("alice"));
        assert!(principal.has_role("user"));
        assert!(!principal.has_role("CONTINENTAL_ROLE_ADMIN"));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
