//! Keycloak admin REST client used for user provisioning.

use axum::http::StatusCode;
use axum::http::header::LOCATION;
use kcview_core::config::KeycloakAdminConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::ServerError;

/// Body of `POST /admin/user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct AdminToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Group {
    id: String,
    name: String,
}

pub struct KeycloakAdmin {
    config: KeycloakAdminConfig,
    http: reqwest::Client,
}

impl KeycloakAdmin {
    pub fn new(config: KeycloakAdminConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn base_url(&self) -> &str {
        self.config.server_url.trim_end_matches('/')
    }

    fn realm_admin_url(&self) -> String {
        format!("{}/admin/realms/{}", self.base_url(), self.config.target_realm)
    }

    /// Password grant against the admin realm.
    async fn admin_token(&self) -> Result<String, ServerError> {
        let url = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base_url(),
            self.config.admin_realm
        );
        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.config.client_id.as_str()),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ServerError::Internal(format!(
                "admin login failed with status {}",
                response.status().as_u16()
            )));
        }
        Ok(response.json::<AdminToken>().await?.access_token)
    }

    /// Creates an enabled user with a permanent password and adds it to the
    /// configured group. Returns the new user id.
    pub async fn create_user(&self, payload: &UserPayload) -> Result<String, ServerError> {
        let token = self.admin_token().await?;

        let representation = json!({
            "enabled": true,
            "username": payload.username,
            "email": payload.email,
            "firstName": payload.first_name,
            "lastName": payload.last_name,
            "credentials": [{
                "type": "password",
                "value": payload.password,
                "temporary": false,
            }],
        });
        let response = self
            .http
            .post(format!("{}/users", self.realm_admin_url()))
            .bearer_auth(&token)
            .json(&representation)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            warn!(
                status = status.as_u16(),
                username = %payload.username,
                "keycloak refused user creation"
            );
            return Err(ServerError::UserRejected {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let user_id = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(user_id_from_location)
            .ok_or_else(|| ServerError::Internal("created user has no Location header".into()))?;

        let group_id = self.find_group(&token, &self.config.user_group).await?;
        self.join_group(&token, &user_id, &group_id).await?;

        info!(
            username = %payload.username,
            %user_id,
            group = %self.config.user_group,
            "user created"
        );
        Ok(user_id)
    }

    async fn find_group(&self, token: &str, name: &str) -> Result<String, ServerError> {
        let groups: Vec<Group> = self
            .http
            .get(format!("{}/groups", self.realm_admin_url()))
            .query(&[("search", name)])
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        groups
            .into_iter()
            .find(|g| g.name == name)
            .map(|g| g.id)
            .ok_or_else(|| ServerError::Internal(format!("group {name} not found")))
    }

    async fn join_group(
        &self,
        token: &str,
        user_id: &str,
        group_id: &str,
    ) -> Result<(), ServerError> {
        self.http
            .put(format!(
                "{}/users/{user_id}/groups/{group_id}",
                self.realm_admin_url()
            ))
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Last path segment of the `Location` header, e.g. `.../users/<id>`.
fn user_id_from_location(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next()?;
    let id = path.trim_end_matches('/').rsplit('/').next()?;
    (!id.is_empty()).then(|| id.to_string())
}
