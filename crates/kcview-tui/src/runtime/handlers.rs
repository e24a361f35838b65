//! Effect handlers.
//!
//! Each handler is a plain async function that performs one piece of I/O
//! and returns the resulting `UiEvent`. The runtime spawns them and feeds the
//! result back to the reducer; handlers never touch view state.

use std::sync::Arc;

use kcview_core::api::{ApiClient, RequestConfig};
use kcview_core::identity::{IdentityClient, InitOptions};
use tracing::{error, info, warn};

use crate::common::RequestId;
use crate::events::{InitOutcome, UiEvent};

/// Runs the silent session check and reads the token when it succeeds.
pub async fn init_identity(identity: Arc<dyn IdentityClient>) -> UiEvent {
    match identity.init(InitOptions::check_sso()).await {
        Ok(true) => {
            info!("Authenticated");
            UiEvent::InitFinished(Ok(InitOutcome {
                authenticated: true,
                token: identity.token(),
            }))
        }
        Ok(false) => {
            info!("Not authenticated");
            UiEvent::InitFinished(Ok(InitOutcome {
                authenticated: false,
                token: None,
            }))
        }
        Err(e) => {
            error!(error = %e, "Authentication failed");
            UiEvent::InitFinished(Err(e.to_string()))
        }
    }
}

pub async fn call_api(
    api: Arc<dyn ApiClient>,
    req: RequestId,
    url: String,
    config: RequestConfig,
) -> UiEvent {
    let with_token = config.header("Authorization").is_some();
    let result = api.get(&url, &config).await;
    match &result {
        Ok(response) => info!(%url, with_token, status = response.status, "api call succeeded"),
        Err(e) => warn!(%url, with_token, status = ?e.status(), error = %e, "api call failed"),
    }
    UiEvent::ApiFinished { req, result }
}

pub async fn login(identity: Arc<dyn IdentityClient>) -> UiEvent {
    let result = identity.login().await.map_err(|e| {
        error!(error = %e, "login failed");
        e.to_string()
    });
    UiEvent::LoginFinished(result)
}

pub async fn logout(identity: Arc<dyn IdentityClient>) -> UiEvent {
    let result = identity.logout().await.map_err(|e| {
        warn!(error = %e, "logout failed");
        e.to_string()
    });
    UiEvent::LogoutFinished(result)
}
