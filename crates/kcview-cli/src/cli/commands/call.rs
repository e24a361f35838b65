//! Headless call: one mount, one request, one printed message.

use std::sync::Arc;

use anyhow::{Result, bail};
use kcview_core::config::Config;
use kcview_core::identity::{IdentityClient, KeycloakClient, StaticTokenClient};
use kcview_tui::headless::run_call;
use kcview_tui::{Services, ViewState};
use tracing::debug;

const SUCCESS_PREFIX: &str = "Success:";

pub async fn run(config: &Config, endpoint: &str, token: Option<String>) -> Result<()> {
    let identity: Arc<dyn IdentityClient> = match token {
        Some(token) => {
            debug!("using access token from the command line");
            Arc::new(StaticTokenClient::new(Some(token)))
        }
        None => Arc::new(KeycloakClient::new(config.identity.clone())),
    };
    let services = Services::new(identity, super::api_client(config)?);

    let run = run_call(&services, ViewState::new(config.api_base_url.as_str()), endpoint).await;
    println!("{}", run.state.message);

    if run.login_requested {
        bail!("{endpoint} requires login; run `kcview login` and pass the token with --token");
    }
    if !run.state.message.starts_with(SUCCESS_PREFIX) {
        bail!("call to {endpoint} failed");
    }
    Ok(())
}
