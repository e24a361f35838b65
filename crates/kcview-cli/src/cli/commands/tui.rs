//! Interactive view.

use std::sync::Arc;

use anyhow::{Context, Result};
use kcview_core::config::Config;
use kcview_core::identity::KeycloakClient;
use kcview_tui::{Services, ViewState};

pub fn run(config: &Config) -> Result<()> {
    let identity = Arc::new(KeycloakClient::new(config.identity.clone()));
    let services = Services::new(identity, super::api_client(config)?);

    kcview_tui::run_interactive(ViewState::new(config.api_base_url.as_str()), services)
        .context("interactive view failed")
}
