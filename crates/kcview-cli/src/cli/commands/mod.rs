//! CLI command handlers.

pub mod call;
pub mod config;
pub mod login;
pub mod serve;
pub mod tui;

use std::sync::Arc;

use anyhow::{Context, Result};
use kcview_core::api::{ApiClient, HttpApiClient};
use kcview_core::config::Config;

fn api_client(config: &Config) -> Result<Arc<dyn ApiClient>> {
    let client = HttpApiClient::new(config.request_timeout()).context("create HTTP client")?;
    Ok(Arc::new(client))
}
