//! Demo resource server protected by Keycloak bearer tokens.

pub mod admin;
pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use std::future;

use anyhow::{Context, Result};
use kcview_core::config::Config;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::state::AppState;

/// Binds the listener and serves until Ctrl+C.
pub async fn serve(config: &Config, bind_override: Option<&str>) -> Result<()> {
    let bind = bind_override.unwrap_or(&config.server.bind);
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    let addr = listener.local_addr().context("Failed to read local address")?;

    let app = routes::router(AppState::from_config(config), &config.server.allowed_origins);
    info!(%addr, "resource server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            // An error here means no signal handler; serve until killed.
            if signal::ctrl_c().await.is_err() {
                future::pending::<()>().await;
            }
            info!("shutting down");
        })
        .await
        .context("Server error")
}
