//! Interactive browser login.

use anyhow::{Context, Result};
use kcview_core::config::Config;
use kcview_core::identity::{IdentityClient, InitOptions, KeycloakClient};

pub async fn run(config: &Config) -> Result<()> {
    let client = KeycloakClient::new(config.identity.clone())
        .with_url_notifier(|url| eprintln!("Sign in at:\n{url}\n"));

    let authenticated = client
        .init(InitOptions::login_required())
        .await
        .context("login failed")?;
    anyhow::ensure!(authenticated, "login did not establish a session");
    let token = client
        .token()
        .context("login finished without an access token")?;
    println!("{token}");
    Ok(())
}
