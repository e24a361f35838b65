//! Configuration management for kcview.
//!
//! Loads configuration from ${KCVIEW_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod paths {
    //! Path resolution for kcview configuration and log directories.
    //!
    //! KCVIEW_HOME resolution order:
    //! 1. KCVIEW_HOME environment variable (if set)
    //! 2. ~/.config/kcview (default)

    use std::path::PathBuf;

    /// Returns the kcview home directory.
    pub fn kcview_home() -> PathBuf {
        if let Ok(home) = std::env::var("KCVIEW_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".kcview"),
            |h| h.join(".config").join("kcview"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        kcview_home().join("config.toml")
    }

    /// Returns the directory holding rolling log files.
    pub fn logs_dir() -> PathBuf {
        kcview_home().join("logs")
    }
}

/// Returns the commented default config shipped with the binary.
pub fn default_config_template() -> &'static str {
    include_str!("../config_template.toml")
}

/// Identity provider (Keycloak) settings used by the interactive client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub server_url: String,
    pub realm: String,
    pub client_id: String,
    pub scope: String,
    /// Loopback port for the redirect URI; 0 picks a random high port.
    pub callback_port: u16,
    pub silent_check_timeout_secs: u64,
    pub login_timeout_secs: u64,
    pub open_browser: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8081".to_string(),
            realm: "continental".to_string(),
            client_id: "frontend-app".to_string(),
            scope: "openid".to_string(),
            callback_port: 0,
            silent_check_timeout_secs: 10,
            login_timeout_secs: 120,
            open_browser: true,
        }
    }
}

impl IdentityConfig {
    /// Base URL of the realm, e.g. `http://localhost:8081/realms/continental`.
    pub fn realm_url(&self) -> String {
        format!("{}/realms/{}", self.server_url.trim_end_matches('/'), self.realm)
    }

    /// OpenID Connect endpoint of the realm (`auth`, `token`, `logout`, `certs`).
    pub fn oidc_endpoint(&self, name: &str) -> String {
        format!("{}/protocol/openid-connect/{name}", self.realm_url())
    }

    pub fn silent_check_timeout(&self) -> Duration {
        Duration::from_secs(self.silent_check_timeout_secs)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }
}

/// Credentials the resource server uses against the Keycloak admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeycloakAdminConfig {
    pub server_url: String,
    pub admin_realm: String,
    pub target_realm: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub user_group: String,
}

impl Default for KeycloakAdminConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8081".to_string(),
            admin_realm: "master".to_string(),
            target_realm: "continental".to_string(),
            client_id: "admin-cli".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            user_group: "CONTINENTAL_GROUP_USER".to_string(),
        }
    }
}

/// Resource server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub allowed_origins: Vec<String>,
    pub admin_role: String,
    pub resource_client_id: String,
    /// HS256 shared secret; takes precedence over JWKS when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub keycloak_admin: KeycloakAdminConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            admin_role: "CONTINENTAL_ROLE_ADMIN".to_string(),
            resource_client_id: "backend-app".to_string(),
            jwt_secret: None,
            jwks_uri: None,
            issuer: None,
            keycloak_admin: KeycloakAdminConfig::default(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin the view prefixes to every endpoint.
    pub api_base_url: String,

    /// Timeout for backend calls in seconds (0 disables)
    pub request_timeout_secs: u64,

    pub identity: IdentityConfig,

    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 0,
            identity: IdentityConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

    /// Loads configuration from the default config path, then applies env overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Applies `KCVIEW_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("KCVIEW_API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if lookup("KCVIEW_NO_BROWSER").is_some_and(|v| is_truthy(&v)) {
            self.identity.open_browser = false;
        }
    }

    /// Writes the default template to `path` unless a file already exists.
    ///
    /// Returns `true` when a new file was written.
    pub fn init_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(true)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.request_timeout_secs))
        }
    }

    /// JWKS endpoint for the resource server, derived from the realm when not configured.
    pub fn jwks_uri(&self) -> String {
        self.server
            .jwks_uri
            .clone()
            .unwrap_or_else(|| self.identity.oidc_endpoint("certs"))
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
