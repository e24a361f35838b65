//! PKCE pair generation and authorization URL construction.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::config::IdentityConfig;

/// PKCE code verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    /// Generates a fresh verifier from 32 random bytes.
    pub fn generate() -> Self {
        // Two v4 UUIDs give 32 random bytes.
        let mut verifier_bytes = [0u8; 32];
        verifier_bytes[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        verifier_bytes[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

fn challenge_for(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Random opaque value echoed back by the provider.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Builds the realm authorization URL.
///
/// `prompt = Some("none")` asks the provider to answer without any
/// interaction, which is how a silent session check is expressed.
pub fn build_auth_url(
    config: &IdentityConfig,
    pkce: &Pkce,
    state: &str,
    redirect_uri: &str,
    prompt: Option<&str>,
) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs([
        ("client_id", config.client_id.as_str()),
        ("response_type", "code"),
        ("redirect_uri", redirect_uri),
        ("scope", config.scope.as_str()),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", "S256"),
        ("state", state),
    ]);
    if let Some(prompt) = prompt {
        serializer.append_pair("prompt", prompt);
    }
    format!("{}?{}", config.oidc_endpoint("auth"), serializer.finish())
}
