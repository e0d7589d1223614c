use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed discovery metadata and client registration for the identity provider.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema, PartialEq)]
pub struct IdentityProviderConfig {
    /// Human-readable name used in logs.
    pub name: String,
    pub client_id: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Extra `audience` parameter some providers (Auth0) need to issue API tokens.
    #[serde(default)]
    pub audience: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    #[serde(default)]
    pub revocation_endpoint: Option<String>,
    /// Custom scheme plus callback path, as registered with the provider.
    pub redirect_uri: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    /// Revoke the access token at the provider before erasing it on logout.
    #[serde(default)]
    pub revoke_on_logout: bool,
}

fn default_scopes() -> Vec<String> {
    vec!["openid".into(), "profile".into(), "email".into()]
}

fn default_timeout_in_ms() -> u64 {
    10_000
}
