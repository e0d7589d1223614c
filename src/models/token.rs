use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::profile::Profile;

/// What the token endpoint hands back after a successful code exchange.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Reads a token endpoint response. Only a non-empty `access_token` is
    /// required; optional fields of an unexpected type are dropped.
    pub fn from_response(json: &Value) -> Option<Self> {
        let text = |key: &str| {
            json.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let expires_in = json.get("expires_in").and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        Some(TokenSet {
            access_token: text("access_token")?,
            id_token: text("id_token"),
            refresh_token: text("refresh_token"),
            token_type: text("token_type"),
            expires_in,
            scope: text("scope"),
        })
    }
}

/// The durable `{accessToken, profile}` pair written on login and erased on logout.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenRecord {
    pub access_token: String,
    pub profile: Profile,
}

impl TokenRecord {
    pub fn new(access_token: String, profile: Profile) -> Self {
        TokenRecord {
            access_token,
            profile,
        }
    }
}
