//! Stateless wrapper over the identity provider's authorize, token, user-info and revoke endpoints.
//!
//! No call is retried here; a failure is reported upward and retry means a fresh login.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::IdentityProviderConfig;
use crate::error::GatewayError;
use crate::models::{Profile, TokenSet};
use crate::pkce::{PkceAttempt, CHALLENGE_METHOD};
use crate::utils::redact::mask_token;

pub struct IdentityProviderGateway {
    config: IdentityProviderConfig,
    authorize_url: Url,
    client: reqwest::Client,
}

impl IdentityProviderGateway {
    pub fn new(config: &IdentityProviderConfig) -> Result<Self, String> {
        info!(
            "Creating identity provider gateway for '{}', client_id='{}'",
            config.name, config.client_id
        );
        let authorize_url = Url::parse(&config.authorization_endpoint).map_err(|e| {
            format!(
                "Invalid authorization endpoint '{}': {}",
                config.authorization_endpoint, e
            )
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            config: config.clone(),
            authorize_url,
            client,
        })
    }

    pub fn config(&self) -> &IdentityProviderConfig {
        &self.config
    }

    /// Builds the URL the user is sent to for this attempt.
    pub fn authorization_url(&self, attempt: &PkceAttempt) -> Url {
        let mut url = self.authorize_url.clone();
        let scope = self.config.scopes.join(" ");
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &attempt.redirect_uri)
                .append_pair("scope", &scope)
                .append_pair("code_challenge", &attempt.challenge)
                .append_pair("code_challenge_method", CHALLENGE_METHOD)
                .append_pair("state", &attempt.state);
            if let Some(audience) = &self.config.audience {
                query.append_pair("audience", audience);
            }
        }
        url
    }

    /// Exchanges an authorization code plus the attempt's verifier for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        attempt: &PkceAttempt,
    ) -> Result<TokenSet, GatewayError> {
        debug!(
            "Exchanging authorization code at '{}'",
            self.config.token_endpoint
        );
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", attempt.verifier.as_str()),
            ("code", code),
            ("redirect_uri", attempt.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_endpoint)
            .form(&form)
            .send()
            .await?;

        let body = read_success_body(response).await?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Decode(format!("Error parsing token JSON: {}", e)))?;

        let tokens = TokenSet::from_response(&json).ok_or(GatewayError::MissingAccessToken)?;

        debug!(
            access_token = %mask_token(&tokens.access_token),
            has_id_token = tokens.id_token.is_some(),
            "Token exchange succeeded"
        );
        Ok(tokens)
    }

    /// Fetches the profile of the user the access token belongs to.
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<Profile, GatewayError> {
        debug!("Fetching user info from '{}'", self.config.userinfo_endpoint);
        let response = self
            .client
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;

        let body = read_success_body(response).await?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Decode(format!("Error parsing user info JSON: {}", e)))?;
        Profile::from_value(json).map_err(GatewayError::Decode)
    }

    /// Revokes a token at the provider. A missing revocation endpoint is a no-op.
    pub async fn revoke(&self, token: &str) -> Result<(), GatewayError> {
        let Some(endpoint) = &self.config.revocation_endpoint else {
            debug!("No revocation endpoint configured; skipping revoke");
            return Ok(());
        };

        let response = self
            .client
            .post(endpoint)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("token", token),
            ])
            .send()
            .await?;
        read_success_body(response).await.map(|_| ())
    }
}

/// Returns the body of a 2xx response; anything else becomes `Rejected` with the provider's payload.
async fn read_success_body(response: reqwest::Response) -> Result<String, GatewayError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        warn!("Identity provider answered HTTP {}", status.as_u16());
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
