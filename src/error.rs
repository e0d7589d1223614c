//! Failure kinds produced by the session engine and the identity provider gateway.

use thiserror::Error;

/// Every way a session operation can fail.
///
/// Values are carried inside [`crate::models::Session`] snapshots when the
/// session lands in `AuthError`, so they only hold owned, cloneable data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The user dismissed or cancelled the provider's authorization screen.
    #[error("Authorization was cancelled by the user")]
    ProviderUICancelled,

    /// The provider redirected back with an OAuth `error` parameter.
    #[error("Provider denied authorization: {error}{}", describe(.description))]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    /// The redirect carried a `state` value that does not belong to this attempt.
    #[error("Authorization response state does not match the login attempt")]
    StateMismatch,

    /// The provider reported success without an authorization code.
    #[error("Provider returned success without an authorization code")]
    MissingAuthorizationCode,

    /// The token endpoint answered with a non-2xx status.
    #[error("Token exchange rejected with HTTP {status}: {body}")]
    TokenExchangeRejected { status: u16, body: String },

    /// The token endpoint answered 2xx but without an `access_token`.
    #[error("Token response did not contain an access token")]
    MissingAccessToken,

    /// The token endpoint answered 2xx with a body that is not a JSON token response.
    #[error("Token response could not be read: {0}")]
    InvalidTokenResponse(String),

    /// The user-info endpoint failed or returned an unusable profile.
    #[error("Failed to fetch user profile: {0}")]
    ProfileFetchFailed(String),

    /// The token store could not be read, written or erased.
    #[error("Token storage failure: {0}")]
    StorageFailure(String),

    /// The provider could not be reached at all.
    #[error("Identity provider unreachable: {0}")]
    NetworkUnreachable(String),

    /// A newer `login()` or a `logout()` invalidated this attempt.
    #[error("Login attempt was superseded by a newer session operation")]
    Superseded,
}

/// Failures of a single call to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Connection, DNS, TLS or timeout failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with a non-2xx status.
    #[error("provider rejected request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The response body was not what the endpoint promises.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// A 2xx token response lacking `access_token`.
    #[error("token response is missing access_token")]
    MissingAccessToken,
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

impl SessionError {
    /// Maps a token-endpoint failure onto the session taxonomy.
    pub fn from_exchange(err: GatewayError) -> Self {
        match err {
            GatewayError::Network(e) => SessionError::NetworkUnreachable(e),
            GatewayError::Rejected { status, body } => {
                SessionError::TokenExchangeRejected { status, body }
            }
            GatewayError::Decode(e) => SessionError::InvalidTokenResponse(e),
            GatewayError::MissingAccessToken => SessionError::MissingAccessToken,
        }
    }

    /// Maps a user-info failure onto the session taxonomy.
    pub fn from_profile_fetch(err: GatewayError) -> Self {
        match err {
            GatewayError::Network(e) => SessionError::NetworkUnreachable(e),
            other => SessionError::ProfileFetchFailed(other.to_string()),
        }
    }

    /// True for failures that are a user decision rather than a fault.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SessionError::ProviderUICancelled)
    }
}
