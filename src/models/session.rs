use serde::Serialize;

use super::profile::Profile;
use super::token::TokenRecord;
use crate::error::SessionError;

/// Where the session state machine currently stands.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticating,
    Authenticated,
    AuthError,
}

/// A read-only snapshot of the single session owned by the engine.
///
/// `user` and `access_token` only ever change when a login commits or a
/// logout runs; a failed or cancelled attempt leaves them as they were.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub status: SessionStatus,
    pub user: Option<Profile>,
    pub access_token: Option<String>,
    /// True until the startup restore has resolved.
    pub is_loading: bool,
    /// The cause attached to an `AuthError` status.
    pub error: Option<SessionError>,
}

impl Session {
    /// The state before the token store has been read.
    pub fn loading() -> Self {
        Session {
            status: SessionStatus::Unauthenticated,
            user: None,
            access_token: None,
            is_loading: true,
            error: None,
        }
    }

    pub fn unauthenticated() -> Self {
        Session {
            is_loading: false,
            ..Session::loading()
        }
    }

    pub fn authenticated(record: TokenRecord) -> Self {
        Session {
            status: SessionStatus::Authenticated,
            user: Some(record.profile),
            access_token: Some(record.access_token),
            is_loading: false,
            error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// The bearer token, only while authenticated.
    pub fn access_token(&self) -> Option<&str> {
        match self.status {
            SessionStatus::Authenticated => self.access_token.as_deref(),
            _ => None,
        }
    }

    /// True when the in-memory session still holds a committed token and profile.
    pub(crate) fn holds_credentials(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }

    /// Leaves an abandoned attempt: back to whatever is still committed, without an error.
    pub(crate) fn settle_abandoned(&mut self) {
        self.status = if self.holds_credentials() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        };
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> TokenRecord {
        TokenRecord::new(
            "tok1".to_string(),
            Profile::from_value(json!({"id": "u1"})).unwrap(),
        )
    }

    #[test]
    fn starts_loading_and_unauthenticated() {
        let session = Session::loading();
        assert!(session.is_loading);
        assert_eq!(session.status, SessionStatus::Unauthenticated);
        assert_eq!(session.access_token(), None);
    }

    #[test]
    fn token_is_hidden_unless_authenticated() {
        let mut session = Session::authenticated(record());
        assert_eq!(session.access_token(), Some("tok1"));

        session.status = SessionStatus::AuthError;
        assert_eq!(session.access_token(), None);
        assert!(session.holds_credentials());
    }

    #[test]
    fn abandoned_attempt_falls_back_to_committed_credentials() {
        let mut session = Session::authenticated(record());
        session.status = SessionStatus::Authenticating;
        session.settle_abandoned();
        assert_eq!(session.access_token(), Some("tok1"));

        let mut session = Session::unauthenticated();
        session.status = SessionStatus::Authenticating;
        session.settle_abandoned();
        assert_eq!(session.status, SessionStatus::Unauthenticated);
    }
}
