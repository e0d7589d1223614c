//! The session state machine: restore on start, PKCE login, logout.
//!
//! One [`AuthSession`] owns the single [`Session`] of the application. Consumers
//! read snapshots or subscribe to changes; only the engine mutates it.
//!
//! Concurrent logins follow a supersede policy. Every `login()` and `logout()`
//! bumps a generation counter, and an attempt only touches the session or the
//! store while its generation is still current. Those checks and the writes that
//! follow them happen under one commit lock, so two attempts can never both
//! commit, and a stale attempt resolves to [`SessionError::Superseded`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::SessionError;
use crate::gateway::IdentityProviderGateway;
use crate::models::{Profile, Session, SessionStatus, TokenRecord};
use crate::pkce::PkceAttempt;
use crate::prompt::{AuthorizationPrompt, AuthorizationRequest, PromptOutcome};
use crate::store::{Store, TokenRecordStore};
use crate::utils::redact::mask_token;

pub struct AuthSession {
    gateway: IdentityProviderGateway,
    prompt: Arc<dyn AuthorizationPrompt>,
    records: TokenRecordStore,
    state: watch::Sender<Session>,
    generation: AtomicU64,
    commit: Mutex<()>,
}

impl AuthSession {
    /// The session starts `Unauthenticated` with `is_loading = true` until
    /// [`AuthSession::restore_session`] has run.
    pub fn new(
        gateway: IdentityProviderGateway,
        prompt: Arc<dyn AuthorizationPrompt>,
        store: Arc<dyn Store>,
    ) -> Self {
        if !store.is_durable() {
            warn!("Token store is not durable; the session will not survive a restart");
        }
        let (state, _) = watch::channel(Session::loading());
        AuthSession {
            gateway,
            prompt,
            records: TokenRecordStore::new(store),
            state,
            generation: AtomicU64::new(0),
            commit: Mutex::new(()),
        }
    }

    // -- Consumer surface

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receives every session change. Treat `is_loading` as "not yet known".
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn user(&self) -> Option<Profile> {
        self.state.borrow().user.clone()
    }

    /// The in-memory token while authenticated. Never touches the network or the store.
    pub fn get_access_token(&self) -> Option<String> {
        self.state.borrow().access_token().map(str::to_string)
    }

    // -- Operations

    /// Reads the persisted record once at startup. Never fails: read errors
    /// and incomplete records both end in `Unauthenticated`.
    pub async fn restore_session(&self) -> Session {
        let _guard = self.commit.lock().await;

        let restored = match self.records.load().await {
            Ok(Some(record)) => {
                let user_id = record.profile.id().unwrap_or_default();
                info!(
                    event_name = "session.restore",
                    event_domain = "session",
                    user_id = user_id.as_str(),
                    "Restored persisted session"
                );
                Session::authenticated(record)
            }
            Ok(None) => {
                debug!(event_name = "session.restore", "No session to restore");
                Session::unauthenticated()
            }
            Err(e) => {
                warn!(
                    event_name = "session.restore",
                    event_domain = "session",
                    "Failed to read token store, starting unauthenticated: {}",
                    e
                );
                Session::unauthenticated()
            }
        };

        self.state.send_modify(|session| {
            // A login or logout that already ran owns the state; only finish loading.
            if session.is_loading && session.status == SessionStatus::Unauthenticated {
                *session = restored;
            } else {
                session.is_loading = false;
                // Keep the stored record as the fallback should the pending attempt be abandoned.
                let pending = session.status != SessionStatus::Unauthenticated;
                if pending && !session.holds_credentials() {
                    session.user = restored.user;
                    session.access_token = restored.access_token;
                }
            }
        });
        self.snapshot()
    }

    /// Runs a full PKCE authorization-code login.
    ///
    /// Any attempt already in flight is superseded. Resolves `Ok` only once the
    /// record is persisted and the session is `Authenticated`.
    pub async fn login(&self) -> Result<Session, SessionError> {
        let generation = self.begin_attempt().await;
        let mut pending = PendingAttempt {
            session: self,
            generation,
            settled: false,
        };
        let result = self.run_attempt(generation).await;
        let outcome = self.finish_attempt(generation, result).await;
        pending.settled = true;
        outcome
    }

    /// Erases the persisted record and drops the in-memory session.
    ///
    /// The session always ends `Unauthenticated`. An erase failure is still
    /// reported, since the stale record would come back on the next restore.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let _guard = self.commit.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Logout invalidates any in-flight login");

        if self.gateway.config().revoke_on_logout {
            if let Some(token) = self.snapshot().access_token {
                if let Err(e) = self.gateway.revoke(&token).await {
                    warn!(
                        access_token = %mask_token(&token),
                        "Token revocation failed, continuing logout: {}",
                        e
                    );
                }
            }
        }

        let erased = self.records.erase().await;
        self.state.send_replace(Session::unauthenticated());

        match erased {
            Ok(()) => {
                info!(
                    event_name = "session.logout",
                    event_domain = "session",
                    "Logged out"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    event_name = "session.logout",
                    event_domain = "session",
                    "Failed to erase persisted token record: {}",
                    e
                );
                Err(SessionError::StorageFailure(e))
            }
        }
    }

    // -- Login state machine

    async fn begin_attempt(&self) -> u64 {
        let _guard = self.commit.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|session| {
            if session.status == SessionStatus::Authenticating {
                info!(generation, "Superseding in-flight login attempt");
            }
            session.status = SessionStatus::Authenticating;
            session.error = None;
        });
        debug!(generation, "Login attempt started");
        generation
    }

    fn ensure_current(&self, generation: u64) -> Result<(), SessionError> {
        if self.generation.load(Ordering::SeqCst) == generation {
            Ok(())
        } else {
            Err(SessionError::Superseded)
        }
    }

    async fn run_attempt(&self, generation: u64) -> Result<TokenRecord, SessionError> {
        let config = self.gateway.config();
        let attempt = PkceAttempt::generate(&config.redirect_uri);
        let url = self.gateway.authorization_url(&attempt);
        debug!(
            generation,
            attempt_id = %attempt.id,
            provider = config.name.as_str(),
            "Awaiting authorization"
        );

        let outcome = self
            .prompt
            .authorize(AuthorizationRequest {
                url,
                redirect_uri: attempt.redirect_uri.clone(),
                state: attempt.state.clone(),
            })
            .await;
        self.ensure_current(generation)?;
        debug!(
            generation,
            attempt_id = %attempt.id,
            completion = outcome.type_name(),
            "Authorization screen closed"
        );

        let code = match outcome {
            PromptOutcome::Success { code, state } => {
                let code = code.ok_or(SessionError::MissingAuthorizationCode)?;
                if state.as_deref() != Some(attempt.state.as_str()) {
                    return Err(SessionError::StateMismatch);
                }
                code
            }
            PromptOutcome::Error { error, description } => {
                return Err(SessionError::AuthorizationDenied { error, description })
            }
            PromptOutcome::Dismiss | PromptOutcome::Cancel | PromptOutcome::Locked => {
                return Err(SessionError::ProviderUICancelled)
            }
        };

        let tokens = self
            .gateway
            .exchange_code(&code, &attempt)
            .await
            .map_err(SessionError::from_exchange)?;
        self.ensure_current(generation)?;

        let profile = self
            .gateway
            .fetch_user_info(&tokens.access_token)
            .await
            .map_err(SessionError::from_profile_fetch)?;
        self.ensure_current(generation)?;

        Ok(TokenRecord::new(tokens.access_token, profile))
    }

    async fn finish_attempt(
        &self,
        generation: u64,
        result: Result<TokenRecord, SessionError>,
    ) -> Result<Session, SessionError> {
        let _guard = self.commit.lock().await;
        if let Err(e) = self.ensure_current(generation) {
            debug!(generation, "Discarding superseded login attempt result");
            return Err(e);
        }

        let failure = match result {
            Ok(record) => match self.records.save(&record).await {
                Ok(()) => {
                    let user_id = record.profile.id().unwrap_or_default();
                    info!(
                        event_name = "session.login",
                        event_domain = "session",
                        generation,
                        user_id = user_id.as_str(),
                        access_token = %mask_token(&record.access_token),
                        "Login succeeded"
                    );
                    self.state.send_replace(Session::authenticated(record));
                    return Ok(self.snapshot());
                }
                Err(e) => {
                    error!(generation, "Failed to persist token record: {}", e);
                    SessionError::StorageFailure(e)
                }
            },
            Err(e) => e,
        };

        self.state.send_modify(|session| {
            session.is_loading = false;
            if failure.is_cancellation() {
                session.settle_abandoned();
            } else {
                session.status = SessionStatus::AuthError;
                session.error = Some(failure.clone());
            }
        });

        match &failure {
            SessionError::ProviderUICancelled => info!(generation, "Login cancelled by user"),
            SessionError::NetworkUnreachable(e) => {
                warn!(generation, "Login failed, provider unreachable: {}", e)
            }
            SessionError::StorageFailure(_) => {}
            other => warn!(generation, "Login failed: {}", other),
        }
        Err(failure)
    }
}

/// Settles the session if a `login()` future is dropped before it resolves.
struct PendingAttempt<'a> {
    session: &'a AuthSession,
    generation: u64,
    settled: bool,
}

impl Drop for PendingAttempt<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let generation = self.generation;
        let current = &self.session.generation;
        // Checked inside the watch lock so a newer attempt's state is never overwritten.
        let reverted = self.session.state.send_if_modified(|session| {
            if current.load(Ordering::SeqCst) != generation
                || session.status != SessionStatus::Authenticating
            {
                return false;
            }
            session.settle_abandoned();
            true
        });
        if reverted {
            info!(generation, "Login attempt abandoned by caller");
        }
    }
}
