use std::sync::Arc;

use tracing::{debug, error, warn};

use super::Store;
use crate::models::{Profile, TokenRecord};

/// Slot holding the raw access token.
pub const TOKEN_KEY: &str = "auth_token";
/// Slot holding the profile serialized as JSON text.
pub const PROFILE_KEY: &str = "user_data";

/// Reads and writes the `{accessToken, profile}` pair as one unit on top of a [`Store`].
///
/// The profile is written before the token and erased after it, and a load
/// requires both, so an interrupted write or erase is never observed as a session.
#[derive(Clone)]
pub struct TokenRecordStore {
    store: Arc<dyn Store>,
}

impl TokenRecordStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        TokenRecordStore { store }
    }

    /// Returns the record if both slots are present and usable, `None` otherwise.
    pub async fn load(&self) -> Result<Option<TokenRecord>, String> {
        let token = self.store.get(TOKEN_KEY).await?;
        let profile = self.store.get(PROFILE_KEY).await?;

        match (token, profile) {
            (Some(token), Some(profile)) if !token.is_empty() => {
                match Profile::from_json(&profile) {
                    Ok(profile) => Ok(Some(TokenRecord::new(token, profile))),
                    Err(e) => {
                        warn!("Stored profile is unusable, ignoring record: {}", e);
                        Ok(None)
                    }
                }
            }
            (None, None) => {
                debug!("No persisted token record");
                Ok(None)
            }
            (token, profile) => {
                warn!(
                    has_token = token.is_some(),
                    has_profile = profile.is_some(),
                    "Persisted token record is incomplete, ignoring it"
                );
                Ok(None)
            }
        }
    }

    /// Writes both slots. On failure, slots already touched are put back to their prior values.
    /// If that rollback fails too, the token slot is removed so the pair reads as incomplete.
    pub async fn save(&self, record: &TokenRecord) -> Result<(), String> {
        let previous_profile = self.store.get(PROFILE_KEY).await?;

        self.store
            .set(PROFILE_KEY, &record.profile.to_json())
            .await?;

        if let Err(e) = self.store.set(TOKEN_KEY, &record.access_token).await {
            self.rollback_profile(previous_profile).await;
            return Err(e);
        }
        Ok(())
    }

    /// Erases both slots, token first.
    pub async fn erase(&self) -> Result<(), String> {
        self.store.remove(TOKEN_KEY).await?;
        self.store.remove(PROFILE_KEY).await
    }

    async fn rollback_profile(&self, previous: Option<String>) {
        let result = match &previous {
            Some(profile) => self.store.set(PROFILE_KEY, profile).await,
            None => self.store.remove(PROFILE_KEY).await,
        };
        if let Err(e) = result {
            error!("Failed to roll back profile slot after a failed token write: {}", e);
            // The old token must not be left paired with the new profile.
            if let Err(e) = self.store.remove(TOKEN_KEY).await {
                error!("Failed to remove token slot after a failed rollback: {}", e);
            }
        }
    }
}
