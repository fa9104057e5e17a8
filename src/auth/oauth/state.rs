use crate::cache::{Cache, MemoryCache};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Default OAuth state token TTL (10 minutes)
pub const OAUTH_STATE_TTL_SECONDS: u64 = 600;

const STATE_KEY_PREFIX: &str = "oauth_state:";

/// CSRF state entry binding a pending login to its post-login target
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingAuthState {
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
}

/// Short-lived store of pending login states. Entries are read-once:
/// a state value is accepted by the callback at most one time.
pub struct StateStore {
    cache: Arc<MemoryCache>,
    ttl: Duration,
}

impl StateStore {
    pub fn new(cache: Arc<MemoryCache>, ttl_seconds: u64) -> Self {
        Self {
            cache,
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Issue a fresh unguessable state value bound to the redirect target.
    pub async fn create(&self, redirect_uri: &str) -> Result<String, AppError> {
        let state = Uuid::new_v4().to_string();
        let entry = PendingAuthState {
            redirect_uri: redirect_uri.to_string(),
            created_at: Utc::now(),
        };

        self.cache
            .set(&format!("{STATE_KEY_PREFIX}{state}"), &entry, Some(self.ttl))
            .await?;

        Ok(state)
    }

    /// Redeem a state value, returning the stored redirect target.
    /// The entry is removed atomically; a forged, expired, or replayed
    /// state fails with `InvalidState`.
    pub async fn consume(&self, state: &str) -> Result<String, AppError> {
        let entry: Option<PendingAuthState> = self
            .cache
            .take(&format!("{STATE_KEY_PREFIX}{state}"))
            .await?;

        entry
            .map(|data| data.redirect_uri)
            .ok_or(AppError::InvalidState)
    }
}
