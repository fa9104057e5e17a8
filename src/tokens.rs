//! Session issuance and provider token lifecycle
//!
//! Local sessions are stateless JWT pairs; revocation is tracked by jti
//! in the database. Provider tokens are persisted per user and refreshed
//! on demand.

use crate::auth::jwt::{JwtService, SessionClaims, TokenKind};
use crate::auth::oauth::client::{GoogleOAuthClient, ProviderTokens};
use crate::config::Config;
use crate::database::DatabaseManager;
use crate::database::entities::{ProviderTokenRecord, UserRecord};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Access tokens within this many seconds of expiry are treated as
/// already stale, so callers never receive a token that dies in flight.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Locally issued session token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokenPair {
    pub access: String,
    pub refresh: String,
}

pub struct TokenService {
    config: Arc<Config>,
    jwt_service: Arc<dyn JwtService>,
    database: Arc<dyn DatabaseManager>,
    oauth_client: Arc<GoogleOAuthClient>,
}

impl TokenService {
    pub fn new(
        config: Arc<Config>,
        jwt_service: Arc<dyn JwtService>,
        database: Arc<dyn DatabaseManager>,
        oauth_client: Arc<GoogleOAuthClient>,
    ) -> Self {
        Self {
            config,
            jwt_service,
            database,
            oauth_client,
        }
    }

    /// Persist a provider token set for the user. A no-op when token
    /// persistence is disabled in configuration.
    pub async fn save_provider_tokens(
        &self,
        user_id: i32,
        tokens: &ProviderTokens,
    ) -> Result<(), AppError> {
        if !self.config.google.save_tokens {
            return Ok(());
        }

        let now = Utc::now();
        let record = ProviderTokenRecord {
            id: 0,
            user_id,
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens.expires_at,
            scopes: tokens.scopes.join(" "),
            created_at: now,
            updated_at: now,
        };

        self.database.provider_tokens().upsert(&record).await?;
        debug!(user_id = %user_id, "Provider tokens saved");
        Ok(())
    }

    /// Return a provider access token that is still usable, refreshing
    /// it through the provider at most once. Yields `None` when no
    /// tokens are stored or the stale token cannot be refreshed.
    pub async fn get_valid_token(
        &self,
        user_id: i32,
    ) -> Result<Option<(String, DateTime<Utc>)>, AppError> {
        let Some(record) = self.database.provider_tokens().find_by_user(user_id).await? else {
            return Ok(None);
        };

        if record.is_fresh(chrono::Duration::seconds(EXPIRY_SKEW_SECONDS)) {
            return Ok(Some((record.access_token, record.expires_at)));
        }

        let Some(refresh_token) = record.refresh_token else {
            debug!(user_id = %user_id, "Stored access token stale and no refresh token held");
            return Ok(None);
        };

        match self.oauth_client.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.save_provider_tokens(user_id, &tokens).await?;
                Ok(Some((tokens.access_token, tokens.expires_at)))
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "Provider token refresh failed");
                Ok(None)
            }
        }
    }

    /// Issue a fresh access/refresh session pair for the user.
    pub fn issue_session(&self, user: &UserRecord) -> Result<SessionTokenPair, AppError> {
        let access_claims =
            SessionClaims::new(user.id, TokenKind::Access, self.config.jwt.access_token_ttl);
        let refresh_claims = SessionClaims::new(
            user.id,
            TokenKind::Refresh,
            self.config.jwt.refresh_token_ttl,
        );

        Ok(SessionTokenPair {
            access: self.jwt_service.create_token(&access_claims)?,
            refresh: self.jwt_service.create_token(&refresh_claims)?,
        })
    }

    /// Revoke a refresh token by blacklisting its jti. An expired token
    /// still revokes cleanly; only a malformed or forged one fails.
    pub async fn invalidate_session(&self, refresh_token: &str) -> Result<(), AppError> {
        let claims = self
            .jwt_service
            .decode_allow_expired(refresh_token, TokenKind::Refresh)
            .map_err(|_| AppError::BadRequest("Malformed refresh token".to_string()))?;

        self.database
            .revoked_sessions()
            .revoke(&claims.jti, claims.sub, claims.expires_at())
            .await?;

        debug!(user_id = %claims.sub, "Session refresh token revoked");
        Ok(())
    }

    /// Exchange a live refresh token for a new session pair. The
    /// presented token is rotated out: its jti is claimed on the
    /// blacklist before any pair is minted, so concurrent refreshes of
    /// the same token yield exactly one winner.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<SessionTokenPair, AppError> {
        let claims = self
            .jwt_service
            .validate_token(refresh_token, TokenKind::Refresh)?;

        let newly_claimed = self
            .database
            .revoked_sessions()
            .revoke(&claims.jti, claims.sub, claims.expires_at())
            .await?;
        if !newly_claimed {
            return Err(AppError::Unauthorized("Refresh token revoked".to_string()));
        }

        let user = self
            .database
            .users()
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        self.issue_session(&user)
    }
}
