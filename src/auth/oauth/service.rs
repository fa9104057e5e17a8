use crate::auth::jwt::JwtService;
use crate::auth::oauth::client::{GoogleOAuthClient, ProviderTokens};
use crate::auth::oauth::identity::IdentityResolver;
use crate::auth::oauth::state::StateStore;
use crate::cache::MemoryCache;
use crate::config::Config;
use crate::database::DatabaseManager;
use crate::database::entities::UserRecord;
use crate::error::AppError;
use crate::tokens::{SessionTokenPair, TokenService};
use chrono::DateTime;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Response for a login initiation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub authorization_url: String,
    pub state: String,
}

/// Callback parameters presented by the client after provider consent
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackRequest {
    pub code: String,
    pub state: String,
}

/// Public view of a user record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&UserRecord> for UserPayload {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Successful login response: a session pair plus the resolved user.
/// Provider tokens are included only when configuration opts in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_tokens: Option<ProviderTokens>,
}

/// Orchestrates the Google authorization-code login flow end to end
pub struct OAuthService {
    config: Arc<Config>,
    oauth_client: Arc<GoogleOAuthClient>,
    identity: IdentityResolver,
    tokens: TokenService,
    state_store: StateStore,
    database: Arc<dyn DatabaseManager>,
}

impl OAuthService {
    pub fn new(
        config: Arc<Config>,
        jwt_service: Arc<dyn JwtService>,
        database: Arc<dyn DatabaseManager>,
        cache: Arc<MemoryCache>,
    ) -> Result<Self, AppError> {
        let oauth_client = Arc::new(GoogleOAuthClient::new(config.google.clone())?);

        let http_client = reqwest::Client::new();
        let identity = IdentityResolver::new(
            http_client,
            config.google.userinfo_url.clone(),
            database.clone(),
        );

        let tokens = TokenService::new(
            config.clone(),
            jwt_service,
            database.clone(),
            oauth_client.clone(),
        );

        let state_store = StateStore::new(cache, config.oauth.state_ttl);

        Ok(Self {
            config,
            oauth_client,
            identity,
            tokens,
            state_store,
            database,
        })
    }

    /// Start a login: mint a state entry and build the provider
    /// authorization URL bound to it.
    pub async fn begin_login(&self, redirect_uri: &str) -> Result<LoginResponse, AppError> {
        // Only absolute URLs make valid OAuth redirect targets
        Url::parse(redirect_uri)
            .map_err(|_| AppError::BadRequest("redirect_uri must be an absolute URL".to_string()))?;

        let state = self.state_store.create(redirect_uri).await?;
        let authorization_url = self.oauth_client.authorization_url(&state, redirect_uri)?;

        Ok(LoginResponse {
            authorization_url,
            state,
        })
    }

    /// Complete a login from the provider callback. Returns the session
    /// response together with the redirect target the state was bound
    /// to, for handlers that answer with a browser redirect.
    pub async fn complete_login(
        &self,
        request: &CallbackRequest,
    ) -> Result<(CallbackResponse, String), AppError> {
        let redirect_uri = self.state_store.consume(&request.state).await?;

        let provider_tokens = self
            .oauth_client
            .exchange_code(&request.code, &redirect_uri)
            .await?;

        let profile = self
            .identity
            .fetch_profile(&provider_tokens.access_token)
            .await?;
        let user = self.identity.resolve(&profile).await?;

        self.tokens
            .save_provider_tokens(user.id, &provider_tokens)
            .await?;

        let user = self.database.users().update_last_login(user.id).await?;
        let pair = self.tokens.issue_session(&user)?;

        info!(user_id = %user.id, email = %user.email, "Login completed");

        let response = CallbackResponse {
            access: pair.access,
            refresh: pair.refresh,
            user: UserPayload::from(&user),
            provider_tokens: self
                .config
                .google
                .return_tokens
                .then_some(provider_tokens),
        };

        Ok((response, redirect_uri))
    }

    /// Recover the redirect target for a provider-reported authorization
    /// error, consuming the state entry.
    pub async fn consume_state(&self, state: &str) -> Result<String, AppError> {
        self.state_store.consume(state).await
    }

    /// Rotate a refresh token into a new session pair.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<SessionTokenPair, AppError> {
        self.tokens.refresh_session(refresh_token).await
    }

    /// Tear down a session. The refresh token is blacklisted; provider
    /// revocation, when enabled, is best-effort and cannot fail the
    /// request.
    pub async fn logout(&self, user: &UserRecord, refresh_token: &str) -> Result<(), AppError> {
        self.tokens.invalidate_session(refresh_token).await?;

        if self.config.google.revoke_on_logout {
            match self.database.provider_tokens().find_by_user(user.id).await {
                Ok(Some(record)) => self.oauth_client.revoke(&record.access_token).await,
                Ok(None) => {}
                Err(err) => {
                    warn!(user_id = %user.id, error = %err, "Could not load provider tokens for revocation");
                }
            }
        }

        info!(user_id = %user.id, "Logout completed");
        Ok(())
    }

    /// Usable provider access token for the user, refreshed if stale.
    pub async fn provider_access_token(
        &self,
        user_id: i32,
    ) -> Result<Option<(String, DateTime<Utc>)>, AppError> {
        self.tokens.get_valid_token(user_id).await
    }
}
