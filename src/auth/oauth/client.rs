use crate::config::GoogleConfig;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use oauth2::basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    HttpClientError, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

type GoogleRequestTokenError = BasicRequestTokenError<HttpClientError<reqwest::Error>>;

/// Fallback lifetime when the provider omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;

/// Provider-issued token set in normalized form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
}

/// OAuth2 client for Google's authorization-code flow
pub struct GoogleOAuthClient {
    config: GoogleConfig,
    client: ConfiguredClient,
    http_client: reqwest::Client,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleConfig) -> Result<Self, AppError> {
        let auth_url = AuthUrl::new(config.authorization_url.clone())
            .map_err(|e| AppError::Internal(format!("Invalid authorization URL: {}", e)))?;
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| AppError::Internal(format!("Invalid token URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        // Following redirects on token endpoints would leak credentials
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            http_client,
        })
    }

    /// Build the provider authorization URL for a previously issued state.
    /// `access_type=offline` asks Google to include a refresh token in the
    /// code exchange.
    pub fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, AppError> {
        let redirect = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| AppError::BadRequest(format!("Invalid redirect_uri: {}", e)))?;

        let state = state.to_string();
        let (url, _csrf) = self
            .client
            .clone()
            .set_redirect_uri(redirect)
            .authorize_url(move || CsrfToken::new(state.clone()))
            .add_scopes(self.config.scopes.iter().map(|s| Scope::new(s.clone())))
            .add_extra_param("access_type", "offline")
            .url();

        Ok(url.to_string())
    }

    /// Redeem an authorization code. The redirect URI must match the one
    /// the authorization request was issued with.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderTokens, AppError> {
        let redirect = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| AppError::BadRequest(format!("Invalid redirect_uri: {}", e)))?;

        let token_response = self
            .client
            .clone()
            .set_redirect_uri(redirect)
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::TokenExchange(describe_token_error(&e)))?;

        debug!("Authorization code exchanged");
        Ok(normalize(token_response, None))
    }

    /// Obtain a fresh access token from a stored refresh token. Google
    /// omits the refresh token from refresh responses, so the presented
    /// one is carried forward unless the provider rotates it.
    pub async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, AppError> {
        let token_response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::TokenRefresh(describe_token_error(&e)))?;

        debug!("Provider access token refreshed");
        Ok(normalize(token_response, Some(refresh_token)))
    }

    /// Best-effort token revocation at the provider. Failures are logged
    /// and swallowed; local session teardown never depends on this.
    pub async fn revoke(&self, token: &str) {
        let result = self
            .http_client
            .post(&self.config.revocation_url)
            .form(&[("token", token)])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Provider token revoked");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Provider rejected token revocation");
            }
            Err(err) => {
                warn!(error = %err, "Provider token revocation request failed");
            }
        }
    }
}

fn normalize(response: BasicTokenResponse, prior_refresh_token: Option<&str>) -> ProviderTokens {
    let lifetime = response
        .expires_in()
        .and_then(|d| chrono::Duration::from_std(d).ok())
        .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECONDS));

    ProviderTokens {
        access_token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| prior_refresh_token.map(str::to_string)),
        expires_at: Utc::now() + lifetime,
        scopes: response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default(),
    }
}

/// Surface the provider's own error code and description when present,
/// so callers see "invalid_grant: code was already redeemed" instead of
/// a generic transport message.
fn describe_token_error(err: &GoogleRequestTokenError) -> String {
    match err {
        oauth2::RequestTokenError::ServerResponse(response) => {
            match response.error_description() {
                Some(description) => format!("{}: {}", response.error(), description),
                None => response.error().to_string(),
            }
        }
        other => other.to_string(),
    }
}
