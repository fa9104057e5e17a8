use crate::auth::middleware::UserExtractor;
use crate::auth::oauth::{CallbackRequest, CallbackResponse, LoginResponse, UserPayload};
use crate::error::AppError;
use crate::server::Server;
use crate::tokens::SessionTokenPair;
use axum::{
    Json, Router,
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// Routes for the Google login flow and session refresh.
/// Trailing slashes are part of the public paths.
pub fn create_auth_routes() -> Router<Server> {
    Router::new()
        .route("/google/login/", get(login))
        .route("/google/login/redirect/", get(login_redirect))
        .route("/google/callback/", post(callback).get(callback_redirect))
        .route("/token/refresh/", post(refresh_session))
}

/// Routes that require a valid access token. The session middleware is
/// attached by the server when assembling the app.
pub fn create_protected_auth_routes() -> Router<Server> {
    Router::new()
        .route("/me/", get(me))
        .route("/logout/", post(logout))
}

#[derive(Debug, Deserialize)]
struct LoginParams {
    redirect_uri: Option<String>,
}

/// Provider callback parameters for the browser-redirect variant.
/// Either `code` or `error` is present.
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct LogoutRequest {
    refresh: String,
}

async fn login(
    State(server): State<Server>,
    Query(params): Query<LoginParams>,
) -> Result<Json<LoginResponse>, AppError> {
    let redirect_uri = params
        .redirect_uri
        .ok_or_else(|| AppError::BadRequest("Missing redirect_uri parameter".to_string()))?;

    let response = server.oauth_service.begin_login(&redirect_uri).await?;
    Ok(Json(response))
}

/// Same as `login`, but answers with a 303 straight to the provider.
async fn login_redirect(
    State(server): State<Server>,
    Query(params): Query<LoginParams>,
) -> Result<Redirect, AppError> {
    let redirect_uri = params
        .redirect_uri
        .ok_or_else(|| AppError::BadRequest("Missing redirect_uri parameter".to_string()))?;

    let response = server.oauth_service.begin_login(&redirect_uri).await?;
    Ok(Redirect::to(&response.authorization_url))
}

/// JSON callback used by single-page clients: they receive the code and
/// state on their redirect target and post them here.
async fn callback(
    State(server): State<Server>,
    Json(request): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, AppError> {
    let (response, _redirect_uri) = server.oauth_service.complete_login(&request).await?;
    Ok(Json(response))
}

/// Browser-redirect callback: completes the login and forwards the
/// session pair to the redirect target as query parameters.
async fn callback_redirect(
    State(server): State<Server>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, AppError> {
    if let Some(error) = params.error {
        // Provider denied the request; forward the error to the target
        // the state was bound to.
        let state = params
            .state
            .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?;
        let target = server.oauth_service.consume_state(&state).await?;

        let mut pairs = vec![("error", error)];
        if let Some(description) = params.error_description {
            pairs.push(("error_description", description));
        }
        return Ok(Redirect::to(&append_query(&target, &pairs)?));
    }

    let request = CallbackRequest {
        code: params
            .code
            .ok_or_else(|| AppError::BadRequest("Missing code parameter".to_string()))?,
        state: params
            .state
            .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?,
    };

    let (response, redirect_uri) = server.oauth_service.complete_login(&request).await?;

    let pairs = vec![("access", response.access), ("refresh", response.refresh)];
    Ok(Redirect::to(&append_query(&redirect_uri, &pairs)?))
}

fn append_query(target: &str, pairs: &[(&str, String)]) -> Result<String, AppError> {
    let mut url = Url::parse(target)
        .map_err(|_| AppError::BadRequest("Invalid redirect target".to_string()))?;
    for (key, value) in pairs {
        url.query_pairs_mut().append_pair(key, value);
    }
    Ok(url.to_string())
}

async fn refresh_session(
    State(server): State<Server>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<SessionTokenPair>, AppError> {
    let pair = server.oauth_service.refresh_session(&request.refresh).await?;
    Ok(Json(pair))
}

async fn me(UserExtractor(user): UserExtractor) -> Json<UserPayload> {
    Json(UserPayload::from(&user))
}

async fn logout(
    State(server): State<Server>,
    UserExtractor(user): UserExtractor,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<Value>, AppError> {
    server.oauth_service.logout(&user, &request.refresh).await?;
    Ok(Json(json!({})))
}
