use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(config::ConfigError),
    Jwt(jsonwebtoken::errors::Error),
    Database(crate::database::DatabaseError),
    Cache(crate::cache::CacheError),
    /// Forged, expired, or already-consumed OAuth state parameter.
    InvalidState,
    /// Provider rejected the authorization code.
    TokenExchange(String),
    /// Provider rejected the refresh token; a new login is required.
    TokenRefresh(String),
    /// Profile fetch failed or the provider email is unverified.
    Identity(String),
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "Configuration error: {}", err),
            AppError::Jwt(err) => write!(f, "JWT error: {}", err),
            AppError::Database(err) => write!(f, "Database error: {}", err),
            AppError::Cache(err) => write!(f, "Cache error: {}", err),
            AppError::InvalidState => write!(f, "Invalid or expired state parameter"),
            AppError::TokenExchange(msg) => write!(f, "Token exchange failed: {}", msg),
            AppError::TokenRefresh(msg) => write!(f, "Token refresh failed: {}", msg),
            AppError::Identity(msg) => write!(f, "Identity resolution failed: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Jwt(err)
    }
}

impl From<crate::database::DatabaseError> for AppError {
    fn from(err: crate::database::DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<crate::cache::CacheError> for AppError {
    fn from(err: crate::cache::CacheError) -> Self {
        AppError::Cache(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Authentication failed"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
            AppError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
            AppError::InvalidState => (StatusCode::BAD_REQUEST, "Invalid state"),
            AppError::TokenExchange(_) => (StatusCode::BAD_REQUEST, "Token exchange failed"),
            AppError::TokenRefresh(_) => (StatusCode::BAD_REQUEST, "Token refresh failed"),
            AppError::Identity(_) => (StatusCode::BAD_REQUEST, "Identity resolution failed"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Authentication failed"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        let body = Json(json!({
            "error": error_message,
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}
