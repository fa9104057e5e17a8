use crate::auth::jwt::TokenKind;
use crate::database::DatabaseManager;
use crate::database::entities::UserRecord;
use crate::error::AppError;
use crate::server::Server;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{trace, warn};

/// Bearer session-token authentication middleware.
/// Validates the access token and attaches the owning UserRecord to the
/// request extensions for downstream handlers.
pub async fn session_auth_middleware(
    State(server): State<Server>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))?;

    let claims = server
        .jwt_service
        .validate_token(token, TokenKind::Access)?;

    let user = get_user_record(claims.sub, &server.database).await?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

async fn get_user_record(
    user_id: i32,
    database: &Arc<dyn DatabaseManager>,
) -> Result<UserRecord, AppError> {
    let user = database
        .users()
        .find_by_id(user_id)
        .await
        .map_err(|e| AppError::Internal(format!("Database error: {}", e)))?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "Session token references unknown user");
            AppError::Unauthorized("User not found".to_string())
        })?;

    trace!(user_id = %user.id, email = %user.email, "Session authentication successful");
    Ok(user)
}

/// Custom extractor for UserRecord from request extensions
/// Use this in route handlers that need access to authenticated user information
pub struct UserExtractor(pub UserRecord);

impl<S> FromRequestParts<S> for UserExtractor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserRecord>()
            .cloned()
            .map(UserExtractor)
            .ok_or_else(|| AppError::Unauthorized("Missing user authentication".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{JwtService, SessionClaims};
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "success"
    }

    fn create_test_token(jwt_service: &dyn JwtService, user_id: i32, kind: TokenKind) -> String {
        let claims = SessionClaims::new(user_id, kind, 3600);
        jwt_service.create_token(&claims).unwrap()
    }

    async fn create_test_server() -> crate::server::Server {
        crate::test_utils::TestServerBuilder::new().build().await
    }

    async fn create_test_user(server: &crate::server::Server, email: &str) -> i32 {
        let user = crate::database::entities::UserRecord::new(email, email.replace('@', "_"));
        server.database.users().insert(&user).await.unwrap().id
    }

    fn create_test_app(server: crate::server::Server) -> Router {
        Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn_with_state(
                server,
                session_auth_middleware,
            ))
    }

    #[tokio::test]
    async fn test_middleware_accepts_valid_access_token() {
        let server = create_test_server().await;
        let user_id = create_test_user(&server, "test@example.com").await;
        let app = create_test_app(server.clone());

        let token = create_test_token(server.jwt_service.as_ref(), user_id, TokenKind::Access);
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_missing_header() {
        let server = create_test_server().await;
        let app = create_test_app(server);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_middleware_invalid_format() {
        let server = create_test_server().await;
        let app = create_test_app(server);

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Invalid token")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_middleware_rejects_refresh_token() {
        let server = create_test_server().await;
        let user_id = create_test_user(&server, "refresh@example.com").await;
        let app = create_test_app(server.clone());

        // A refresh token is not valid for protected endpoints
        let token = create_test_token(server.jwt_service.as_ref(), user_id, TokenKind::Refresh);
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_middleware_unknown_user() {
        let server = create_test_server().await;
        let app = create_test_app(server.clone());

        let token = create_test_token(server.jwt_service.as_ref(), 999, TokenKind::Access);
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_middleware_expired_token() {
        let server = create_test_server().await;
        let user_id = create_test_user(&server, "expired@example.com").await;
        let app = create_test_app(server.clone());

        let mut claims = SessionClaims::new(user_id, TokenKind::Access, 3600);
        claims.exp = claims.iat - 60; // Set to past
        let token = server.jwt_service.create_token(&claims).unwrap();

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
