#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use google_sso_service::Server;
use google_sso_service::test_utils::TestServerBuilder;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Full-stack test fixture: the assembled app wired against a stub
/// Google server.
pub struct TestHarness {
    pub server: Server,
    pub app: Router,
    pub google: MockServer,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_builder(|builder| builder).await
    }

    pub async fn with_builder(
        customize: impl FnOnce(TestServerBuilder) -> TestServerBuilder,
    ) -> Self {
        let google = MockServer::start().await;
        let builder = TestServerBuilder::new().with_google_base_url(&google.uri());
        let server = customize(builder).build().await;
        let app = server.create_app();
        Self {
            server,
            app,
            google,
        }
    }

    /// Stub a successful code/refresh exchange at the token endpoint.
    pub async fn mock_token_success(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "provider-access-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "provider-refresh-token",
                "scope": "openid email profile",
            })))
            .mount(&self.google)
            .await;
    }

    /// Stub an OAuth error response from the token endpoint.
    pub async fn mock_token_error(&self, error: &str, description: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": error,
                "error_description": description,
            })))
            .mount(&self.google)
            .await;
    }

    pub async fn mock_userinfo(&self, email: &str, email_verified: bool) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "google-subject-1",
                "email": email,
                "email_verified": email_verified,
                "given_name": "Test",
                "family_name": "User",
            })))
            .mount(&self.google)
            .await;
    }

    pub async fn mock_revocation(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .and(body_string_contains("token="))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.google)
            .await;
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        split(self.send(request).await).await
    }

    pub async fn get_with_token(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        split(self.send(request).await).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        split(self.send(request).await).await
    }

    pub async fn post_json_with_token(
        &self,
        uri: &str,
        token: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        split(self.send(request).await).await
    }

    /// Start a login and return the issued state value.
    pub async fn begin_login(&self) -> String {
        let (status, body) = self
            .get("/google/login/?redirect_uri=http%3A%2F%2Flocalhost%2Fcb")
            .await;
        assert_eq!(status, StatusCode::OK);
        body["state"].as_str().expect("state missing").to_string()
    }

    /// Drive a complete login for the given email through the JSON
    /// callback. Token and userinfo stubs must be mounted first.
    pub async fn login(&self, email: &str) -> Value {
        let state = self.begin_login().await;
        let (status, body) = self
            .post_json(
                "/google/callback/",
                json!({"code": "auth-code", "state": state}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "callback failed: {}", body);
        body
    }
}

async fn split(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body read failed")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
