//! Shared helpers for unit and integration tests

use crate::config::Config;
use crate::database::DatabaseManager;
use crate::server::Server;

/// Builds a fully wired server on an in-memory database for tests.
pub struct TestServerBuilder {
    config: Config,
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestServerBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.database.url = "sqlite::memory:".to_string();
        config.jwt.secret = "test-secret".to_string();
        config.google.client_id = "test-client-id".to_string();
        config.google.client_secret = "test-client-secret".to_string();
        Self { config }
    }

    /// Point all Google endpoints at a stub server base URL.
    pub fn with_google_base_url(mut self, base_url: &str) -> Self {
        self.config.google.authorization_url = format!("{}/auth", base_url);
        self.config.google.token_url = format!("{}/token", base_url);
        self.config.google.userinfo_url = format!("{}/userinfo", base_url);
        self.config.google.revocation_url = format!("{}/revoke", base_url);
        self
    }

    pub fn with_save_tokens(mut self, save_tokens: bool) -> Self {
        self.config.google.save_tokens = save_tokens;
        self
    }

    pub fn with_return_tokens(mut self, return_tokens: bool) -> Self {
        self.config.google.return_tokens = return_tokens;
        self
    }

    pub fn with_revoke_on_logout(mut self, revoke_on_logout: bool) -> Self {
        self.config.google.revoke_on_logout = revoke_on_logout;
        self
    }

    pub fn with_config(mut self, apply: impl FnOnce(&mut Config)) -> Self {
        apply(&mut self.config);
        self
    }

    pub async fn build(self) -> Server {
        let server = Server::new(self.config)
            .await
            .unwrap_or_else(|e| panic!("Failed to build test server: {}", e));
        server
            .database
            .migrate()
            .await
            .unwrap_or_else(|e| panic!("Failed to migrate test database: {}", e));
        server
    }
}
