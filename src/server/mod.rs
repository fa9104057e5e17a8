use crate::{
    auth::{
        jwt::{JwtService, JwtServiceImpl, parse_algorithm},
        middleware::session_auth_middleware,
        oauth::OAuthService,
    },
    cache::MemoryCache,
    config::Config,
    database::{DatabaseManager, DatabaseManagerImpl},
    error::AppError,
    routes::{create_auth_routes, create_health_routes, create_protected_auth_routes},
};
use axum::{Router, middleware};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub jwt_service: Arc<dyn JwtService>,
    pub database: Arc<dyn DatabaseManager>,
    pub cache: Arc<MemoryCache>,
    pub oauth_service: Arc<OAuthService>,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);

        let jwt_algorithm = parse_algorithm(&config.jwt.algorithm)?;
        let jwt_service: Arc<dyn JwtService> = Arc::new(JwtServiceImpl::new(
            config.jwt.secret.clone(),
            jwt_algorithm,
        )?);

        let cache = Arc::new(MemoryCache::new());

        let database: Arc<dyn DatabaseManager> = Arc::new(
            DatabaseManagerImpl::new_from_config(&config)
                .await
                .map_err(AppError::Database)?,
        );

        // The OAuth service needs the concrete cache type for the state
        // store
        let oauth_service = Arc::new(OAuthService::new(
            config.clone(),
            jwt_service.clone(),
            database.clone(),
            cache.clone(),
        )?);

        Ok(Self {
            config,
            jwt_service,
            database,
            cache,
            oauth_service,
        })
    }

    /// Assemble the application router. Protected routes sit behind the
    /// session auth middleware; the login flow and health check do not.
    pub fn create_app(&self) -> Router {
        let protected = create_protected_auth_routes().route_layer(middleware::from_fn_with_state(
            self.clone(),
            session_auth_middleware,
        ));

        Router::new()
            .merge(create_auth_routes())
            .merge(protected)
            .nest("/health/", create_health_routes())
            .with_state(self.clone())
    }

    pub async fn run(self) -> Result<(), AppError> {
        self.database.migrate().await.map_err(AppError::Database)?;

        let app = self.create_app();

        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid listen address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::Internal(format!("Server error: {}", e)))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
