pub mod auth;
pub mod health;

pub use auth::{create_auth_routes, create_protected_auth_routes};
pub use health::create_health_routes;
