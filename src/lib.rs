//! Google SSO service
//!
//! A standalone authentication service implementing Google's OAuth2
//! authorization-code flow. Verified Google identities are mapped onto
//! local user accounts and sessions are issued as JWT access/refresh
//! pairs.

pub mod auth;
pub mod cache;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod server;
pub mod test_utils;
pub mod tokens;

pub use config::Config;
pub use error::AppError;
pub use server::Server;
