//! Cache layer for short-lived data
//!
//! Home of the pending-login state entries. Values are JSON-serialized so
//! the backend stays type-agnostic.

use thiserror::Error;

pub mod memory;

pub use memory::MemoryCache;

/// Cache error types
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Key not found")]
    NotFound,
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait::async_trait]
pub trait Cache: Send + Sync {
    async fn get<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send;

    async fn set<T>(&self, key: &str, value: &T, ttl: Option<std::time::Duration>)
        -> CacheResult<()>
    where
        T: serde::Serialize + Send + Sync;

    /// Remove the entry and return its value in one step. Single-use
    /// reads (the OAuth state handshake) rely on this being atomic.
    async fn take<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;
}
