//! Record store access
//!
//! Zone content is produced by an external ingestion pipeline and lives in a
//! key-value store. This module exposes the handful of read operations the
//! query path needs behind the [`RecordStore`] trait, the key layout shared with
//! the pipeline, and [`ZoneData`], a typed view over those keys.

pub mod keys;
pub mod memory;
pub mod redis_backend;
pub mod zone_data;

use async_trait::async_trait;
use thiserror::Error;

pub use keys::DiffSide;
pub use memory::MemoryStore;
pub use redis_backend::RedisStore;
pub use zone_data::ZoneData;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected value at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Invalid key pattern {0}")]
    InvalidPattern(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Redis(err.to_string())
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read-only view of a key-value store
///
/// The query path never writes, so implementations need no locking discipline
/// beyond what their backing client requires.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// GET a string key
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// HGET a single hash field
    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// HGETALL, as field/value pairs in the order the backend returns them
    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>>;

    /// LRANGE key 0 -1
    async fn lrange_all(&self, key: &str) -> StoreResult<Vec<String>>;

    /// All keys matching a glob pattern
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;
}
