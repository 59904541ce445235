//! Error types for swcache.
//!
//! Cache, lifecycle, and worker operations return `CacheResult<T>`.
//! Network failures carry their own [`FetchError`] and convert into
//! [`CacheError::Fetch`] where they cross into cache operations.

use thiserror::Error;

use crate::net::FetchError;
use crate::worker::WorkerState;

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode cache entry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    #[error("Request method {0} cannot be cached")]
    UnsupportedMethod(String),

    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Manifest lists {0} more than once")]
    DuplicateEntry(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Cannot {operation} while worker is {state}")]
    InvalidState {
        operation: &'static str,
        state: WorkerState,
    },
}
