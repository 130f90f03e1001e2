//! Error types for the caching subsystem
//!
//! Provides unified error handling using thiserror.
//!
//! Three failure domains are kept apart on purpose:
//! - [`FetchError`] - an external lookup failed; surfaced unchanged to
//!   foreground callers, retried-then-dropped by the prefetch scheduler.
//! - [`StorageError`] - the durable tier failed; logged and never
//!   propagated, since the memory tier stays authoritative.
//! - [`CacheError`] - everything the operational HTTP surface can report.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tokio_rusqlite::rusqlite;

// == Fetch Error ==
/// Failure of an external lookup function.
///
/// Cloneable so a single coalesced fetch result can fan out to every
/// caller waiting on the same in-flight key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The upstream service returned an error response
    #[error("upstream lookup failed: {0}")]
    Upstream(String),

    /// The upstream service did not answer in time
    #[error("lookup timed out after {0} ms")]
    Timeout(u64),

    /// The upstream service refused the request due to rate limiting
    #[error("rate limited by upstream: {0}")]
    RateLimited(String),
}

// == Storage Error ==
/// Failure in the durable SQLite tier.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Schema migration failed to apply
    #[error("migration failed: {0}")]
    Migration(String),

    /// A stored row could not be decoded back into a cache entry
    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}

impl From<tokio_rusqlite::Error<StorageError>> for StorageError {
    fn from(err: tokio_rusqlite::Error<StorageError>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => {
                StorageError::Database(tokio_rusqlite::Error::ConnectionClosed)
            }
            tokio_rusqlite::Error::Close(c) => StorageError::Database(tokio_rusqlite::Error::Close(c)),
            _ => StorageError::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for StorageError {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        StorageError::Database(err)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(tokio_rusqlite::Error::Error(err))
    }
}

// == Cache Error ==
/// Unified error type for the operational surface and service lifecycle.
#[derive(Error, Debug)]
pub enum CacheError {
    /// External lookup failed on a foreground miss
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Durable tier failed during startup or an admin operation
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid request data
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Fetch(_) => StatusCode::BAD_GATEWAY,
            CacheError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;
