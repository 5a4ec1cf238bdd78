//! # Lookup Errors
//!
//! What the transport layer sees.
//!
//! ## Mapping
//! ```text
//! ConfigError                 → LookupError::Configuration  (fatal, fix config)
//! DbError::Configuration      → LookupError::Configuration
//! DbError::Cancelled          → LookupError::Cancelled
//! DbError (anything else)     → LookupError::Store          (maybe transient)
//! ```
//!
//! Not-found and rejected input are not errors: `lookup` returns `Ok(None)`
//! and `search` returns an empty list.

use pricecheck_core::ConfigError;
use pricecheck_db::DbError;
use thiserror::Error;

/// Resolution errors.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// The configuration does not fit the live schema.
    ///
    /// ## When This Occurs
    /// - No price table and none of the price fields exist
    /// - A configured name fails the identifier allow-list
    /// - The product name or key column is missing where it is needed
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The store failed (connection, timeout, query error).
    #[error("Store error: {0}")]
    Store(DbError),

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
}

impl LookupError {
    /// True for store failures a caller may reasonably try again.
    pub fn is_transient(&self) -> bool {
        match self {
            LookupError::Store(err) => err.is_transient(),
            LookupError::Configuration(_) | LookupError::Cancelled => false,
        }
    }
}

impl From<DbError> for LookupError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Configuration(config) => LookupError::Configuration(config),
            DbError::Cancelled => LookupError::Cancelled,
            other => LookupError::Store(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, LookupError>;
