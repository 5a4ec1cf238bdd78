//! # Database Error Types
//!
//! Error types for store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  PostgreSQL Error (sqlx::Error)      ConfigError (pricecheck-core)     │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LookupError (pricecheck-lookup) ← What the transport layer maps       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate retries. A transient error goes straight back to
//! the caller.

use pricecheck_core::ConfigError;
use thiserror::Error;

/// PostgreSQL SQLSTATE raised when `statement_timeout` fires.
const SQLSTATE_QUERY_CANCELED: &str = "57014";

/// Store operation errors.
#[derive(Debug, Clone, Error)]
pub enum DbError {
    /// The configuration does not fit the live schema.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Host unreachable or refusing connections
    /// - Bad credentials
    /// - Connection dropped mid-query
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - A configured column has an unexpected type
    /// - The legacy function raised an error
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The per-call timeout (client or server side) elapsed.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a Timeout error.
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        DbError::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Returns true for failures a caller may reasonably try again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_) | DbError::Timeout { .. } | DbError::PoolExhausted
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database (57014) → DbError::Timeout (statement_timeout)
/// sqlx::Error::Database (other) → DbError::QueryFailed
/// sqlx::Error::Io / Tls         → DbError::ConnectionFailed
/// sqlx::Error::PoolTimedOut     → DbError::PoolExhausted
/// sqlx::Error::PoolClosed       → DbError::ConnectionFailed
/// Other                         → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                if db_err.code().as_deref() == Some(SQLSTATE_QUERY_CANCELED) {
                    DbError::timeout("Statement", 0)
                } else {
                    DbError::QueryFailed(db_err.message().to_string())
                }
            }

            sqlx::Error::Io(io_err) => DbError::ConnectionFailed(io_err.to_string()),

            sqlx::Error::Tls(tls_err) => DbError::ConnectionFailed(tls_err.to_string()),

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
