//! # Error Types
//!
//! Configuration errors raised by pricecheck-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pricecheck-core (this file)                                           │
//! │  └── ConfigError   - Bad deployment configuration / unresolvable schema │
//! │                                                                         │
//! │  pricecheck-db                                                         │
//! │  └── DbError       - Store failures (timeout, connection, query)       │
//! │                                                                         │
//! │  pricecheck-lookup                                                     │
//! │  └── LookupError   - What the transport layer sees                     │
//! │                                                                         │
//! │  Flow: ConfigError → DbError::Configuration → LookupError::Configuration│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `ConfigError` is never retried. It is raised at startup validation or
//! on first use, when the live schema turns out not to support the
//! configuration (e.g. no candidate price column exists).

use thiserror::Error;

/// Deployment configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// A table or column name failed the identifier allow-list.
    ///
    /// ## When This Occurs
    /// - Name contains spaces, quotes, brackets or other punctuation
    /// - Name starts with a digit
    /// - Table name has more than two dot-separated parts
    #[error("{field} is not a valid identifier: '{value}'")]
    InvalidIdentifier { field: String, value: String },

    /// One half of a table/column pair is configured without the other.
    #[error("{configured} is configured but {missing} is not")]
    MissingPair { configured: String, missing: String },

    /// Neither a price table nor any candidate price field is configured.
    #[error("No price source configured: set schema.price_table or at least one schema.price_fields entry")]
    NoPriceSource,

    /// No way to match a barcode at all.
    #[error("No barcode source configured: set schema.barcode_table, schema.barcode_fields, or enable function fallback")]
    NoBarcodeSource,

    /// None of the candidate price fields exists on the product table.
    ///
    /// ## When This Occurs
    /// Raised per request when the live schema snapshot is resolved, not
    /// at startup: the columns are only known after introspection.
    #[error("No available price field found in {table} (candidates: {candidates:?})")]
    PriceFieldUnresolved {
        table: String,
        candidates: Vec<String>,
    },

    /// A join needs the product key column but the product table lacks it.
    #[error("{purpose} requires column {column} on {table}")]
    KeyColumnMissing {
        table: String,
        column: String,
        purpose: String,
    },

    /// Numeric setting is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Config file could not be read.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// Config file is not valid TOML for this shape.
    #[error("Failed to parse config: {0}")]
    ParseFailed(String),
}

impl ConfigError {
    /// Creates a Required error.
    pub fn required(field: impl Into<String>) -> Self {
        ConfigError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidIdentifier error.
    pub fn invalid_identifier(field: impl Into<String>, value: impl Into<String>) -> Self {
        ConfigError::InvalidIdentifier {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Convenience type alias for Results with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
