//! # Validation Module
//!
//! Identifier allow-list for table and column names coming from
//! deployment configuration.
//!
//! ## Why an Allow-List?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where Identifiers Come From                          │
//! │                                                                         │
//! │  Values (barcode, keyword)  ──► always bound parameters ($1, $2, ...)  │
//! │                                                                         │
//! │  Identifiers (table/column) ──► cannot be bound in SQL                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  THIS MODULE: ^[A-Za-z_][A-Za-z0-9_]*$                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Quoted and spliced into statement text by pricecheck-db               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pricecheck_core::validation::{validate_identifier, TableRef};
//!
//! assert!(validate_identifier("schema.barcode_column", "barcode").is_ok());
//! assert!(validate_identifier("schema.barcode_column", "1barcode").is_err());
//!
//! let table = TableRef::parse("schema.product_table", "public.ptype").unwrap();
//! assert_eq!(table.schema(), Some("public"));
//! assert_eq!(table.name(), "ptype");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConfigError, ConfigResult};

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"));

// =============================================================================
// Identifiers
// =============================================================================

/// Returns true if `value` is a plain identifier (letters, digits,
/// underscore, not digit-first).
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(value)
}

/// Validates a column or function name.
///
/// ## Example
/// ```rust
/// use pricecheck_core::validation::validate_identifier;
///
/// assert!(validate_identifier("f", "RetailPrice").is_ok());
/// assert!(validate_identifier("f", "price]; --").is_err());
/// ```
pub fn validate_identifier(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::required(field));
    }

    if !is_valid_identifier(value) {
        return Err(ConfigError::invalid_identifier(field, value));
    }

    Ok(())
}

// =============================================================================
// Table References
// =============================================================================

/// A validated `table` or `schema.table` reference.
///
/// Both parts are folded to lower case, the way PostgreSQL folds unquoted
/// identifiers, so `PType` names the same relation in the catalog and in
/// quoted statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    schema: Option<String>,
    name: String,
}

impl TableRef {
    /// Parses a one- or two-part table name.
    ///
    /// Parts are trimmed and empty parts are dropped, so `" public . ptype "`
    /// parses the same as `public.ptype`.
    pub fn parse(field: &str, value: &str) -> ConfigResult<Self> {
        let parts: Vec<&str> = value
            .split('.')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        match parts.as_slice() {
            [] => Err(ConfigError::required(field)),
            [name] => {
                validate_identifier(field, name)
                    .map_err(|_| ConfigError::invalid_identifier(field, value))?;
                Ok(TableRef {
                    schema: None,
                    name: name.to_ascii_lowercase(),
                })
            }
            [schema, name] => {
                if !is_valid_identifier(schema) || !is_valid_identifier(name) {
                    return Err(ConfigError::invalid_identifier(field, value));
                }
                Ok(TableRef {
                    schema: Some(schema.to_ascii_lowercase()),
                    name: name.to_ascii_lowercase(),
                })
            }
            _ => Err(ConfigError::invalid_identifier(field, value)),
        }
    }

    /// Returns the schema part, if one was given.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Returns the bare table name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Returns `Some(trimmed)` for a non-blank optional setting.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
