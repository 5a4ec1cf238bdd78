//! Identifier quoting.

use pricecheck_core::validation::{is_valid_identifier, TableRef};
use pricecheck_core::{ConfigError, ConfigResult};

/// Quotes a column or function name after checking the allow-list.
///
/// ## Example
/// ```rust
/// use pricecheck_db::sql::ident::quote_ident;
///
/// assert_eq!(quote_ident("PFullName").unwrap(), "\"PFullName\"");
/// assert!(quote_ident("name\"; --").is_err());
/// ```
pub fn quote_ident(name: &str) -> ConfigResult<String> {
    let name = name.trim();
    if !is_valid_identifier(name) {
        return Err(ConfigError::invalid_identifier("identifier", name));
    }
    Ok(format!("\"{}\"", name))
}

/// Quotes a validated table reference, e.g. `"public"."ptype"`.
pub fn quote_table(table: &TableRef) -> String {
    match table.schema() {
        Some(schema) => format!("\"{}\".\"{}\"", schema, table.name()),
        None => format!("\"{}\"", table.name()),
    }
}

/// `alias."column"`, with the column checked.
pub fn qualified(alias: &str, column: &str) -> ConfigResult<String> {
    Ok(format!("{}.{}", alias, quote_ident(column)?))
}
