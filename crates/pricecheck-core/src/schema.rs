//! # Schema Snapshot
//!
//! A time-boxed view of which columns exist on the product table and
//! whether the legacy barcode function is installed.
//!
//! Snapshots are immutable. A refresh builds a new one and swaps it in;
//! nothing ever edits a snapshot that a request might be reading.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Introspected product table shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSnapshot {
    /// Lowercased column name → actual spelling in the store.
    columns: HashMap<String, String>,
    has_barcode_function: bool,
    expires_at: DateTime<Utc>,
}

impl SchemaSnapshot {
    /// Builds a snapshot from introspected column names.
    ///
    /// Column names are matched case-insensitively. If the store reports
    /// two spellings of one name, the first one wins.
    pub fn new<I, S>(columns: I, has_barcode_function: bool, expires_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = HashMap::new();
        for column in columns {
            let column = column.into();
            map.entry(column.to_lowercase()).or_insert(column);
        }

        SchemaSnapshot {
            columns: map,
            has_barcode_function,
            expires_at,
        }
    }

    /// Returns true if the product table has this column (any case).
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(&name.trim().to_lowercase())
    }

    /// Returns the store's spelling of a column, if present.
    pub fn column(&self, name: &str) -> Option<&str> {
        self.columns.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// All column names, sorted, in the store's spelling.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.values().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_barcode_function(&self) -> bool {
        self.has_barcode_function
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true while `now` is before the expiry.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
