//! # Query Expression Builder
//!
//! Schema-adapted SQL, built from configuration and the schema snapshot.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      How a Statement Is Built                           │
//! │                                                                         │
//! │  ident.rs       quote_ident / quote_table                               │
//! │                 allow-list checked, double-quoted                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  expr.rs        price / specification / code projections,               │
//! │                 price joins, composite keyword, LIKE patterns           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  statements.rs  complete SELECTs + ordered bind list                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqlStatement { sql: "... WHERE bc.\"barcode\" = $1", binds: [..] }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Request input (candidate barcodes, keywords, product ids) only ever
//! enters a statement through [`StatementBuilder::bind_text`]. Identifiers
//! only enter through the quoting helpers.

pub mod expr;
pub mod ident;
pub mod statements;

/// A value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Text(String),
    Int(i64),
}

/// A finished statement: SQL text plus binds in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// Collects binds while a statement is being assembled.
#[derive(Debug, Default)]
pub struct StatementBuilder {
    binds: Vec<BindValue>,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text bind and returns its placeholder.
    pub fn bind_text(&mut self, value: impl Into<String>) -> String {
        self.binds.push(BindValue::Text(value.into()));
        format!("${}", self.binds.len())
    }

    /// Adds an integer bind and returns its placeholder.
    pub fn bind_int(&mut self, value: i64) -> String {
        self.binds.push(BindValue::Int(value));
        format!("${}", self.binds.len())
    }

    /// Finishes the statement.
    pub fn finish(self, sql: String) -> SqlStatement {
        SqlStatement {
            sql,
            binds: self.binds,
        }
    }
}
