//! # Lookup Context
//!
//! Per-request view of what the configuration can actually use, given the
//! current schema snapshot.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DeploymentConfig ──┐                                                   │
//! │                     ├── LookupContext::resolve ──► LookupContext        │
//! │  SchemaSnapshot ────┘                                                   │
//! │                                                                         │
//! │  price            price table (needs key column)                        │
//! │                   else first price field present in schema              │
//! │                   else ConfigError::PriceFieldUnresolved                │
//! │  specification    configured field if present, else None                │
//! │  barcode_fields   configured fields present in schema, order kept       │
//! │  barcode_table    configured pair AND key column present                │
//! │  function         fallback enabled AND function exists AND key present  │
//! │  unit_table       barcode table usable AND price table AND unit table   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Column names carried here use the store's own spelling so the SQL
//! builder can quote them as-is.

use std::sync::Arc;

use crate::config::DeploymentConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::SchemaSnapshot;
use crate::validation::{non_blank, TableRef};
use crate::{PRODUCT_CODE_FIELD, PRODUCT_SHORT_CODE_FIELD};

// =============================================================================
// Price Source
// =============================================================================

/// Where a lookup reads its price from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceSource {
    /// Joined price table.
    Table {
        table: TableRef,
        column: String,
        /// One row per product unit; pick by preferred price type.
        unit_scoped: bool,
        price_type_id: String,
    },

    /// A column on the product table.
    Column(String),
}

impl PriceSource {
    pub fn is_table(&self) -> bool {
        matches!(self, PriceSource::Table { .. })
    }

    /// The product-table price column, when price comes from the product
    /// table.
    pub fn column(&self) -> Option<&str> {
        match self {
            PriceSource::Column(column) => Some(column),
            PriceSource::Table { .. } => None,
        }
    }
}

/// Usable barcode cross-reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeTable {
    pub table: TableRef,
    pub column: String,
    /// Label reported when this table matched.
    pub label: String,
}

// =============================================================================
// Lookup Context
// =============================================================================

/// Everything a strategy needs to know about the live schema.
#[derive(Debug, Clone)]
pub struct LookupContext {
    pub snapshot: Arc<SchemaSnapshot>,
    pub product_table: TableRef,

    /// Key column, `None` when the product table has no such column.
    pub product_key: Option<String>,

    pub product_name: String,
    pub price: PriceSource,
    pub specification_field: Option<String>,

    /// Configured barcode fields present in the schema, in configured order.
    pub barcode_fields: Vec<String>,

    pub barcode_table: Option<BarcodeTable>,
    pub unit_table: Option<TableRef>,

    /// Legacy function name, when the function path is usable.
    pub function: Option<String>,

    pub product_code_field: Option<String>,
    pub product_short_code_field: Option<String>,
}

impl LookupContext {
    /// Resolves the configuration against a snapshot.
    ///
    /// ## Errors
    /// - `PriceFieldUnresolved`: no price table and no candidate price
    ///   column exists on the product table
    /// - `KeyColumnMissing`: a price table is configured but the product
    ///   table has no key column to join on, or the name column is missing
    /// - `InvalidIdentifier`: a configured name fails the allow-list
    pub fn resolve(config: &DeploymentConfig, snapshot: Arc<SchemaSnapshot>) -> ConfigResult<Self> {
        let schema = &config.schema;
        let product_table = schema.product_table_ref()?;

        let product_key = snapshot.column(&schema.product_key_field).map(String::from);

        let product_name = snapshot
            .column(&schema.product_name_field)
            .map(String::from)
            .ok_or_else(|| ConfigError::KeyColumnMissing {
                table: product_table.to_string(),
                column: schema.product_name_field.trim().to_string(),
                purpose: "Product lookup".to_string(),
            })?;

        let price = match schema.price_source()? {
            Some((table, column)) => {
                if product_key.is_none() {
                    return Err(ConfigError::KeyColumnMissing {
                        table: product_table.to_string(),
                        column: schema.product_key_field.trim().to_string(),
                        purpose: "Price table join".to_string(),
                    });
                }
                PriceSource::Table {
                    table,
                    column: column.to_string(),
                    unit_scoped: schema.is_price_unit_scoped(),
                    price_type_id: schema.preferred_price_type_id().to_string(),
                }
            }
            None => schema
                .price_fields
                .iter()
                .find_map(|field| snapshot.column(field))
                .map(|column| PriceSource::Column(column.to_string()))
                .ok_or_else(|| ConfigError::PriceFieldUnresolved {
                    table: product_table.to_string(),
                    candidates: schema.price_fields.clone(),
                })?,
        };

        let specification_field = non_blank(&schema.specification_field)
            .and_then(|field| snapshot.column(field))
            .map(String::from);

        let mut barcode_fields: Vec<String> = Vec::new();
        for field in &schema.barcode_fields {
            if let Some(column) = snapshot.column(field) {
                if !barcode_fields.iter().any(|f| f.eq_ignore_ascii_case(column)) {
                    barcode_fields.push(column.to_string());
                }
            }
        }

        let barcode_table = match schema.barcode_source()? {
            Some((table, column)) if product_key.is_some() => Some(BarcodeTable {
                table,
                column: column.to_string(),
                label: schema.barcode_table_label().to_string(),
            }),
            _ => None,
        };

        let unit_table = match (&barcode_table, &price) {
            (Some(_), PriceSource::Table { .. }) => schema.unit_table_ref()?,
            _ => None,
        };

        let function = (config.lookup.enable_function_fallback
            && snapshot.has_barcode_function()
            && product_key.is_some())
        .then(|| schema.legacy_function.trim().to_string());

        Ok(LookupContext {
            product_code_field: snapshot.column(PRODUCT_CODE_FIELD).map(String::from),
            product_short_code_field: snapshot.column(PRODUCT_SHORT_CODE_FIELD).map(String::from),
            snapshot,
            product_table,
            product_key,
            product_name,
            price,
            specification_field,
            barcode_fields,
            barcode_table,
            unit_table,
            function,
        })
    }

    /// Whether the barcode cross-reference table path is usable.
    pub fn use_barcode_table(&self) -> bool {
        self.barcode_table.is_some()
    }

    /// Whether the legacy function path is usable.
    pub fn can_use_function_fallback(&self) -> bool {
        self.function.is_some()
    }

    /// Label reported for a legacy function match, e.g. `fn_strunitptype(B)`.
    pub fn function_label(&self) -> Option<String> {
        self.function.as_ref().map(|name| format!("{}(B)", name))
    }

    /// Whether units can be listed for a matched product.
    pub fn lists_units(&self) -> bool {
        self.unit_table.is_some()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
