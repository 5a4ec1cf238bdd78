//! # Deployment Configuration
//!
//! Static description of the target schema shape and engine settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PRICECHECK_DATABASE_URL=postgres://reader@db/retail                │
//! │     PRICECHECK_QUERY_TIMEOUT_SECS=10                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pricecheck/pricecheck.toml (Linux)                       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     product_table = "ptype", price_fields = [retailprice, ...]         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module never touches the file system or the process environment.
//! The host reads the file and hands the text to [`DeploymentConfig::from_toml_str`],
//! then passes an environment lookup closure to
//! [`DeploymentConfig::apply_overrides`].
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! url = "postgres://reader@localhost/retail"
//! max_connections = 10
//!
//! [schema]
//! product_table = "public.ptype"
//! barcode_table = "xw_ptypebarcode"
//! barcode_column = "barcode"
//! price_table = "xw_p_ptypeprice"
//! price_column = "price"
//! price_type_id = "0001"
//! unit_table = "xw_ptypeunit"
//!
//! [lookup]
//! enable_function_fallback = true
//! schema_cache_minutes = 10
//! query_timeout_secs = 15
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::types::PricingMeta;
use crate::validation::{non_blank, validate_identifier, TableRef};
use crate::DEFAULT_PRICE_TYPE_ID;

/// Price table name whose rows are keyed per product unit.
const UNIT_SCOPED_PRICE_TABLE: &str = "xw_p_ptypeprice";

/// Upper bound for `lookup.query_timeout_secs`.
pub const MAX_QUERY_TIMEOUT_SECS: i64 = 120;

// =============================================================================
// Database Settings
// =============================================================================

/// Connection settings for the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Connection string. Read-only credentials are recommended.
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long to wait for a pooled connection (seconds).
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

// =============================================================================
// Schema Layout
// =============================================================================

/// Names of the tables and columns this deployment stores products in.
///
/// ## Barcode and Price Sources
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                     Where a Barcode Can Live                            │
/// │                                                                         │
/// │  barcode_table + barcode_column   cross-reference table (per unit)     │
/// │  barcode_fields                   candidate columns on product_table   │
/// │  legacy_function                  fn(B, key, 0) computed per row       │
/// │                                                                         │
/// │                      Where a Price Can Live                             │
/// │                                                                         │
/// │  price_table + price_column       joined on product key                │
/// │                                   (per unit if unit scoped)            │
/// │  price_fields                     first candidate present in schema    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaLayout {
    /// Product table, `table` or `schema.table`.
    #[serde(default = "default_product_table")]
    pub product_table: String,

    /// Primary key column on the product table.
    #[serde(default = "default_product_key_field")]
    pub product_key_field: String,

    #[serde(default = "default_product_name_field")]
    pub product_name_field: String,

    /// Projected as the specification when present in the schema.
    #[serde(default = "default_specification_field")]
    pub specification_field: Option<String>,

    /// Candidate barcode columns, tried in order.
    #[serde(default = "default_barcode_fields")]
    pub barcode_fields: Vec<String>,

    /// Candidate price columns; the first one present in the schema wins.
    #[serde(default = "default_price_fields")]
    pub price_fields: Vec<String>,

    #[serde(default)]
    pub barcode_table: Option<String>,

    #[serde(default)]
    pub barcode_column: Option<String>,

    #[serde(default)]
    pub price_table: Option<String>,

    #[serde(default)]
    pub price_column: Option<String>,

    /// Preferred price type on a unit-scoped price table.
    #[serde(default)]
    pub price_type_id: Option<String>,

    /// Unit table. Units are only listed when this, the barcode table and
    /// the price table are all configured.
    #[serde(default)]
    pub unit_table: Option<String>,

    /// Forces unit-scoped pricing on or off. Detected from the price table
    /// name when unset.
    #[serde(default)]
    pub price_unit_scoped: Option<bool>,

    /// Database-side function deriving a barcode from a product key.
    #[serde(default = "default_legacy_function")]
    pub legacy_function: String,
}

fn default_product_table() -> String {
    "ptype".to_string()
}

fn default_product_key_field() -> String {
    "ptypeid".to_string()
}

fn default_product_name_field() -> String {
    "pfullname".to_string()
}

fn default_specification_field() -> Option<String> {
    Some("standard".to_string())
}

fn default_barcode_fields() -> Vec<String> {
    vec!["standard".to_string(), "barcode".to_string()]
}

fn default_price_fields() -> Vec<String> {
    vec![
        "retailprice".to_string(),
        "price1".to_string(),
        "price".to_string(),
    ]
}

fn default_legacy_function() -> String {
    "fn_strunitptype".to_string()
}

impl Default for SchemaLayout {
    fn default() -> Self {
        SchemaLayout {
            product_table: default_product_table(),
            product_key_field: default_product_key_field(),
            product_name_field: default_product_name_field(),
            specification_field: default_specification_field(),
            barcode_fields: default_barcode_fields(),
            price_fields: default_price_fields(),
            barcode_table: None,
            barcode_column: None,
            price_table: None,
            price_column: None,
            price_type_id: None,
            unit_table: None,
            price_unit_scoped: None,
            legacy_function: default_legacy_function(),
        }
    }
}

impl SchemaLayout {
    /// Parsed product table reference.
    pub fn product_table_ref(&self) -> ConfigResult<TableRef> {
        TableRef::parse("schema.product_table", &self.product_table)
    }

    /// Barcode cross-reference table and column, when both are set.
    pub fn barcode_source(&self) -> ConfigResult<Option<(TableRef, &str)>> {
        match (non_blank(&self.barcode_table), non_blank(&self.barcode_column)) {
            (Some(table), Some(column)) => {
                let table = TableRef::parse("schema.barcode_table", table)?;
                validate_identifier("schema.barcode_column", column)?;
                Ok(Some((table, column)))
            }
            _ => Ok(None),
        }
    }

    /// Price table and column, when both are set.
    pub fn price_source(&self) -> ConfigResult<Option<(TableRef, &str)>> {
        match (non_blank(&self.price_table), non_blank(&self.price_column)) {
            (Some(table), Some(column)) => {
                let table = TableRef::parse("schema.price_table", table)?;
                validate_identifier("schema.price_column", column)?;
                Ok(Some((table, column)))
            }
            _ => Ok(None),
        }
    }

    /// Parsed unit table reference, when set.
    pub fn unit_table_ref(&self) -> ConfigResult<Option<TableRef>> {
        non_blank(&self.unit_table)
            .map(|table| TableRef::parse("schema.unit_table", table))
            .transpose()
    }

    /// Returns true when a price table is configured.
    pub fn has_price_table(&self) -> bool {
        non_blank(&self.price_table).is_some()
    }

    /// Returns true when a barcode cross-reference table is configured.
    pub fn has_barcode_table(&self) -> bool {
        non_blank(&self.barcode_table).is_some()
    }

    /// Returns the barcode label reported when the cross-reference table
    /// matched.
    pub fn barcode_table_label(&self) -> &str {
        non_blank(&self.barcode_column).unwrap_or(crate::BARCODE_TABLE_LABEL)
    }

    /// Whether the price table holds one row per product unit.
    pub fn is_price_unit_scoped(&self) -> bool {
        if let Some(forced) = self.price_unit_scoped {
            return forced;
        }

        non_blank(&self.price_table)
            .and_then(|table| TableRef::parse("schema.price_table", table).ok())
            .map(|table| table.name().eq_ignore_ascii_case(UNIT_SCOPED_PRICE_TABLE))
            .unwrap_or(false)
    }

    /// Preferred price type, or the default type when unset.
    pub fn preferred_price_type_id(&self) -> &str {
        non_blank(&self.price_type_id).unwrap_or(DEFAULT_PRICE_TYPE_ID)
    }

    /// Describes where prices come from for this deployment.
    pub fn pricing_meta(&self) -> PricingMeta {
        let source_table = non_blank(&self.price_table)
            .unwrap_or(self.product_table.trim())
            .to_string();

        let source_field = match non_blank(&self.price_column) {
            Some(column) => column.to_string(),
            None => self
                .price_fields
                .iter()
                .map(|field| field.trim())
                .filter(|field| !field.is_empty())
                .collect::<Vec<_>>()
                .join(" | "),
        };

        PricingMeta {
            source_table,
            source_field,
            unit_scoped: self.has_barcode_table() && self.has_price_table(),
            price_type_id: non_blank(&self.price_type_id).map(String::from),
        }
    }
}

// =============================================================================
// Lookup Settings
// =============================================================================

/// Engine behavior settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupSettings {
    /// Allow the legacy barcode function path.
    #[serde(default = "default_true")]
    pub enable_function_fallback: bool,

    /// Schema snapshot time-to-live (minutes). Values below 1 count as 1.
    #[serde(default = "default_schema_cache_minutes")]
    pub schema_cache_minutes: i64,

    /// Per-call query timeout (seconds), 1..=120.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: i64,

    /// Operations slower than this are logged as warnings.
    #[serde(default = "default_slow_query_threshold")]
    pub slow_query_threshold_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_schema_cache_minutes() -> i64 {
    10
}

fn default_query_timeout() -> i64 {
    15
}

fn default_slow_query_threshold() -> u64 {
    300
}

impl Default for LookupSettings {
    fn default() -> Self {
        LookupSettings {
            enable_function_fallback: true,
            schema_cache_minutes: default_schema_cache_minutes(),
            query_timeout_secs: default_query_timeout(),
            slow_query_threshold_ms: default_slow_query_threshold(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete deployment configuration. Immutable once validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub schema: SchemaLayout,

    #[serde(default)]
    pub lookup: LookupSettings,
}

impl DeploymentConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies overrides from an environment-style lookup.
    ///
    /// ## Recognized Keys
    /// - `PRICECHECK_DATABASE_URL`
    /// - `PRICECHECK_PRODUCT_TABLE`
    /// - `PRICECHECK_QUERY_TIMEOUT_SECS`
    /// - `PRICECHECK_FUNCTION_FALLBACK` (`true`/`false`/`1`/`0`)
    /// - `PRICECHECK_SCHEMA_CACHE_MINUTES`
    ///
    /// Returns the names of the keys that were applied.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<Vec<&'static str>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(url) = lookup("PRICECHECK_DATABASE_URL") {
            self.database.url = url;
            applied.push("PRICECHECK_DATABASE_URL");
        }

        if let Some(table) = lookup("PRICECHECK_PRODUCT_TABLE") {
            self.schema.product_table = table;
            applied.push("PRICECHECK_PRODUCT_TABLE");
        }

        if let Some(raw) = lookup("PRICECHECK_QUERY_TIMEOUT_SECS") {
            self.lookup.query_timeout_secs = parse_override("PRICECHECK_QUERY_TIMEOUT_SECS", &raw)?;
            applied.push("PRICECHECK_QUERY_TIMEOUT_SECS");
        }

        if let Some(raw) = lookup("PRICECHECK_FUNCTION_FALLBACK") {
            self.lookup.enable_function_fallback = match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ConfigError::ParseFailed(format!(
                        "PRICECHECK_FUNCTION_FALLBACK: expected true or false, got '{}'",
                        other
                    )))
                }
            };
            applied.push("PRICECHECK_FUNCTION_FALLBACK");
        }

        if let Some(raw) = lookup("PRICECHECK_SCHEMA_CACHE_MINUTES") {
            self.lookup.schema_cache_minutes =
                parse_override("PRICECHECK_SCHEMA_CACHE_MINUTES", &raw)?;
            applied.push("PRICECHECK_SCHEMA_CACHE_MINUTES");
        }

        Ok(applied)
    }

    /// Validates the configuration at startup.
    ///
    /// ## Checks
    /// - required: database url, product table, product name field
    /// - every configured identifier passes the allow-list
    /// - table/column pairs are complete
    /// - at least one price source and one barcode source
    /// - numeric settings in range
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::required("database.url"));
        }

        let schema = &self.schema;
        schema.product_table_ref()?;
        validate_identifier("schema.product_name_field", schema.product_name_field.trim())?;
        validate_identifier("schema.product_key_field", schema.product_key_field.trim())?;
        validate_identifier("schema.legacy_function", schema.legacy_function.trim())?;

        if let Some(field) = non_blank(&schema.specification_field) {
            validate_identifier("schema.specification_field", field)?;
        }

        for field in schema.barcode_fields.iter().filter(|f| !f.trim().is_empty()) {
            validate_identifier("schema.barcode_fields", field.trim())?;
        }

        for field in schema.price_fields.iter().filter(|f| !f.trim().is_empty()) {
            validate_identifier("schema.price_fields", field.trim())?;
        }

        check_pair(
            &schema.barcode_table,
            "schema.barcode_table",
            &schema.barcode_column,
            "schema.barcode_column",
        )?;
        check_pair(
            &schema.price_table,
            "schema.price_table",
            &schema.price_column,
            "schema.price_column",
        )?;
        schema.barcode_source()?;
        schema.price_source()?;
        schema.unit_table_ref()?;

        let has_price_field = schema.price_fields.iter().any(|f| !f.trim().is_empty());
        if !schema.has_price_table() && !has_price_field {
            return Err(ConfigError::NoPriceSource);
        }

        let has_barcode_field = schema.barcode_fields.iter().any(|f| !f.trim().is_empty());
        if !schema.has_barcode_table() && !has_barcode_field && !self.lookup.enable_function_fallback
        {
            return Err(ConfigError::NoBarcodeSource);
        }

        if self.lookup.schema_cache_minutes < 0 {
            return Err(ConfigError::OutOfRange {
                field: "lookup.schema_cache_minutes".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }

        if !(1..=MAX_QUERY_TIMEOUT_SECS).contains(&self.lookup.query_timeout_secs) {
            return Err(ConfigError::OutOfRange {
                field: "lookup.query_timeout_secs".to_string(),
                min: 1,
                max: MAX_QUERY_TIMEOUT_SECS,
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::OutOfRange {
                field: "database.max_connections".to_string(),
                min: 1,
                max: u32::MAX as i64,
            });
        }

        Ok(())
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Schema snapshot time-to-live, never less than one minute.
    pub fn schema_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lookup.schema_cache_minutes.max(1))
    }

    /// Per-call query timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup.query_timeout_secs.clamp(1, MAX_QUERY_TIMEOUT_SECS) as u64)
    }

    /// Latency above which an operation is logged as slow.
    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.lookup.slow_query_threshold_ms)
    }

    /// Pool acquire timeout.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.database.acquire_timeout_secs)
    }
}

fn check_pair(
    first: &Option<String>,
    first_name: &str,
    second: &Option<String>,
    second_name: &str,
) -> ConfigResult<()> {
    if non_blank(first).is_some() && non_blank(second).is_none() {
        return Err(ConfigError::MissingPair {
            configured: first_name.to_string(),
            missing: second_name.to_string(),
        });
    }
    Ok(())
}

fn parse_override(key: &str, raw: &str) -> ConfigResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::ParseFailed(format!("{}: expected an integer, got '{}'", key, raw)))
}

// =============================================================================
// Unit Tests
// =============================================================================
