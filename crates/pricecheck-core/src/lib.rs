//! # pricecheck-core: Pure Rules for Barcode Resolution
//!
//! Types and pure functions shared by the database layer and the lookup
//! engine. Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Pricecheck Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Host (CLI / transport layer)                    │   │
//! │  │           lookup <barcode>, search <keyword> [limit]            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            pricecheck-lookup (strategy chain, service)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         pricecheck-db (PostgreSQL, SQL builder, cache)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ pricecheck-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   config   barcode   schema   context   search   units   types  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Deployment configuration, overrides and validation
//! - [`barcode`] - Barcode candidate normalizer (GS1 / GTIN variants)
//! - [`schema`] - Immutable schema snapshot
//! - [`context`] - Per-request lookup context resolution
//! - [`search`] - Search limits, targets and ranking
//! - [`units`] - Unit conversion and current-unit selection
//! - [`types`] - Row and result records
//! - [`money`] - Integer money
//! - [`validation`] - Identifier allow-list
//! - [`error`] - Configuration errors
//!
//! ## Example Usage
//!
//! ```rust
//! use pricecheck_core::barcode::build_candidates;
//!
//! let candidates = build_candidates("(01)06923644237943");
//! assert_eq!(candidates.last().map(String::as_str), Some("6923644237943"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod barcode;
pub mod config;
pub mod context;
pub mod error;
pub mod money;
pub mod schema;
pub mod search;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::{DatabaseSettings, DeploymentConfig, LookupSettings, SchemaLayout};
pub use context::{BarcodeTable, LookupContext, PriceSource};
pub use error::{ConfigError, ConfigResult};
pub use money::Money;
pub use schema::SchemaSnapshot;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Label reported when the cross-reference table matched and no barcode
/// column name is configured.
pub const BARCODE_TABLE_LABEL: &str = "BarcodeTable";

/// Label reported by the legacy composite-keyword strategy.
pub const COMPOSITE_LABEL: &str = "LegacyCompositeLike";

/// Product code column, projected when present.
pub const PRODUCT_CODE_FIELD: &str = "pusercode";

/// Short (phonetic) code column, projected when present.
pub const PRODUCT_SHORT_CODE_FIELD: &str = "pnamepy";

/// Columns concatenated into the legacy composite keyword, in order.
pub const COMPOSITE_FIELDS: [&str; 6] = ["pusercode", "pfullname", "pnamepy", "standard", "type", "area"];

/// Separator between composite keyword parts.
pub const COMPOSITE_SEPARATOR: &str = "^^^";

/// A candidate needs at least this many digits to reach the composite path.
pub const COMPOSITE_MIN_DIGITS: usize = 8;

/// Price type used when no preferred type is configured.
pub const DEFAULT_PRICE_TYPE_ID: &str = "0001";

/// Keywords shorter than this are rejected before any I/O.
pub const MIN_SEARCH_KEYWORD_LENGTH: usize = 2;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

pub const MAX_SEARCH_LIMIT: usize = 50;
