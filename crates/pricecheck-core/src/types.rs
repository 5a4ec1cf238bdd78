//! # Domain Types
//!
//! Row records read from the store and the result records handed to the
//! transport layer.
//!
//! ## Type Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Record Flow                                    │
//! │                                                                         │
//! │   Store rows (FromRow)              Results (serde + ts-rs)             │
//! │   ────────────────────              ───────────────────────             │
//! │                                                                         │
//! │   RawMatchRow ──┐                                                       │
//! │                 ├── ResultAssembler ──► LookupResult                   │
//! │   UnitRow[] ────┘                        ├── current_unit: ProductUnit? │
//! │                                          ├── units: ProductUnit[]       │
//! │                                          └── pricing: PricingMeta       │
//! │                                                                         │
//! │   SearchRow[] ──► rank_search_rows ──► SearchResultItem[]              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Optional Fields
//! Schema-dependent values stay `Option` end to end. A missing product key
//! is `None`, not `""`; a missing specification is `None`, not `""`.
//! Only product code and short code are plain strings: their projection
//! falls back to `''` so every statement has the same column list.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Raw Row Records
// =============================================================================

/// A single product row returned by one of the exact or fuzzy strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RawMatchRow {
    /// Product key. `None` when the product table has no key column.
    pub product_id: Option<String>,

    pub product_name: String,

    /// `pusercode`, or empty when the column is absent.
    pub product_code: String,

    /// `pnamepy`, or empty when the column is absent.
    pub product_short_code: String,

    pub specification: Option<String>,

    /// Price projected as integer cents.
    pub price_cents: i64,

    /// Unit id from the barcode cross-reference row, when that path matched.
    pub matched_unit_id: Option<String>,

    /// The barcode value that matched (or the keyword, for the fuzzy path).
    pub matched_barcode: String,
}

impl RawMatchRow {
    /// Returns the price as Money.
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the product key if it is present and non-blank.
    pub fn product_key(&self) -> Option<&str> {
        self.product_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// One unit of measure for a product, with its own price and barcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UnitRow {
    pub unit_id: String,
    pub unit_name: String,
    pub unit_rate: String,
    pub price_cents: i64,

    /// Comma-separated barcodes in cross-reference order.
    pub barcode_list: Option<String>,

    /// True when one of this unit's barcodes is the one that was scanned.
    pub is_matched_unit: bool,
}

/// One candidate row of a fragment search, before ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SearchRow {
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_code: String,
    pub product_short_code: String,
    pub specification: Option<String>,
    pub price_cents: i64,
    pub barcode: String,
    pub matched_by: String,

    /// 0 for a prefix match, 1 for a contains-only match.
    pub match_rank: i32,

    /// Position of the matching target in the target list.
    pub field_rank: i32,
}

// =============================================================================
// Result Records
// =============================================================================

/// A unit of measure as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductUnit {
    pub unit_id: String,
    pub unit_name: String,
    pub unit_rate: String,
    pub price: Money,
    pub barcodes: Vec<String>,
    pub is_matched_unit: bool,
}

/// Where the price on a result came from.
///
/// Lets the scanning client show whether the price is per unit and which
/// price type it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricingMeta {
    /// Price table when configured, otherwise the product table.
    pub source_table: String,

    /// Price column, or the candidate price fields joined with ` | `.
    pub source_field: String,

    pub unit_scoped: bool,

    pub price_type_id: Option<String>,
}

/// The assembled outcome of an exact (or fuzzy fallback) lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LookupResult {
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_code: String,
    pub product_short_code: String,
    pub specification: Option<String>,

    /// Current unit's price when a unit was selected, else the row price.
    pub price: Money,

    /// Label of the strategy or field that produced the match.
    pub matched_by: String,

    pub matched_barcode: String,
    pub current_unit: Option<ProductUnit>,
    pub units: Vec<ProductUnit>,
    pub pricing: PricingMeta,
}

/// One row of a fragment search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SearchResultItem {
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_code: String,
    pub product_short_code: String,
    pub specification: Option<String>,
    pub price: Money,
    pub barcode: String,
    pub matched_by: String,
}

impl From<SearchRow> for SearchResultItem {
    fn from(row: SearchRow) -> Self {
        SearchResultItem {
            product_id: row.product_id,
            product_name: row.product_name,
            product_code: row.product_code,
            product_short_code: row.product_short_code,
            specification: row.specification,
            price: Money::from_cents(row.price_cents),
            barcode: row.barcode,
            matched_by: row.matched_by,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_row(product_id: Option<&str>) -> RawMatchRow {
        RawMatchRow {
            product_id: product_id.map(String::from),
            product_name: "Jasmine Tea 500ml".to_string(),
            product_code: "T-001".to_string(),
            product_short_code: "JT".to_string(),
            specification: Some("500ml".to_string()),
            price_cents: 350,
            matched_unit_id: None,
            matched_barcode: "6925303714857".to_string(),
        }
    }

    #[test]
    fn test_product_key_ignores_blank() {
        assert_eq!(raw_row(Some("00012")).product_key(), Some("00012"));
        assert_eq!(raw_row(Some("   ")).product_key(), None);
        assert_eq!(raw_row(None).product_key(), None);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let item = SearchResultItem {
            product_id: Some("00012".to_string()),
            product_name: "Jasmine Tea".to_string(),
            product_code: String::new(),
            product_short_code: String::new(),
            specification: None,
            price: Money::from_cents(350),
            barcode: "6925303714857".to_string(),
            matched_by: "barcode".to_string(),
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productId"], "00012");
        assert_eq!(json["matchedBy"], "barcode");
        assert_eq!(json["price"], 350);
        assert!(json["specification"].is_null());
    }

    #[test]
    fn test_search_row_into_item() {
        let row = SearchRow {
            product_id: None,
            product_name: "Green Tea".to_string(),
            product_code: "G1".to_string(),
            product_short_code: "GT".to_string(),
            specification: None,
            price_cents: 1250,
            barcode: "123456".to_string(),
            matched_by: "pnamepy".to_string(),
            match_rank: 0,
            field_rank: 2,
        };

        let item = SearchResultItem::from(row);
        assert_eq!(item.price.cents(), 1250);
        assert_eq!(item.matched_by, "pnamepy");
    }
}
