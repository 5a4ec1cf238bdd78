//! # Unit Selection
//!
//! Converts unit rows into result units and picks the "current" unit.
//!
//! ## Current Unit Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (a) unit flagged is_matched_unit by the unit query                     │
//! │  (b) unit whose id equals the row's matched_unit_id (ignoring case)     │
//! │  (c) first unit in the list                                             │
//! │  (d) none                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::Money;
use crate::types::{ProductUnit, UnitRow};

/// Splits a comma-separated barcode list: trimmed, empties dropped, each
/// value once in first-seen order.
///
/// ## Example
/// ```rust
/// use pricecheck_core::units::parse_barcode_list;
///
/// assert_eq!(
///     parse_barcode_list(Some(" 111, 222,,111 ")),
///     vec!["111", "222"]
/// );
/// ```
pub fn parse_barcode_list(list: Option<&str>) -> Vec<String> {
    let mut barcodes: Vec<String> = Vec::new();
    for part in list.unwrap_or_default().split(',') {
        let part = part.trim();
        if !part.is_empty() && !barcodes.iter().any(|b| b == part) {
            barcodes.push(part.to_string());
        }
    }
    barcodes
}

impl From<UnitRow> for ProductUnit {
    fn from(row: UnitRow) -> Self {
        ProductUnit {
            barcodes: parse_barcode_list(row.barcode_list.as_deref()),
            unit_id: row.unit_id,
            unit_name: row.unit_name,
            unit_rate: row.unit_rate,
            price: Money::from_cents(row.price_cents),
            is_matched_unit: row.is_matched_unit,
        }
    }
}

/// Picks the current unit by the fixed precedence.
pub fn select_current_unit<'a>(
    units: &'a [ProductUnit],
    matched_unit_id: Option<&str>,
) -> Option<&'a ProductUnit> {
    if let Some(unit) = units.iter().find(|unit| unit.is_matched_unit) {
        return Some(unit);
    }

    let matched_unit_id = matched_unit_id.map(str::trim).filter(|id| !id.is_empty());
    if let Some(id) = matched_unit_id {
        if let Some(unit) = units
            .iter()
            .find(|unit| unit.unit_id.trim().eq_ignore_ascii_case(id))
        {
            return Some(unit);
        }
    }

    units.first()
}
