//! # Fragment Search Rules
//!
//! Limits, search targets and result ranking for fragment search.
//!
//! ## Ranking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sort key: (match_rank, field_rank, barcode)                            │
//! │                                                                         │
//! │  match_rank   0 = value starts with keyword, 1 = only contains it       │
//! │  field_rank   index of the target in build_search_targets order         │
//! │  barcode      ascending text                                            │
//! │                                                                         │
//! │  Then: keep the best row per product, truncate to the limit.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store already orders and limits, but ranking is applied again here
//! so the result invariants hold for any [`SearchRow`] source.

use std::collections::HashSet;

use crate::context::LookupContext;
use crate::types::{SearchResultItem, SearchRow};
use crate::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

/// Normalizes a requested limit: non-positive → default, capped at max.
///
/// ## Example
/// ```rust
/// use pricecheck_core::search::normalize_limit;
///
/// assert_eq!(normalize_limit(0), 20);
/// assert_eq!(normalize_limit(200), 50);
/// assert_eq!(normalize_limit(7), 7);
/// ```
pub fn normalize_limit(limit: i64) -> usize {
    if limit <= 0 {
        return DEFAULT_SEARCH_LIMIT;
    }
    (limit as u64).min(MAX_SEARCH_LIMIT as u64) as usize
}

// =============================================================================
// Search Targets
// =============================================================================

/// What a search target is and which barcode a match on it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTargetKind {
    /// The cross-reference table's barcode column; reports itself.
    CrossReference,

    /// A barcode column on the product table; reports itself.
    BarcodeField,

    /// A descriptive column (short code, code, name). Reports the
    /// cross-reference barcode when searching that table, else the
    /// product's preferred barcode.
    Descriptive,
}

/// A column the keyword is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    /// Column name in the store's spelling.
    pub column: String,
    pub kind: SearchTargetKind,
    /// Reported as `matched_by` on result items.
    pub label: String,
}

/// Builds the ordered search targets for a context.
///
/// Order: cross-reference column (if usable) or the schema-present barcode
/// fields, then short code, product code and product name when present.
/// Returns an empty list when there is no barcode source to report.
pub fn build_search_targets(context: &LookupContext) -> Vec<SearchTarget> {
    let mut targets = Vec::new();

    match &context.barcode_table {
        Some(barcode_table) => targets.push(SearchTarget {
            column: barcode_table.column.clone(),
            kind: SearchTargetKind::CrossReference,
            label: barcode_table.label.clone(),
        }),
        None => {
            for field in &context.barcode_fields {
                targets.push(SearchTarget {
                    column: field.clone(),
                    kind: SearchTargetKind::BarcodeField,
                    label: field.clone(),
                });
            }
        }
    }

    if targets.is_empty() {
        return targets;
    }

    let descriptive = [
        context.product_short_code_field.as_deref(),
        context.product_code_field.as_deref(),
        Some(context.product_name.as_str()),
    ];

    for column in descriptive.into_iter().flatten() {
        let duplicate = targets.iter().any(|target| {
            target.kind != SearchTargetKind::CrossReference
                && target.column.eq_ignore_ascii_case(column)
        });
        if !duplicate {
            targets.push(SearchTarget {
                column: column.to_string(),
                kind: SearchTargetKind::Descriptive,
                label: column.to_string(),
            });
        }
    }

    targets
}

// =============================================================================
// Ranking
// =============================================================================

/// Orders, de-duplicates per product and truncates search rows.
///
/// Rows without a barcode to report are dropped. Rows without a product
/// key cannot be grouped and are kept individually.
pub fn rank_search_rows(mut rows: Vec<SearchRow>, limit: usize) -> Vec<SearchResultItem> {
    rows.retain(|row| !row.barcode.trim().is_empty());
    rows.sort_by(|a, b| {
        a.match_rank
            .cmp(&b.match_rank)
            .then(a.field_rank.cmp(&b.field_rank))
            .then_with(|| a.barcode.cmp(&b.barcode))
    });

    let mut seen: HashSet<String> = HashSet::new();
    rows.into_iter()
        .filter(|row| match row.product_id.as_deref() {
            Some(id) if !id.trim().is_empty() => seen.insert(id.trim().to_string()),
            _ => true,
        })
        .take(limit)
        .map(SearchResultItem::from)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentConfig;
    use crate::schema::SchemaSnapshot;
    use chrono::Utc;
    use std::sync::Arc;

    fn row(product_id: &str, barcode: &str, match_rank: i32, field_rank: i32) -> SearchRow {
        SearchRow {
            product_id: Some(product_id.to_string()),
            product_name: format!("Product {}", product_id),
            product_code: String::new(),
            product_short_code: String::new(),
            specification: None,
            price_cents: 100,
            barcode: barcode.to_string(),
            matched_by: format!("field{}", field_rank),
            match_rank,
            field_rank,
        }
    }

    fn context(columns: &[&str], with_barcode_table: bool) -> LookupContext {
        let mut config = DeploymentConfig::default();
        if with_barcode_table {
            config.schema.barcode_table = Some("xw_ptypebarcode".to_string());
            config.schema.barcode_column = Some("barcode".to_string());
        }
        let snapshot = Arc::new(SchemaSnapshot::new(columns.iter().copied(), false, Utc::now()));
        LookupContext::resolve(&config, snapshot).unwrap()
    }

    #[test]
    fn test_normalize_limit() {
        assert_eq!(normalize_limit(0), DEFAULT_SEARCH_LIMIT);
        assert_eq!(normalize_limit(-5), DEFAULT_SEARCH_LIMIT);
        assert_eq!(normalize_limit(200), MAX_SEARCH_LIMIT);
        assert_eq!(normalize_limit(50), 50);
        assert_eq!(normalize_limit(1), 1);
    }

    #[test]
    fn test_targets_from_product_table() {
        let context = context(
            &["ptypeid", "pfullname", "price", "standard", "barcode", "pnamepy", "pusercode"],
            false,
        );
        let targets = build_search_targets(&context);
        let labels: Vec<&str> = targets.iter().map(|t| t.label.as_str()).collect();

        assert_eq!(labels, vec!["standard", "barcode", "pnamepy", "pusercode", "pfullname"]);
        assert_eq!(targets[0].kind, SearchTargetKind::BarcodeField);
        assert_eq!(targets[4].kind, SearchTargetKind::Descriptive);
    }

    #[test]
    fn test_targets_from_barcode_table() {
        let context = context(&["ptypeid", "pfullname", "price", "barcode"], true);
        let targets = build_search_targets(&context);
        let labels: Vec<&str> = targets.iter().map(|t| t.label.as_str()).collect();

        assert_eq!(labels, vec!["barcode", "pfullname"]);
        assert_eq!(targets[0].kind, SearchTargetKind::CrossReference);
    }

    #[test]
    fn test_no_barcode_source_means_no_targets() {
        let context = context(&["ptypeid", "pfullname", "price", "pnamepy"], false);
        assert!(build_search_targets(&context).is_empty());
    }

    #[test]
    fn test_ranking_order() {
        let rows = vec![
            row("3", "300", 1, 0),
            row("2", "200", 0, 1),
            row("1", "190", 0, 1),
            row("4", "100", 0, 0),
        ];

        let ranked = rank_search_rows(rows, 10);
        let ids: Vec<&str> = ranked.iter().filter_map(|i| i.product_id.as_deref()).collect();
        assert_eq!(ids, vec!["4", "1", "2", "3"]);
    }

    #[test]
    fn test_dedup_keeps_best_rank_per_product() {
        let rows = vec![
            row("1", "6920000000002", 1, 0),
            row("1", "6920000000001", 0, 2),
            row("2", "6920000000003", 0, 0),
        ];

        let ranked = rank_search_rows(rows, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].product_id.as_deref(), Some("2"));
        assert_eq!(ranked[1].barcode, "6920000000001");
        assert_eq!(ranked[1].matched_by, "field2");
    }

    #[test]
    fn test_truncates_and_skips_blank_barcodes() {
        let mut rows: Vec<SearchRow> = (0..60)
            .map(|i| row(&i.to_string(), &format!("{:04}", i), 0, 0))
            .collect();
        rows.push(row("blank", "  ", 0, 0));

        let ranked = rank_search_rows(rows, normalize_limit(200));
        assert_eq!(ranked.len(), 50);
        assert!(ranked.iter().all(|item| item.product_id.as_deref() != Some("blank")));
    }
}
