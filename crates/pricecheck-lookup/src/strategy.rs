//! # Lookup Strategies
//!
//! Each strategy tries one way of finding a product for one candidate.
//!
//! ## Chain Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for candidate in candidates:             ← outer loop                  │
//! │      1. BarcodeTableStrategy   cross-reference table = candidate        │
//! │      2. FieldStrategy          each barcode field, configured order     │
//! │      3. FunctionStrategy       fn('B', key, 0) = candidate              │
//! │      first hit anywhere → stop                                          │
//! │                                                                         │
//! │  only if nothing above hit:                                             │
//! │  for candidate in candidates:                                           │
//! │      4. CompositeStrategy      composite ILIKE %candidate%              │
//! │                                (candidates with ≥ 8 digits only)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A strategy whose path is unusable for the current context returns
//! `Ok(None)` without touching the store.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pricecheck_core::barcode::digit_count;
use pricecheck_core::{LookupContext, RawMatchRow, COMPOSITE_LABEL, COMPOSITE_MIN_DIGITS};
use pricecheck_db::DbResult;

use crate::source::ProductSource;

/// A row plus the label of what matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyMatch {
    pub row: RawMatchRow,
    pub matched_by: String,
}

impl StrategyMatch {
    fn new(row: RawMatchRow, matched_by: impl Into<String>) -> Self {
        StrategyMatch {
            row,
            matched_by: matched_by.into(),
        }
    }
}

/// One way of resolving a candidate.
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn attempt(
        &self,
        source: &dyn ProductSource,
        candidate: &str,
        context: &LookupContext,
        cancel: &CancellationToken,
    ) -> DbResult<Option<StrategyMatch>>;
}

/// The exact strategies in chain order.
pub fn exact_strategies() -> Vec<Box<dyn LookupStrategy>> {
    vec![
        Box::new(BarcodeTableStrategy),
        Box::new(FieldStrategy),
        Box::new(FunctionStrategy),
    ]
}

// =============================================================================
// Exact Strategies
// =============================================================================

/// Exact match through the barcode cross-reference table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarcodeTableStrategy;

#[async_trait]
impl LookupStrategy for BarcodeTableStrategy {
    fn name(&self) -> &'static str {
        "barcode_table"
    }

    async fn attempt(
        &self,
        source: &dyn ProductSource,
        candidate: &str,
        context: &LookupContext,
        cancel: &CancellationToken,
    ) -> DbResult<Option<StrategyMatch>> {
        let barcode_table = match &context.barcode_table {
            Some(barcode_table) => barcode_table,
            None => return Ok(None),
        };

        let row = source
            .find_by_barcode_table(context, candidate, cancel)
            .await?;
        Ok(row.map(|row| StrategyMatch::new(row, barcode_table.label.as_str())))
    }
}

/// Exact match on the product table's barcode fields, first hit wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldStrategy;

#[async_trait]
impl LookupStrategy for FieldStrategy {
    fn name(&self) -> &'static str {
        "field"
    }

    async fn attempt(
        &self,
        source: &dyn ProductSource,
        candidate: &str,
        context: &LookupContext,
        cancel: &CancellationToken,
    ) -> DbResult<Option<StrategyMatch>> {
        for field in &context.barcode_fields {
            if let Some(row) = source.find_by_field(context, field, candidate, cancel).await? {
                return Ok(Some(StrategyMatch::new(row, field.as_str())));
            }
        }
        Ok(None)
    }
}

/// Exact match on the legacy function's derived barcode.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionStrategy;

#[async_trait]
impl LookupStrategy for FunctionStrategy {
    fn name(&self) -> &'static str {
        "legacy_function"
    }

    async fn attempt(
        &self,
        source: &dyn ProductSource,
        candidate: &str,
        context: &LookupContext,
        cancel: &CancellationToken,
    ) -> DbResult<Option<StrategyMatch>> {
        let label = match context.function_label() {
            Some(label) => label,
            None => return Ok(None),
        };

        let row = source.find_by_function(context, candidate, cancel).await?;
        Ok(row.map(|row| StrategyMatch::new(row, label)))
    }
}

// =============================================================================
// Legacy Compatibility
// =============================================================================

/// Fuzzy match on the legacy composite keyword.
///
/// Emulates a prior system that stored every searchable text of a product
/// in one `^^^`-separated string. Only candidates with at least
/// [`COMPOSITE_MIN_DIGITS`] digits are tried.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeStrategy;

#[async_trait]
impl LookupStrategy for CompositeStrategy {
    fn name(&self) -> &'static str {
        "legacy_composite"
    }

    async fn attempt(
        &self,
        source: &dyn ProductSource,
        candidate: &str,
        context: &LookupContext,
        cancel: &CancellationToken,
    ) -> DbResult<Option<StrategyMatch>> {
        if digit_count(candidate) < COMPOSITE_MIN_DIGITS {
            return Ok(None);
        }

        let row = source.find_by_composite(context, candidate, cancel).await?;
        Ok(row.map(|row| StrategyMatch::new(row, COMPOSITE_LABEL)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, row, unit_config, FakeSource};
    use pricecheck_core::DeploymentConfig;

    const COLUMNS: &[&str] = &["ptypeid", "pfullname", "price", "standard", "barcode"];

    #[tokio::test]
    async fn test_barcode_table_skipped_without_table() {
        let source = FakeSource::default();
        let context = context(&DeploymentConfig::default(), COLUMNS, false);
        let cancel = CancellationToken::new();

        let hit = BarcodeTableStrategy
            .attempt(&source, "6925303714857", &context, &cancel)
            .await
            .unwrap();
        assert!(hit.is_none());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_barcode_table_label() {
        let mut source = FakeSource::default();
        source
            .barcode_table
            .insert("6925303714857".to_string(), row(Some("001"), "Tea", 350, "6925303714857"));
        let context = context(&unit_config(), &["ptypeid", "pfullname"], false);
        let cancel = CancellationToken::new();

        let hit = BarcodeTableStrategy
            .attempt(&source, "6925303714857", &context, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.matched_by, "barcode");
        assert_eq!(source.calls(), vec!["table:6925303714857"]);
    }

    #[tokio::test]
    async fn test_field_order_and_label() {
        let mut source = FakeSource::default();
        source.fields.insert(
            ("barcode".to_string(), "111".to_string()),
            row(Some("002"), "Milk", 500, "111"),
        );
        let context = context(&DeploymentConfig::default(), COLUMNS, false);
        let cancel = CancellationToken::new();

        let hit = FieldStrategy
            .attempt(&source, "111", &context, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.matched_by, "barcode");
        assert_eq!(source.calls(), vec!["field:standard:111", "field:barcode:111"]);
    }

    #[tokio::test]
    async fn test_function_skipped_when_disabled_or_absent() {
        let mut source = FakeSource::default();
        source
            .function
            .insert("111".to_string(), row(Some("003"), "Soap", 200, "111"));
        let cancel = CancellationToken::new();

        let absent = context(&DeploymentConfig::default(), COLUMNS, false);
        assert!(FunctionStrategy
            .attempt(&source, "111", &absent, &cancel)
            .await
            .unwrap()
            .is_none());

        let mut config = DeploymentConfig::default();
        config.lookup.enable_function_fallback = false;
        let disabled = context(&config, COLUMNS, true);
        assert!(FunctionStrategy
            .attempt(&source, "111", &disabled, &cancel)
            .await
            .unwrap()
            .is_none());
        assert!(source.calls().is_empty());

        let enabled = context(&DeploymentConfig::default(), COLUMNS, true);
        let hit = FunctionStrategy
            .attempt(&source, "111", &enabled, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.matched_by, "fn_strunitptype(B)");
    }

    #[tokio::test]
    async fn test_composite_needs_eight_digits() {
        let mut source = FakeSource::default();
        source
            .composite
            .insert("1234".to_string(), row(None, "Short", 100, "1234"));
        source
            .composite
            .insert("AB12345678".to_string(), row(None, "Long", 100, "AB12345678"));
        let context = context(&DeploymentConfig::default(), COLUMNS, false);
        let cancel = CancellationToken::new();

        let short = CompositeStrategy
            .attempt(&source, "1234", &context, &cancel)
            .await
            .unwrap();
        assert!(short.is_none());
        assert!(source.calls().is_empty());

        let long = CompositeStrategy
            .attempt(&source, "AB12345678", &context, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(long.matched_by, COMPOSITE_LABEL);
    }
}
