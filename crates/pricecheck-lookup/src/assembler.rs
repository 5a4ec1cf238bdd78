//! # Result Assembler
//!
//! Turns a strategy hit into a [`LookupResult`].
//!
//! ## Assembly
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StrategyMatch { row, matched_by }                                      │
//! │       │                                                                 │
//! │       ├── row has no product key ──► minimal result, no units          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  units_for_product(key, matched_barcode)   (skipped when the           │
//! │       │                                      deployment has no units)  │
//! │       ▼                                                                 │
//! │  select_current_unit(units, row.matched_unit_id)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price = current unit's price, else the row's price                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio_util::sync::CancellationToken;
use tracing::debug;

use pricecheck_core::units::select_current_unit;
use pricecheck_core::{LookupContext, LookupResult, PricingMeta, ProductUnit};
use pricecheck_db::DbResult;

use crate::source::ProductSource;
use crate::strategy::StrategyMatch;

/// Builds lookup results, carrying the deployment's pricing metadata.
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    pricing: PricingMeta,
}

impl ResultAssembler {
    pub fn new(pricing: PricingMeta) -> Self {
        ResultAssembler { pricing }
    }

    /// Loads units if needed and assembles the result.
    pub async fn assemble(
        &self,
        source: &dyn ProductSource,
        context: &LookupContext,
        matched: StrategyMatch,
        cancel: &CancellationToken,
    ) -> DbResult<LookupResult> {
        let units = match matched.row.product_key() {
            Some(product_id) if context.lists_units() => source
                .units_for_product(context, product_id, &matched.row.matched_barcode, cancel)
                .await?
                .into_iter()
                .map(ProductUnit::from)
                .collect(),
            _ => Vec::new(),
        };

        debug!(units = units.len(), matched_by = %matched.matched_by, "Assembling result");
        Ok(self.build(matched, units))
    }

    /// Pure assembly from a hit and its units.
    pub fn build(&self, matched: StrategyMatch, units: Vec<ProductUnit>) -> LookupResult {
        let StrategyMatch { row, matched_by } = matched;

        let current_unit = select_current_unit(&units, row.matched_unit_id.as_deref()).cloned();
        let price = match &current_unit {
            Some(unit) => unit.price,
            None => row.price(),
        };

        LookupResult {
            product_id: row.product_key().map(String::from),
            product_name: row.product_name,
            product_code: row.product_code,
            product_short_code: row.product_short_code,
            specification: row.specification,
            price,
            matched_by,
            matched_barcode: row.matched_barcode,
            current_unit,
            units,
            pricing: self.pricing.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, row, unit, unit_config, FakeSource};
    use pricecheck_core::{DeploymentConfig, Money};

    fn hit(product_id: Option<&str>, matched_unit: Option<&str>) -> StrategyMatch {
        let mut row = row(product_id, "Green Tea 500ml", 350, "6925303714857");
        row.matched_unit_id = matched_unit.map(String::from);
        StrategyMatch {
            row,
            matched_by: "barcode".to_string(),
        }
    }

    fn assembler(config: &DeploymentConfig) -> ResultAssembler {
        ResultAssembler::new(config.schema.pricing_meta())
    }

    #[tokio::test]
    async fn test_no_product_key_means_no_units() {
        let config = unit_config();
        let mut source = FakeSource::default();
        source.units = vec![unit("1", 400, true)];
        let context = context(&config, &["ptypeid", "pfullname"], false);
        let cancel = CancellationToken::new();

        let result = assembler(&config)
            .assemble(&source, &context, hit(Some("  "), None), &cancel)
            .await
            .unwrap();

        assert!(result.product_id.is_none());
        assert!(result.units.is_empty());
        assert!(result.current_unit.is_none());
        assert_eq!(result.price, Money::from_cents(350));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_units_skipped_when_deployment_has_none() {
        let config = DeploymentConfig::default();
        let source = FakeSource::default();
        let context = context(&config, &["ptypeid", "pfullname", "price"], false);
        let cancel = CancellationToken::new();

        let result = assembler(&config)
            .assemble(&source, &context, hit(Some("001"), None), &cancel)
            .await
            .unwrap();

        assert_eq!(result.product_id.as_deref(), Some("001"));
        assert!(result.units.is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_flagged_unit_sets_price() {
        let config = unit_config();
        let mut source = FakeSource::default();
        source.units = vec![unit("1", 400, false), unit("2", 4500, true)];
        let context = context(&config, &["ptypeid", "pfullname"], false);
        let cancel = CancellationToken::new();

        let result = assembler(&config)
            .assemble(&source, &context, hit(Some("001"), Some("1")), &cancel)
            .await
            .unwrap();

        assert_eq!(result.units.len(), 2);
        assert_eq!(result.current_unit.as_ref().unwrap().unit_id, "2");
        assert_eq!(result.price, Money::from_cents(4500));
        assert_eq!(result.units[0].barcodes, vec!["100", "101"]);
        assert!(result.pricing.unit_scoped);
        assert_eq!(source.calls(), vec!["units:001"]);
    }

    #[test]
    fn test_current_unit_precedence() {
        let config = unit_config();
        let assembler = assembler(&config);
        let units = |rows: Vec<_>| rows.into_iter().map(ProductUnit::from).collect::<Vec<_>>();

        // matched unit id beats first unit
        let result = assembler.build(
            hit(Some("001"), Some("B")),
            units(vec![unit("a", 100, false), unit("b", 200, false)]),
        );
        assert_eq!(result.current_unit.unwrap().unit_id, "b");
        assert_eq!(result.price, Money::from_cents(200));

        // first unit when nothing points anywhere
        let result = assembler.build(
            hit(Some("001"), Some("zz")),
            units(vec![unit("a", 100, false), unit("b", 200, false)]),
        );
        assert_eq!(result.current_unit.unwrap().unit_id, "a");
        assert_eq!(result.price, Money::from_cents(100));

        // no units: row price
        let result = assembler.build(hit(Some("001"), None), Vec::new());
        assert!(result.current_unit.is_none());
        assert_eq!(result.price, Money::from_cents(350));
    }
}
