//! # Product Resolution Service
//!
//! The two public operations: exact lookup and fragment search.
//!
//! ## Lookup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lookup("(01)06923644237943", cancel)                                   │
//! │       │                                                                 │
//! │       ├── blank? ──► Ok(None), no I/O                                  │
//! │       ▼                                                                 │
//! │  build_candidates → ["(01)0692…", "0106…", "0692…", "6923…"]           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SchemaCache::get_snapshot ──► LookupContext::resolve                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  exact chain (candidate × strategy) ── hit ──┐                         │
//! │       │ miss                                  │                         │
//! │       ▼                                       │                         │
//! │  composite (candidate, ≥ 8 digits) ── hit ───┤                         │
//! │       │ miss                                  ▼                         │
//! │       ▼                               ResultAssembler                   │
//! │  Ok(None)                                     │                         │
//! │                                               ▼                         │
//! │                                     Ok(Some(LookupResult))              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call runs in a span carrying a fresh request id. Calls slower than
//! the configured threshold are logged at `warn` with a redacted key.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use pricecheck_core::barcode::{build_candidates, redact_key};
use pricecheck_core::search::{build_search_targets, normalize_limit, rank_search_rows};
use pricecheck_core::{
    DeploymentConfig, LookupContext, LookupResult, SchemaSnapshot, SearchResultItem,
    MIN_SEARCH_KEYWORD_LENGTH,
};
use pricecheck_db::{SchemaCache, SchemaSource};

use crate::assembler::ResultAssembler;
use crate::error::{EngineResult, LookupError};
use crate::source::ProductSource;
use crate::strategy::{exact_strategies, CompositeStrategy, LookupStrategy, StrategyMatch};

/// Resolves barcodes and fragments to products.
///
/// ## Usage
/// ```rust,ignore
/// let cache = SchemaCache::from_config(db.introspector(), &config)?;
/// let service = ProductResolutionService::new(config, cache, db.products());
///
/// if let Some(result) = service.lookup("6925303714857", &cancel).await? {
///     println!("{} {}", result.product_name, result.price);
/// }
/// let items = service.search("692", 20, &cancel).await?;
/// ```
pub struct ProductResolutionService<P, S> {
    config: Arc<DeploymentConfig>,
    cache: SchemaCache<S>,
    source: P,
    exact: Vec<Box<dyn LookupStrategy>>,
    fuzzy: CompositeStrategy,
    assembler: ResultAssembler,
    slow_threshold: Duration,
}

impl<P, S> ProductResolutionService<P, S>
where
    P: ProductSource,
    S: SchemaSource,
{
    pub fn new(config: DeploymentConfig, cache: SchemaCache<S>, source: P) -> Self {
        let assembler = ResultAssembler::new(config.schema.pricing_meta());
        let slow_threshold = config.slow_query_threshold();

        ProductResolutionService {
            config: Arc::new(config),
            cache,
            source,
            exact: exact_strategies(),
            fuzzy: CompositeStrategy,
            assembler,
            slow_threshold,
        }
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// The current schema snapshot, refreshed if expired.
    pub async fn schema_snapshot(
        &self,
        cancel: &CancellationToken,
    ) -> EngineResult<Arc<SchemaSnapshot>> {
        Ok(self.cache.get_snapshot(cancel).await?)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Resolves one scanned or typed barcode.
    ///
    /// ## Returns
    /// * `Ok(Some(result))` - a strategy matched
    /// * `Ok(None)` - blank input, or every strategy missed
    /// * `Err(LookupError)` - configuration, store or cancellation
    pub async fn lookup(
        &self,
        barcode: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<LookupResult>> {
        let request_id = Uuid::new_v4();
        let key = barcode.trim();
        let span = info_span!("lookup", %request_id, key = %redact_key(key));

        async move {
            if key.is_empty() {
                debug!("Blank barcode rejected");
                return Ok(None);
            }

            let started = Instant::now();
            let outcome = self.resolve(key, cancel).await;
            self.log_completion("lookup", key, started.elapsed(), &outcome.as_ref().map(Option::is_some));
            outcome
        }
        .instrument(span)
        .await
    }

    async fn resolve(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<LookupResult>> {
        let candidates = build_candidates(key);
        let context = self.context(cancel).await?;
        let source: &dyn ProductSource = &self.source;

        debug!(candidates = candidates.len(), "Trying exact strategies");

        let mut hit = self.exact_match(source, &candidates, &context, cancel).await?;

        if hit.is_none() {
            for candidate in &candidates {
                ensure_active(cancel)?;
                hit = self.fuzzy.attempt(source, candidate, &context, cancel).await?;
                if hit.is_some() {
                    break;
                }
            }
        }

        match hit {
            Some(matched) => {
                let result = self
                    .assembler
                    .assemble(source, &context, matched, cancel)
                    .await?;
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    async fn exact_match(
        &self,
        source: &dyn ProductSource,
        candidates: &[String],
        context: &LookupContext,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<StrategyMatch>> {
        for candidate in candidates {
            for strategy in &self.exact {
                ensure_active(cancel)?;
                if let Some(matched) = strategy.attempt(source, candidate, context, cancel).await? {
                    debug!(strategy = strategy.name(), matched_by = %matched.matched_by, "Exact match");
                    return Ok(Some(matched));
                }
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Fragment search over barcodes, codes and names.
    ///
    /// Keywords shorter than [`MIN_SEARCH_KEYWORD_LENGTH`] characters return
    /// an empty list without I/O. `limit` is normalized (non-positive →
    /// default, capped at the maximum).
    pub async fn search(
        &self,
        keyword: &str,
        limit: i64,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<SearchResultItem>> {
        let request_id = Uuid::new_v4();
        let keyword = keyword.trim();
        let span = info_span!("search", %request_id, key = %redact_key(keyword));

        async move {
            if keyword.chars().count() < MIN_SEARCH_KEYWORD_LENGTH {
                debug!("Search keyword too short");
                return Ok(Vec::new());
            }

            let started = Instant::now();
            let outcome = self.search_inner(keyword, normalize_limit(limit), cancel).await;
            self.log_completion("search", keyword, started.elapsed(), &outcome.as_ref().map(|items| !items.is_empty()));
            outcome
        }
        .instrument(span)
        .await
    }

    async fn search_inner(
        &self,
        keyword: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<SearchResultItem>> {
        let context = self.context(cancel).await?;
        let targets = build_search_targets(&context);
        if targets.is_empty() {
            debug!("No search targets for this schema");
            return Ok(Vec::new());
        }

        ensure_active(cancel)?;
        let rows = self
            .source
            .search_rows(&context, &targets, keyword, limit, cancel)
            .await?;
        Ok(rank_search_rows(rows, limit))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn context(&self, cancel: &CancellationToken) -> EngineResult<LookupContext> {
        ensure_active(cancel)?;
        let snapshot = self.cache.get_snapshot(cancel).await?;
        Ok(LookupContext::resolve(&self.config, snapshot)?)
    }

    fn log_completion(
        &self,
        operation: &str,
        key: &str,
        elapsed: Duration,
        outcome: &Result<bool, &LookupError>,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        let result = match outcome {
            Ok(true) => "hit",
            Ok(false) => "miss",
            Err(_) => "error",
        };

        if elapsed > self.slow_threshold {
            warn!(
                operation,
                elapsed_ms,
                result,
                key = %redact_key(key),
                "Slow operation"
            );
        } else {
            debug!(operation, elapsed_ms, result, "Operation finished");
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> EngineResult<()> {
    if cancel.is_cancelled() {
        return Err(LookupError::Cancelled);
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{row, unit, unit_config, FakeSchema, FakeSource};
    use pricecheck_core::validation::TableRef;
    use pricecheck_core::{ConfigError, Money, SearchRow, COMPOSITE_LABEL};
    use pricecheck_db::DbError;
    use std::sync::atomic::Ordering;

    const COLUMNS: &[&str] = &["ptypeid", "pfullname", "price", "standard", "barcode", "pnamepy"];

    fn service(
        config: DeploymentConfig,
        schema: FakeSchema,
        source: FakeSource,
    ) -> ProductResolutionService<FakeSource, FakeSchema> {
        let cache = SchemaCache::new(
            schema,
            TableRef::parse("product_table", "ptype").unwrap(),
            "fn_strunitptype",
            chrono::Duration::minutes(10),
        );
        ProductResolutionService::new(config, cache, source)
    }

    fn search_row(id: &str, barcode: &str, match_rank: i32, field_rank: i32) -> SearchRow {
        SearchRow {
            product_id: Some(id.to_string()),
            product_name: format!("product {}", id),
            product_code: String::new(),
            product_short_code: String::new(),
            specification: None,
            price_cents: 100,
            barcode: barcode.to_string(),
            matched_by: "barcode".to_string(),
            match_rank,
            field_rank,
        }
    }

    #[tokio::test]
    async fn test_blank_barcode_does_no_io() {
        let schema = FakeSchema::new(COLUMNS, false);
        let refreshes = Arc::clone(&schema.refreshes);
        let service = service(DeploymentConfig::default(), schema, FakeSource::default());

        let result = service.lookup("   ", &CancellationToken::new()).await.unwrap();
        assert!(result.is_none());
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        assert!(service.source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_price_is_configuration_error() {
        let schema = FakeSchema::new(&["ptypeid", "pfullname", "barcode"], false);
        let service = service(DeploymentConfig::default(), schema, FakeSource::default());

        let result = service.lookup("6925303714857", &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(LookupError::Configuration(ConfigError::PriceFieldUnresolved { .. }))
        ));
        assert!(service.source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_barcode_table_beats_field() {
        let mut source = FakeSource::default();
        source.barcode_table.insert(
            "6925303714857".to_string(),
            row(Some("001"), "From table", 350, "6925303714857"),
        );
        source.fields.insert(
            ("barcode".to_string(), "6925303714857".to_string()),
            row(Some("002"), "From field", 999, "6925303714857"),
        );
        let schema = FakeSchema::new(&["ptypeid", "pfullname", "barcode"], false);
        let service = service(unit_config(), schema, source);

        let result = service
            .lookup("6925303714857", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.product_name, "From table");
        assert_eq!(result.matched_by, "barcode");
        assert!(!service.source.calls().iter().any(|c| c.starts_with("field:")));
    }

    #[tokio::test]
    async fn test_candidates_are_outer_loop() {
        let mut source = FakeSource::default();
        source.fields.insert(
            ("standard".to_string(), "6923644237943".to_string()),
            row(Some("003"), "EAN hit", 120, "6923644237943"),
        );
        let service = service(
            DeploymentConfig::default(),
            FakeSchema::new(COLUMNS, false),
            source,
        );

        let result = service
            .lookup("(01)06923644237943", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.matched_by, "standard");
        assert_eq!(result.price, Money::from_cents(120));

        let calls = service.source.calls();
        assert_eq!(
            calls,
            vec![
                "field:standard:(01)06923644237943",
                "field:barcode:(01)06923644237943",
                "field:standard:0106923644237943",
                "field:barcode:0106923644237943",
                "field:standard:06923644237943",
                "field:barcode:06923644237943",
                "field:standard:6923644237943",
            ]
        );
    }

    #[tokio::test]
    async fn test_function_fallback_after_fields() {
        let mut source = FakeSource::default();
        source.function.insert(
            "6925303714857".to_string(),
            row(Some("004"), "Legacy", 50, "6925303714857"),
        );
        let service = service(
            DeploymentConfig::default(),
            FakeSchema::new(COLUMNS, true),
            source,
        );

        let result = service
            .lookup("6925303714857", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.matched_by, "fn_strunitptype(B)");
        assert_eq!(
            &service.source.calls()[..3],
            &[
                "field:standard:6925303714857".to_string(),
                "field:barcode:6925303714857".to_string(),
                "function:6925303714857".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_composite_only_after_all_exact_misses() {
        let mut source = FakeSource::default();
        source.composite.insert(
            "6925303714857".to_string(),
            row(None, "Composite", 75, "6925303714857"),
        );
        let service = service(
            DeploymentConfig::default(),
            FakeSchema::new(COLUMNS, false),
            source,
        );

        let result = service
            .lookup("6925303714857", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.matched_by, COMPOSITE_LABEL);
        assert!(result.product_id.is_none());
        assert!(result.units.is_empty());

        let calls = service.source.calls();
        let first_composite = calls.iter().position(|c| c.starts_with("composite:")).unwrap();
        let last_exact = calls.iter().rposition(|c| c.starts_with("field:")).unwrap();
        assert!(last_exact < first_composite);
        assert_eq!(
            calls.iter().filter(|c| c.starts_with("field:")).count(),
            4
        );
    }

    #[tokio::test]
    async fn test_short_digit_candidate_never_fuzzy() {
        let service = service(
            DeploymentConfig::default(),
            FakeSchema::new(COLUMNS, false),
            FakeSource::default(),
        );

        let result = service.lookup("1234", &CancellationToken::new()).await.unwrap();
        assert!(result.is_none());
        assert!(!service.source.calls().iter().any(|c| c.starts_with("composite:")));
    }

    #[tokio::test]
    async fn test_lookup_assembles_units() {
        let mut source = FakeSource::default();
        let mut hit = row(Some("001"), "Tea", 350, "6925303714857");
        hit.matched_unit_id = Some("2".to_string());
        source.barcode_table.insert("6925303714857".to_string(), hit);
        source.units = vec![unit("1", 350, false), unit("2", 4200, false)];
        let service = service(
            unit_config(),
            FakeSchema::new(&["ptypeid", "pfullname"], false),
            source,
        );

        let result = service
            .lookup("6925303714857", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.current_unit.as_ref().unwrap().unit_id, "2");
        assert_eq!(result.price, Money::from_cents(4200));
        assert_eq!(result.units.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_lookup() {
        let service = service(
            DeploymentConfig::default(),
            FakeSchema::new(COLUMNS, false),
            FakeSource::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = service.lookup("6925303714857", &cancel).await;
        assert!(matches!(result, Err(LookupError::Cancelled)));
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let source = FakeSource {
            fail_with: Some(DbError::timeout("Barcode field lookup", 15)),
            ..Default::default()
        };
        let service = service(
            DeploymentConfig::default(),
            FakeSchema::new(COLUMNS, false),
            source,
        );

        let result = service.lookup("6925303714857", &CancellationToken::new()).await;
        match result {
            Err(err) => assert!(err.is_transient()),
            Ok(_) => panic!("expected a store error"),
        }
        assert_eq!(service.source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_search_rejects_short_keyword() {
        let service = service(
            DeploymentConfig::default(),
            FakeSchema::new(COLUMNS, false),
            FakeSource::default(),
        );

        let items = service.search(" 6 ", 20, &CancellationToken::new()).await.unwrap();
        assert!(items.is_empty());
        assert!(service.source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_search_limit_normalized() {
        let service = service(
            DeploymentConfig::default(),
            FakeSchema::new(COLUMNS, false),
            FakeSource::default(),
        );
        let cancel = CancellationToken::new();

        service.search("69", 200, &cancel).await.unwrap();
        service.search("69", 0, &cancel).await.unwrap();
        assert_eq!(service.source.calls(), vec!["search:69:50", "search:69:20"]);
    }

    #[tokio::test]
    async fn test_search_ranks_and_dedups() {
        let mut source = FakeSource::default();
        source.search = vec![
            search_row("B", "692002", 1, 0),
            search_row("A", "692001", 0, 2),
            search_row("A", "692000", 0, 0),
            search_row("C", "692003", 0, 0),
        ];
        let service = service(
            DeploymentConfig::default(),
            FakeSchema::new(COLUMNS, false),
            source,
        );

        let items = service.search("692", 10, &CancellationToken::new()).await.unwrap();
        let ids: Vec<&str> = items.iter().filter_map(|i| i.product_id.as_deref()).collect();
        assert_eq!(ids, vec!["A", "C", "B"]);
        assert_eq!(items[0].barcode, "692000");
    }

    #[tokio::test]
    async fn test_search_without_targets() {
        let mut config = DeploymentConfig::default();
        config.schema.barcode_fields = vec!["ean".to_string()];
        let service = service(
            config,
            FakeSchema::new(&["ptypeid", "pfullname", "price"], false),
            FakeSource::default(),
        );

        let items = service.search("692", 10, &CancellationToken::new()).await.unwrap();
        assert!(items.is_empty());
        assert!(service.source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_shared_across_requests() {
        let schema = FakeSchema::new(COLUMNS, false);
        let refreshes = Arc::clone(&schema.refreshes);
        let service = service(DeploymentConfig::default(), schema, FakeSource::default());
        let cancel = CancellationToken::new();

        service.lookup("6925303714857", &cancel).await.unwrap();
        service.search("692", 5, &cancel).await.unwrap();
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }
}
