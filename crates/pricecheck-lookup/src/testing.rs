//! In-memory fakes for strategy, assembler and service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use pricecheck_core::search::SearchTarget;
use pricecheck_core::validation::TableRef;
use pricecheck_core::{
    DeploymentConfig, LookupContext, RawMatchRow, SchemaSnapshot, SearchRow, UnitRow,
};
use pricecheck_db::{DbError, DbResult, SchemaSource};

use crate::source::ProductSource;

/// Canned answers keyed by candidate, plus a call log.
#[derive(Default)]
pub(crate) struct FakeSource {
    pub barcode_table: HashMap<String, RawMatchRow>,
    /// Keyed by (field, candidate).
    pub fields: HashMap<(String, String), RawMatchRow>,
    pub function: HashMap<String, RawMatchRow>,
    pub composite: HashMap<String, RawMatchRow>,
    pub units: Vec<UnitRow>,
    pub search: Vec<SearchRow>,
    pub fail_with: Option<DbError>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> DbResult<()> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProductSource for FakeSource {
    async fn find_by_barcode_table(
        &self,
        _context: &LookupContext,
        candidate: &str,
        _cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        self.record(format!("table:{}", candidate))?;
        Ok(self.barcode_table.get(candidate).cloned())
    }

    async fn find_by_field(
        &self,
        _context: &LookupContext,
        field: &str,
        candidate: &str,
        _cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        self.record(format!("field:{}:{}", field, candidate))?;
        Ok(self
            .fields
            .get(&(field.to_string(), candidate.to_string()))
            .cloned())
    }

    async fn find_by_function(
        &self,
        _context: &LookupContext,
        candidate: &str,
        _cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        self.record(format!("function:{}", candidate))?;
        Ok(self.function.get(candidate).cloned())
    }

    async fn find_by_composite(
        &self,
        _context: &LookupContext,
        keyword: &str,
        _cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        self.record(format!("composite:{}", keyword))?;
        Ok(self.composite.get(keyword).cloned())
    }

    async fn units_for_product(
        &self,
        _context: &LookupContext,
        product_id: &str,
        _matched_barcode: &str,
        _cancel: &CancellationToken,
    ) -> DbResult<Vec<UnitRow>> {
        self.record(format!("units:{}", product_id))?;
        Ok(self.units.clone())
    }

    async fn search_rows(
        &self,
        _context: &LookupContext,
        _targets: &[SearchTarget],
        keyword: &str,
        limit: usize,
        _cancel: &CancellationToken,
    ) -> DbResult<Vec<SearchRow>> {
        self.record(format!("search:{}:{}", keyword, limit))?;
        Ok(self.search.clone())
    }
}

/// Fixed schema with refresh counting.
pub(crate) struct FakeSchema {
    pub columns: Vec<String>,
    pub has_function: bool,
    pub refreshes: Arc<AtomicUsize>,
}

impl FakeSchema {
    pub fn new(columns: &[&str], has_function: bool) -> Self {
        FakeSchema {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            has_function,
            refreshes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SchemaSource for FakeSchema {
    async fn product_columns(
        &self,
        _table: &TableRef,
        _cancel: &CancellationToken,
    ) -> DbResult<Vec<String>> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(self.columns.clone())
    }

    async fn function_exists(&self, _name: &str, _cancel: &CancellationToken) -> DbResult<bool> {
        Ok(self.has_function)
    }
}

pub(crate) fn context(config: &DeploymentConfig, columns: &[&str], has_function: bool) -> LookupContext {
    let snapshot = Arc::new(SchemaSnapshot::new(
        columns.iter().copied(),
        has_function,
        Utc::now(),
    ));
    LookupContext::resolve(config, snapshot).unwrap()
}

pub(crate) fn row(product_id: Option<&str>, name: &str, price_cents: i64, barcode: &str) -> RawMatchRow {
    RawMatchRow {
        product_id: product_id.map(String::from),
        product_name: name.to_string(),
        product_code: String::new(),
        product_short_code: String::new(),
        specification: None,
        price_cents,
        matched_unit_id: None,
        matched_barcode: barcode.to_string(),
    }
}

pub(crate) fn unit(unit_id: &str, price_cents: i64, matched: bool) -> UnitRow {
    UnitRow {
        unit_id: unit_id.to_string(),
        unit_name: format!("unit {}", unit_id),
        unit_rate: "1".to_string(),
        price_cents,
        barcode_list: Some(format!("{}00,{}01", unit_id, unit_id)),
        is_matched_unit: matched,
    }
}

/// Barcode table, unit-scoped price table and unit table all configured.
pub(crate) fn unit_config() -> DeploymentConfig {
    let mut config = DeploymentConfig::default();
    config.schema.barcode_table = Some("xw_ptypebarcode".to_string());
    config.schema.barcode_column = Some("barcode".to_string());
    config.schema.price_table = Some("xw_p_ptypeprice".to_string());
    config.schema.price_column = Some("price".to_string());
    config.schema.unit_table = Some("xw_ptypeunit".to_string());
    config
}
