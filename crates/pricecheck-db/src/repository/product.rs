//! # Product Repository
//!
//! Read-only product queries against the deployment's schema.
//!
//! ## Key Operations
//! - Exact lookups: cross-reference table, barcode field, legacy function
//! - Composite keyword lookup (legacy compatibility)
//! - Units of a matched product
//! - Fragment search rows
//!
//! Every method takes the request's [`LookupContext`]; the statements are
//! rebuilt per call from it, so a schema refresh takes effect on the next
//! request without any invalidation here.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pricecheck_core::search::SearchTarget;
use pricecheck_core::{LookupContext, RawMatchRow, SearchRow, UnitRow};

use super::QueryRunner;
use crate::error::DbResult;
use crate::sql::statements;

/// Repository for product queries.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let row = repo
///     .find_by_field(&context, "barcode", "6925303714857", &cancel)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    runner: QueryRunner,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        ProductRepository {
            runner: QueryRunner::new(pool, query_timeout),
        }
    }

    /// Exact match through the barcode cross-reference table.
    ///
    /// Returns `Ok(None)` without I/O when that path is not usable.
    pub async fn find_by_barcode_table(
        &self,
        context: &LookupContext,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        let statement = match statements::barcode_table_lookup(context, candidate)? {
            Some(statement) => statement,
            None => return Ok(None),
        };
        self.runner
            .fetch_optional("Barcode table lookup", &statement, cancel)
            .await
    }

    /// Exact match on one barcode column of the product table.
    pub async fn find_by_field(
        &self,
        context: &LookupContext,
        field: &str,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        let statement = statements::field_lookup(context, field, candidate)?;
        self.runner
            .fetch_optional("Barcode field lookup", &statement, cancel)
            .await
    }

    /// Exact match on the legacy function's derived barcode.
    ///
    /// Returns `Ok(None)` without I/O when the function is not usable.
    pub async fn find_by_function(
        &self,
        context: &LookupContext,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        let statement = match statements::function_lookup(context, candidate)? {
            Some(statement) => statement,
            None => return Ok(None),
        };
        self.runner
            .fetch_optional("Legacy function lookup", &statement, cancel)
            .await
    }

    /// Composite keyword match, prefix matches first.
    pub async fn find_by_composite(
        &self,
        context: &LookupContext,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        let statement = match statements::composite_lookup(context, keyword)? {
            Some(statement) => statement,
            None => return Ok(None),
        };
        self.runner
            .fetch_optional("Composite keyword lookup", &statement, cancel)
            .await
    }

    /// Units of a product, in unit ordinal order.
    ///
    /// Returns an empty list without I/O when units cannot be listed for
    /// this deployment.
    pub async fn units_for_product(
        &self,
        context: &LookupContext,
        product_id: &str,
        matched_barcode: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Vec<UnitRow>> {
        let statement = match statements::units_for_product(context, product_id, matched_barcode)? {
            Some(statement) => statement,
            None => return Ok(Vec::new()),
        };
        let units: Vec<UnitRow> = self
            .runner
            .fetch_all("Unit listing", &statement, cancel)
            .await?;

        debug!(count = units.len(), "Loaded product units");
        Ok(units)
    }

    /// Candidate rows for a fragment search, already de-duplicated per
    /// product and limited by the store.
    pub async fn search_rows(
        &self,
        context: &LookupContext,
        targets: &[SearchTarget],
        keyword: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> DbResult<Vec<SearchRow>> {
        let statement = match statements::search_fragment(context, targets, keyword, limit)? {
            Some(statement) => statement,
            None => return Ok(Vec::new()),
        };
        let rows: Vec<SearchRow> = self
            .runner
            .fetch_all("Fragment search", &statement, cancel)
            .await?;

        debug!(count = rows.len(), targets = targets.len(), "Search returned rows");
        Ok(rows)
    }
}
