//! # Product Source
//!
//! The seam between the engine and the store. Production uses
//! [`ProductRepository`]; tests use an in-memory fake.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pricecheck_core::search::SearchTarget;
use pricecheck_core::{LookupContext, RawMatchRow, SearchRow, UnitRow};
use pricecheck_db::{DbResult, ProductRepository};

/// Product queries the strategies, assembler and search run against.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn find_by_barcode_table(
        &self,
        context: &LookupContext,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>>;

    async fn find_by_field(
        &self,
        context: &LookupContext,
        field: &str,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>>;

    async fn find_by_function(
        &self,
        context: &LookupContext,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>>;

    async fn find_by_composite(
        &self,
        context: &LookupContext,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>>;

    async fn units_for_product(
        &self,
        context: &LookupContext,
        product_id: &str,
        matched_barcode: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Vec<UnitRow>>;

    async fn search_rows(
        &self,
        context: &LookupContext,
        targets: &[SearchTarget],
        keyword: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> DbResult<Vec<SearchRow>>;
}

#[async_trait]
impl ProductSource for ProductRepository {
    async fn find_by_barcode_table(
        &self,
        context: &LookupContext,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        ProductRepository::find_by_barcode_table(self, context, candidate, cancel).await
    }

    async fn find_by_field(
        &self,
        context: &LookupContext,
        field: &str,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        ProductRepository::find_by_field(self, context, field, candidate, cancel).await
    }

    async fn find_by_function(
        &self,
        context: &LookupContext,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        ProductRepository::find_by_function(self, context, candidate, cancel).await
    }

    async fn find_by_composite(
        &self,
        context: &LookupContext,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Option<RawMatchRow>> {
        ProductRepository::find_by_composite(self, context, keyword, cancel).await
    }

    async fn units_for_product(
        &self,
        context: &LookupContext,
        product_id: &str,
        matched_barcode: &str,
        cancel: &CancellationToken,
    ) -> DbResult<Vec<UnitRow>> {
        ProductRepository::units_for_product(self, context, product_id, matched_barcode, cancel)
            .await
    }

    async fn search_rows(
        &self,
        context: &LookupContext,
        targets: &[SearchTarget],
        keyword: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> DbResult<Vec<SearchRow>> {
        ProductRepository::search_rows(self, context, targets, keyword, limit, cancel).await
    }
}
