//! # Schema Introspection
//!
//! Reads which columns the product table has and whether the legacy barcode
//! function is installed. Feeds [`SchemaCache`](crate::schema_cache::SchemaCache).

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pricecheck_core::validation::TableRef;

use super::QueryRunner;
use crate::error::DbResult;
use crate::schema_cache::SchemaSource;
use crate::sql::statements;

/// Metadata queries against `information_schema` and `pg_proc`.
#[derive(Debug, Clone)]
pub struct SchemaIntrospector {
    runner: QueryRunner,
}

impl SchemaIntrospector {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        SchemaIntrospector {
            runner: QueryRunner::new(pool, query_timeout),
        }
    }
}

#[async_trait]
impl SchemaSource for SchemaIntrospector {
    async fn product_columns(
        &self,
        table: &TableRef,
        cancel: &CancellationToken,
    ) -> DbResult<Vec<String>> {
        let statement = statements::product_columns(table);
        let rows: Vec<(String,)> = self
            .runner
            .fetch_all("Column introspection", &statement, cancel)
            .await?;

        debug!(table = %table, columns = rows.len(), "Read product columns");
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn function_exists(&self, name: &str, cancel: &CancellationToken) -> DbResult<bool> {
        let statement = statements::function_exists(name);
        let (present,): (bool,) = self
            .runner
            .fetch_one("Function introspection", &statement, cancel)
            .await?;

        debug!(function = name, present, "Checked legacy function");
        Ok(present)
    }
}
