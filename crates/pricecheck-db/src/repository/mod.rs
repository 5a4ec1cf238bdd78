//! # Repository Module
//!
//! Executes built statements against the pool.
//!
//! ## Call Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Every Store Call Goes Through Here                     │
//! │                                                                         │
//! │  SqlStatement { sql, binds }                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  QueryRunner::fetch_*(operation, statement, cancel)                    │
//! │       │                                                                 │
//! │       ├── cancel already fired?      → DbError::Cancelled (no I/O)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  select! {                                                              │
//! │      cancel.cancelled()            → DbError::Cancelled                │
//! │      timeout(query_timeout, query) → rows | DbError::Timeout           │
//! │  }                                                                      │
//! │                                                                         │
//! │  Dropping the query future aborts it and releases the connection.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - lookups, units, search
//! - [`SchemaIntrospector`](schema::SchemaIntrospector) - column and function metadata

pub mod product;
pub mod schema;

use std::future::Future;
use std::time::{Duration, Instant};

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::sql::{BindValue, SqlStatement};

/// Runs statements with the per-call timeout and caller cancellation.
#[derive(Debug, Clone)]
pub(crate) struct QueryRunner {
    pool: PgPool,
    timeout: Duration,
}

impl QueryRunner {
    pub(crate) fn new(pool: PgPool, timeout: Duration) -> Self {
        QueryRunner { pool, timeout }
    }

    /// Fetches at most one row.
    pub(crate) async fn fetch_optional<T>(
        &self,
        operation: &str,
        statement: &SqlStatement,
        cancel: &CancellationToken,
    ) -> DbResult<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let query = bind_values(sqlx::query_as::<_, T>(&statement.sql), &statement.binds);
        let row = self
            .guarded(operation, cancel, query.fetch_optional(&self.pool))
            .await?;
        Ok(row)
    }

    /// Fetches every row.
    pub(crate) async fn fetch_all<T>(
        &self,
        operation: &str,
        statement: &SqlStatement,
        cancel: &CancellationToken,
    ) -> DbResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let query = bind_values(sqlx::query_as::<_, T>(&statement.sql), &statement.binds);
        self.guarded(operation, cancel, query.fetch_all(&self.pool))
            .await
    }

    /// Fetches exactly one row.
    pub(crate) async fn fetch_one<T>(
        &self,
        operation: &str,
        statement: &SqlStatement,
        cancel: &CancellationToken,
    ) -> DbResult<T>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let query = bind_values(sqlx::query_as::<_, T>(&statement.sql), &statement.binds);
        self.guarded(operation, cancel, query.fetch_one(&self.pool))
            .await
    }

    async fn guarded<F, T>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        query: F,
    ) -> DbResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DbError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, query) => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(self.classify(operation, err)),
                Err(_) => Err(DbError::timeout(operation, self.timeout.as_secs())),
            },
        };

        debug!(
            operation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Store call finished"
        );
        result
    }

    /// A server-side `statement_timeout` is reported with this call's name.
    fn classify(&self, operation: &str, err: sqlx::Error) -> DbError {
        match DbError::from(err) {
            DbError::Timeout { .. } => DbError::timeout(operation, self.timeout.as_secs()),
            other => other,
        }
    }
}

fn bind_values<'q, T>(
    mut query: QueryAs<'q, Postgres, T, PgArguments>,
    binds: &'q [BindValue],
) -> QueryAs<'q, Postgres, T, PgArguments> {
    for value in binds {
        query = match value {
            BindValue::Text(text) => query.bind(text.as_str()),
            BindValue::Int(number) => query.bind(*number),
        };
    }
    query
}

// =============================================================================
// Unit Tests
// =============================================================================
