//! # Schema Snapshot Cache
//!
//! Caches which columns the product table has and whether the legacy
//! barcode function exists, for a bounded time.
//!
//! ## Single-Flight Refresh
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       get_snapshot(cancel)                              │
//! │                                                                         │
//! │  current.load() fresh? ──yes──► return it (lock-free)                  │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  refresh.lock()          ← one refresher; others wait here             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  current.load() fresh? ──yes──► return it (someone else refreshed)     │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  product_columns() + function_exists()   ← the only two queries        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  current.store(new snapshot, expires = now + ttl)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed refresh stores nothing; the error goes straight to the caller
//! and the next call tries again.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pricecheck_core::validation::TableRef;
use pricecheck_core::{ConfigResult, DeploymentConfig, SchemaSnapshot};

use crate::error::{DbError, DbResult};

/// Where snapshots come from.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Column names of the product table. Empty if the table does not exist.
    async fn product_columns(
        &self,
        table: &TableRef,
        cancel: &CancellationToken,
    ) -> DbResult<Vec<String>>;

    /// Whether a function with this name is visible.
    async fn function_exists(&self, name: &str, cancel: &CancellationToken) -> DbResult<bool>;
}

/// Time-boxed [`SchemaSnapshot`] with a single-flight refresh.
pub struct SchemaCache<S> {
    source: S,
    table: TableRef,
    function: String,
    ttl: chrono::Duration,
    current: ArcSwapOption<SchemaSnapshot>,
    refresh: Mutex<()>,
}

impl<S: SchemaSource> SchemaCache<S> {
    pub fn new(source: S, table: TableRef, function: impl Into<String>, ttl: chrono::Duration) -> Self {
        SchemaCache {
            source,
            table,
            function: function.into(),
            ttl,
            current: ArcSwapOption::empty(),
            refresh: Mutex::new(()),
        }
    }

    /// Cache for the configured product table and legacy function.
    pub fn from_config(source: S, config: &DeploymentConfig) -> ConfigResult<Self> {
        Ok(SchemaCache::new(
            source,
            config.schema.product_table_ref()?,
            config.schema.legacy_function.trim(),
            config.schema_ttl(),
        ))
    }

    /// Returns a fresh snapshot, refreshing it if expired.
    ///
    /// ## Errors
    /// - `DbError::Cancelled` if `cancel` fires while waiting or refreshing
    /// - any error from the two introspection queries
    pub async fn get_snapshot(&self, cancel: &CancellationToken) -> DbResult<Arc<SchemaSnapshot>> {
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DbError::Cancelled),
            guard = self.refresh.lock() => guard,
        };

        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }

        let columns = self.source.product_columns(&self.table, cancel).await?;
        let has_function = self.source.function_exists(&self.function, cancel).await?;

        if columns.is_empty() {
            warn!(table = %self.table, "Product table has no visible columns");
        }

        let snapshot = Arc::new(SchemaSnapshot::new(
            columns,
            has_function,
            Utc::now() + self.ttl,
        ));
        self.current.store(Some(Arc::clone(&snapshot)));

        info!(
            table = %self.table,
            columns = snapshot.column_count(),
            legacy_function = has_function,
            expires_at = %snapshot.expires_at(),
            "Schema snapshot refreshed"
        );
        Ok(snapshot)
    }

    /// The last stored snapshot, fresh or not.
    pub fn current(&self) -> Option<Arc<SchemaSnapshot>> {
        self.current.load_full()
    }

    /// Drops the stored snapshot so the next call refreshes.
    pub fn invalidate(&self) {
        self.current.store(None);
    }

    fn fresh(&self) -> Option<Arc<SchemaSnapshot>> {
        self.current
            .load_full()
            .filter(|snapshot| snapshot.is_fresh_at(Utc::now()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
