//! # Database Pool Management
//!
//! Connection pool creation and configuration for the retail store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Host Startup                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::from_deployment(&config) ← pool settings + timeouts         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::connect(config).await ← read-only sessions                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │              PgPool                      │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.products() / db.introspector()                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session Settings
//! Every connection starts with:
//! - `default_transaction_read_only = on` (nothing here writes)
//! - `statement_timeout = <query timeout>` so the server aborts a runaway
//!   statement even if the client-side timeout has already given up

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use pricecheck_core::DeploymentConfig;

use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;
use crate::repository::schema::SchemaIntrospector;

// =============================================================================
// Configuration
// =============================================================================

/// Database pool configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("postgres://reader@localhost/retail")
///     .max_connections(5)
///     .query_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL connection URL.
    pub url: String,

    /// Maximum number of connections in the pool.
    /// Default: 10
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a free connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Per-call query timeout, applied client side and as the session's
    /// `statement_timeout`.
    /// Default: 15 seconds
    pub query_timeout: Duration,
}

impl DbConfig {
    /// Creates a configuration with defaults for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        DbConfig {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            query_timeout: Duration::from_secs(15),
        }
    }

    /// Pool settings taken from a validated deployment configuration.
    pub fn from_deployment(config: &DeploymentConfig) -> Self {
        DbConfig::new(config.database.url.clone())
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .query_timeout(config.query_timeout())
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets the per-call query timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::connect(DbConfig::from_deployment(&config)).await?;
/// let repo = db.products();
/// let cache = SchemaCache::new(db.introspector(), config.schema_ttl());
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    query_timeout: Duration,
}

impl Database {
    /// Creates the connection pool.
    ///
    /// ## What This Does
    /// 1. Parses the URL into connect options
    /// 2. Adds the read-only and `statement_timeout` session settings
    /// 3. Creates the pool (min connections are opened eagerly)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError::ConnectionFailed)` - Bad URL or unreachable server
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        info!(
            max_connections = config.max_connections,
            query_timeout_ms = config.query_timeout.as_millis() as u64,
            "Initializing database connection"
        );

        let statement_timeout = config.query_timeout.as_millis().to_string();
        let connect_options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .application_name("pricecheck")
            .options([
                ("default_transaction_read_only", "on"),
                ("statement_timeout", statement_timeout.as_str()),
            ]);

        debug!("Connection options configured");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database pool created");

        Ok(Database {
            pool,
            query_timeout: config.query_timeout,
        })
    }

    /// Per-call query timeout.
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Returns the product repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.query_timeout)
    }

    /// Returns the schema introspector used by the snapshot cache.
    pub fn introspector(&self) -> SchemaIntrospector {
        SchemaIntrospector::new(self.pool.clone(), self.query_timeout)
    }

    /// Closes the connection pool.
    ///
    /// ## Note
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("postgres://reader@localhost/retail")
            .max_connections(4)
            .min_connections(2)
            .query_timeout(Duration::from_secs(5));

        assert_eq!(config.max_connections, 4);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.query_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_config_from_deployment() {
        let mut deployment = DeploymentConfig::default();
        deployment.database.url = "postgres://reader@db/retail".to_string();
        deployment.database.max_connections = 3;
        deployment.lookup.query_timeout_secs = 7;

        let config = DbConfig::from_deployment(&deployment);
        assert_eq!(config.url, "postgres://reader@db/retail");
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.query_timeout, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let result = Database::connect(DbConfig::new("not a url")).await;
        assert!(matches!(result, Err(DbError::ConnectionFailed(_))));
    }
}
