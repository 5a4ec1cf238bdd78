//! # pricecheck-db: Database Layer for Pricecheck
//!
//! Read-only access to a retail store whose physical schema varies per
//! deployment. Nothing in this crate knows the schema at compile time: the
//! product table's columns are introspected, cached, and every statement is
//! built from the configuration plus that snapshot.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pricecheck Data Flow                             │
//! │                                                                         │
//! │  ProductResolutionService (pricecheck-lookup)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  pricecheck-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  sql builder │  │   │
//! │  │   │   (pool.rs)   │    │ (product.rs)  │    │  (sql/)      │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ PgPool        │◄───│ ProductRepo   │◄───│ statements   │  │   │
//! │  │   │ read-only     │    │ Introspector  │    │ expr, ident  │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                        ┌───────┴────────┐                      │   │
//! │  │                        │  SchemaCache   │  arc-swap snapshot   │   │
//! │  │                        └────────────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           PostgreSQL (legacy retail schema, read-only)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and session settings
//! - [`schema_cache`] - Single-flight schema snapshot cache
//! - [`sql`] - Identifier quoting, expressions and statements
//! - [`repository`] - Statement execution (products, introspection)
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pricecheck_db::{Database, DbConfig, SchemaCache};
//!
//! let db = Database::connect(DbConfig::from_deployment(&config)).await?;
//! let cache = SchemaCache::from_config(db.introspector(), &config)?;
//!
//! let snapshot = cache.get_snapshot(&cancel).await?;
//! let context = LookupContext::resolve(&config, snapshot)?;
//! let row = db.products().find_by_field(&context, "barcode", "6925303714857", &cancel).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pool;
pub mod repository;
pub mod schema_cache;
pub mod sql;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use schema_cache::{SchemaCache, SchemaSource};

// Repository re-exports for convenience
pub use repository::product::ProductRepository;
pub use repository::schema::SchemaIntrospector;
