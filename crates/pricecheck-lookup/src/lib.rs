//! # pricecheck-lookup: Resolution Engine
//!
//! Exact barcode lookup and fragment search over a retail store whose
//! schema varies per deployment.
//!
//! ## Module Organization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  service.rs    ProductResolutionService   lookup / search, spans,      │
//! │                                           slow-operation warnings      │
//! │  strategy.rs   LookupStrategy + the four strategies                    │
//! │  assembler.rs  ResultAssembler            units, current unit, price   │
//! │  source.rs     ProductSource              store seam (async trait)     │
//! │  error.rs      LookupError                what the transport maps      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pricecheck_db::{Database, DbConfig, SchemaCache};
//! use pricecheck_lookup::ProductResolutionService;
//!
//! let db = Database::connect(DbConfig::from_deployment(&config)).await?;
//! let cache = SchemaCache::from_config(db.introspector(), &config)?;
//! let service = ProductResolutionService::new(config, cache, db.products());
//!
//! let result = service.lookup("(01)06923644237943", &cancel).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod assembler;
pub mod error;
pub mod service;
pub mod source;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use assembler::ResultAssembler;
pub use error::{EngineResult, LookupError};
pub use service::ProductResolutionService;
pub use source::ProductSource;
pub use strategy::{
    BarcodeTableStrategy, CompositeStrategy, FieldStrategy, FunctionStrategy, LookupStrategy,
    StrategyMatch,
};
