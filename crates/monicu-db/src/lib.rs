//! # monicu-db
//!
//! Storage layer implementing the `monicu-core` storage traits.
//!
//! ## Overview
//!
//! - Connection pool management and schema setup
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - `PgStore`: unit-of-work implementation over a PostgreSQL transaction
//! - `PgPostQuery`: read-side listings for the HTTP API
//! - `MemoryStore`: in-process implementation of the same traits
//!
//! ## Usage
//!
//! ```rust,ignore
//! use monicu_db::{create_pool, ensure_schema, DatabaseConfig, PgStore};
//! use monicu_core::traits::Store;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::from_env()).await?;
//!     ensure_schema(&pool).await?;
//!     let store = PgStore::new(pool);
//!
//!     let mut tx = store.begin().await?;
//!     // ...
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod store;

// Re-export commonly used types
pub use memory::{MemoryStore, TableCounts};
pub use pool::{create_pool, ensure_schema, DatabaseConfig, PgPool};
pub use store::{PgPostQuery, PgStore, PgUnitOfWork};
