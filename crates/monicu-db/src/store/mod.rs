//! PostgreSQL store
//!
//! [`PgStore`] hands out [`PgUnitOfWork`]s, each wrapping one open
//! transaction. [`PgPostQuery`] serves the read API straight from the pool.

mod error;
mod pg;
mod query;

pub use pg::{PgStore, PgUnitOfWork};
pub use query::PgPostQuery;
