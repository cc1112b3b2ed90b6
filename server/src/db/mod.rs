//! Database module for PostgreSQL persistence.

mod documents;
mod pool;
mod store;

pub use pool::*;
pub use store::PgStore;
