//! Request handlers for document operations.

mod documents;
mod reconcile;

pub use documents::*;
pub use reconcile::*;
