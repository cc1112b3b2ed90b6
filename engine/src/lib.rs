//! # Concord Engine
//!
//! Optimistic concurrency for document stores, built on entity tags.
//!
//! Every stored document carries a [`VersionTag`] that changes on each write.
//! A writer remembers the tag it read, and its write only lands if the tag in
//! the store is still that one. When it is not, somebody else wrote first: the
//! engine reads the current revision back, reports which fields differ, and
//! lets a caller-supplied policy decide whether to give up or write again on
//! top of the new revision.
//!
//! ## Design Principles
//!
//! - **Store-agnostic**: all IO goes through the [`DocumentStore`] trait
//! - **Lock-free**: concurrency is settled by the store's compare-and-swap,
//!   never by in-process locks
//! - **Explicit values**: a save takes the proposed values and the original tag
//!   as plain snapshots; nothing is tracked behind the caller's back
//! - **Outcomes, not exceptions**: conflicts are return values; only missing
//!   documents, invalid input and transport problems are errors
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`VersionedRecord`] is a [`DocumentKey`] (collection, id, optional
//! partition key), a map of field values and the tag it was read with.
//!
//! ### Saving
//!
//! - [`ConflictResolver::save`] - one conditional write
//! - [`ConflictResolver::reconcile`] - bounded retry loop driven by a
//!   [`ReconciliationPolicy`]
//! - [`ConflictResolver::force_overwrite`] - unconditional replace, kept
//!   separate so it is never taken by accident
//!
//! ### Diagnostics
//!
//! The resolver does not log. Attach an [`EventSink`] to observe
//! [`ResolverEvent`]s.
//!
//! ## Quick Start
//!
//! ```rust
//! use concord_engine::{
//!     AlwaysOverwrite, ConflictResolver, DocumentKey, DocumentStore, MemoryStore,
//!     SaveAttempt, SaveOutcome,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> concord_engine::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let key = DocumentKey::partitioned("Address", "Address-1", "Utah");
//! let values = concord_engine::fields_from_value(json!({
//!     "state": "Utah",
//!     "street": "Course Road",
//! }))?;
//! store.insert(&key, &values).await?;
//!
//! let resolver = ConflictResolver::new(store);
//!
//! // Two writers read the same revision
//! let mut a = resolver.read(&key).await?;
//! let mut b = resolver.read(&key).await?;
//! a.set("street", "A St");
//! b.set("street", "B St");
//!
//! // A wins the race
//! let outcome = resolver.save(&a, &a.version_tag).await?;
//! assert!(outcome.is_committed());
//!
//! // B conflicts, then overwrites on top of A's revision
//! let result = resolver
//!     .reconcile(SaveAttempt::from_read(b), &AlwaysOverwrite, 3)
//!     .await?;
//! assert_eq!(result.attempts, 2);
//! assert!(matches!(result.outcome, SaveOutcome::Committed { .. }));
//! # Ok(())
//! # }
//! ```

pub mod conflict;
pub mod error;
pub mod events;
pub mod operation;
pub mod policy;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod tag;

// Re-export main types at crate root
pub use conflict::{Conflict, ConflictReport, FieldConflict};
pub use error::{Error, Result, StoreError};
pub use events::{EventSink, NoopSink, ResolverEvent};
pub use operation::SaveAttempt;
pub use policy::{AlwaysAbort, AlwaysOverwrite, ConflictResolution, ProtectFields, ReconciliationPolicy};
pub use record::{fields_from_value, DocumentKey, VersionedRecord};
pub use resolver::{ConflictResolver, Reconciliation, SaveOutcome};
pub use schema::{ContainerSchema, Schema, DEFAULT_ETAG_FIELD};
pub use store::{
    DeleteResult, DocumentStore, Filter, InsertResult, MemoryStore, ReadResult, WriteResult,
};
pub use tag::VersionTag;

/// Type aliases for clarity
pub type CollectionName = String;
pub type DocumentId = String;
pub type PartitionKeyValue = String;
pub type FieldName = String;
pub type Fields = serde_json::Map<String, serde_json::Value>;
