//! Document store contract and an in-memory implementation.
//!
//! The store is the only collaborator the resolver talks to. Its one hard
//! requirement is that [`DocumentStore::conditional_write`] compares and swaps
//! the tag atomically; everything else about concurrency follows from that.

use crate::{
    CollectionName, DocumentKey, Fields, StoreError, VersionTag, VersionedRecord,
};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of a point read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadResult {
    /// The document and the tag of its current revision
    Found(VersionedRecord),
    /// No document under that key
    NotFound,
}

/// Result of a conditional or unconditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// Values stored; the new revision's tag
    Success(VersionTag),
    /// The stored tag was not the expected one; nothing was written
    VersionMismatch,
    /// No document under that key
    NotFound,
}

/// Result of an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Document created with this tag
    Created(VersionTag),
    /// A document already exists under that key
    AlreadyExists,
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    Deleted,
    VersionMismatch,
    NotFound,
}

/// Conjunction of field-equality predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    /// Every listed field must equal the given value
    #[serde(default)]
    pub equals: Fields,
}

impl Filter {
    /// Match everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality predicate (builder pattern).
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    /// Whether `values` satisfies every predicate.
    pub fn matches(&self, values: &Fields) -> bool {
        self.equals
            .iter()
            .all(|(field, expected)| values.get(field) == Some(expected))
    }
}

/// A document store with point reads, conditional writes and partition-scoped
/// queries.
///
/// Transport problems and cancellations are the only `Err` cases; everything
/// else is a normal result the caller is expected to branch on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the current revision of a document.
    async fn read(&self, key: &DocumentKey) -> Result<ReadResult, StoreError>;

    /// Write `values` only if the stored tag still equals `expected`.
    async fn conditional_write(
        &self,
        key: &DocumentKey,
        values: &Fields,
        expected: &VersionTag,
    ) -> Result<WriteResult, StoreError>;

    /// Write `values` whatever the stored tag is. Never returns
    /// [`WriteResult::VersionMismatch`].
    async fn replace(&self, key: &DocumentKey, values: &Fields)
        -> Result<WriteResult, StoreError>;

    /// Create a new document.
    async fn insert(&self, key: &DocumentKey, values: &Fields)
        -> Result<InsertResult, StoreError>;

    /// Delete a document, optionally only if its tag equals `expected`.
    async fn delete(
        &self,
        key: &DocumentKey,
        expected: Option<&VersionTag>,
    ) -> Result<DeleteResult, StoreError>;

    /// Documents of `collection` matching `filter`, restricted to one
    /// partition when `partition_key` is given. Ordered by id.
    async fn query(
        &self,
        collection: &str,
        partition_key: Option<&str>,
        filter: &Filter,
    ) -> Result<Vec<VersionedRecord>, StoreError>;
}

#[derive(Debug, Clone)]
struct StoredDocument {
    values: Fields,
    version_tag: VersionTag,
}

/// In-memory [`DocumentStore`].
///
/// Tags come from one store-wide counter (`v1`, `v2`, ...), so a tag is never
/// reused, even for a document deleted and created again.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<DocumentKey, StoredDocument>,
    tag_counter: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Names of collections holding at least one document, sorted.
    pub fn collections(&self) -> Vec<CollectionName> {
        let mut names: Vec<_> = self
            .documents
            .iter()
            .map(|entry| entry.key().collection.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn next_tag(&self) -> VersionTag {
        let n = self.tag_counter.fetch_add(1, Ordering::SeqCst) + 1;
        VersionTag::new(format!("v{}", n))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, key: &DocumentKey) -> Result<ReadResult, StoreError> {
        Ok(match self.documents.get(key) {
            Some(doc) => ReadResult::Found(VersionedRecord::new(
                key.clone(),
                doc.values.clone(),
                doc.version_tag.clone(),
            )),
            None => ReadResult::NotFound,
        })
    }

    async fn conditional_write(
        &self,
        key: &DocumentKey,
        values: &Fields,
        expected: &VersionTag,
    ) -> Result<WriteResult, StoreError> {
        // The shard write lock is held from the comparison to the swap.
        let Some(mut doc) = self.documents.get_mut(key) else {
            return Ok(WriteResult::NotFound);
        };
        if doc.version_tag != *expected {
            return Ok(WriteResult::VersionMismatch);
        }

        let tag = self.next_tag();
        doc.values = values.clone();
        doc.version_tag = tag.clone();
        Ok(WriteResult::Success(tag))
    }

    async fn replace(
        &self,
        key: &DocumentKey,
        values: &Fields,
    ) -> Result<WriteResult, StoreError> {
        let Some(mut doc) = self.documents.get_mut(key) else {
            return Ok(WriteResult::NotFound);
        };

        let tag = self.next_tag();
        doc.values = values.clone();
        doc.version_tag = tag.clone();
        Ok(WriteResult::Success(tag))
    }

    async fn insert(
        &self,
        key: &DocumentKey,
        values: &Fields,
    ) -> Result<InsertResult, StoreError> {
        match self.documents.entry(key.clone()) {
            Entry::Occupied(_) => Ok(InsertResult::AlreadyExists),
            Entry::Vacant(slot) => {
                let tag = self.next_tag();
                slot.insert(StoredDocument {
                    values: values.clone(),
                    version_tag: tag.clone(),
                });
                Ok(InsertResult::Created(tag))
            }
        }
    }

    async fn delete(
        &self,
        key: &DocumentKey,
        expected: Option<&VersionTag>,
    ) -> Result<DeleteResult, StoreError> {
        let removed = self.documents.remove_if(key, |_, doc| {
            expected.map_or(true, |tag| doc.version_tag == *tag)
        });

        Ok(match removed {
            Some(_) => DeleteResult::Deleted,
            None if self.documents.contains_key(key) => DeleteResult::VersionMismatch,
            None => DeleteResult::NotFound,
        })
    }

    async fn query(
        &self,
        collection: &str,
        partition_key: Option<&str>,
        filter: &Filter,
    ) -> Result<Vec<VersionedRecord>, StoreError> {
        let mut records: Vec<_> = self
            .documents
            .iter()
            .filter(|entry| entry.key().collection == collection)
            .filter(|entry| {
                partition_key.map_or(true, |pk| entry.key().partition_key.as_deref() == Some(pk))
            })
            .filter(|entry| filter.matches(&entry.value().values))
            .map(|entry| {
                VersionedRecord::new(
                    entry.key().clone(),
                    entry.value().values.clone(),
                    entry.value().version_tag.clone(),
                )
            })
            .collect();

        records.sort_by(|a, b| a.key.id.cmp(&b.key.id));
        Ok(records)
    }
}
