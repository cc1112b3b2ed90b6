//! Shared fixtures for concord-engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use concord_engine::{
    fields_from_value, DeleteResult, DocumentKey, DocumentStore, Fields, Filter, InsertResult,
    MemoryStore, ReadResult, StoreError, VersionTag, VersionedRecord, WriteResult,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// A [`MemoryStore`] wrapper that can inject competing writes and failures
/// into the conditional-write path.
#[derive(Default)]
pub struct ScriptedStore {
    inner: MemoryStore,
    competing_writes: AtomicU32,
    failure: Mutex<Option<(u32, StoreError)>>,
    write_calls: AtomicU32,
    read_calls: AtomicU32,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Before each of the next `n` conditional writes, another writer replaces
    /// the document first.
    pub fn with_competing_writes(self, n: u32) -> Self {
        self.competing_writes.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the `call`-th conditional write (1-based) with `error`.
    pub fn fail_write(self, call: u32, error: StoreError) -> Self {
        *self.failure.lock().unwrap() = Some((call, error));
        self
    }

    /// Conditional writes issued so far.
    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Point reads issued so far.
    pub fn read_calls(&self) -> u32 {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    async fn interfere(&self, key: &DocumentKey) -> Result<(), StoreError> {
        let remaining = self.competing_writes.load(Ordering::SeqCst);
        if remaining == 0 {
            return Ok(());
        }
        self.competing_writes.store(remaining - 1, Ordering::SeqCst);

        if let ReadResult::Found(mut current) = self.inner.read(key).await? {
            current.set("street", format!("Competitor {} St", remaining));
            self.inner.replace(key, &current.values).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn read(&self, key: &DocumentKey) -> Result<ReadResult, StoreError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.read(key).await
    }

    async fn conditional_write(
        &self,
        key: &DocumentKey,
        values: &Fields,
        expected: &VersionTag,
    ) -> Result<WriteResult, StoreError> {
        let call = self.write_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let failure = self.failure.lock().unwrap().clone();
        if let Some((fail_on, error)) = failure {
            if fail_on == call {
                return Err(error);
            }
        }

        self.interfere(key).await?;
        self.inner.conditional_write(key, values, expected).await
    }

    async fn replace(&self, key: &DocumentKey, values: &Fields) -> Result<WriteResult, StoreError> {
        self.inner.replace(key, values).await
    }

    async fn insert(&self, key: &DocumentKey, values: &Fields) -> Result<InsertResult, StoreError> {
        self.inner.insert(key, values).await
    }

    async fn delete(
        &self,
        key: &DocumentKey,
        expected: Option<&VersionTag>,
    ) -> Result<DeleteResult, StoreError> {
        self.inner.delete(key, expected).await
    }

    async fn query(
        &self,
        collection: &str,
        partition_key: Option<&str>,
        filter: &Filter,
    ) -> Result<Vec<VersionedRecord>, StoreError> {
        self.inner.query(collection, partition_key, filter).await
    }
}

pub fn fields(value: Value) -> Fields {
    fields_from_value(value).unwrap()
}

pub fn address_key() -> DocumentKey {
    DocumentKey::partitioned("Address", "Address-1", "Utah")
}

pub fn address_values() -> Fields {
    fields(json!({
        "addressId": "Address-1",
        "city": "Salt Lake City",
        "state": "Utah",
        "street": "Course Road",
        "houseNumber": "1234",
    }))
}

/// Insert the Address-1 fixture and return its tag.
pub async fn seed_address<S: DocumentStore + ?Sized>(store: &S) -> VersionTag {
    match store.insert(&address_key(), &address_values()).await.unwrap() {
        InsertResult::Created(tag) => tag,
        InsertResult::AlreadyExists => panic!("Address-1 already seeded"),
    }
}
