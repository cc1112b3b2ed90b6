//! [`DocumentStore`] backed by PostgreSQL.

use async_trait::async_trait;
use concord_engine::{
    DeleteResult, DocumentKey, DocumentStore, Fields, Filter, InsertResult, ReadResult,
    StoreError, VersionTag, VersionedRecord, WriteResult,
};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use super::{documents, Pool};

/// PostgreSQL document store.
///
/// Every call runs under a deadline; a call that overruns it is reported as
/// [`StoreError::DeadlineExceeded`]. New etags are random UUIDs.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(sqlx::Error::PoolTimedOut)) => Err(StoreError::DeadlineExceeded(self.timeout)),
            Ok(Err(e)) => Err(StoreError::Transport(e.to_string())),
            Err(_) => Err(StoreError::DeadlineExceeded(self.timeout)),
        }
    }
}

fn new_etag() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn read(&self, key: &DocumentKey) -> Result<ReadResult, StoreError> {
        let row = self.bounded(documents::get_document(&self.pool, key)).await?;
        Ok(match row {
            Some(stored) => ReadResult::Found(stored.into_record()),
            None => ReadResult::NotFound,
        })
    }

    async fn conditional_write(
        &self,
        key: &DocumentKey,
        values: &Fields,
        expected: &VersionTag,
    ) -> Result<WriteResult, StoreError> {
        let etag = new_etag();
        let updated = self
            .bounded(documents::update_document_if_match(
                &self.pool,
                key,
                values,
                &etag,
                expected.as_str(),
            ))
            .await?;

        if updated {
            return Ok(WriteResult::Success(VersionTag::new(etag)));
        }

        // No row matched: tell a moved tag apart from a missing document
        if self.bounded(documents::document_exists(&self.pool, key)).await? {
            Ok(WriteResult::VersionMismatch)
        } else {
            Ok(WriteResult::NotFound)
        }
    }

    async fn replace(&self, key: &DocumentKey, values: &Fields) -> Result<WriteResult, StoreError> {
        let etag = new_etag();
        let updated = self
            .bounded(documents::replace_document(&self.pool, key, values, &etag))
            .await?;

        Ok(if updated {
            WriteResult::Success(VersionTag::new(etag))
        } else {
            WriteResult::NotFound
        })
    }

    async fn insert(&self, key: &DocumentKey, values: &Fields) -> Result<InsertResult, StoreError> {
        let etag = new_etag();
        let created = self
            .bounded(documents::insert_document(&self.pool, key, values, &etag))
            .await?;

        Ok(if created {
            InsertResult::Created(VersionTag::new(etag))
        } else {
            InsertResult::AlreadyExists
        })
    }

    async fn delete(
        &self,
        key: &DocumentKey,
        expected: Option<&VersionTag>,
    ) -> Result<DeleteResult, StoreError> {
        let deleted = self
            .bounded(documents::delete_document(
                &self.pool,
                key,
                expected.map(VersionTag::as_str),
            ))
            .await?;

        if deleted {
            return Ok(DeleteResult::Deleted);
        }

        if expected.is_some() && self.bounded(documents::document_exists(&self.pool, key)).await? {
            Ok(DeleteResult::VersionMismatch)
        } else {
            Ok(DeleteResult::NotFound)
        }
    }

    async fn query(
        &self,
        collection: &str,
        partition_key: Option<&str>,
        filter: &Filter,
    ) -> Result<Vec<VersionedRecord>, StoreError> {
        let rows = self
            .bounded(documents::query_documents(
                &self.pool,
                collection,
                partition_key,
                &filter.equals,
            ))
            .await?;

        Ok(rows.into_iter().map(documents::StoredDocument::into_record).collect())
    }
}
