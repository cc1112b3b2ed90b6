//! Database operations for the documents table.

use concord_engine::{DocumentKey, Fields, VersionTag, VersionedRecord};
use sqlx::{PgPool, Row};

/// A stored document row from the database.
#[derive(Debug)]
pub struct StoredDocument {
    pub collection: String,
    pub partition_key: String,
    pub id: String,
    pub body: serde_json::Value,
    pub etag: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredDocument {
            collection: row.try_get("collection")?,
            partition_key: row.try_get("partition_key")?,
            id: row.try_get("id")?,
            body: row.try_get("body")?,
            etag: row.try_get("etag")?,
        })
    }
}

impl StoredDocument {
    /// Convert database row to a concord-engine record.
    pub fn into_record(self) -> VersionedRecord {
        let key = DocumentKey {
            collection: self.collection,
            id: self.id,
            partition_key: (!self.partition_key.is_empty()).then_some(self.partition_key),
        };
        let values = match self.body {
            serde_json::Value::Object(map) => map,
            _ => Fields::new(),
        };
        VersionedRecord::new(key, values, VersionTag::new(self.etag))
    }
}

/// Partition column value for a key. Unpartitioned documents use `''`.
pub fn partition_column(key: &DocumentKey) -> &str {
    key.partition_key.as_deref().unwrap_or("")
}

/// Get a single document.
pub async fn get_document(
    pool: &PgPool,
    key: &DocumentKey,
) -> Result<Option<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        SELECT collection, partition_key, id, body, etag
        FROM documents
        WHERE collection = $1 AND partition_key = $2 AND id = $3
        "#,
    )
    .bind(&key.collection)
    .bind(partition_column(key))
    .bind(&key.id)
    .fetch_optional(pool)
    .await
}

/// Check whether a document exists.
pub async fn document_exists(pool: &PgPool, key: &DocumentKey) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM documents
            WHERE collection = $1 AND partition_key = $2 AND id = $3
        ) AS present
        "#,
    )
    .bind(&key.collection)
    .bind(partition_column(key))
    .bind(&key.id)
    .fetch_one(pool)
    .await?;

    row.try_get("present")
}

/// Insert a new document. Returns `false` if it already exists.
pub async fn insert_document(
    pool: &PgPool,
    key: &DocumentKey,
    body: &Fields,
    etag: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO documents (collection, partition_key, id, body, etag)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (collection, partition_key, id) DO NOTHING
        "#,
    )
    .bind(&key.collection)
    .bind(partition_column(key))
    .bind(&key.id)
    .bind(serde_json::Value::Object(body.clone()))
    .bind(etag)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Replace the body only if the stored etag equals `expected`.
///
/// Returns `false` when no row matched, either because the tag moved on or
/// the document is gone.
pub async fn update_document_if_match(
    pool: &PgPool,
    key: &DocumentKey,
    body: &Fields,
    new_etag: &str,
    expected: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET body = $4, etag = $5, updated_at = now()
        WHERE collection = $1 AND partition_key = $2 AND id = $3 AND etag = $6
        "#,
    )
    .bind(&key.collection)
    .bind(partition_column(key))
    .bind(&key.id)
    .bind(serde_json::Value::Object(body.clone()))
    .bind(new_etag)
    .bind(expected)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Replace the body whatever the stored etag is. Returns `false` if the
/// document does not exist.
pub async fn replace_document(
    pool: &PgPool,
    key: &DocumentKey,
    body: &Fields,
    new_etag: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET body = $4, etag = $5, updated_at = now()
        WHERE collection = $1 AND partition_key = $2 AND id = $3
        "#,
    )
    .bind(&key.collection)
    .bind(partition_column(key))
    .bind(&key.id)
    .bind(serde_json::Value::Object(body.clone()))
    .bind(new_etag)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Delete a document, optionally only if its etag equals `expected`.
pub async fn delete_document(
    pool: &PgPool,
    key: &DocumentKey,
    expected: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM documents
        WHERE collection = $1 AND partition_key = $2 AND id = $3
          AND ($4::text IS NULL OR etag = $4)
        "#,
    )
    .bind(&key.collection)
    .bind(partition_column(key))
    .bind(&key.id)
    .bind(expected)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Documents of a collection whose body contains every field of `equals`,
/// optionally restricted to one partition. Ordered by id.
pub async fn query_documents(
    pool: &PgPool,
    collection: &str,
    partition_key: Option<&str>,
    equals: &Fields,
) -> Result<Vec<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        SELECT collection, partition_key, id, body, etag
        FROM documents
        WHERE collection = $1
          AND ($2::text IS NULL OR partition_key = $2)
          AND body @> $3
        ORDER BY id ASC
        "#,
    )
    .bind(collection)
    .bind(partition_key)
    .bind(serde_json::Value::Object(equals.clone()))
    .fetch_all(pool)
    .await
}
