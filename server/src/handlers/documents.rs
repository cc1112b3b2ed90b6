//! Document handlers - create, read, conditional replace, delete and query.

use crate::error::{AppError, Result};
use crate::AppState;
use concord_engine::{
    fields_from_value, DeleteResult, DocumentKey, Error as EngineError, Fields, Filter,
    InsertResult, SaveOutcome, VersionTag, VersionedRecord,
};
use serde::{Deserialize, Serialize};

/// Partition key passed as a query parameter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionQuery {
    pub partition_key: Option<String>,
}

/// Request body for creating a document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub id: String,
    /// Taken from the container's partition key field when omitted
    pub partition_key: Option<String>,
    pub values: serde_json::Value,
}

/// Request body for replacing a document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteDocumentRequest {
    pub values: serde_json::Value,
}

/// Request body for querying a collection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub partition_key: Option<String>,
    #[serde(default)]
    pub equals: Fields,
}

/// A document as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub collection: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
    pub values: Fields,
    pub etag: VersionTag,
}

impl From<VersionedRecord> for DocumentResponse {
    fn from(record: VersionedRecord) -> Self {
        Self {
            collection: record.key.collection,
            id: record.key.id,
            partition_key: record.key.partition_key,
            values: record.values,
            etag: record.version_tag,
        }
    }
}

/// Response for a query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub documents: Vec<DocumentResponse>,
    pub count: usize,
}

/// Definition of `collection`, or an error if the schema is strict and does
/// not know it.
fn known_container<'a>(
    state: &'a AppState,
    collection: &str,
) -> Result<Option<&'a concord_engine::ContainerSchema>> {
    match state.schema.container(collection) {
        None if !state.schema.allow_unknown => {
            Err(EngineError::CollectionNotFound(collection.to_string()).into())
        }
        container => Ok(container),
    }
}

/// Build the key a request addresses.
///
/// For partitioned containers the partition key may be left out when the
/// values carry it.
pub fn document_key(
    state: &AppState,
    collection: &str,
    id: &str,
    partition_key: Option<String>,
    values: Option<&Fields>,
) -> Result<DocumentKey> {
    let container = known_container(state, collection)?;

    let partition_key = match (partition_key, container) {
        (Some(pk), _) => Some(pk),
        (None, Some(container)) if container.partition_key_path.is_some() => {
            match values.and_then(|v| container.partition_key_of(v)) {
                Some(pk) => Some(pk),
                None => {
                    return Err(EngineError::MissingPartitionKey {
                        collection: collection.to_string(),
                        path: container.partition_key_path.clone().unwrap_or_default(),
                    }
                    .into())
                }
            }
        }
        (None, _) => None,
    };

    let key = DocumentKey {
        collection: collection.to_string(),
        id: id.to_string(),
        partition_key,
    };
    state.schema.validate_key(&key)?;
    Ok(key)
}

/// Create a new document.
pub async fn create_document(
    state: &AppState,
    collection: &str,
    request: CreateDocumentRequest,
) -> Result<DocumentResponse> {
    let values = fields_from_value(request.values)?;
    let key = document_key(state, collection, &request.id, request.partition_key, Some(&values))?;
    state.schema.validate(&key, &values)?;

    match state.store.insert(&key, &values).await.map_err(EngineError::from)? {
        InsertResult::Created(version_tag) => {
            tracing::info!(%key, %version_tag, "document created");
            Ok(VersionedRecord::new(key, values, version_tag).into())
        }
        InsertResult::AlreadyExists => Err(EngineError::AlreadyExists(key.to_string()).into()),
    }
}

/// Read the current revision of a document.
pub async fn get_document(
    state: &AppState,
    collection: &str,
    id: &str,
    query: PartitionQuery,
) -> Result<DocumentResponse> {
    let key = document_key(state, collection, id, query.partition_key, None)?;
    let record = state.resolver().read(&key).await?;
    Ok(record.into())
}

/// Replace a document if its tag still equals `if_match`.
///
/// A lost race is answered with the conflict, never retried.
pub async fn replace_document(
    state: &AppState,
    collection: &str,
    id: &str,
    query: PartitionQuery,
    if_match: VersionTag,
    request: WriteDocumentRequest,
) -> Result<DocumentResponse> {
    let values = fields_from_value(request.values)?;
    let key = document_key(state, collection, id, query.partition_key, Some(&values))?;
    let record = VersionedRecord::new(key, values, if_match.clone());

    match state.resolver().save(&record, &if_match).await? {
        SaveOutcome::Committed { version_tag } => {
            Ok(VersionedRecord::new(record.key, record.values, version_tag).into())
        }
        SaveOutcome::Conflicted { conflict, .. } => Err(AppError::conflict(conflict)),
        SaveOutcome::Aborted { last_conflict } => {
            Err(AppError::PreconditionFailed(last_conflict.map(Box::new)))
        }
    }
}

/// Replace a document without checking its tag.
pub async fn force_overwrite_document(
    state: &AppState,
    collection: &str,
    id: &str,
    query: PartitionQuery,
    request: WriteDocumentRequest,
) -> Result<DocumentResponse> {
    let values = fields_from_value(request.values)?;
    let key = document_key(state, collection, id, query.partition_key, Some(&values))?;
    let mut record = VersionedRecord::new(key, values, VersionTag::new(""));

    record.version_tag = state.resolver().force_overwrite(&record).await?;
    Ok(record.into())
}

/// Delete a document, only if its tag equals `if_match` when one is given.
pub async fn delete_document(
    state: &AppState,
    collection: &str,
    id: &str,
    query: PartitionQuery,
    if_match: Option<VersionTag>,
) -> Result<()> {
    let key = document_key(state, collection, id, query.partition_key, None)?;

    match state
        .store
        .delete(&key, if_match.as_ref())
        .await
        .map_err(EngineError::from)?
    {
        DeleteResult::Deleted => {
            tracing::info!(%key, "document deleted");
            Ok(())
        }
        DeleteResult::VersionMismatch => Err(AppError::PreconditionFailed(None)),
        DeleteResult::NotFound => Err(EngineError::NotFound(key.to_string()).into()),
    }
}

/// Documents of a collection matching every `equals` predicate.
pub async fn query_documents(
    state: &AppState,
    collection: &str,
    request: QueryRequest,
) -> Result<QueryResponse> {
    known_container(state, collection)?;

    let filter = Filter {
        equals: request.equals,
    };
    let documents: Vec<DocumentResponse> = state
        .store
        .query(collection, request.partition_key.as_deref(), &filter)
        .await
        .map_err(EngineError::from)?
        .into_iter()
        .map(DocumentResponse::from)
        .collect();

    Ok(QueryResponse {
        count: documents.len(),
        documents,
    })
}
