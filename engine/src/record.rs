//! Record types for documents read from and written to a store.

use crate::{error::Result, CollectionName, DocumentId, Error, Fields, PartitionKeyValue, VersionTag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identity of a document: collection, id and (optional) partition key.
///
/// Two documents with the same id in different partitions are different
/// documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentKey {
    /// Collection (container) the document lives in
    pub collection: CollectionName,
    /// Document id, unique within its partition
    pub id: DocumentId,
    /// Partition key value, if the collection is partitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<PartitionKeyValue>,
}

impl DocumentKey {
    /// Key for a document in an unpartitioned collection.
    pub fn new(collection: impl Into<CollectionName>, id: impl Into<DocumentId>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            partition_key: None,
        }
    }

    /// Key for a document in a partitioned collection.
    pub fn partitioned(
        collection: impl Into<CollectionName>,
        id: impl Into<DocumentId>,
        partition_key: impl Into<PartitionKeyValue>,
    ) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            partition_key: Some(partition_key.into()),
        }
    }

    /// Reject keys that cannot address anything.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() || self.collection.trim().is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(())
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.partition_key {
            Some(pk) => write!(f, "{}/{}[{}]", self.collection, self.id, pk),
            None => write!(f, "{}/{}", self.collection, self.id),
        }
    }
}

/// A document together with the tag it was read (or written) with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedRecord {
    /// Where the document lives
    pub key: DocumentKey,
    /// Field values
    pub values: Fields,
    /// Tag of the stored revision these values came from
    pub version_tag: VersionTag,
}

impl VersionedRecord {
    /// Create a record.
    pub fn new(key: DocumentKey, values: Fields, version_tag: VersionTag) -> Self {
        Self {
            key,
            values,
            version_tag,
        }
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a field value, returning the previous one.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(field.into(), value.into())
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }
}

/// Convert a JSON object into [`Fields`].
pub fn fields_from_value(value: Value) -> Result<Fields> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidPayload(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
