//! Container definitions.
//!
//! A container declares which field holds its partition key and which field
//! carries the version tag. Both matter to the resolver: the partition key
//! field must agree with the key a write is addressed to, and the tag field is
//! excluded from conflict reports.

use crate::{error::Result, CollectionName, DocumentKey, Error, FieldName, Fields, PartitionKeyValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// Field name stores use for their system tag when nothing else is declared.
pub const DEFAULT_ETAG_FIELD: &str = "_etag";

/// Definition of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSchema {
    /// Container (collection) name
    pub name: CollectionName,
    /// Field holding the partition key, if partitioned
    pub partition_key_path: Option<FieldName>,
    /// Field carrying the version tag
    pub etag_field: FieldName,
}

impl ContainerSchema {
    /// An unpartitioned container using the default tag field.
    pub fn new(name: impl Into<CollectionName>) -> Self {
        Self {
            name: name.into(),
            partition_key_path: None,
            etag_field: DEFAULT_ETAG_FIELD.to_string(),
        }
    }

    /// Partition the container by `path`.
    pub fn with_partition_key(mut self, path: impl Into<FieldName>) -> Self {
        self.partition_key_path = Some(path.into());
        self
    }

    /// Carry the version tag in a custom field.
    pub fn with_etag_field(mut self, field: impl Into<FieldName>) -> Self {
        self.etag_field = field.into();
        self
    }

    /// Partition key value found in `values`, if any.
    pub fn partition_key_of(&self, values: &Fields) -> Option<PartitionKeyValue> {
        let path = self.partition_key_path.as_ref()?;
        match values.get(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Check that `key` addresses a document of this container: a partition
    /// key is present exactly when the container declares one.
    pub fn validate_key(&self, key: &DocumentKey) -> Result<()> {
        match (&self.partition_key_path, &key.partition_key) {
            (Some(path), None) => Err(Error::MissingPartitionKey {
                collection: self.name.clone(),
                path: path.clone(),
            }),
            (None, Some(_)) => Err(Error::UnexpectedPartitionKey(self.name.clone())),
            _ => Ok(()),
        }
    }

    /// Check that `values` may be stored under `key`.
    pub fn validate(&self, key: &DocumentKey, values: &Fields) -> Result<()> {
        self.validate_key(key)?;
        let Some(expected) = &key.partition_key else {
            return Ok(());
        };

        let actual = self.partition_key_of(values);
        if actual.as_ref() != Some(expected) {
            return Err(Error::PartitionKeyMismatch {
                expected: Some(expected.clone()),
                actual,
            });
        }
        Ok(())
    }
}

/// The set of known containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Containers by name
    pub containers: HashMap<CollectionName, ContainerSchema>,
    /// Whether collections without a definition are accepted
    pub allow_unknown: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            containers: HashMap::new(),
            allow_unknown: true,
        }
    }
}

impl Schema {
    /// An empty, permissive schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject collections that have no definition.
    pub fn strict(mut self) -> Self {
        self.allow_unknown = false;
        self
    }

    /// Add a container definition (builder pattern).
    pub fn with_container(mut self, container: ContainerSchema) -> Self {
        self.add_container(container);
        self
    }

    /// Add a container definition.
    pub fn add_container(&mut self, container: ContainerSchema) {
        self.containers.insert(container.name.clone(), container);
    }

    /// Look up a container.
    pub fn container(&self, name: &str) -> Option<&ContainerSchema> {
        self.containers.get(name)
    }

    /// Tag field for a collection.
    pub fn etag_field(&self, collection: &str) -> &str {
        self.container(collection)
            .map(|c| c.etag_field.as_str())
            .unwrap_or(DEFAULT_ETAG_FIELD)
    }

    /// Check that `key` may address a document. Containers without a
    /// definition take the key's partition as given.
    pub fn validate_key(&self, key: &DocumentKey) -> Result<()> {
        key.validate()?;
        match self.container(&key.collection) {
            Some(container) => container.validate_key(key),
            None if self.allow_unknown => Ok(()),
            None => Err(Error::CollectionNotFound(key.collection.clone())),
        }
    }

    /// Check that `values` may be written under `key`.
    pub fn validate(&self, key: &DocumentKey, values: &Fields) -> Result<()> {
        self.validate_key(key)?;
        match self.container(&key.collection) {
            Some(container) => container.validate(key, values),
            None => Ok(()),
        }
    }
}

/// Parses `Name[:partitionPath[:etagField]]` entries separated by commas,
/// e.g. `Address:state:customETag,Driver`. An empty partition path means
/// unpartitioned.
impl FromStr for Schema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut schema = Schema::new();

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.split(':').map(str::trim);
            let name = parts.next().unwrap_or_default();
            if name.is_empty() {
                return Err(Error::InvalidPayload(format!(
                    "container entry '{}' has no name",
                    entry
                )));
            }

            let mut container = ContainerSchema::new(name);
            if let Some(path) = parts.next().filter(|p| !p.is_empty()) {
                container = container.with_partition_key(path);
            }
            if let Some(field) = parts.next().filter(|f| !f.is_empty()) {
                container = container.with_etag_field(field);
            }
            if parts.next().is_some() {
                return Err(Error::InvalidPayload(format!(
                    "container entry '{}' has too many parts",
                    entry
                )));
            }

            schema.add_container(container);
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fields_from_value;
    use serde_json::json;

    fn transport_schema() -> Schema {
        Schema::new()
            .with_container(
                ContainerSchema::new("Address")
                    .with_partition_key("state")
                    .with_etag_field("customETag"),
            )
            .with_container(ContainerSchema::new("Driver"))
    }

    #[test]
    fn partition_key_must_match_document_field() {
        let schema = transport_schema();
        let values = fields_from_value(json!({"state": "Utah", "street": "Course Road"})).unwrap();

        let key = DocumentKey::partitioned("Address", "Address-1", "Utah");
        assert!(schema.validate(&key, &values).is_ok());

        let key = DocumentKey::partitioned("Address", "Address-1", "Nevada");
        assert_eq!(
            schema.validate(&key, &values),
            Err(Error::PartitionKeyMismatch {
                expected: Some("Nevada".into()),
                actual: Some("Utah".into()),
            })
        );

        let key = DocumentKey::new("Address", "Address-1");
        assert_eq!(
            schema.validate(&key, &values),
            Err(Error::MissingPartitionKey {
                collection: "Address".into(),
                path: "state".into(),
            })
        );
    }

    #[test]
    fn document_without_partition_field_rejected() {
        let schema = transport_schema();
        let values = fields_from_value(json!({"street": "Course Road"})).unwrap();
        let key = DocumentKey::partitioned("Address", "Address-1", "Utah");

        assert_eq!(
            schema.validate(&key, &values),
            Err(Error::PartitionKeyMismatch {
                expected: Some("Utah".into()),
                actual: None,
            })
        );
    }

    #[test]
    fn partition_key_rejected_for_unpartitioned_container() {
        let schema = transport_schema();
        let values = fields_from_value(json!({"firstName": "Jurgen"})).unwrap();

        let key = DocumentKey::partitioned("Driver", "Driver-1", "x");
        assert_eq!(
            schema.validate(&key, &values),
            Err(Error::UnexpectedPartitionKey("Driver".into()))
        );
        assert_eq!(
            schema.validate_key(&key),
            Err(Error::UnexpectedPartitionKey("Driver".into()))
        );
        assert!(schema.validate(&DocumentKey::new("Driver", "Driver-1"), &values).is_ok());

        // Undeclared containers take whatever partition the caller addresses
        let key = DocumentKey::partitioned("Trip", "Trip-1", "x");
        assert!(schema.validate_key(&key).is_ok());
    }

    #[test]
    fn numeric_partition_key_compared_as_text() {
        let container = ContainerSchema::new("Vehicle").with_partition_key("year");
        let values = fields_from_value(json!({"year": 2019})).unwrap();
        assert_eq!(container.partition_key_of(&values), Some("2019".into()));
    }

    #[test]
    fn etag_field_lookup() {
        let schema = transport_schema();
        assert_eq!(schema.etag_field("Address"), "customETag");
        assert_eq!(schema.etag_field("Driver"), DEFAULT_ETAG_FIELD);
        assert_eq!(schema.etag_field("Trip"), DEFAULT_ETAG_FIELD);
    }

    #[test]
    fn unknown_collections() {
        let values = Fields::new();
        let key = DocumentKey::new("Trip", "Trip-1");

        assert!(transport_schema().validate(&key, &values).is_ok());
        assert_eq!(
            transport_schema().strict().validate(&key, &values),
            Err(Error::CollectionNotFound("Trip".into()))
        );
    }

    #[test]
    fn parse_container_list() {
        let schema: Schema = "Address:state:customETag, Driver ,Vehicle:make".parse().unwrap();

        assert_eq!(schema, transport_schema().with_container(
            ContainerSchema::new("Vehicle").with_partition_key("make")
        ));
    }

    #[test]
    fn parse_rejects_bad_entries() {
        assert!("Address:state:etag:extra".parse::<Schema>().is_err());
        assert!(":state".parse::<Schema>().is_err());
        assert_eq!("".parse::<Schema>().unwrap(), Schema::new());
    }

    #[test]
    fn parse_empty_partition_path_means_unpartitioned() {
        let schema: Schema = "Driver::driverTag".parse().unwrap();
        let driver = schema.container("Driver").unwrap();
        assert_eq!(driver.partition_key_path, None);
        assert_eq!(driver.etag_field, "driverTag");
    }
}
