//! Demo data.
//!
//! Two documents to try conflicts against: an address partitioned by state
//! and a driver in an unpartitioned container.

use chrono::{TimeZone, Utc};
use concord_engine::{
    fields_from_value, DocumentKey, DocumentStore, Error, InsertResult, Result, Schema,
};
use serde_json::json;

/// Insert the demo documents, leaving existing ones alone.
///
/// Returns how many documents were created.
pub async fn seed_demo_data(store: &dyn DocumentStore, schema: &Schema) -> Result<usize> {
    let employment_begin = Utc
        .with_ymd_and_hms(2022, 1, 17, 9, 0, 0)
        .single()
        .ok_or_else(|| Error::InvalidPayload("invalid demo timestamp".to_string()))?;

    let documents = [
        (
            DocumentKey::partitioned("Address", "Address-1", "Utah"),
            json!({
                "id": "Address-1",
                "street": "Course Road",
                "houseNumber": "1234",
                "city": "Salt Lake City",
                "state": "Utah",
            }),
        ),
        (
            DocumentKey::new("Driver", "Driver-1"),
            json!({
                "id": "Driver-1",
                "firstName": "Jurgen",
                "lastName": "Kevelaers",
                "employmentBeginUtc": employment_begin.to_rfc3339(),
            }),
        ),
    ];

    let mut created = 0;
    for (key, values) in documents {
        let values = fields_from_value(values)?;
        schema.validate(&key, &values)?;

        match store.insert(&key, &values).await? {
            InsertResult::Created(version_tag) => {
                tracing::info!(%key, %version_tag, "seeded demo document");
                created += 1;
            }
            InsertResult::AlreadyExists => {
                tracing::debug!(%key, "demo document already present");
            }
        }
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_engine::{ContainerSchema, MemoryStore, ReadResult};

    #[tokio::test]
    async fn seeds_once() {
        let store = MemoryStore::new();
        let schema = Schema::new()
            .with_container(ContainerSchema::new("Address").with_partition_key("state"));

        assert_eq!(seed_demo_data(&store, &schema).await.unwrap(), 2);
        assert_eq!(seed_demo_data(&store, &schema).await.unwrap(), 0);
        assert_eq!(store.len(), 2);

        let key = DocumentKey::new("Driver", "Driver-1");
        let ReadResult::Found(driver) = store.read(&key).await.unwrap() else {
            panic!("driver not seeded");
        };
        assert_eq!(
            driver.get("employmentBeginUtc"),
            Some(&json!("2022-01-17T09:00:00+00:00"))
        );
    }

    #[tokio::test]
    async fn rejects_schema_that_disagrees_with_demo_data() {
        let store = MemoryStore::new();
        let schema = Schema::new()
            .with_container(ContainerSchema::new("Address").with_partition_key("city"));

        assert!(matches!(
            seed_demo_data(&store, &schema).await,
            Err(Error::PartitionKeyMismatch { .. })
        ));
    }
}
