//! Save attempts: a proposed record plus the tag it was based on.

use crate::{DocumentKey, Fields, VersionTag, VersionedRecord};
use serde::{Deserialize, Serialize};

/// A pending conditional write.
///
/// `record.values` are the values the caller wants stored; `original_tag` is
/// the tag the caller's copy was read with and is what the store compares
/// against. The record's own `version_tag` is not consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAttempt {
    /// Proposed record
    pub record: VersionedRecord,
    /// Tag this attempt expects to find in the store
    pub original_tag: VersionTag,
}

impl SaveAttempt {
    /// Build an attempt from a record whose `version_tag` is the tag it was
    /// read with.
    pub fn from_read(record: VersionedRecord) -> Self {
        let original_tag = record.version_tag.clone();
        Self {
            record,
            original_tag,
        }
    }

    /// Build an attempt with an explicit original tag.
    pub fn new(record: VersionedRecord, original_tag: VersionTag) -> Self {
        Self {
            record,
            original_tag,
        }
    }

    /// The document this attempt targets.
    pub fn key(&self) -> &DocumentKey {
        &self.record.key
    }

    /// The values this attempt will write.
    pub fn proposed(&self) -> &Fields {
        &self.record.values
    }

    /// Accept `tag` as the new baseline for the version check.
    ///
    /// Only the expected tag moves; proposed values stay the caller's.
    pub fn restamp(&mut self, tag: VersionTag) {
        self.original_tag = tag;
    }
}
