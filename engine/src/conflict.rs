//! Conflict reports: what a concurrent writer changed under us.
//!
//! A report is computed from two snapshots, the caller's proposed values and
//! the values currently stored. It is purely diagnostic; nothing in the engine
//! merges from it.

use crate::{FieldName, Fields, VersionTag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One field whose proposed and stored values differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConflict {
    /// Field name
    pub field: FieldName,
    /// Value in the store (`None` when the store has no such field)
    pub current: Option<Value>,
    /// Value the caller tried to write (`None` when the caller dropped it)
    pub proposed: Option<Value>,
}

/// Per-field differences between proposed and stored values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    /// Differing fields, ordered by field name
    pub fields: Vec<FieldConflict>,
}

impl ConflictReport {
    /// Compare `proposed` against `current`.
    ///
    /// Fields with equal values are left out, and `version_field` is never
    /// compared.
    pub fn compute(proposed: &Fields, current: &Fields, version_field: &str) -> Self {
        let names: BTreeSet<&String> = proposed.keys().chain(current.keys()).collect();

        let fields = names
            .into_iter()
            .filter(|name| name.as_str() != version_field)
            .filter_map(|name| {
                let mine = proposed.get(name.as_str());
                let theirs = current.get(name.as_str());
                if mine == theirs {
                    return None;
                }
                Some(FieldConflict {
                    field: name.clone(),
                    current: theirs.cloned(),
                    proposed: mine.cloned(),
                })
            })
            .collect();

        Self { fields }
    }

    /// True when no field differs (a conflict on tag alone).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of differing fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Look up the entry for one field.
    pub fn field(&self, name: &str) -> Option<&FieldConflict> {
        self.fields.iter().find(|f| f.field == name)
    }

    /// True if the report mentions `name`.
    pub fn touches(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// What a conditional write ran into: the report plus the store's current
/// revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// Differences between proposed and current values
    pub report: ConflictReport,
    /// Tag of the revision currently stored
    pub current_version_tag: VersionTag,
    /// Values currently stored
    pub current_values: Fields,
}
