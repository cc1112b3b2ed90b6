//! Reconciliation policies: what to do after losing a conditional write.

use crate::{ConflictReport, FieldName};
use serde::{Deserialize, Serialize};

/// Decision taken on a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictResolution {
    /// Give up; leave the store as the other writer left it
    Abort,
    /// Retry with the caller's values against the current tag
    OverwriteWithMine,
}

/// Caller-supplied decision function.
pub trait ReconciliationPolicy: Send + Sync {
    fn decide(&self, report: &ConflictReport) -> ConflictResolution;
}

impl<F> ReconciliationPolicy for F
where
    F: Fn(&ConflictReport) -> ConflictResolution + Send + Sync,
{
    fn decide(&self, report: &ConflictReport) -> ConflictResolution {
        self(report)
    }
}

/// Always abort.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAbort;

impl ReconciliationPolicy for AlwaysAbort {
    fn decide(&self, _report: &ConflictReport) -> ConflictResolution {
        ConflictResolution::Abort
    }
}

/// Always keep retrying with the caller's values.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOverwrite;

impl ReconciliationPolicy for AlwaysOverwrite {
    fn decide(&self, _report: &ConflictReport) -> ConflictResolution {
        ConflictResolution::OverwriteWithMine
    }
}

/// Overwrite unless the concurrent writer changed one of the protected fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectFields(pub Vec<FieldName>);

impl ProtectFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }
}

impl ReconciliationPolicy for ProtectFields {
    fn decide(&self, report: &ConflictReport) -> ConflictResolution {
        if self.0.iter().any(|field| report.touches(field)) {
            ConflictResolution::Abort
        } else {
            ConflictResolution::OverwriteWithMine
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldConflict;
    use serde_json::json;

    fn report(fields: &[&str]) -> ConflictReport {
        ConflictReport {
            fields: fields
                .iter()
                .map(|f| FieldConflict {
                    field: f.to_string(),
                    current: Some(json!("theirs")),
                    proposed: Some(json!("mine")),
                })
                .collect(),
        }
    }

    #[test]
    fn fixed_policies() {
        assert_eq!(AlwaysAbort.decide(&report(&["street"])), ConflictResolution::Abort);
        assert_eq!(
            AlwaysOverwrite.decide(&report(&["street"])),
            ConflictResolution::OverwriteWithMine
        );
    }

    #[test]
    fn protected_fields() {
        let policy = ProtectFields::new(["houseNumber"]);
        assert_eq!(
            policy.decide(&report(&["street"])),
            ConflictResolution::OverwriteWithMine
        );
        assert_eq!(
            policy.decide(&report(&["street", "houseNumber"])),
            ConflictResolution::Abort
        );
    }

    #[test]
    fn closures_are_policies() {
        let small_only = |report: &ConflictReport| {
            if report.len() <= 1 {
                ConflictResolution::OverwriteWithMine
            } else {
                ConflictResolution::Abort
            }
        };
        assert_eq!(
            small_only.decide(&report(&["street"])),
            ConflictResolution::OverwriteWithMine
        );
        assert_eq!(
            small_only.decide(&report(&["street", "city"])),
            ConflictResolution::Abort
        );
    }
}
