//! Reconcile handler - save with bounded retries under a named policy.

use super::documents::document_key;
use crate::error::{AppError, Result};
use crate::AppState;
use concord_engine::{
    fields_from_value, AlwaysAbort, AlwaysOverwrite, ConflictReport, FieldName, ProtectFields,
    ReconciliationPolicy, SaveAttempt, SaveOutcome, VersionTag, VersionedRecord,
};
use serde::{Deserialize, Serialize};

/// Policy a client can ask for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PolicyRequest {
    /// Give up on the first conflict.
    Abort,
    /// Re-apply the proposed values on top of every newer revision.
    OverwriteWithMine,
    /// Overwrite unless a listed field was changed concurrently.
    #[serde(rename_all = "camelCase")]
    ProtectFields { fields: Vec<FieldName> },
}

impl PolicyRequest {
    fn into_policy(self) -> Box<dyn ReconciliationPolicy> {
        match self {
            PolicyRequest::Abort => Box::new(AlwaysAbort),
            PolicyRequest::OverwriteWithMine => Box::new(AlwaysOverwrite),
            PolicyRequest::ProtectFields { fields } => Box::new(ProtectFields(fields)),
        }
    }
}

/// Request body for reconcile.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    pub partition_key: Option<String>,
    /// Proposed values
    pub values: serde_json::Value,
    /// Tag the client read the document with
    pub original_etag: VersionTag,
    pub policy: PolicyRequest,
    /// Defaults to, and may not exceed, the server's `RECONCILE_MAX_ATTEMPTS`
    pub max_attempts: Option<u32>,
}

/// Response for reconcile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub outcome: SaveOutcome,
    /// Conditional writes issued
    pub attempts: u32,
    /// One report per conflict, oldest first
    pub reports: Vec<ConflictReport>,
}

/// Run a reconcile loop for one document.
///
/// Every terminal outcome is a successful response; only invalid input,
/// missing documents and store failures are errors.
pub async fn handle_reconcile(
    state: &AppState,
    collection: &str,
    id: &str,
    request: ReconcileRequest,
) -> Result<ReconcileResponse> {
    let values = fields_from_value(request.values)?;
    let key = document_key(state, collection, id, request.partition_key, Some(&values))?;
    let limit = state.config.max_attempts;
    let max_attempts = request.max_attempts.unwrap_or(limit);
    if max_attempts > limit {
        return Err(AppError::BadRequest(format!(
            "maxAttempts may not exceed {}",
            limit
        )));
    }

    let record = VersionedRecord::new(key, values, request.original_etag.clone());
    let attempt = SaveAttempt::new(record, request.original_etag);
    let policy = request.policy.into_policy();

    let result = state
        .resolver()
        .reconcile(attempt, policy.as_ref(), max_attempts)
        .await?;

    tracing::debug!(
        key = %result.attempt.key(),
        attempts = result.attempts,
        committed = result.outcome.is_committed(),
        "reconcile finished"
    );

    Ok(ReconcileResponse {
        outcome: result.outcome,
        attempts: result.attempts,
        reports: result.reports,
    })
}
