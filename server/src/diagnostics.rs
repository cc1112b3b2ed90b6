//! Resolver events routed into `tracing`.

use concord_engine::{EventSink, ResolverEvent};

/// [`EventSink`] that logs every resolver event.
///
/// Conflicts are logged at `warn` together with one `debug` line per
/// differing field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&self, event: &ResolverEvent) {
        match event {
            ResolverEvent::WriteAttempted {
                key,
                attempt,
                expected_tag,
            } => {
                tracing::debug!(%key, attempt, expected_tag = %expected_tag, "conditional write");
            }
            ResolverEvent::Committed {
                key,
                attempt,
                version_tag,
            } => {
                tracing::info!(%key, attempt, version_tag = %version_tag, "write committed");
            }
            ResolverEvent::Conflicted {
                key,
                attempt,
                current_tag,
                report,
            } => {
                tracing::warn!(
                    %key,
                    attempt,
                    current_tag = %current_tag,
                    fields = report.len(),
                    "write conflicted with a concurrent update"
                );
                for field in &report.fields {
                    tracing::debug!(
                        %key,
                        field = %field.field,
                        current = ?field.current,
                        proposed = ?field.proposed,
                        "conflicting field"
                    );
                }
            }
            ResolverEvent::Retrying {
                key,
                attempt,
                new_baseline,
            } => {
                tracing::info!(%key, attempt, new_baseline = %new_baseline, "retrying on current revision");
            }
            ResolverEvent::Aborted {
                key,
                attempt,
                reason,
            } => {
                tracing::info!(%key, attempt, reason = %reason, "reconcile aborted");
            }
            ResolverEvent::Exhausted { key, attempts } => {
                tracing::warn!(%key, attempts, "reconcile gave up after every attempt conflicted");
            }
            ResolverEvent::ForcedOverwrite { key, version_tag } => {
                tracing::warn!(%key, version_tag = %version_tag, "document overwritten without tag check");
            }
        }
    }
}
