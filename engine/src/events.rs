//! Diagnostics hooks.
//!
//! The resolver never logs. It reports what it is doing to an [`EventSink`],
//! and the caller decides whether that ends up in a log, a metric or nowhere.

use crate::{ConflictReport, DocumentKey, VersionTag};
use serde::Serialize;

/// Something the resolver did or observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ResolverEvent {
    /// A conditional write is about to be issued.
    #[serde(rename_all = "camelCase")]
    WriteAttempted {
        key: DocumentKey,
        attempt: u32,
        expected_tag: VersionTag,
    },
    /// A conditional write succeeded.
    #[serde(rename_all = "camelCase")]
    Committed {
        key: DocumentKey,
        attempt: u32,
        version_tag: VersionTag,
    },
    /// A conditional write lost against a concurrent writer.
    #[serde(rename_all = "camelCase")]
    Conflicted {
        key: DocumentKey,
        attempt: u32,
        current_tag: VersionTag,
        report: ConflictReport,
    },
    /// The policy chose to overwrite; the attempt now expects `new_baseline`.
    #[serde(rename_all = "camelCase")]
    Retrying {
        key: DocumentKey,
        attempt: u32,
        new_baseline: VersionTag,
    },
    /// The loop stopped without committing, by policy or cancellation.
    #[serde(rename_all = "camelCase")]
    Aborted {
        key: DocumentKey,
        attempt: u32,
        reason: String,
    },
    /// Every allowed attempt ended in a conflict.
    #[serde(rename_all = "camelCase")]
    Exhausted { key: DocumentKey, attempts: u32 },
    /// An unconditional replace bypassed the tag check.
    #[serde(rename_all = "camelCase")]
    ForcedOverwrite {
        key: DocumentKey,
        version_tag: VersionTag,
    },
}

impl ResolverEvent {
    /// The document the event is about.
    pub fn key(&self) -> &DocumentKey {
        match self {
            ResolverEvent::WriteAttempted { key, .. }
            | ResolverEvent::Committed { key, .. }
            | ResolverEvent::Conflicted { key, .. }
            | ResolverEvent::Retrying { key, .. }
            | ResolverEvent::Aborted { key, .. }
            | ResolverEvent::Exhausted { key, .. }
            | ResolverEvent::ForcedOverwrite { key, .. } => key,
        }
    }
}

/// Receiver of [`ResolverEvent`]s.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &ResolverEvent);
}

impl<F> EventSink for F
where
    F: Fn(&ResolverEvent) + Send + Sync,
{
    fn on_event(&self, event: &ResolverEvent) {
        self(event)
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&self, _event: &ResolverEvent) {}
}
