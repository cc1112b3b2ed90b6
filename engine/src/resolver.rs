//! Conflict detection and resolution around conditional writes.
//!
//! # Protocol
//!
//! 1. The caller reads a document and remembers its tag
//! 2. [`ConflictResolver::save`] writes the caller's values on condition that
//!    the stored tag is still the remembered one
//! 3. If another writer got there first, the current revision is read back and
//!    diffed against the caller's values into a [`ConflictReport`]
//! 4. [`ConflictResolver::reconcile`] asks a [`ReconciliationPolicy`] what to
//!    do: abort, or adopt the current tag as baseline and write again, up to
//!    `max_attempts` writes in total
//!
//! The resolver holds no locks and no state per key. Two loops racing on one
//! key are serialized by the store's compare-and-swap alone; whichever write
//! lands first wins and the other sees a conflict.

use crate::{
    error::Result, Conflict, ConflictReport, ConflictResolution, DocumentKey, DocumentStore,
    Error, EventSink, NoopSink, ReadResult, ReconciliationPolicy, ResolverEvent, SaveAttempt,
    Schema, VersionTag, VersionedRecord, WriteResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a save or of a whole reconcile loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SaveOutcome {
    /// The write landed; the document now has this tag.
    #[serde(rename_all = "camelCase")]
    Committed { version_tag: VersionTag },
    /// A concurrent write was detected and nothing was written.
    /// `attempts_exhausted` is set when the reconcile loop ran out of attempts
    /// rather than being stopped by its policy.
    #[serde(rename_all = "camelCase")]
    Conflicted {
        conflict: Conflict,
        attempts_exhausted: bool,
    },
    /// A store call was cancelled mid-loop. Carries the last conflict seen
    /// before that, if any.
    #[serde(rename_all = "camelCase")]
    Aborted { last_conflict: Option<Conflict> },
}

impl SaveOutcome {
    /// Whether the values were persisted.
    pub fn is_committed(&self) -> bool {
        matches!(self, SaveOutcome::Committed { .. })
    }

    /// The conflict that stopped the save, if one did.
    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            SaveOutcome::Committed { .. } => None,
            SaveOutcome::Conflicted { conflict, .. } => Some(conflict),
            SaveOutcome::Aborted { last_conflict } => last_conflict.as_ref(),
        }
    }
}

/// Result of [`ConflictResolver::reconcile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// How the loop ended
    pub outcome: SaveOutcome,
    /// Conditional writes issued, including the final one
    pub attempts: u32,
    /// Every conflict report observed, in order
    pub reports: Vec<ConflictReport>,
    /// The attempt as it stood when the loop ended. Its values are still the
    /// caller's; after an exhausted overwrite its tag is the one the last
    /// conflict reported.
    pub attempt: SaveAttempt,
}

enum WriteOutcome {
    Committed(VersionTag),
    Conflicted(Conflict),
}

/// Drives conditional writes against a [`DocumentStore`].
pub struct ConflictResolver<S: ?Sized> {
    store: Arc<S>,
    schema: Arc<Schema>,
    sink: Arc<dyn EventSink>,
}

impl<S: ?Sized> Clone for ConflictResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            schema: Arc::clone(&self.schema),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: DocumentStore + ?Sized> ConflictResolver<S> {
    /// Create a resolver with a permissive schema and no diagnostics.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            schema: Arc::new(Schema::default()),
            sink: Arc::new(NoopSink),
        }
    }

    /// Use `schema` for partition key checks and the tag field name.
    pub fn with_schema(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Report progress to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The schema in use.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Read the current revision of a document.
    pub async fn read(&self, key: &DocumentKey) -> Result<VersionedRecord> {
        self.schema.validate_key(key)?;
        match self.store.read(key).await? {
            ReadResult::Found(record) => Ok(record),
            ReadResult::NotFound => Err(Error::NotFound(key.to_string())),
        }
    }

    /// Write `record.values` if the stored tag still equals `original_tag`.
    ///
    /// Returns `Committed` or `Conflicted`, never `Aborted`. A missing
    /// document is [`Error::NotFound`]; transport failures and cancellations
    /// are returned as they come, without retrying.
    pub async fn save(
        &self,
        record: &VersionedRecord,
        original_tag: &VersionTag,
    ) -> Result<SaveOutcome> {
        Ok(match self.write_once(record, original_tag, 1).await? {
            WriteOutcome::Committed(version_tag) => SaveOutcome::Committed { version_tag },
            WriteOutcome::Conflicted(conflict) => SaveOutcome::Conflicted {
                conflict,
                attempts_exhausted: false,
            },
        })
    }

    /// Save with bounded retries, asking `policy` after every conflict.
    ///
    /// Stops on commit, on [`ConflictResolution::Abort`], or after
    /// `max_attempts` conditional writes (`attempts_exhausted = true`). A
    /// cancelled store call ends the loop with [`SaveOutcome::Aborted`].
    pub async fn reconcile<P>(
        &self,
        mut attempt: SaveAttempt,
        policy: &P,
        max_attempts: u32,
    ) -> Result<Reconciliation>
    where
        P: ReconciliationPolicy + ?Sized,
    {
        if max_attempts == 0 {
            return Err(Error::InvalidMaxAttempts(max_attempts));
        }

        let mut attempts = 0;
        let mut reports = Vec::new();
        let mut last_conflict: Option<Conflict> = None;

        loop {
            attempts += 1;

            let written = self
                .write_once(&attempt.record, &attempt.original_tag, attempts)
                .await;

            let conflict = match written {
                Ok(WriteOutcome::Committed(version_tag)) => {
                    return Ok(Reconciliation {
                        outcome: SaveOutcome::Committed { version_tag },
                        attempts,
                        reports,
                        attempt,
                    });
                }
                Ok(WriteOutcome::Conflicted(conflict)) => conflict,
                Err(err) if err.is_cancellation() => {
                    self.emit(ResolverEvent::Aborted {
                        key: attempt.key().clone(),
                        attempt: attempts,
                        reason: err.to_string(),
                    });
                    return Ok(Reconciliation {
                        outcome: SaveOutcome::Aborted { last_conflict },
                        attempts,
                        reports,
                        attempt,
                    });
                }
                Err(err) => return Err(err),
            };

            reports.push(conflict.report.clone());

            match policy.decide(&conflict.report) {
                ConflictResolution::Abort => {
                    self.emit(ResolverEvent::Aborted {
                        key: attempt.key().clone(),
                        attempt: attempts,
                        reason: "policy chose to abort".to_string(),
                    });
                    return Ok(Reconciliation {
                        outcome: SaveOutcome::Conflicted {
                            conflict,
                            attempts_exhausted: false,
                        },
                        attempts,
                        reports,
                        attempt,
                    });
                }
                ConflictResolution::OverwriteWithMine if attempts < max_attempts => {
                    self.emit(ResolverEvent::Retrying {
                        key: attempt.key().clone(),
                        attempt: attempts,
                        new_baseline: conflict.current_version_tag.clone(),
                    });
                    attempt.restamp(conflict.current_version_tag.clone());
                    last_conflict = Some(conflict);
                }
                ConflictResolution::OverwriteWithMine => {
                    self.emit(ResolverEvent::Exhausted {
                        key: attempt.key().clone(),
                        attempts,
                    });
                    // Leave the attempt ready for a later retry on the newest revision
                    attempt.restamp(conflict.current_version_tag.clone());
                    return Ok(Reconciliation {
                        outcome: SaveOutcome::Conflicted {
                            conflict,
                            attempts_exhausted: true,
                        },
                        attempts,
                        reports,
                        attempt,
                    });
                }
            }
        }
    }

    /// Replace the stored values without any tag check.
    ///
    /// This deliberately bypasses conflict detection; whatever a concurrent
    /// writer stored is lost. Fails with [`Error::NotFound`] if there is no
    /// document to replace.
    pub async fn force_overwrite(&self, record: &VersionedRecord) -> Result<VersionTag> {
        self.schema.validate(&record.key, &record.values)?;

        match self.store.replace(&record.key, &record.values).await? {
            WriteResult::Success(version_tag) => {
                self.emit(ResolverEvent::ForcedOverwrite {
                    key: record.key.clone(),
                    version_tag: version_tag.clone(),
                });
                Ok(version_tag)
            }
            WriteResult::NotFound => Err(Error::NotFound(record.key.to_string())),
            WriteResult::VersionMismatch => Err(Error::Transport(format!(
                "store reported a version mismatch on unconditional replace of {}",
                record.key
            ))),
        }
    }

    async fn write_once(
        &self,
        record: &VersionedRecord,
        original_tag: &VersionTag,
        attempt: u32,
    ) -> Result<WriteOutcome> {
        let key = &record.key;
        self.schema.validate(key, &record.values)?;

        self.emit(ResolverEvent::WriteAttempted {
            key: key.clone(),
            attempt,
            expected_tag: original_tag.clone(),
        });

        match self
            .store
            .conditional_write(key, &record.values, original_tag)
            .await?
        {
            WriteResult::Success(version_tag) => {
                self.emit(ResolverEvent::Committed {
                    key: key.clone(),
                    attempt,
                    version_tag: version_tag.clone(),
                });
                Ok(WriteOutcome::Committed(version_tag))
            }
            WriteResult::NotFound => Err(Error::NotFound(key.to_string())),
            WriteResult::VersionMismatch => {
                // Deleted between the failed write and this read: still not found.
                let current = match self.store.read(key).await? {
                    ReadResult::Found(current) => current,
                    ReadResult::NotFound => return Err(Error::NotFound(key.to_string())),
                };

                let report = ConflictReport::compute(
                    &record.values,
                    &current.values,
                    self.schema.etag_field(&key.collection),
                );

                self.emit(ResolverEvent::Conflicted {
                    key: key.clone(),
                    attempt,
                    current_tag: current.version_tag.clone(),
                    report: report.clone(),
                });

                Ok(WriteOutcome::Conflicted(Conflict {
                    report,
                    current_version_tag: current.version_tag,
                    current_values: current.values,
                }))
            }
        }
    }

    fn emit(&self, event: ResolverEvent) {
        self.sink.on_event(&event);
    }
}
