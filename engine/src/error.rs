//! Error types for the Concord engine.

use crate::{CollectionName, PartitionKeyValue};
use std::time::Duration;
use thiserror::Error;

/// All possible errors from the Concord engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("document key must not be empty")]
    EmptyKey,

    #[error("max attempts must be at least 1, got {0}")]
    InvalidMaxAttempts(u32),

    #[error("collection not found: {0}")]
    CollectionNotFound(CollectionName),

    #[error("missing partition key for collection '{collection}' (path '{path}')")]
    MissingPartitionKey {
        collection: CollectionName,
        path: String,
    },

    #[error("collection '{0}' is not partitioned, but the key carries a partition key")]
    UnexpectedPartitionKey(CollectionName),

    #[error("partition key mismatch: key says {expected:?}, document field says {actual:?}")]
    PartitionKeyMismatch {
        expected: Option<PartitionKeyValue>,
        actual: Option<PartitionKeyValue>,
    },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Store outcomes surfaced as errors
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("store transport failure: {0}")]
    Transport(String),

    #[error("store call cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    /// True when the error came from the caller's context giving up on a
    /// store call, rather than from the store itself.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

/// Failure of a single store round-trip.
///
/// These are the only failures a [`DocumentStore`](crate::DocumentStore) reports
/// through `Err`; not-found and version mismatches are ordinary results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transport(msg) => Error::Transport(msg),
            StoreError::Cancelled(msg) => Error::Cancelled(msg),
            StoreError::DeadlineExceeded(d) => {
                Error::Cancelled(format!("deadline of {:?} exceeded", d))
            }
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::NotFound("Address/Address-1".into());
        assert_eq!(err.to_string(), "document not found: Address/Address-1");

        let err = Error::InvalidMaxAttempts(0);
        assert_eq!(err.to_string(), "max attempts must be at least 1, got 0");

        let err = Error::MissingPartitionKey {
            collection: "Address".into(),
            path: "state".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing partition key for collection 'Address' (path 'state')"
        );
    }

    #[test]
    fn store_error_conversion() {
        let err: Error = StoreError::Transport("connection refused".into()).into();
        assert_eq!(err, Error::Transport("connection refused".into()));
        assert!(!err.is_cancellation());

        let err: Error = StoreError::DeadlineExceeded(Duration::from_millis(250)).into();
        assert!(err.is_cancellation());
        assert_eq!(err.to_string(), "store call cancelled: deadline of 250ms exceeded");
    }
}
