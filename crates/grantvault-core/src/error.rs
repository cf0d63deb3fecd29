//! Error types for grant storage operations.
//!
//! Every store operation returns either a value or exactly one [`StoreError`].
//! Errors are never retried inside the store.

use std::fmt;

/// The record set an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Client registration.
    Client,
    /// Authorization code.
    Authorization,
    /// Access grant.
    Access,
    /// Refresh token mapping.
    Refresh,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Authorization => write!(f, "authorize"),
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Errors that can occur during grant storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record matches the requested key.
    #[error("Record not found: {kind}/{key}")]
    NotFound {
        /// Record set that was queried.
        kind: RecordKind,
        /// Key that was looked up.
        key: String,
    },

    /// A record with the same primary key already exists.
    #[error("Duplicate key: {kind}/{key}")]
    DuplicateKey {
        /// Record set the insert targeted.
        kind: RecordKind,
        /// Conflicting key.
        key: String,
    },

    /// A record referenced by the one being loaded could not be resolved.
    #[error("Inconsistent reference: {message}")]
    ReferenceInconsistent {
        /// Which reference failed to resolve.
        message: String,
    },

    /// Commit or rollback failed inside an atomic unit.
    ///
    /// When a rollback fails while handling another error, that original
    /// error is kept in `source`.
    #[error("Transaction failure: {message}")]
    TransactionFailure {
        /// Description of the commit/rollback failure.
        message: String,
        /// The error that triggered the rollback, if any.
        #[source]
        source: Option<Box<StoreError>>,
    },

    /// The storage engine could not be reached.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of the connection failure.
        message: String,
    },

    /// Any other backend failure (bad row data, unexpected driver error).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: RecordKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Creates a new `DuplicateKey` error.
    #[must_use]
    pub fn duplicate_key(kind: RecordKind, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            kind,
            key: key.into(),
        }
    }

    /// Creates a new `ReferenceInconsistent` error.
    #[must_use]
    pub fn reference_inconsistent(message: impl Into<String>) -> Self {
        Self::ReferenceInconsistent {
            message: message.into(),
        }
    }

    /// Creates a new `TransactionFailure` error with no triggering error.
    #[must_use]
    pub fn transaction_failure(message: impl Into<String>) -> Self {
        Self::TransactionFailure {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a `TransactionFailure` for a rollback that failed while
    /// handling `original`.
    #[must_use]
    pub fn rollback_failed(rollback: StoreError, original: StoreError) -> Self {
        Self::TransactionFailure {
            message: format!("rollback failed: {rollback} (while handling: {original})"),
            source: Some(Box::new(original)),
        }
    }

    /// Creates a new `StorageUnavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a `DuplicateKey` error.
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Returns `true` if this is a `ReferenceInconsistent` error.
    #[must_use]
    pub fn is_reference_inconsistent(&self) -> bool {
        matches!(self, Self::ReferenceInconsistent { .. })
    }

    /// Returns `true` if this is a `TransactionFailure` error.
    #[must_use]
    pub fn is_transaction_failure(&self) -> bool {
        matches!(self, Self::TransactionFailure { .. })
    }

    /// Returns `true` if this is a `StorageUnavailable` error.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }

    /// The error that triggered a failed rollback, if this is one.
    #[must_use]
    pub fn original_error(&self) -> Option<&StoreError> {
        match self {
            Self::TransactionFailure {
                source: Some(original),
                ..
            } => Some(original),
            _ => None,
        }
    }

    /// Turns a missing record into a reference failure.
    ///
    /// Used when a lookup is a hop in a multi-record load: the record that
    /// was asked for exists, but something it points at does not.
    #[must_use]
    pub fn into_reference(self, context: &str) -> Self {
        match self {
            Self::NotFound { kind, key } => {
                Self::reference_inconsistent(format!("{context}: {kind}/{key} is missing"))
            }
            other => other,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
