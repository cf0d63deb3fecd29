//! Atomic multi-record writes.
//!
//! The only multi-row write in the store is an access grant together with
//! its refresh token. [`TransactionCoordinator`] runs a [`UnitOfWork`]
//! inside one backend transaction: commit when every operation succeeds,
//! rollback on the first failure. A [`TransactionScope`] that goes out of
//! scope unreleased drops its backend transaction, which rolls back.

use tracing::{debug, warn};

use crate::storage::{GrantTransaction, RecordStore};
use crate::types::AccessRecord;
use crate::{StoreError, StoreResult};

/// A single step inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOperation {
    /// Fails the unit unless the access grant `token` exists.
    RequireAccess { token: String, referenced_by: String },
    InsertAccess(AccessRecord),
    InsertRefresh { token: String, access_token: String },
}

impl WriteOperation {
    /// Primary key the operation reads or writes.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::RequireAccess { token, .. } => token,
            Self::InsertAccess(record) => &record.access_token,
            Self::InsertRefresh { token, .. } => token,
        }
    }
}

/// An ordered list of writes that must all land or none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitOfWork {
    operations: Vec<WriteOperation>,
}

impl UnitOfWork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The steps for saving an access grant: the predecessor check when the
    /// grant was rotated, the grant row, then its refresh mapping when a
    /// refresh token was issued.
    #[must_use]
    pub fn for_access(record: &AccessRecord) -> Self {
        let mut unit = Self::new();
        if let Some(previous) = record.previous() {
            unit.push(WriteOperation::RequireAccess {
                token: previous.to_string(),
                referenced_by: record.access_token.clone(),
            });
        }
        unit.push(WriteOperation::InsertAccess(record.clone()));
        if let Some(refresh) = record.refresh() {
            unit.push(WriteOperation::InsertRefresh {
                token: refresh.to_string(),
                access_token: record.access_token.clone(),
            });
        }
        unit
    }

    #[must_use]
    pub fn with(mut self, operation: WriteOperation) -> Self {
        self.push(operation);
        self
    }

    pub fn push(&mut self, operation: WriteOperation) {
        self.operations.push(operation);
    }

    #[must_use]
    pub fn operations(&self) -> &[WriteOperation] {
        &self.operations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

// =============================================================================
// Transaction Scope
// =============================================================================

/// An open backend transaction.
///
/// Released exactly once, by [`commit`](Self::commit) or
/// [`abort`](Self::abort). Dropping it unreleased hands the backend
/// transaction to its own `Drop`, which rolls back.
pub struct TransactionScope {
    tx: Box<dyn GrantTransaction>,
}

impl TransactionScope {
    /// Apply one write.
    ///
    /// The scope stays open on failure; the caller decides whether to
    /// abort or drop it.
    pub async fn apply(&mut self, operation: &WriteOperation) -> StoreResult<()> {
        match operation {
            WriteOperation::RequireAccess {
                token,
                referenced_by,
            } => {
                if self.tx.access_exists(token).await? {
                    Ok(())
                } else {
                    Err(StoreError::reference_inconsistent(format!(
                        "access token {referenced_by} refers to missing predecessor {token}"
                    )))
                }
            }
            WriteOperation::InsertAccess(record) => self.tx.insert_access(record).await,
            WriteOperation::InsertRefresh {
                token,
                access_token,
            } => self.tx.insert_refresh(token, access_token).await,
        }
    }

    /// Commit every applied write.
    ///
    /// # Errors
    ///
    /// `TransactionFailure` if the backend could not commit.
    pub async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(|err| {
            if err.is_transaction_failure() {
                err
            } else {
                StoreError::transaction_failure(format!("commit failed: {err}"))
            }
        })?;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Roll back and return the error to report.
    ///
    /// Returns `cause` when the rollback succeeds. When the rollback fails
    /// too, returns a `TransactionFailure` that carries both.
    pub async fn abort(self, cause: StoreError) -> StoreError {
        match self.tx.rollback().await {
            Ok(()) => {
                debug!(error = %cause, "Unit of work rolled back");
                cause
            }
            Err(rollback) => {
                warn!(error = %cause, rollback_error = %rollback, "Rollback failed");
                StoreError::rollback_failed(rollback, cause)
            }
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Runs units of work against a backend.
pub struct TransactionCoordinator<'a, B: RecordStore + ?Sized> {
    backend: &'a B,
}

impl<'a, B: RecordStore + ?Sized> TransactionCoordinator<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Open a transaction scope.
    pub async fn begin(&self) -> StoreResult<TransactionScope> {
        let tx = self.backend.begin().await?;
        Ok(TransactionScope { tx })
    }

    /// Apply every operation in order and commit, or roll back on the first
    /// failure.
    ///
    /// # Errors
    ///
    /// The failing operation's error (after a successful rollback),
    /// `TransactionFailure` when commit or rollback fails.
    pub async fn execute(&self, unit: &UnitOfWork) -> StoreResult<()> {
        if unit.is_empty() {
            return Ok(());
        }

        let mut scope = self.begin().await?;
        for operation in unit.operations() {
            if let Err(err) = scope.apply(operation).await {
                debug!(key = operation.key(), error = %err, "Write failed inside unit of work");
                return Err(scope.abort(err).await);
            }
        }
        scope.commit().await
    }
}
