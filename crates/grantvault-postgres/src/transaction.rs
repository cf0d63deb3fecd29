//! Database transaction used for the atomic access write.

use async_trait::async_trait;
use sqlx_postgres::PgTransaction;

use grantvault_core::{AccessRecord, GrantTransaction, StoreError, StoreResult};

use crate::{access, refresh};

/// PostgreSQL unit of work.
///
/// Wraps an sqlx transaction. sqlx issues a ROLLBACK when the inner
/// transaction is dropped, so an unreleased `PostgresTransaction` never
/// leaves partial writes behind.
pub struct PostgresTransaction {
    /// Taken on commit or rollback.
    tx: Option<PgTransaction<'static>>,
}

impl PostgresTransaction {
    pub fn new(tx: PgTransaction<'static>) -> Self {
        Self { tx: Some(tx) }
    }

    fn active(&mut self) -> StoreResult<&mut PgTransaction<'static>> {
        self.tx.as_mut().ok_or_else(|| {
            StoreError::transaction_failure("Transaction already completed (committed or rolled back)")
        })
    }
}

#[async_trait]
impl GrantTransaction for PostgresTransaction {
    async fn access_exists(&mut self, token: &str) -> StoreResult<bool> {
        let tx = self.active()?;
        access::lock_with_tx(tx, token).await
    }

    async fn insert_access(&mut self, record: &AccessRecord) -> StoreResult<()> {
        let tx = self.active()?;
        access::insert_with_tx(tx, record).await
    }

    async fn insert_refresh(&mut self, token: &str, access_token: &str) -> StoreResult<()> {
        let tx = self.active()?;
        refresh::insert_with_tx(tx, token, access_token).await
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(|e| {
                StoreError::transaction_failure(format!("Failed to commit transaction: {e}"))
            })?;
            tracing::debug!("Transaction committed successfully");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StoreResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(|e| {
                StoreError::transaction_failure(format!("Failed to rollback transaction: {e}"))
            })?;
            tracing::debug!("Transaction rolled back successfully");
        }
        Ok(())
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!(
                "PostgresTransaction dropped without explicit commit/rollback - rolling back"
            );
        }
    }
}
