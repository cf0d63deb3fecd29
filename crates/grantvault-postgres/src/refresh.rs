//! Refresh token rows: a refresh token and the access token it was issued with.

use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgTransaction;

use grantvault_core::{RecordKind, StoreResult};

use crate::PgPool;
use crate::error::{db_error, insert_error};

/// Refresh token table operations.
pub struct RefreshStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> RefreshStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Access token the refresh token maps to.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_access_token(&self, token: &str) -> StoreResult<Option<String>> {
        query_scalar("SELECT access FROM refresh WHERE token = $1 LIMIT 1")
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .map_err(db_error)
    }

    /// Delete the mapping only. The access grant is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete(&self, token: &str) -> StoreResult<()> {
        query("DELETE FROM refresh WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }
}

/// Insert a refresh mapping inside a transaction.
///
/// # Errors
///
/// Returns `DuplicateKey` if the refresh token exists.
pub async fn insert_with_tx(
    tx: &mut PgTransaction<'_>,
    token: &str,
    access_token: &str,
) -> StoreResult<()> {
    query("INSERT INTO refresh (token, access) VALUES ($1, $2)")
        .bind(token)
        .bind(access_token)
        .execute(&mut **tx)
        .await
        .map_err(|e| insert_error(RecordKind::Refresh, token, e))?;

    Ok(())
}
