//! Access grant rows.
//!
//! Inserts and predecessor locks only happen inside a transaction (see
//! [`insert_with_tx`] and [`lock_with_tx`]); reads and deletes go straight
//! to the pool.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgTransaction;
use time::OffsetDateTime;

use grantvault_core::{AccessRecord, RecordKind, StoreResult};

use crate::PgPool;
use crate::error::{db_error, insert_error};

type AccessTuple = (
    String,
    String,
    String,
    String,
    String,
    i32,
    String,
    String,
    OffsetDateTime,
);

fn from_tuple(row: AccessTuple) -> AccessRecord {
    AccessRecord {
        access_token: row.0,
        client_id: row.1,
        authorization_code: row.2,
        previous_access_token: row.3,
        refresh_token: row.4,
        expires_in: row.5,
        scope: row.6,
        redirect_uri: row.7,
        created_at: row.8,
    }
}

/// Access grant table operations.
pub struct AccessStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> AccessStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an access grant row by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, access_token: &str) -> StoreResult<Option<AccessRecord>> {
        let row: Option<AccessTuple> = query_as(
            r#"
            SELECT access_token, client, authorize, previous, refresh_token,
                   expires_in, scope, redirect_uri, created_at
            FROM access
            WHERE access_token = $1
            LIMIT 1
            "#,
        )
        .bind(access_token)
        .fetch_optional(self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(from_tuple))
    }

    /// Delete an access grant row. Missing tokens are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete(&self, access_token: &str) -> StoreResult<()> {
        query("DELETE FROM access WHERE access_token = $1")
            .bind(access_token)
            .execute(self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }
}

/// Check that an access grant row exists and lock it against deletion until
/// the transaction ends.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn lock_with_tx(tx: &mut PgTransaction<'_>, access_token: &str) -> StoreResult<bool> {
    let row: Option<i32> = query_scalar(
        r#"
        SELECT 1
        FROM access
        WHERE access_token = $1
        FOR KEY SHARE
        "#,
    )
    .bind(access_token)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error)?;

    Ok(row.is_some())
}

/// Insert an access grant row inside a transaction.
///
/// # Errors
///
/// Returns `DuplicateKey` if the token exists.
pub async fn insert_with_tx(tx: &mut PgTransaction<'_>, record: &AccessRecord) -> StoreResult<()> {
    query(
        r#"
        INSERT INTO access (access_token, client, authorize, previous, refresh_token,
                            expires_in, scope, redirect_uri, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(&record.access_token)
    .bind(&record.client_id)
    .bind(&record.authorization_code)
    .bind(&record.previous_access_token)
    .bind(&record.refresh_token)
    .bind(record.expires_in)
    .bind(&record.scope)
    .bind(&record.redirect_uri)
    .bind(record.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| insert_error(RecordKind::Access, &record.access_token, e))?;

    Ok(())
}
