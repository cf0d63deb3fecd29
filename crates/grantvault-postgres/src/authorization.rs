//! Authorization code rows.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use grantvault_core::{AuthorizationRecord, RecordKind, StoreResult};

use crate::PgPool;
use crate::error::{db_error, insert_error};

type AuthorizationTuple = (String, String, i32, String, String, String, OffsetDateTime);

fn from_tuple(row: AuthorizationTuple) -> AuthorizationRecord {
    AuthorizationRecord {
        code: row.0,
        client_id: row.1,
        expires_in: row.2,
        scope: row.3,
        redirect_uri: row.4,
        state: row.5,
        created_at: row.6,
    }
}

/// Authorization code table operations.
pub struct AuthorizationStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> AuthorizationStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, code: &str) -> StoreResult<Option<AuthorizationRecord>> {
        let row: Option<AuthorizationTuple> = query_as(
            r#"
            SELECT code, client, expires_in, scope, redirect_uri, state, created_at
            FROM authorize
            WHERE code = $1
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(from_tuple))
    }

    /// Insert a new authorization code.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if the code exists.
    pub async fn create(&self, record: &AuthorizationRecord) -> StoreResult<()> {
        query(
            r#"
            INSERT INTO authorize (code, client, expires_in, scope, redirect_uri, state, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&record.code)
        .bind(&record.client_id)
        .bind(record.expires_in)
        .bind(&record.scope)
        .bind(&record.redirect_uri)
        .bind(&record.state)
        .bind(record.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| insert_error(RecordKind::Authorization, &record.code, e))?;

        Ok(())
    }

    /// Delete an authorization code. Missing codes are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete(&self, code: &str) -> StoreResult<()> {
        query("DELETE FROM authorize WHERE code = $1")
            .bind(code)
            .execute(self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }
}
