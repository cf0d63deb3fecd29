//! Client registration rows.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;

use grantvault_core::{Client, RecordKind, StoreResult};

use crate::PgPool;
use crate::error::{db_error, insert_error};

/// Client table operations.
pub struct ClientStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> ClientStorage<'a> {
    /// Create a new client storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a client by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, id: &str) -> StoreResult<Option<Client>> {
        let row: Option<(String, String, String)> = query_as(
            r#"
            SELECT id, secret, redirect_uri
            FROM client
            WHERE id = $1
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(id, secret, redirect_uri)| Client {
            id,
            secret,
            redirect_uri,
        }))
    }

    /// Insert a new client.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if the id is taken.
    pub async fn create(&self, client: &Client) -> StoreResult<()> {
        query(
            r#"
            INSERT INTO client (id, secret, redirect_uri)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&client.id)
        .bind(&client.secret)
        .bind(&client.redirect_uri)
        .execute(self.pool)
        .await
        .map_err(|e| insert_error(RecordKind::Client, &client.id, e))?;

        Ok(())
    }

    /// Update a client's secret and redirect URI.
    ///
    /// Returns the number of rows affected; 0 means no such client.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn update(&self, client: &Client) -> StoreResult<u64> {
        let result = query(
            r#"
            UPDATE client
            SET secret = $2,
                redirect_uri = $3
            WHERE id = $1
            "#,
        )
        .bind(&client.id)
        .bind(&client.secret)
        .bind(&client.redirect_uri)
        .execute(self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected())
    }
}
