//! [`RecordStore`] over a PostgreSQL pool.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use grantvault_core::{
    AccessRecord, AuthorizationRecord, Client, GrantTransaction, RecordStore, StoreError,
    StoreResult,
};

use crate::PgPool;
use crate::access::AccessStorage;
use crate::authorization::AuthorizationStorage;
use crate::client::ClientStorage;
use crate::config::PostgresConfig;
use crate::error::Result;
use crate::pool;
use crate::refresh::RefreshStorage;
use crate::transaction::PostgresTransaction;

/// PostgreSQL record backend. Clones share the pool.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresRecordStore {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Creates the pool from `config` and, if enabled, runs the schema bootstrap.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or the bootstrap fails.
    #[instrument(skip(config))]
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = pool::create_pool(config).await?;

        if config.run_migrations {
            crate::migrations::run(&pool).await?;
        }

        Ok(Self::new(Arc::new(pool)))
    }

    /// Reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<PgPool> {
        &self.pool
    }

    /// Close the pool, waiting for in-flight connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for PostgresRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRecordStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn fetch_client(&self, id: &str) -> StoreResult<Option<Client>> {
        ClientStorage::new(&self.pool).find(id).await
    }

    async fn insert_client(&self, client: &Client) -> StoreResult<()> {
        ClientStorage::new(&self.pool).create(client).await
    }

    async fn update_client(&self, client: &Client) -> StoreResult<u64> {
        ClientStorage::new(&self.pool).update(client).await
    }

    async fn fetch_authorization(&self, code: &str) -> StoreResult<Option<AuthorizationRecord>> {
        AuthorizationStorage::new(&self.pool).find(code).await
    }

    async fn insert_authorization(&self, record: &AuthorizationRecord) -> StoreResult<()> {
        AuthorizationStorage::new(&self.pool).create(record).await
    }

    async fn delete_authorization(&self, code: &str) -> StoreResult<()> {
        AuthorizationStorage::new(&self.pool).delete(code).await
    }

    async fn fetch_access(&self, token: &str) -> StoreResult<Option<AccessRecord>> {
        AccessStorage::new(&self.pool).find(token).await
    }

    async fn delete_access(&self, token: &str) -> StoreResult<()> {
        AccessStorage::new(&self.pool).delete(token).await
    }

    async fn fetch_refresh(&self, token: &str) -> StoreResult<Option<String>> {
        RefreshStorage::new(&self.pool).find_access_token(token).await
    }

    async fn delete_refresh(&self, token: &str) -> StoreResult<()> {
        RefreshStorage::new(&self.pool).delete(token).await
    }

    async fn begin(&self) -> StoreResult<Box<dyn GrantTransaction>> {
        let tx = self.pool.begin().await.map_err(|e| {
            StoreError::unavailable(format!("Failed to begin transaction: {e}"))
        })?;
        debug!("Transaction started");
        Ok(Box::new(PostgresTransaction::new(tx)))
    }
}
