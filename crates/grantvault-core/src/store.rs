//! [`GrantStorage`] over any [`RecordStore`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::RecordKind;
use crate::lineage::{self, DEFAULT_MAX_LINEAGE_DEPTH};
use crate::storage::{GrantStorage, RecordStore};
use crate::transaction::{TransactionCoordinator, UnitOfWork};
use crate::types::{AccessGrant, AuthorizationGrant, Client};
use crate::{StoreError, StoreResult};

/// Tuning for [`GrantStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Longest rotation chain a load will follow before giving up.
    pub max_lineage_depth: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_lineage_depth: DEFAULT_MAX_LINEAGE_DEPTH,
        }
    }
}

impl StoreOptions {
    /// Sets the maximum lineage depth. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_lineage_depth(mut self, depth: usize) -> Self {
        self.max_lineage_depth = depth.max(1);
        self
    }
}

/// The grant store.
///
/// Owns reference resolution, lineage walking and the atomic access write;
/// the backend only moves rows. Cheap to clone.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use grantvault_core::{GrantStorage, GrantStore};
/// use grantvault_memory::MemoryRecordStore;
///
/// let store = GrantStore::new(Arc::new(MemoryRecordStore::new()));
/// let client = store.create_client("app", "s3cret", "https://app.example/cb").await?;
/// ```
pub struct GrantStore<B: RecordStore + ?Sized> {
    backend: Arc<B>,
    options: StoreOptions,
}

impl<B: RecordStore + ?Sized> Clone for GrantStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            options: self.options,
        }
    }
}

impl<B: RecordStore + ?Sized> GrantStore<B> {
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    #[must_use]
    pub fn with_options(backend: Arc<B>, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Coordinator for units of work on this store's backend.
    #[must_use]
    pub fn coordinator(&self) -> TransactionCoordinator<'_, B> {
        TransactionCoordinator::new(self.backend.as_ref())
    }
}

#[async_trait]
impl<B> GrantStorage for GrantStore<B>
where
    B: RecordStore + ?Sized + 'static,
{
    async fn get_client(&self, id: &str) -> StoreResult<Client> {
        lineage::client(self.backend.as_ref(), id).await
    }

    #[instrument(skip(self, secret, redirect_uri))]
    async fn create_client(
        &self,
        id: &str,
        secret: &str,
        redirect_uri: &str,
    ) -> StoreResult<Client> {
        let client = Client::new(id, secret, redirect_uri);
        self.backend.insert_client(&client).await?;
        debug!("Client created");
        Ok(client)
    }

    #[instrument(skip(self, secret, redirect_uri))]
    async fn update_client(
        &self,
        id: &str,
        secret: &str,
        redirect_uri: &str,
    ) -> StoreResult<Client> {
        let client = Client::new(id, secret, redirect_uri);
        if self.backend.update_client(&client).await? == 0 {
            return Err(StoreError::not_found(RecordKind::Client, id));
        }
        debug!("Client updated");
        Ok(client)
    }

    async fn save_authorization(&self, grant: &AuthorizationGrant) -> StoreResult<()> {
        self.backend.insert_authorization(&grant.to_record()).await
    }

    async fn load_authorization(&self, code: &str) -> StoreResult<AuthorizationGrant> {
        lineage::authorization(self.backend.as_ref(), code).await
    }

    async fn remove_authorization(&self, code: &str) -> StoreResult<()> {
        self.backend.delete_authorization(code).await
    }

    #[instrument(skip_all, fields(token = %grant.access_token, refresh = grant.refresh().is_some()))]
    async fn save_access(&self, grant: &AccessGrant) -> StoreResult<()> {
        let unit = UnitOfWork::for_access(&grant.to_record());
        self.coordinator().execute(&unit).await
    }

    async fn load_access(&self, token: &str) -> StoreResult<AccessGrant> {
        lineage::access(
            self.backend.as_ref(),
            token,
            self.options.max_lineage_depth,
        )
        .await
    }

    async fn remove_access(&self, token: &str) -> StoreResult<()> {
        self.backend.delete_access(token).await
    }

    async fn load_refresh(&self, token: &str) -> StoreResult<AccessGrant> {
        let access_token = self
            .backend
            .fetch_refresh(token)
            .await?
            .ok_or_else(|| StoreError::not_found(RecordKind::Refresh, token))?;

        self.load_access(&access_token)
            .await
            .map_err(|e| e.into_reference(&format!("refresh token {token}")))
    }

    async fn remove_refresh(&self, token: &str) -> StoreResult<()> {
        self.backend.delete_refresh(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        assert_eq!(
            StoreOptions::default().max_lineage_depth,
            DEFAULT_MAX_LINEAGE_DEPTH
        );
    }

    #[test]
    fn test_lineage_depth_floor() {
        let options = StoreOptions::default().with_max_lineage_depth(0);
        assert_eq!(options.max_lineage_depth, 1);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: StoreOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, StoreOptions::default());

        let options: StoreOptions =
            serde_json::from_str(r#"{"max_lineage_depth": 8}"#).unwrap();
        assert_eq!(options.max_lineage_depth, 8);
    }
}
