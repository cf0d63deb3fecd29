use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, warn};

use grantvault_core::{
    AccessRecord, AuthorizationRecord, Client, GrantTransaction, RecordKind, RecordStore,
    StoreError, StoreResult,
};

/// The four record sets, keyed by primary key.
#[derive(Debug, Default)]
struct Tables {
    clients: HashMap<String, Client>,
    authorizations: HashMap<String, AuthorizationRecord>,
    access: HashMap<String, AccessRecord>,
    /// refresh token -> access token
    refresh: HashMap<String, String>,
}

/// In-memory record backend.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored clients.
    pub async fn client_count(&self) -> usize {
        self.tables.read().await.clients.len()
    }

    /// Number of stored authorization codes.
    pub async fn authorization_count(&self) -> usize {
        self.tables.read().await.authorizations.len()
    }

    /// Number of stored access grants.
    pub async fn access_count(&self) -> usize {
        self.tables.read().await.access.len()
    }

    /// Number of stored refresh token mappings.
    pub async fn refresh_count(&self) -> usize {
        self.tables.read().await.refresh.len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_client(&self, id: &str) -> StoreResult<Option<Client>> {
        Ok(self.tables.read().await.clients.get(id).cloned())
    }

    async fn insert_client(&self, client: &Client) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.clients.entry(client.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::duplicate_key(RecordKind::Client, &client.id)),
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                Ok(())
            }
        }
    }

    async fn update_client(&self, client: &Client) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        match tables.clients.get_mut(&client.id) {
            Some(existing) => {
                *existing = client.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn fetch_authorization(&self, code: &str) -> StoreResult<Option<AuthorizationRecord>> {
        Ok(self.tables.read().await.authorizations.get(code).cloned())
    }

    async fn insert_authorization(&self, record: &AuthorizationRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.authorizations.entry(record.code.clone()) {
            Entry::Occupied(_) => Err(StoreError::duplicate_key(
                RecordKind::Authorization,
                &record.code,
            )),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn delete_authorization(&self, code: &str) -> StoreResult<()> {
        self.tables.write().await.authorizations.remove(code);
        Ok(())
    }

    async fn fetch_access(&self, token: &str) -> StoreResult<Option<AccessRecord>> {
        Ok(self.tables.read().await.access.get(token).cloned())
    }

    async fn delete_access(&self, token: &str) -> StoreResult<()> {
        self.tables.write().await.access.remove(token);
        Ok(())
    }

    async fn fetch_refresh(&self, token: &str) -> StoreResult<Option<String>> {
        Ok(self.tables.read().await.refresh.get(token).cloned())
    }

    async fn delete_refresh(&self, token: &str) -> StoreResult<()> {
        self.tables.write().await.refresh.remove(token);
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Box<dyn GrantTransaction>> {
        let guard = Arc::clone(&self.tables).write_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            undo: Vec::new(),
        }))
    }
}

// =============================================================================
// Transaction
// =============================================================================

enum Undo {
    Access(String),
    Refresh(String),
}

/// Unit of work over the in-memory tables.
///
/// Holds the write lock from `begin` until release, so other callers never
/// see a half-written unit. Writes are applied in place and recorded in an
/// undo log that rollback (or drop) replays in reverse.
pub struct MemoryTransaction {
    guard: Option<OwnedRwLockWriteGuard<Tables>>,
    undo: Vec<Undo>,
}

impl MemoryTransaction {
    fn tables(&mut self) -> StoreResult<&mut Tables> {
        self.guard.as_deref_mut().ok_or_else(|| {
            StoreError::transaction_failure("Transaction already completed (committed or rolled back)")
        })
    }

    fn revert(&mut self) {
        let Some(tables) = self.guard.as_deref_mut() else {
            return;
        };
        for undo in self.undo.drain(..).rev() {
            match undo {
                Undo::Access(token) => {
                    tables.access.remove(&token);
                }
                Undo::Refresh(token) => {
                    tables.refresh.remove(&token);
                }
            }
        }
    }
}

#[async_trait]
impl GrantTransaction for MemoryTransaction {
    async fn access_exists(&mut self, token: &str) -> StoreResult<bool> {
        Ok(self.tables()?.access.contains_key(token))
    }

    async fn insert_access(&mut self, record: &AccessRecord) -> StoreResult<()> {
        let tables = self.tables()?;
        if tables.access.contains_key(&record.access_token) {
            return Err(StoreError::duplicate_key(
                RecordKind::Access,
                &record.access_token,
            ));
        }
        tables
            .access
            .insert(record.access_token.clone(), record.clone());
        self.undo.push(Undo::Access(record.access_token.clone()));
        Ok(())
    }

    async fn insert_refresh(&mut self, token: &str, access_token: &str) -> StoreResult<()> {
        let tables = self.tables()?;
        if tables.refresh.contains_key(token) {
            return Err(StoreError::duplicate_key(RecordKind::Refresh, token));
        }
        tables
            .refresh
            .insert(token.to_string(), access_token.to_string());
        self.undo.push(Undo::Refresh(token.to_string()));
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.undo.clear();
        self.guard.take();
        debug!("Memory transaction committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StoreResult<()> {
        self.revert();
        self.guard.take();
        debug!("Memory transaction rolled back");
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.guard.is_some() {
            warn!("MemoryTransaction dropped without explicit commit/rollback - rolling back");
            self.revert();
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn record(token: &str) -> AccessRecord {
        AccessRecord {
            access_token: token.into(),
            client_id: "app".into(),
            authorization_code: "code-1".into(),
            previous_access_token: String::new(),
            refresh_token: String::new(),
            expires_in: 3600,
            scope: "read".into(),
            redirect_uri: "https://app.example/cb".into(),
            created_at: datetime!(2026-03-01 09:00 UTC),
        }
    }

    #[tokio::test]
    async fn test_insert_client_rejects_duplicate() {
        let store = MemoryRecordStore::new();
        let client = Client::new("app", "one", "https://app.example/cb");
        store.insert_client(&client).await.unwrap();

        let other = Client::new("app", "two", "https://other.example/cb");
        let err = store.insert_client(&other).await.unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(store.fetch_client("app").await.unwrap(), Some(client));
    }

    #[tokio::test]
    async fn test_update_missing_client_affects_nothing() {
        let store = MemoryRecordStore::new();
        let client = Client::new("ghost", "s", "https://ghost.example/cb");
        assert_eq!(store.update_client(&client).await.unwrap(), 0);
        assert_eq!(store.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_commit_keeps_writes() {
        let store = MemoryRecordStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_access(&record("a-1")).await.unwrap();
        tx.insert_refresh("r-1", "a-1").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.access_count().await, 1);
        assert_eq!(
            store.fetch_refresh("r-1").await.unwrap().as_deref(),
            Some("a-1")
        );
    }

    #[tokio::test]
    async fn test_rollback_reverts_writes() {
        let store = MemoryRecordStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_access(&record("a-1")).await.unwrap();
        tx.insert_refresh("r-1", "a-1").await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.access_count().await, 0);
        assert_eq!(store.refresh_count().await, 0);
    }

    #[tokio::test]
    async fn test_drop_reverts_writes() {
        let store = MemoryRecordStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_access(&record("a-1")).await.unwrap();
        }
        assert_eq!(store.access_count().await, 0);
    }

    #[tokio::test]
    async fn test_rollback_keeps_rows_written_before_transaction() {
        let store = MemoryRecordStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_access(&record("a-1")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.insert_access(&record("a-1")).await.unwrap_err();
        assert!(err.is_duplicate_key());
        tx.rollback().await.unwrap();

        assert!(store.fetch_access("a-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_access_exists_sees_own_writes() {
        let store = MemoryRecordStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(!tx.access_exists("a-1").await.unwrap());
        tx.insert_access(&record("a-1")).await.unwrap();
        assert!(tx.access_exists("a-1").await.unwrap());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_deletes_are_idempotent() {
        let store = MemoryRecordStore::new();
        store.delete_access("missing").await.unwrap();
        store.delete_refresh("missing").await.unwrap();
        store.delete_authorization("missing").await.unwrap();
    }
}
