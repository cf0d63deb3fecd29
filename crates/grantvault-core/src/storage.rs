//! Storage traits.
//!
//! Two layers:
//!
//! - [`GrantStorage`] is the capability surface the protocol engine talks to.
//!   It resolves references and lineage and returns fully built grants.
//! - [`RecordStore`] is what a backend implements: single-row reads, writes
//!   and deletes keyed by primary key, plus [`RecordStore::begin`] for the
//!   one multi-row write.
//!
//! [`GrantStore`](crate::GrantStore) implements the first on top of the
//! second, so a backend never has to know about lineage.

use async_trait::async_trait;

use crate::StoreResult;
use crate::types::{AccessGrant, AccessRecord, AuthorizationGrant, AuthorizationRecord, Client};

// =============================================================================
// Capability Surface
// =============================================================================

/// Grant storage as seen by the protocol engine.
///
/// # Example
///
/// ```ignore
/// use grantvault_core::GrantStorage;
///
/// async fn redeem_refresh(storage: &dyn GrantStorage, token: &str) {
///     let grant = storage.load_refresh(token).await?;
///     for previous in grant.lineage() {
///         println!("rotated from {}", previous.access_token);
///     }
/// }
/// ```
#[async_trait]
pub trait GrantStorage: Send + Sync {
    /// Fetch a client by id.
    ///
    /// # Errors
    ///
    /// `NotFound` if no client has this id.
    async fn get_client(&self, id: &str) -> StoreResult<Client>;

    /// Register a new client.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the id is taken; the existing record is untouched.
    async fn create_client(
        &self,
        id: &str,
        secret: &str,
        redirect_uri: &str,
    ) -> StoreResult<Client>;

    /// Replace a client's secret and redirect URI.
    ///
    /// # Errors
    ///
    /// `NotFound` if no client has this id.
    async fn update_client(
        &self,
        id: &str,
        secret: &str,
        redirect_uri: &str,
    ) -> StoreResult<Client>;

    /// Persist a new authorization code.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the code already exists.
    async fn save_authorization(&self, grant: &AuthorizationGrant) -> StoreResult<()>;

    /// Load an authorization code with its client resolved.
    ///
    /// Expiry is not checked.
    ///
    /// # Errors
    ///
    /// `NotFound` if the code is unknown, `ReferenceInconsistent` if its
    /// client is gone.
    async fn load_authorization(&self, code: &str) -> StoreResult<AuthorizationGrant>;

    /// Delete an authorization code. Deleting an unknown code succeeds.
    async fn remove_authorization(&self, code: &str) -> StoreResult<()>;

    /// Persist an access grant and, when it carries one, its refresh token,
    /// as one atomic unit.
    ///
    /// A rotated grant's predecessor must exist when it is saved.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if either token exists, `ReferenceInconsistent` if the
    /// predecessor does not exist, `TransactionFailure` if the unit could not
    /// be committed or rolled back.
    async fn save_access(&self, grant: &AccessGrant) -> StoreResult<()>;

    /// Load an access grant with its client, authorization code and full
    /// rotation chain resolved.
    ///
    /// # Errors
    ///
    /// `NotFound` if the token is unknown, `ReferenceInconsistent` if any
    /// hop of the chain cannot be resolved or the chain loops.
    async fn load_access(&self, token: &str) -> StoreResult<AccessGrant>;

    /// Delete an access grant. Deleting an unknown token succeeds.
    async fn remove_access(&self, token: &str) -> StoreResult<()>;

    /// Resolve a refresh token to the access grant it was issued with.
    ///
    /// # Errors
    ///
    /// `NotFound` if the refresh token is unknown, otherwise as
    /// [`GrantStorage::load_access`].
    async fn load_refresh(&self, token: &str) -> StoreResult<AccessGrant>;

    /// Delete a refresh token mapping. The access grant it points at is kept.
    async fn remove_refresh(&self, token: &str) -> StoreResult<()>;
}

// =============================================================================
// Backend Contract
// =============================================================================

/// Row-level operations a storage backend provides.
///
/// Reads return `Ok(None)` for a missing row; inserts return `DuplicateKey`
/// on a primary key collision; deletes succeed whether or not a row matched.
/// Uniqueness must be enforced by the backend itself, not by callers
/// checking first.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_client(&self, id: &str) -> StoreResult<Option<Client>>;

    /// # Errors
    ///
    /// `DuplicateKey` if the id is taken.
    async fn insert_client(&self, client: &Client) -> StoreResult<()>;

    /// Returns the number of rows updated (0 or 1).
    async fn update_client(&self, client: &Client) -> StoreResult<u64>;

    async fn fetch_authorization(&self, code: &str) -> StoreResult<Option<AuthorizationRecord>>;

    /// # Errors
    ///
    /// `DuplicateKey` if the code exists.
    async fn insert_authorization(&self, record: &AuthorizationRecord) -> StoreResult<()>;

    async fn delete_authorization(&self, code: &str) -> StoreResult<()>;

    async fn fetch_access(&self, token: &str) -> StoreResult<Option<AccessRecord>>;

    async fn delete_access(&self, token: &str) -> StoreResult<()>;

    /// Access token a refresh token maps to.
    async fn fetch_refresh(&self, token: &str) -> StoreResult<Option<String>>;

    async fn delete_refresh(&self, token: &str) -> StoreResult<()>;

    /// Open a unit of work for the access + refresh write.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` if no connection could be obtained.
    async fn begin(&self) -> StoreResult<Box<dyn GrantTransaction>>;
}

/// A unit of work spanning the access grant insert and its refresh insert.
///
/// Dropping a transaction that was neither committed nor rolled back must
/// undo its writes.
#[async_trait]
pub trait GrantTransaction: Send {
    /// Whether an access grant row exists, as seen by this transaction.
    ///
    /// A row reported as present must stay present until the transaction
    /// is released.
    async fn access_exists(&mut self, token: &str) -> StoreResult<bool>;

    /// Insert an access grant row.
    async fn insert_access(&mut self, record: &AccessRecord) -> StoreResult<()>;

    /// Insert a refresh token mapping.
    async fn insert_refresh(&mut self, token: &str, access_token: &str) -> StoreResult<()>;

    /// Make all writes visible.
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Undo all writes.
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
