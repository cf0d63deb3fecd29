//! # grantvault-core
//!
//! Grant state for an OAuth2-style authorization server: clients,
//! authorization codes, access grants and refresh tokens, and the lineage
//! that links them.
//!
//! The protocol engine depends only on [`GrantStorage`]. [`GrantStore`]
//! implements it on top of any [`RecordStore`] backend and owns the parts
//! that must behave the same everywhere:
//!
//! - resolving a grant's client and authorization code at load time
//! - walking the access token rotation chain (iteratively, cycle-checked,
//!   depth-bounded)
//! - writing an access grant and its refresh token as one atomic unit
//!
//! Backends live in separate crates:
//!
//! - `grantvault-postgres` - PostgreSQL via sqlx
//! - `grantvault-memory` - in-process maps, for tests and embedding
//!
//! ## Example
//!
//! ```ignore
//! use grantvault_core::{GrantStorage, StoreError};
//!
//! async fn redeem(storage: &dyn GrantStorage, code: &str) -> Result<(), StoreError> {
//!     let authorization = storage.load_authorization(code).await?;
//!     // ... issue tokens ...
//!     storage.remove_authorization(&authorization.code).await
//! }
//! ```

mod error;
mod lineage;
mod storage;
mod store;
mod transaction;
mod types;

pub use error::{RecordKind, StoreError, StoreResult};
pub use lineage::DEFAULT_MAX_LINEAGE_DEPTH;
pub use storage::{GrantStorage, GrantTransaction, RecordStore};
pub use store::{GrantStore, StoreOptions};
pub use transaction::{TransactionCoordinator, TransactionScope, UnitOfWork, WriteOperation};
pub use types::{
    AccessGrant, AccessRecord, AuthorizationGrant, AuthorizationRecord, Client, Lineage,
    truncate_to_micros,
};

/// Type alias for a shareable grant storage handle.
pub type DynGrantStorage = std::sync::Arc<dyn GrantStorage>;
