//! In-memory storage backend for grantvault.
//!
//! Implements [`RecordStore`](grantvault_core::RecordStore) over plain maps
//! behind a single `tokio::sync::RwLock`. Writers are serialised, so primary
//! key checks and the access + refresh unit of work are race free without
//! any help from callers.
//!
//! # Example
//!
//! ```ignore
//! use grantvault_core::GrantStorage;
//! use grantvault_memory::create_grant_storage;
//!
//! let storage = create_grant_storage();
//! storage.create_client("app", "s3cret", "https://app.example/cb").await?;
//! ```

mod storage;

pub use storage::{MemoryRecordStore, MemoryTransaction};

use std::sync::Arc;

use grantvault_core::{DynGrantStorage, GrantStore, StoreOptions};

/// Creates a grant store with default options over a fresh in-memory backend.
pub fn create_grant_storage() -> DynGrantStorage {
    create_grant_storage_with_options(StoreOptions::default())
}

/// Like [`create_grant_storage`], with explicit [`StoreOptions`].
pub fn create_grant_storage_with_options(options: StoreOptions) -> DynGrantStorage {
    Arc::new(GrantStore::with_options(
        Arc::new(MemoryRecordStore::new()),
        options,
    ))
}
