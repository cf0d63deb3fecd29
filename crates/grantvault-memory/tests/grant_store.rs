//! Grant lifecycle and lineage behaviour of `GrantStore` over the memory backend.

use std::sync::Arc;

use grantvault_core::{
    AccessGrant, AccessRecord, AuthorizationGrant, Client, GrantStorage, GrantStore, RecordStore,
    StoreOptions,
};
use grantvault_memory::MemoryRecordStore;
use time::OffsetDateTime;
use time::macros::datetime;

const REDIRECT: &str = "https://app.example/cb";

fn store() -> (GrantStore<MemoryRecordStore>, Arc<MemoryRecordStore>) {
    let backend = Arc::new(MemoryRecordStore::new());
    (GrantStore::new(Arc::clone(&backend)), backend)
}

fn authorization(code: &str, client: &Client) -> AuthorizationGrant {
    AuthorizationGrant {
        code: code.into(),
        client: client.clone(),
        expires_in: 600,
        scope: "openid profile".into(),
        redirect_uri: REDIRECT.into(),
        state: "st-1".into(),
        created_at: datetime!(2026-05-04 10:00 UTC),
    }
}

fn access(
    token: &str,
    refresh: &str,
    authorization: &AuthorizationGrant,
    previous: Option<AccessGrant>,
) -> AccessGrant {
    AccessGrant {
        access_token: token.into(),
        client: authorization.client.clone(),
        authorization: authorization.clone(),
        previous: previous.map(Box::new),
        refresh_token: refresh.into(),
        expires_in: 3600,
        scope: authorization.scope.clone(),
        redirect_uri: REDIRECT.into(),
        created_at: datetime!(2026-05-04 10:01 UTC),
    }
}

async fn seeded() -> (
    GrantStore<MemoryRecordStore>,
    Arc<MemoryRecordStore>,
    AuthorizationGrant,
) {
    let (store, backend) = store();
    let client = store.create_client("app", "s3cret", REDIRECT).await.unwrap();
    let code = authorization("code-1", &client);
    store.save_authorization(&code).await.unwrap();
    (store, backend, code)
}

// -----------------------------------------------------------------------------
// Clients
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_client_round_trip() {
    let (store, _) = store();
    let created = store.create_client("app", "s3cret", REDIRECT).await.unwrap();
    let loaded = store.get_client("app").await.unwrap();

    assert_eq!(created, loaded);
    assert_eq!(loaded, Client::new("app", "s3cret", REDIRECT));
}

#[tokio::test]
async fn test_duplicate_client_is_rejected_and_original_kept() {
    let (store, _) = store();
    store.create_client("app", "s3cret", REDIRECT).await.unwrap();

    let err = store
        .create_client("app", "other", "https://evil.example/cb")
        .await
        .unwrap_err();

    assert!(err.is_duplicate_key());
    let loaded = store.get_client("app").await.unwrap();
    assert_eq!(loaded.secret, "s3cret");
    assert_eq!(loaded.redirect_uri, REDIRECT);
}

#[tokio::test]
async fn test_update_client_replaces_fields() {
    let (store, _) = store();
    store.create_client("app", "s3cret", REDIRECT).await.unwrap();

    let updated = store
        .update_client("app", "rotated", "https://app.example/new")
        .await
        .unwrap();

    assert_eq!(store.get_client("app").await.unwrap(), updated);
    assert_eq!(updated.secret, "rotated");
}

#[tokio::test]
async fn test_update_missing_client_is_not_found() {
    let (store, backend) = store();
    let err = store
        .update_client("ghost", "s", REDIRECT)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(backend.client_count().await, 0);
}

#[tokio::test]
async fn test_get_missing_client_is_not_found() {
    let (store, _) = store();
    assert!(store.get_client("ghost").await.unwrap_err().is_not_found());
}

// -----------------------------------------------------------------------------
// Authorization codes
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_authorization_lifecycle() {
    let (store, _, code) = seeded().await;

    let loaded = store.load_authorization("code-1").await.unwrap();
    assert_eq!(loaded, code);
    assert_eq!(loaded.client, store.get_client("app").await.unwrap());

    store.remove_authorization("code-1").await.unwrap();
    let err = store.load_authorization("code-1").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_duplicate_authorization_code_is_rejected() {
    let (store, _, code) = seeded().await;
    let err = store.save_authorization(&code).await.unwrap_err();
    assert!(err.is_duplicate_key());
}

#[tokio::test]
async fn test_authorization_with_missing_client_fails_to_load() {
    let (store, _) = store();
    let orphan = authorization("code-9", &Client::new("gone", "s", REDIRECT));
    store.save_authorization(&orphan).await.unwrap();

    let err = store.load_authorization("code-9").await.unwrap_err();
    assert!(err.is_reference_inconsistent());
}

#[tokio::test]
async fn test_authorization_expiry_is_not_enforced() {
    let (store, _, code) = seeded().await;
    let far_future = OffsetDateTime::now_utc() + time::Duration::days(3650);

    let loaded = store.load_authorization(&code.code).await.unwrap();
    assert!(loaded.is_expired_at(far_future));
}

// -----------------------------------------------------------------------------
// Access and refresh grants
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_access_and_refresh_are_saved_together() {
    let (store, _, code) = seeded().await;
    let grant = access("a-1", "r-1", &code, None);
    store.save_access(&grant).await.unwrap();

    let by_access = store.load_access("a-1").await.unwrap();
    let by_refresh = store.load_refresh("r-1").await.unwrap();

    assert_eq!(by_access, grant);
    assert_eq!(by_refresh, by_access);
}

#[tokio::test]
async fn test_access_without_refresh_writes_no_mapping() {
    let (store, backend, code) = seeded().await;
    store
        .save_access(&access("a-1", "", &code, None))
        .await
        .unwrap();

    assert_eq!(backend.access_count().await, 1);
    assert_eq!(backend.refresh_count().await, 0);
}

#[tokio::test]
async fn test_failed_refresh_write_leaves_no_access_row() {
    let (store, backend, code) = seeded().await;
    store
        .save_access(&access("a-1", "r-shared", &code, None))
        .await
        .unwrap();

    // Second grant reuses the refresh token, so its refresh insert fails.
    let err = store
        .save_access(&access("a-2", "r-shared", &code, None))
        .await
        .unwrap_err();

    assert!(err.is_duplicate_key());
    assert!(store.load_access("a-2").await.unwrap_err().is_not_found());
    assert_eq!(backend.access_count().await, 1);
    assert_eq!(
        store.load_refresh("r-shared").await.unwrap().access_token,
        "a-1"
    );
}

#[tokio::test]
async fn test_duplicate_access_token_is_rejected() {
    let (store, backend, code) = seeded().await;
    store
        .save_access(&access("a-1", "r-1", &code, None))
        .await
        .unwrap();

    let err = store
        .save_access(&access("a-1", "r-2", &code, None))
        .await
        .unwrap_err();

    assert!(err.is_duplicate_key());
    assert!(store.load_refresh("r-2").await.unwrap_err().is_not_found());
    assert_eq!(backend.refresh_count().await, 1);
}

#[tokio::test]
async fn test_rotation_chain_resolves_predecessor() {
    let (store, _, code) = seeded().await;
    let first = access("a-1", "r-1", &code, None);
    store.save_access(&first).await.unwrap();

    let previous = store.load_refresh("r-1").await.unwrap();
    let second = access("a-2", "r-2", &code, Some(previous));
    store.save_access(&second).await.unwrap();

    let loaded = store.load_access("a-2").await.unwrap();
    let predecessor = loaded.previous.as_deref().expect("predecessor resolved");

    assert_eq!(predecessor, &first);
    assert!(predecessor.previous.is_none());
    assert_eq!(loaded.previous_access_token(), Some("a-1"));
    assert_eq!(loaded.chain_len(), 2);
}

#[tokio::test]
async fn test_long_rotation_chain_resolves_every_hop() {
    let (store, _, code) = seeded().await;
    let mut previous: Option<AccessGrant> = None;
    for i in 0..20 {
        let grant = access(&format!("a-{i}"), &format!("r-{i}"), &code, previous.take());
        store.save_access(&grant).await.unwrap();
        previous = Some(store.load_access(&grant.access_token).await.unwrap());
    }

    let head = store.load_access("a-19").await.unwrap();
    let tokens: Vec<&str> = head
        .lineage()
        .map(|grant| grant.access_token.as_str())
        .collect();

    assert_eq!(tokens.len(), 19);
    assert_eq!(tokens.first(), Some(&"a-18"));
    assert_eq!(tokens.last(), Some(&"a-0"));
}

#[tokio::test]
async fn test_removals_are_idempotent() {
    let (store, _, code) = seeded().await;
    store
        .save_access(&access("a-1", "r-1", &code, None))
        .await
        .unwrap();

    for _ in 0..2 {
        store.remove_access("a-1").await.unwrap();
        store.remove_refresh("r-1").await.unwrap();
        store.remove_authorization("code-1").await.unwrap();
    }
}

#[tokio::test]
async fn test_removing_refresh_keeps_access_grant() {
    let (store, _, code) = seeded().await;
    store
        .save_access(&access("a-1", "r-1", &code, None))
        .await
        .unwrap();

    store.remove_refresh("r-1").await.unwrap();

    assert!(store.load_refresh("r-1").await.unwrap_err().is_not_found());
    assert!(store.load_access("a-1").await.is_ok());
}

#[tokio::test]
async fn test_refresh_pointing_at_removed_access_is_inconsistent() {
    let (store, _, code) = seeded().await;
    store
        .save_access(&access("a-1", "r-1", &code, None))
        .await
        .unwrap();

    store.remove_access("a-1").await.unwrap();

    let err = store.load_refresh("r-1").await.unwrap_err();
    assert!(err.is_reference_inconsistent());
}

// -----------------------------------------------------------------------------
// Dangling and corrupted references
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_removed_authorization_code_breaks_access_load() {
    let (store, _, code) = seeded().await;
    store
        .save_access(&access("a-1", "r-1", &code, None))
        .await
        .unwrap();

    store.remove_authorization("code-1").await.unwrap();

    let err = store.load_access("a-1").await.unwrap_err();
    assert!(err.is_reference_inconsistent());
    assert!(store.load_refresh("r-1").await.unwrap_err().is_reference_inconsistent());
}

#[tokio::test]
async fn test_removed_predecessor_breaks_chain_load() {
    let (store, _, code) = seeded().await;
    let first = access("a-1", "", &code, None);
    store.save_access(&first).await.unwrap();
    store
        .save_access(&access("a-2", "", &code, Some(first)))
        .await
        .unwrap();

    store.remove_access("a-1").await.unwrap();

    let err = store.load_access("a-2").await.unwrap_err();
    assert!(err.is_reference_inconsistent());
    assert!(err.to_string().contains("a-1"));
}

#[tokio::test]
async fn test_never_saved_predecessor_is_rejected() {
    let (store, backend, code) = seeded().await;
    let ghost = access("ghost", "", &code, None);

    let err = store
        .save_access(&access("a-1", "r-1", &code, Some(ghost)))
        .await
        .unwrap_err();

    assert!(err.is_reference_inconsistent());
    assert!(err.to_string().contains("ghost"));
    assert_eq!(backend.access_count().await, 0);
    assert_eq!(backend.refresh_count().await, 0);
}

#[tokio::test]
async fn test_cycle_cannot_be_built_through_save() {
    let (store, backend, code) = seeded().await;
    let x = access("x", "", &code, None);
    let y = access("y", "", &code, Some(x.clone()));
    let x_after_y = access("x", "", &code, Some(y.clone()));

    assert!(store.save_access(&y).await.unwrap_err().is_reference_inconsistent());
    assert!(
        store
            .save_access(&x_after_y)
            .await
            .unwrap_err()
            .is_reference_inconsistent()
    );

    let self_ref = access("z", "", &code, Some(access("z", "", &code, None)));
    assert!(
        store
            .save_access(&self_ref)
            .await
            .unwrap_err()
            .is_reference_inconsistent()
    );
    assert_eq!(backend.access_count().await, 0);
}

#[tokio::test]
async fn test_created_at_is_stored_at_microsecond_precision() {
    let (store, _, mut code) = seeded().await;
    code.code = "code-ns".into();
    code.created_at = datetime!(2026-05-04 10:00:00.123_456_789 UTC);
    store.save_authorization(&code).await.unwrap();

    let mut grant = access("a-ns", "", &code, None);
    grant.created_at = datetime!(2026-05-04 10:01:00.000_000_999 UTC);
    store.save_access(&grant).await.unwrap();

    let loaded = store.load_access("a-ns").await.unwrap();
    assert_eq!(loaded.created_at, datetime!(2026-05-04 10:01 UTC));
    assert_eq!(
        loaded.authorization.created_at,
        datetime!(2026-05-04 10:00:00.123_456 UTC)
    );
    assert_eq!(loaded.to_record(), grant.to_record());
}

fn raw_record(token: &str, previous: &str) -> AccessRecord {
    AccessRecord {
        access_token: token.into(),
        client_id: "app".into(),
        authorization_code: "code-1".into(),
        previous_access_token: previous.into(),
        refresh_token: String::new(),
        expires_in: 3600,
        scope: "openid".into(),
        redirect_uri: REDIRECT.into(),
        created_at: datetime!(2026-05-04 10:01 UTC),
    }
}

#[tokio::test]
async fn test_cyclic_chain_is_detected() {
    let (store, backend, _) = seeded().await;

    let mut tx = backend.begin().await.unwrap();
    tx.insert_access(&raw_record("a-1", "a-2")).await.unwrap();
    tx.insert_access(&raw_record("a-2", "a-1")).await.unwrap();
    tx.commit().await.unwrap();

    let err = store.load_access("a-1").await.unwrap_err();
    assert!(err.is_reference_inconsistent());
    assert!(err.to_string().contains("loops"));
}

#[tokio::test]
async fn test_self_referencing_grant_is_detected() {
    let (store, backend, _) = seeded().await;

    let mut tx = backend.begin().await.unwrap();
    tx.insert_access(&raw_record("a-1", "a-1")).await.unwrap();
    tx.commit().await.unwrap();

    assert!(store.load_access("a-1").await.unwrap_err().is_reference_inconsistent());
}

#[tokio::test]
async fn test_chain_longer_than_limit_is_rejected() {
    let (_, backend, _) = seeded().await;
    let store = GrantStore::with_options(
        Arc::clone(&backend),
        StoreOptions::default().with_max_lineage_depth(3),
    );

    let mut tx = backend.begin().await.unwrap();
    tx.insert_access(&raw_record("a-1", "")).await.unwrap();
    tx.insert_access(&raw_record("a-2", "a-1")).await.unwrap();
    tx.insert_access(&raw_record("a-3", "a-2")).await.unwrap();
    tx.insert_access(&raw_record("a-4", "a-3")).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(store.load_access("a-3").await.unwrap().chain_len(), 3);
    let err = store.load_access("a-4").await.unwrap_err();
    assert!(err.is_reference_inconsistent());
    assert!(err.to_string().contains("exceeds 3"));
}

#[tokio::test]
async fn test_concurrent_saves_of_same_code_yield_one_success() {
    let (store, _) = store();
    let client = store.create_client("app", "s3cret", REDIRECT).await.unwrap();
    let code = authorization("code-race", &client);

    let (left, right) = tokio::join!(
        store.save_authorization(&code),
        store.save_authorization(&code)
    );

    let results = [left, right];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.is_duplicate_key())
    );
}
