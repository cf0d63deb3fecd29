//! Reference and rotation-chain resolution.
//!
//! Loading an access grant is a multi-hop read: the grant row, its client,
//! its authorization code (and that code's client), then the same again for
//! every predecessor. The chain is walked with an explicit loop, a visited
//! set and a hop limit, so a corrupted or looping chain ends in an error
//! instead of unbounded work.

use std::collections::HashSet;

use tracing::debug;

use crate::error::RecordKind;
use crate::storage::RecordStore;
use crate::types::{AccessGrant, AccessRecord, AuthorizationGrant, Client};
use crate::{StoreError, StoreResult};

/// Default maximum number of grants in one rotation chain.
pub const DEFAULT_MAX_LINEAGE_DEPTH: usize = 256;

pub(crate) async fn client<B: RecordStore + ?Sized>(backend: &B, id: &str) -> StoreResult<Client> {
    backend
        .fetch_client(id)
        .await?
        .ok_or_else(|| StoreError::not_found(RecordKind::Client, id))
}

/// Load an authorization code and resolve its client.
pub(crate) async fn authorization<B: RecordStore + ?Sized>(
    backend: &B,
    code: &str,
) -> StoreResult<AuthorizationGrant> {
    let record = backend
        .fetch_authorization(code)
        .await?
        .ok_or_else(|| StoreError::not_found(RecordKind::Authorization, code))?;

    let owner = client(backend, &record.client_id)
        .await
        .map_err(|e| e.into_reference(&format!("authorization code {code}")))?;

    Ok(AuthorizationGrant::from_record(record, owner))
}

/// Load an access grant and its whole rotation chain.
///
/// `max_depth` bounds the number of grants in the chain, the requested one
/// included.
pub(crate) async fn access<B: RecordStore + ?Sized>(
    backend: &B,
    token: &str,
    max_depth: usize,
) -> StoreResult<AccessGrant> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut hops: Vec<(AccessRecord, Client, AuthorizationGrant)> = Vec::new();
    let mut next = Some(token.to_string());

    while let Some(current) = next.take() {
        if !visited.insert(current.clone()) {
            return Err(StoreError::reference_inconsistent(format!(
                "rotation chain of access token {token} loops back to {current}"
            )));
        }
        if hops.len() >= max_depth {
            return Err(StoreError::reference_inconsistent(format!(
                "rotation chain of access token {token} exceeds {max_depth} grants"
            )));
        }

        let record = match backend.fetch_access(&current).await? {
            Some(record) => record,
            None => {
                return Err(match hops.last() {
                    None => StoreError::not_found(RecordKind::Access, current),
                    Some((successor, _, _)) => StoreError::reference_inconsistent(format!(
                        "access token {} refers to missing predecessor {current}",
                        successor.access_token
                    )),
                });
            }
        };

        let context = format!("access token {current}");
        let owner = client(backend, &record.client_id)
            .await
            .map_err(|e| e.into_reference(&context))?;
        let authorized_by = authorization(backend, &record.authorization_code)
            .await
            .map_err(|e| e.into_reference(&context))?;

        next = record.previous().map(str::to_owned);
        hops.push((record, owner, authorized_by));
    }

    debug!(token, grants = hops.len(), "Resolved access lineage");

    // Rebuild from the oldest grant forward so each one owns its predecessor.
    let mut resolved: Option<AccessGrant> = None;
    while let Some((record, owner, authorized_by)) = hops.pop() {
        resolved = Some(AccessGrant::from_record(
            record,
            owner,
            authorized_by,
            resolved,
        ));
    }

    resolved.ok_or_else(|| StoreError::not_found(RecordKind::Access, token))
}
