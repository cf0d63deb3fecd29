use anyhow::{Context, Result};
use colored::Colorize;
use grantvault_core::{AccessGrant, GrantStorage, GrantStore, RecordStore};

use crate::cli::OutputFormat;
use crate::output::{print_grant, print_success};

pub async fn show(
    store: &dyn GrantStorage,
    access_token: &str,
    format: OutputFormat,
) -> Result<AccessGrant> {
    let grant = store
        .load_access(access_token)
        .await
        .with_context(|| format!("Failed to load access grant {access_token}"))?;
    print_grant(&grant, format)?;
    Ok(grant)
}

pub async fn refresh(
    store: &dyn GrantStorage,
    refresh_token: &str,
    format: OutputFormat,
) -> Result<AccessGrant> {
    let grant = store
        .load_refresh(refresh_token)
        .await
        .with_context(|| format!("Failed to resolve refresh token {refresh_token}"))?;
    print_grant(&grant, format)?;
    Ok(grant)
}

/// Removes an access grant, and its refresh mapping when `with_refresh` is set.
///
/// Reads the raw row rather than the resolved grant so that a grant with a
/// broken chain can still be revoked.
pub async fn revoke<B>(store: &GrantStore<B>, access_token: &str, with_refresh: bool) -> Result<()>
where
    B: RecordStore + ?Sized + 'static,
{
    let record = store
        .backend()
        .fetch_access(access_token)
        .await
        .with_context(|| format!("Failed to read access grant {access_token}"))?;

    if with_refresh
        && let Some(refresh_token) = record.as_ref().and_then(|r| r.refresh())
    {
        store
            .remove_refresh(refresh_token)
            .await
            .with_context(|| format!("Failed to remove refresh token {refresh_token}"))?;
        tracing::debug!(refresh_token, "Refresh token removed");
    }

    store
        .remove_access(access_token)
        .await
        .with_context(|| format!("Failed to remove access grant {access_token}"))?;

    if record.is_some() {
        print_success(&format!("Revoked access grant {}", access_token.cyan()));
    } else {
        print_success(&format!("No access grant {}; nothing to revoke", access_token.cyan()));
    }
    Ok(())
}
