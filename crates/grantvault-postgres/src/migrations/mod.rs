//! Schema bootstrap.
//!
//! The schema is shipped as embedded sqlx migrations and applied through
//! `sqlx_core::migrate::Migrator`, which records applied versions in
//! `_sqlx_migrations`. Running it against an initialised database is a
//! no-op, and every statement is `CREATE TABLE IF NOT EXISTS` so tables
//! created outside the migrator are accepted too.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use tracing::{info, instrument};

use crate::PgPool;
use crate::error::{PostgresError, Result};

/// Embedded migrations as `(version, description, sql)`, oldest first.
const EMBEDDED_MIGRATIONS: &[(i64, &str, &str)] = &[(
    20261016000001,
    "grant_schema",
    include_str!("../../migrations/20261016000001_grant_schema.sql"),
)];

/// Tables the bootstrap creates.
pub const TABLES: [&str; 4] = ["client", "authorize", "access", "refresh"];

fn build_migrations() -> Vec<Migration> {
    EMBEDDED_MIGRATIONS
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(*description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(*sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Creates the grant tables if they do not exist yet.
///
/// Run once at startup. A failure here is fatal: the store cannot work
/// without its tables.
///
/// # Errors
///
/// Returns [`PostgresError::Migration`] if any statement fails.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running schema bootstrap");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(format!("Migration failed: {e}")))?;

    info!("Schema bootstrap completed");

    Ok(())
}
