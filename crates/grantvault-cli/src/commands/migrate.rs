use anyhow::{Context, Result};
use grantvault_postgres::{PostgresConfig, migrations, pool};

use crate::output::print_success;

pub async fn run(config: &PostgresConfig) -> Result<()> {
    let url = pool::mask_password(&config.url);
    let pool = pool::create_pool(config)
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    migrations::run(&pool)
        .await
        .context("Schema bootstrap failed")?;
    pool.close().await;

    print_success(&format!(
        "Schema ready ({}) on {url}",
        migrations::TABLES.join(", ")
    ));
    Ok(())
}
