use anyhow::{Context, Result};
use colored::Colorize;
use grantvault_core::{Client, GrantStorage};
use rand::Rng;

use crate::cli::{ClientCreateArgs, ClientUpdateArgs, OutputFormat};
use crate::output::{print_client, print_success};

/// Random 32-byte client secret, hex encoded.
pub fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

pub async fn get(store: &dyn GrantStorage, id: &str, format: OutputFormat) -> Result<Client> {
    let client = store
        .get_client(id)
        .await
        .with_context(|| format!("Failed to load client {id}"))?;
    print_client(&client, format)?;
    Ok(client)
}

pub async fn create(
    store: &dyn GrantStorage,
    args: &ClientCreateArgs,
    format: OutputFormat,
) -> Result<Client> {
    let secret = args.secret.clone().unwrap_or_else(generate_secret);
    let client = store
        .create_client(&args.id, &secret, &args.redirect_uri)
        .await
        .with_context(|| format!("Failed to create client {}", args.id))?;

    print_success(&format!("Created client {}", client.id.cyan()));
    print_client(&client, format)?;
    Ok(client)
}

pub async fn update(
    store: &dyn GrantStorage,
    args: &ClientUpdateArgs,
    format: OutputFormat,
) -> Result<Client> {
    let client = store
        .update_client(&args.id, &args.secret, &args.redirect_uri)
        .await
        .with_context(|| format!("Failed to update client {}", args.id))?;

    print_success(&format!("Updated client {}", client.id.cyan()));
    print_client(&client, format)?;
    Ok(client)
}
