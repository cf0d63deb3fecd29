use anyhow::Result;
use colored::Colorize;
use grantvault_core::{AccessGrant, Client};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cli::OutputFormat;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_client(client: &Client, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(client),
        OutputFormat::Table => {
            println!("{}: {}", "Client".cyan(), client.id);
            println!("{}: {}", "Redirect URI".cyan(), client.redirect_uri);
            println!("{}: {}", "Secret".cyan(), client.secret);
            Ok(())
        }
    }
}

pub fn print_grant(grant: &AccessGrant, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(grant),
        OutputFormat::Table => {
            println!("{}", grant_table(grant));
            println!("Chain length: {}", grant.chain_len());
            Ok(())
        }
    }
}

/// One row per grant in the chain, newest first.
pub fn grant_table(grant: &AccessGrant) -> String {
    let mut builder = Builder::default();
    builder.push_record([
        "Access Token",
        "Client",
        "Code",
        "Refresh Token",
        "Scope",
        "Expires At",
    ]);
    for current in std::iter::once(grant).chain(grant.lineage()) {
        builder.push_record([
            current.access_token.clone(),
            current.client.id.clone(),
            current.authorization.code.clone(),
            current.refresh().unwrap_or("-").to_string(),
            current.scope.clone(),
            timestamp(current.expires_at()),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn timestamp(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}
