use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "grantvault")]
#[command(about = "Manage clients and inspect grants in a grantvault store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// PostgreSQL URL (overrides the config file)
    #[arg(short, long, global = true, env = "GRANTVAULT_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Path to a TOML config file (defaults to ./grantvault.toml when present)
    #[arg(short, long, global = true, env = "GRANTVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the grant tables if they do not exist
    Migrate,
    /// Manage registered clients
    Client(ClientArgs),
    /// Inspect and revoke grants
    Grant(GrantArgs),
}

#[derive(clap::Args)]
pub struct ClientArgs {
    #[command(subcommand)]
    pub command: ClientCommands,
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Show a client
    Get(ClientGetArgs),
    /// Register a new client
    Create(ClientCreateArgs),
    /// Replace a client's secret and redirect URI
    Update(ClientUpdateArgs),
}

#[derive(clap::Args)]
pub struct ClientGetArgs {
    /// Client id
    pub id: String,
}

#[derive(clap::Args)]
pub struct ClientCreateArgs {
    /// Client id
    pub id: String,
    /// Redirect URI registered for the client
    #[arg(long)]
    pub redirect_uri: String,
    /// Client secret (a random one is generated if omitted)
    #[arg(long)]
    pub secret: Option<String>,
}

#[derive(clap::Args)]
pub struct ClientUpdateArgs {
    /// Client id
    pub id: String,
    /// New client secret
    #[arg(long)]
    pub secret: String,
    /// New redirect URI
    #[arg(long)]
    pub redirect_uri: String,
}

#[derive(clap::Args)]
pub struct GrantArgs {
    #[command(subcommand)]
    pub command: GrantCommands,
}

#[derive(Subcommand)]
pub enum GrantCommands {
    /// Load an access grant and print its rotation chain
    Show(GrantShowArgs),
    /// Resolve a refresh token to its access grant
    Refresh(GrantRefreshArgs),
    /// Remove an access grant
    Revoke(GrantRevokeArgs),
}

#[derive(clap::Args)]
pub struct GrantShowArgs {
    /// Access token
    pub access_token: String,
}

#[derive(clap::Args)]
pub struct GrantRefreshArgs {
    /// Refresh token
    pub refresh_token: String,
}

#[derive(clap::Args)]
pub struct GrantRevokeArgs {
    /// Access token
    pub access_token: String,
    /// Also remove the refresh token issued with the grant
    #[arg(long)]
    pub with_refresh: bool,
}
