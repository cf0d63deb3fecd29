mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{ClientCommands, Cli, Commands, GrantCommands};
use output::print_error;

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::resolve(&cli)?;
    observability::init_tracing_with_level(&config.logging.level);
    let format = cli.format.unwrap_or_default();

    if let Commands::Migrate = &cli.command {
        return commands::migrate::run(&config.database).await;
    }

    let store = grantvault_postgres::connect(&config.database)
        .await
        .with_context(|| {
            format!(
                "Failed to open store at {}",
                grantvault_postgres::pool::mask_password(&config.database.url)
            )
        })?;

    match &cli.command {
        Commands::Migrate => {}
        Commands::Client(args) => match &args.command {
            ClientCommands::Get(get) => {
                commands::client::get(&store, &get.id, format).await?;
            }
            ClientCommands::Create(create) => {
                commands::client::create(&store, create, format).await?;
            }
            ClientCommands::Update(update) => {
                commands::client::update(&store, update, format).await?;
            }
        },
        Commands::Grant(args) => match &args.command {
            GrantCommands::Show(show) => {
                commands::grant::show(&store, &show.access_token, format).await?;
            }
            GrantCommands::Refresh(refresh) => {
                commands::grant::refresh(&store, &refresh.refresh_token, format).await?;
            }
            GrantCommands::Revoke(revoke) => {
                commands::grant::revoke(&store, &revoke.access_token, revoke.with_refresh)
                    .await?;
            }
        },
    }

    store.backend().close().await;
    Ok(())
}
