// SPDX-License-Identifier: MIT
mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "deadman",
    version,
    about = "Inspect dead-man's switch vaults anchored in Bitcoin"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output results as JSON.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report whether a vault may receive a heartbeat or be released.
    Status(commands::status::StatusArgs),

    /// Verify a transaction's spell and print the vault state it carries.
    Extract(commands::extract::ExtractArgs),

    /// List vaults in the registry.
    List(commands::list::ListArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status(args) => commands::status::run(args, cli.json).await,
        Commands::Extract(args) => commands::extract::run(args, cli.json).await,
        Commands::List(args) => commands::list::run(args, cli.json),
    }
}
