use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::info::InfoArgs;
use commands::migrate::MigrateArgs;
use commands::reports::ReportsArgs;
use commands::setup::SetupArgs;

#[derive(Parser)]
#[command(name = "pg-migrate")]
#[command(about = "PostgreSQL dump/restore migration tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a migration: dump the source, restore into the target, verify
    Migrate(MigrateArgs),

    /// Write a template configuration file
    Setup(SetupArgs),

    /// Run the introspection catalog against source and/or target
    Info(InfoArgs),

    /// Compare estimated row counts between source and target
    Reports(ReportsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    // Priority: RUST_LOG env var > verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Migrate(args) => {
            commands::migrate::run(args).await?;
        }
        Commands::Setup(args) => {
            commands::setup::run(args).await?;
        }
        Commands::Info(args) => {
            commands::info::run(args).await?;
        }
        Commands::Reports(args) => {
            commands::reports::run(args).await?;
        }
    }

    Ok(())
}
