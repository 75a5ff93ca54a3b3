//! The migrate command: resolve config, confirm, run the pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use dialoguer::Confirm;

use pg_migrate_core::config::{MigrationConfig, Mode, PartialEndpoint};
use pg_migrate_core::orchestrator::MigrationOrchestrator;
use pg_migrate_core::run::MigrationRun;

/// Source endpoint override flags. Any field given here beats the config
/// file's value for that field.
#[derive(Debug, Default, Args)]
pub struct SourceArgs {
    /// Source database host
    #[arg(long, value_name = "HOST")]
    pub source_host: Option<String>,

    /// Source database port
    #[arg(long, value_name = "PORT")]
    pub source_port: Option<u16>,

    /// Source database name
    #[arg(long = "source-db", value_name = "DB")]
    pub source_database: Option<String>,

    /// Source database user
    #[arg(long, value_name = "USER")]
    pub source_user: Option<String>,

    /// Source database password
    #[arg(long, value_name = "PASSWORD")]
    pub source_password: Option<String>,
}

impl From<SourceArgs> for PartialEndpoint {
    fn from(args: SourceArgs) -> Self {
        PartialEndpoint {
            host: args.source_host,
            port: args.source_port,
            database: args.source_database,
            user: args.source_user,
            password: args.source_password,
        }
    }
}

/// Target endpoint override flags.
#[derive(Debug, Default, Args)]
pub struct TargetArgs {
    /// Target database host
    #[arg(long, value_name = "HOST")]
    pub target_host: Option<String>,

    /// Target database port
    #[arg(long, value_name = "PORT")]
    pub target_port: Option<u16>,

    /// Target database name
    #[arg(long = "target-db", value_name = "DB")]
    pub target_database: Option<String>,

    /// Target database user
    #[arg(long, value_name = "USER")]
    pub target_user: Option<String>,

    /// Target database password
    #[arg(long, value_name = "PASSWORD")]
    pub target_password: Option<String>,
}

impl From<TargetArgs> for PartialEndpoint {
    fn from(args: TargetArgs) -> Self {
        PartialEndpoint {
            host: args.target_host,
            port: args.target_port,
            database: args.target_database,
            user: args.target_user,
            password: args.target_password,
        }
    }
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Dump mode: auto (fresh pg_dump) or manual (reuse an artifact)
    #[arg(long, default_value = "auto")]
    pub mode: String,

    /// Existing dump artifact to restore (manual mode only)
    #[arg(long, value_name = "PATH")]
    pub artifact: Option<PathBuf>,

    /// Parallel jobs passed to pg_restore
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Directory receiving dump/, dumps/, restore/ and reports/
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Verification query to run after the restore
    #[arg(long, value_name = "SQL")]
    pub verify_sql: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

pub async fn run(args: MigrateArgs) -> Result<()> {
    let file = super::load_config(args.config.as_deref()).await;

    let mode = args
        .mode
        .parse::<Mode>()
        .unwrap_or_else(|e| super::fail(e));

    let config = MigrationConfig {
        file,
        source_overrides: args.source.into(),
        target_overrides: args.target.into(),
        mode,
        artifact: args.artifact,
        jobs: args.jobs,
        work_dir: args.work_dir,
        verify_sql: args.verify_sql,
    };

    let run = config.resolve().unwrap_or_else(|e| super::fail(e));

    println!(
        "Migration {}: {} -> {}",
        run.token(),
        run.source().describe(),
        run.target().describe()
    );

    if !args.yes && !confirm(&run)? {
        println!("Migration aborted.");
        return Ok(());
    }

    let mut orchestrator = MigrationOrchestrator::new(run);
    match orchestrator.execute().await {
        Ok(report) => {
            report.print();
            println!("Migration completed successfully.");
            Ok(())
        }
        Err(e) => super::fail(e),
    }
}

fn confirm(run: &MigrationRun) -> Result<bool> {
    let prompt = format!(
        "Copy {} into {}?",
        run.source().describe(),
        run.target().describe()
    );
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}
