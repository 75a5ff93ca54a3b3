//! The setup command: write a template configuration file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use pg_migrate_core::config::ConfigFile;

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Where to write the template
    #[arg(short, long, default_value = super::DEFAULT_CONFIG_PATH)]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub async fn run(args: SetupArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (pass --force to overwrite)",
            args.output.display()
        );
    }

    let template = serde_json::to_string_pretty(&ConfigFile::template())?;
    tokio::fs::write(&args.output, format!("{}\n", template)).await?;

    println!(
        "Configuration file '{}' created successfully.",
        args.output.display()
    );
    println!("Edit the connection details before running a migration.");
    Ok(())
}
