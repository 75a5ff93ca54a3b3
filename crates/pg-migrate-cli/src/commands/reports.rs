//! The reports command: compare row counts between source and target.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use pg_migrate_core::process::SystemToolRunner;
use pg_migrate_core::report;
use pg_migrate_core::run::generate_token;

#[derive(Debug, Args)]
pub struct ReportsArgs {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory receiving reports/
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,
}

pub async fn run(args: ReportsArgs) -> Result<()> {
    let file = super::load_config(args.config.as_deref()).await;

    let source = file
        .source
        .clone()
        .into_endpoint("source")
        .unwrap_or_else(|e| super::fail(e));
    let target = file
        .target
        .clone()
        .into_endpoint("target")
        .unwrap_or_else(|e| super::fail(e));

    let work_dir = args
        .work_dir
        .unwrap_or_else(|| file.settings.work_dir.clone());
    let reports_dir = work_dir.join("reports");
    tokio::fs::create_dir_all(&reports_dir).await?;

    info!(
        "Comparing row counts: {} vs {}",
        source.describe(),
        target.describe()
    );

    let runner = SystemToolRunner;
    let log_prefix = reports_dir.join(format!("row_counts_{}", generate_token()));
    let report = report::row_count_report(&runner, &source, &target, &log_prefix)
        .await
        .unwrap_or_else(|e| super::fail(e));

    report.print();

    let path = reports_dir.join("row_counts.txt");
    tokio::fs::write(&path, report.render()).await?;
    println!("Report saved to {}", path.display());

    Ok(())
}
