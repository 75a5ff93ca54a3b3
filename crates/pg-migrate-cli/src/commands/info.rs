//! The info command: run the introspection catalog and save reports.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use pg_migrate_core::catalog::QueryCatalog;
use pg_migrate_core::process::SystemToolRunner;
use pg_migrate_core::report;
use pg_migrate_core::run::generate_token;
use pg_migrate_core::Error;

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Which database to inspect: source, target, or both
    #[arg(long, default_value = "both")]
    pub client: String,

    /// Catalog file replacing the built-in queries
    #[arg(long, value_name = "JSON")]
    pub catalog: Option<PathBuf>,

    /// Directory receiving reports/
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,
}

fn clients(value: &str) -> Option<Vec<&'static str>> {
    match value {
        "source" => Some(vec!["source"]),
        "target" => Some(vec!["target"]),
        "both" => Some(vec!["source", "target"]),
        _ => None,
    }
}

pub async fn run(args: InfoArgs) -> Result<()> {
    let file = super::load_config(args.config.as_deref()).await;

    let clients = clients(&args.client).unwrap_or_else(|| {
        super::fail(Error::Config(format!(
            "client must be source, target, or both, got '{}'",
            args.client
        )))
    });

    let catalog = match &args.catalog {
        Some(path) => QueryCatalog::load(path)
            .await
            .unwrap_or_else(|e| super::fail(e)),
        None => QueryCatalog::builtin(),
    };

    let work_dir = args
        .work_dir
        .unwrap_or_else(|| file.settings.work_dir.clone());
    let reports_dir = work_dir.join("reports");
    tokio::fs::create_dir_all(&reports_dir).await?;

    let runner = SystemToolRunner;
    let token = generate_token();

    for client in clients {
        let partial = match client {
            "source" => file.source.clone(),
            _ => file.target.clone(),
        };
        let endpoint = partial
            .into_endpoint(client)
            .unwrap_or_else(|e| super::fail(e));

        info!("Fetching info for {} {}", client, endpoint.describe());

        let log_prefix = reports_dir.join(format!("info_{}_{}", client, token));
        let report = report::database_info(&runner, &endpoint, &catalog, client, &log_prefix)
            .await
            .unwrap_or_else(|e| super::fail(e));

        report.print();

        let path = reports_dir.join(format!("info_{}_{}.txt", client, endpoint.database));
        tokio::fs::write(&path, report.render()).await?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}
