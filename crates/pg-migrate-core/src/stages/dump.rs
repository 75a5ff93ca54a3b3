//! Dump stage: produce the migration artifact, or validate a supplied one.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::config::RunMode;
use crate::logsink::StageLogs;
use crate::process::{CommandSpec, ToolRunner};
use crate::run::{MigrationRun, Stage, StageResult};
use crate::{Error, Result};

/// Render the pg_dump invocation for `run`.
///
/// Ownership and privilege metadata are suppressed so the artifact restores
/// cleanly under a differently-privileged destination role.
pub fn command(run: &MigrationRun) -> CommandSpec {
    let source = run.source();

    CommandSpec::new("pg_dump")
        .arg("--host")
        .arg(&source.host)
        .arg("--port")
        .arg(source.port.to_string())
        .arg("--username")
        .arg(&source.user)
        .arg("--dbname")
        .arg(&source.database)
        .arg("--format=custom")
        .arg("--no-owner")
        .arg("--no-privileges")
        .arg("--verbose")
        .arg("--file")
        .arg(run.artifact().display().to_string())
        .env("PGPASSWORD", &source.password)
}

/// Run the dump stage.
///
/// Auto mode invokes pg_dump and then enforces the artifact invariant.
/// Manual mode only checks the caller-supplied artifact; no external process
/// is started.
pub async fn run(
    run: &MigrationRun,
    runner: &dyn ToolRunner,
    logs: &mut StageLogs,
) -> Result<StageResult> {
    let started = Instant::now();

    match run.mode() {
        RunMode::Auto => {
            if let Some(parent) = run.artifact().parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            info!(
                "Dumping {} to {}",
                run.source().describe(),
                run.artifact().display()
            );

            let spec = command(run);
            let code = runner.run(&spec, logs).await?;
            if code != 0 {
                return Err(Error::Dump {
                    code,
                    stdout_log: logs.stdout.path().to_path_buf(),
                    stderr_log: logs.stderr.path().to_path_buf(),
                });
            }

            ensure_artifact(run.artifact()).await?;
        }
        RunMode::Manual(path) => {
            info!("Reusing existing artifact: {}", path.display());
            ensure_artifact(path).await?;
        }
    }

    Ok(StageResult {
        stage: Stage::Dump,
        exit_code: 0,
        stdout_log: logs.stdout.path().to_path_buf(),
        stderr_log: logs.stderr.path().to_path_buf(),
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// The artifact must exist and be non-empty before a restore may run.
pub async fn ensure_artifact(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.len() > 0 => Ok(()),
        Ok(_) => Err(Error::ArtifactNotFound(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::ArtifactNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
