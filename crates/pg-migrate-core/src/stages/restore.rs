//! Restore stage: apply the artifact to the destination database.

use std::time::Instant;

use tracing::info;

use crate::logsink::StageLogs;
use crate::process::{CommandSpec, ToolRunner};
use crate::run::{MigrationRun, Stage, StageResult};
use crate::stages::dump;
use crate::{Error, Result};

/// Render the pg_restore invocation for `run`.
pub fn command(run: &MigrationRun) -> CommandSpec {
    let target = run.target();

    CommandSpec::new("pg_restore")
        .arg("--host")
        .arg(&target.host)
        .arg("--port")
        .arg(target.port.to_string())
        .arg("--username")
        .arg(&target.user)
        .arg("--dbname")
        .arg(&target.database)
        .arg("--no-owner")
        .arg("--no-privileges")
        .arg("--jobs")
        .arg(run.settings().jobs.to_string())
        .arg("--verbose")
        .arg(run.artifact().display().to_string())
        .env("PGPASSWORD", &target.password)
}

/// Run pg_restore against the destination.
///
/// The artifact invariant is re-checked first. pg_restore has no transaction
/// spanning the whole archive; on failure the destination is left in
/// whatever partial state the tool produced, and the log paths are surfaced
/// for diagnosis.
pub async fn run(
    run: &MigrationRun,
    runner: &dyn ToolRunner,
    logs: &mut StageLogs,
) -> Result<StageResult> {
    dump::ensure_artifact(run.artifact()).await?;

    info!(
        "Restoring {} into {} (jobs={})",
        run.artifact().display(),
        run.target().describe(),
        run.settings().jobs
    );

    let started = Instant::now();
    let spec = command(run);
    let code = runner.run(&spec, logs).await?;
    if code != 0 {
        return Err(Error::Restore {
            code,
            stdout_log: logs.stdout.path().to_path_buf(),
            stderr_log: logs.stderr.path().to_path_buf(),
        });
    }

    Ok(StageResult {
        stage: Stage::Restore,
        exit_code: code,
        stdout_log: logs.stdout.path().to_path_buf(),
        stderr_log: logs.stderr.path().to_path_buf(),
        duration_ms: started.elapsed().as_millis() as u64,
    })
}
