//! Verification stage: run one read query against the destination.

use std::time::Instant;

use tracing::info;

use crate::config::Endpoint;
use crate::logsink::StageLogs;
use crate::process::{CommandSpec, ToolRunner};
use crate::run::{MigrationRun, Stage, StageResult};
use crate::{Error, Result};

/// Render a psql invocation running `sql` against `endpoint`.
///
/// Output is unaligned and tuples-only with tab-separated fields, so captured
/// rows can be split mechanically. Also used by the reporting commands, which
/// accept any single SQL string of this shape.
pub fn command(endpoint: &Endpoint, sql: &str) -> CommandSpec {
    CommandSpec::new("psql")
        .arg("--host")
        .arg(&endpoint.host)
        .arg("--port")
        .arg(endpoint.port.to_string())
        .arg("--username")
        .arg(&endpoint.user)
        .arg("--dbname")
        .arg(&endpoint.database)
        .arg("--no-password")
        .arg("--no-align")
        .arg("--tuples-only")
        .arg("--field-separator")
        .arg("\t")
        .arg("--command")
        .arg(sql)
        .env("PGPASSWORD", &endpoint.password)
}

/// Run the verification query against the destination.
///
/// Purely observational: a failure here is reported, but the completed
/// restore is not reversed.
pub async fn run(
    run: &MigrationRun,
    runner: &dyn ToolRunner,
    logs: &mut StageLogs,
) -> Result<StageResult> {
    info!("Verifying restored relations on {}", run.target().describe());

    let started = Instant::now();
    let spec = command(run.target(), &run.settings().verify_sql);
    let code = runner.run(&spec, logs).await?;
    if code != 0 {
        return Err(Error::Verification {
            code,
            stdout_log: logs.stdout.path().to_path_buf(),
            stderr_log: logs.stderr.path().to_path_buf(),
        });
    }

    Ok(StageResult {
        stage: Stage::Verify,
        exit_code: code,
        stdout_log: logs.stdout.path().to_path_buf(),
        stderr_log: logs.stderr.path().to_path_buf(),
        duration_ms: started.elapsed().as_millis() as u64,
    })
}
