//! Test helper utilities.
//!
//! Provides endpoint/run constructors and the scripted stub runner used
//! across the scenario tests.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use pg_migrate_core::config::{ConfigFile, Endpoint, PartialEndpoint, RunMode, Settings};
use pg_migrate_core::logsink::StageLogs;
use pg_migrate_core::process::{CommandSpec, ToolRunner};
use pg_migrate_core::run::MigrationRun;
use pg_migrate_core::Result;

pub const TEST_TOKEN: &str = "20240101_120000";

/// Partial endpoint with every field populated.
pub fn test_partial(host: &str, database: &str) -> PartialEndpoint {
    PartialEndpoint {
        host: Some(host.to_string()),
        port: Some(5432),
        database: Some(database.to_string()),
        user: Some("app".to_string()),
        password: Some("s3cret".to_string()),
    }
}

/// Validated endpoint with every field populated.
pub fn test_endpoint(host: &str, database: &str) -> Endpoint {
    test_partial(host, database).into_endpoint("test").unwrap()
}

/// Config file with both endpoints fully populated.
pub fn test_config_file() -> ConfigFile {
    ConfigFile {
        source: test_partial("host1", "db1"),
        target: test_partial("host2", "db2"),
        settings: Settings::default(),
    }
}

/// Run rooted at `work_dir` with the fixed test token.
pub fn test_run(work_dir: &Path, mode: RunMode) -> MigrationRun {
    MigrationRun::with_token(
        TEST_TOKEN.to_string(),
        test_endpoint("host1", "db1"),
        test_endpoint("host2", "db2"),
        mode,
        Settings {
            work_dir: work_dir.to_path_buf(),
            ..Settings::default()
        },
    )
}

/// Value following `flag` in an invocation's argument list.
pub fn arg_after(spec: &CommandSpec, flag: &str) -> Option<String> {
    spec.args
        .iter()
        .position(|arg| arg == flag)
        .and_then(|i| spec.args.get(i + 1))
        .cloned()
}

/// Program names of the recorded invocations, in order.
pub fn programs(calls: &[CommandSpec]) -> Vec<String> {
    calls.iter().map(|spec| spec.program.clone()).collect()
}

/// Scripted stand-in for the external PostgreSQL tools.
///
/// Records every invocation, plays back queued exit codes and stdout lines
/// per program (consumed in call order; exhausted queues mean exit 0 and no
/// output), and fabricates the dump artifact when a pg_dump invocation
/// succeeds so the artifact invariant holds without a real database.
#[derive(Default)]
pub struct StubRunner {
    exit_codes: Mutex<HashMap<String, VecDeque<i32>>>,
    stdout_lines: Mutex<HashMap<String, VecDeque<Vec<String>>>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl StubRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an exit code for the next unscripted invocation of `program`.
    pub fn with_exit_code(self, program: &str, code: i32) -> Self {
        self.exit_codes
            .lock()
            .entry(program.to_string())
            .or_default()
            .push_back(code);
        self
    }

    /// Queue stdout lines for the next unscripted invocation of `program`.
    pub fn with_stdout(self, program: &str, lines: &[&str]) -> Self {
        self.stdout_lines
            .lock()
            .entry(program.to_string())
            .or_default()
            .push_back(lines.iter().map(|line| line.to_string()).collect());
        self
    }

    /// Every recorded invocation, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    /// How many times `program` was invoked.
    pub fn count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|spec| spec.program == program)
            .count()
    }
}

#[async_trait]
impl ToolRunner for StubRunner {
    async fn run(&self, spec: &CommandSpec, logs: &mut StageLogs) -> Result<i32> {
        self.calls.lock().push(spec.clone());

        let code = self
            .exit_codes
            .lock()
            .get_mut(&spec.program)
            .and_then(VecDeque::pop_front)
            .unwrap_or(0);

        if spec.program == "pg_dump" && code == 0 {
            if let Some(path) = arg_after(spec, "--file") {
                tokio::fs::write(&path, b"stub archive").await?;
            }
        }

        let lines = self
            .stdout_lines
            .lock()
            .get_mut(&spec.program)
            .and_then(VecDeque::pop_front);
        if let Some(lines) = lines {
            for line in &lines {
                logs.stdout.write_line(line).await?;
            }
        }

        Ok(code)
    }
}
