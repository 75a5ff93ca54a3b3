//! Run identity, stage naming, and per-stage results.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{Endpoint, RunMode, Settings};

/// One discrete step of the migration pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Dump,
    Restore,
    Verify,
}

impl Stage {
    /// Stage name as it appears in log file names and progress output.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Dump => "dump",
            Stage::Restore => "restore",
            Stage::Verify => "verify",
        }
    }

    /// Directory (under the work dir) receiving this stage's log files.
    pub fn log_dir(&self) -> &'static str {
        match self {
            Stage::Dump => "dumps",
            Stage::Restore | Stage::Verify => "restore",
        }
    }
}

/// Which standard stream of a child process a log file captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamName {
    Stdout,
    Stderr,
}

impl StreamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamName::Stdout => "stdout",
            StreamName::Stderr => "stderr",
        }
    }
}

/// Generate a run token from the current local time.
pub fn generate_token() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Immutable description of one end-to-end migration invocation.
///
/// The timestamp token is generated once at resolution time; every file the
/// run produces (artifact, log files) embeds it, so re-runs never collide.
#[derive(Debug, Clone)]
pub struct MigrationRun {
    token: String,
    source: Endpoint,
    target: Endpoint,
    mode: RunMode,
    settings: Settings,
    artifact: PathBuf,
}

impl MigrationRun {
    /// Build a run with a freshly generated token.
    pub fn new(source: Endpoint, target: Endpoint, mode: RunMode, settings: Settings) -> Self {
        Self::with_token(generate_token(), source, target, mode, settings)
    }

    /// Build a run with a caller-chosen token.
    pub fn with_token(
        token: String,
        source: Endpoint,
        target: Endpoint,
        mode: RunMode,
        settings: Settings,
    ) -> Self {
        let artifact = match &mode {
            RunMode::Auto => settings
                .work_dir
                .join("dump")
                .join(format!("pg_dump_{}.dump", token)),
            RunMode::Manual(path) => path.clone(),
        };

        Self {
            token,
            source,
            target,
            mode,
            settings,
            artifact,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> &Endpoint {
        &self.source
    }

    pub fn target(&self) -> &Endpoint {
        &self.target
    }

    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolved artifact path: generated under `dump/` in auto mode,
    /// caller-supplied in manual mode.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Log file path for one stream of one stage.
    pub fn log_path(&self, stage: Stage, stream: StreamName) -> PathBuf {
        self.settings
            .work_dir
            .join(stage.log_dir())
            .join(format!(
                "{}_{}_{}.log",
                stage.name(),
                self.token,
                stream.as_str()
            ))
    }
}

/// Outcome of one stage, kept for the final summary only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub exit_code: i32,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    pub duration_ms: u64,
}

/// Summary of a completed migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub token: String,
    pub artifact: PathBuf,
    pub stages: Vec<StageResult>,
    /// Rows returned by the verification query (schema-qualified relations).
    pub relations: Vec<String>,
    pub total_duration_ms: u64,
    pub success: bool,
}

impl MigrationReport {
    pub fn print(&self) {
        println!("\n=== Migration Report ===\n");
        println!("Run Token:  {}", self.token);
        println!("Artifact:   {}", self.artifact.display());
        println!("Duration:   {}ms", self.total_duration_ms);

        for stage in &self.stages {
            println!();
            println!(
                "{}: exit={} ({}ms)",
                stage.stage.name(),
                stage.exit_code,
                stage.duration_ms
            );
            println!("  stdout log: {}", stage.stdout_log.display());
            println!("  stderr log: {}", stage.stderr_log.display());
        }

        if !self.relations.is_empty() {
            println!("\nRestored relations ({}):", self.relations.len());
            for relation in &self.relations {
                println!("  {}", relation);
            }
        }

        println!();
        if self.success {
            println!("Result: SUCCESS");
        } else {
            println!("Result: FAILED");
        }
    }
}
