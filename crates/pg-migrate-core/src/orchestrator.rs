//! Fixed-order migration pipeline.
//!
//! The orchestrator advances through dump, restore, and verification, one
//! stage at a time, stopping at the first failure. Re-runs are safe: dump
//! artifacts are uniquely timestamped and restores are re-runnable.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::logsink::{EchoStream, StageLogs};
use crate::process::{SystemToolRunner, ToolRunner};
use crate::run::{MigrationReport, MigrationRun, Stage, StageResult};
use crate::stages::{dump, restore, verify};
use crate::Result;

/// Pipeline position. `Failed` is terminal and reachable from every
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Configuring,
    Dumping,
    Restoring,
    Verifying,
    Done,
    Failed,
}

/// Runs the migration stages in fixed order against an injected tool runner.
pub struct MigrationOrchestrator {
    run: MigrationRun,
    runner: Arc<dyn ToolRunner>,
    state: MigrationState,
}

impl MigrationOrchestrator {
    /// Orchestrator using the real system runner.
    pub fn new(run: MigrationRun) -> Self {
        Self::with_runner(run, Arc::new(SystemToolRunner))
    }

    /// Orchestrator with a caller-supplied runner.
    pub fn with_runner(run: MigrationRun, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            run,
            runner,
            state: MigrationState::Configuring,
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    pub fn migration_run(&self) -> &MigrationRun {
        &self.run
    }

    /// Execute the pipeline to completion.
    ///
    /// On failure the state is `Failed`, no further stage runs, and the
    /// returned error names the stage, exit code, and log paths.
    pub async fn execute(&mut self) -> Result<MigrationReport> {
        let started = Instant::now();
        let mut stages = Vec::new();

        match self.pipeline(&mut stages).await {
            Ok(relations) => {
                self.state = MigrationState::Done;
                let report = MigrationReport {
                    token: self.run.token().to_string(),
                    artifact: self.run.artifact().to_path_buf(),
                    stages,
                    relations,
                    total_duration_ms: started.elapsed().as_millis() as u64,
                    success: true,
                };
                info!(
                    "Migration {} completed in {}ms",
                    self.run.token(),
                    report.total_duration_ms
                );
                Ok(report)
            }
            Err(e) => {
                self.state = MigrationState::Failed;
                error!("Migration {} failed: {}", self.run.token(), e);
                Err(e)
            }
        }
    }

    async fn pipeline(&mut self, stages: &mut Vec<StageResult>) -> Result<Vec<String>> {
        self.state = MigrationState::Dumping;
        info!(
            "step=1/3 dump: {} -> {}",
            self.run.source().describe(),
            self.run.artifact().display()
        );
        let mut logs = StageLogs::open(&self.run, Stage::Dump).await?;
        stages.push(dump::run(&self.run, self.runner.as_ref(), &mut logs).await?);

        self.state = MigrationState::Restoring;
        info!(
            "step=2/3 restore: {} -> {}",
            self.run.artifact().display(),
            self.run.target().describe()
        );
        let mut logs = StageLogs::open(&self.run, Stage::Restore).await?;
        stages.push(restore::run(&self.run, self.runner.as_ref(), &mut logs).await?);

        self.state = MigrationState::Verifying;
        info!("step=3/3 verify: {}", self.run.target().describe());
        let (echo, captured) = EchoStream::capture();
        let mut logs =
            StageLogs::open_with(&self.run, Stage::Verify, echo, EchoStream::Stderr).await?;
        stages.push(verify::run(&self.run, self.runner.as_ref(), &mut logs).await?);

        let relations = captured
            .lock()
            .iter()
            .filter(|line| !line.trim().is_empty())
            .cloned()
            .collect();
        Ok(relations)
    }
}
