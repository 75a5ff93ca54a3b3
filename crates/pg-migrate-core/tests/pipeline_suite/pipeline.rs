//! Orchestrator scenario tests.
//!
//! Each scenario drives the real pipeline with a scripted stub runner,
//! asserting stage ordering, artifact handling, and failure semantics.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use pg_migrate_core::config::{MigrationConfig, Mode, RunMode};
use pg_migrate_core::orchestrator::{MigrationOrchestrator, MigrationState};
use pg_migrate_core::run::{Stage, StreamName};
use pg_migrate_core::Error;

use super::helpers::{programs, test_config_file, test_run, StubRunner, TEST_TOKEN};

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn auto_mode_reaches_done_through_all_three_stages() {
    let work_dir = TempDir::new().unwrap();
    let runner = Arc::new(StubRunner::new().with_stdout(
        "psql",
        &["public.users", "public.orders", ""],
    ));
    let run = test_run(work_dir.path(), RunMode::Auto);
    let artifact = run.artifact().to_path_buf();

    let mut orchestrator = MigrationOrchestrator::with_runner(run, runner.clone());
    let report = orchestrator.execute().await.unwrap();

    assert_eq!(orchestrator.state(), MigrationState::Done);
    assert!(report.success);

    let calls = runner.calls();
    assert_eq!(programs(&calls), ["pg_dump", "pg_restore", "psql"]);

    // Exactly one artifact, named with the run token, handed to pg_restore.
    assert!(artifact.to_string_lossy().contains(TEST_TOKEN));
    assert_eq!(report.artifact, artifact);
    assert_eq!(calls[1].args.last().map(String::as_str), artifact.to_str());

    // Verification ran exactly once and its blank lines were dropped.
    assert_eq!(runner.count("psql"), 1);
    assert_eq!(report.relations, ["public.users", "public.orders"]);
}

#[tokio::test]
async fn stage_logs_land_under_their_directories() {
    let work_dir = TempDir::new().unwrap();
    let runner = Arc::new(StubRunner::new());
    let run = test_run(work_dir.path(), RunMode::Auto);

    let expected: Vec<PathBuf> = [
        (Stage::Dump, StreamName::Stdout),
        (Stage::Dump, StreamName::Stderr),
        (Stage::Restore, StreamName::Stdout),
        (Stage::Restore, StreamName::Stderr),
        (Stage::Verify, StreamName::Stdout),
        (Stage::Verify, StreamName::Stderr),
    ]
    .into_iter()
    .map(|(stage, stream)| run.log_path(stage, stream))
    .collect();

    let mut orchestrator = MigrationOrchestrator::with_runner(run, runner);
    orchestrator.execute().await.unwrap();

    for path in expected {
        assert!(path.exists(), "missing log file {}", path.display());
        assert!(path.to_string_lossy().contains(TEST_TOKEN));
    }
}

// ============================================================================
// Manual Mode
// ============================================================================

#[tokio::test]
async fn manual_mode_skips_pg_dump_and_restores_the_supplied_artifact() {
    let work_dir = TempDir::new().unwrap();
    let artifact = work_dir.path().join("existing.dump");
    tokio::fs::write(&artifact, b"archive bytes").await.unwrap();

    let runner = Arc::new(StubRunner::new());
    let run = test_run(work_dir.path(), RunMode::Manual(artifact.clone()));

    let mut orchestrator = MigrationOrchestrator::with_runner(run, runner.clone());
    orchestrator.execute().await.unwrap();

    let calls = runner.calls();
    assert_eq!(programs(&calls), ["pg_restore", "psql"]);
    assert_eq!(calls[0].args.last().map(String::as_str), artifact.to_str());
}

#[tokio::test]
async fn manual_mode_with_missing_artifact_fails_before_any_tool_runs() {
    let work_dir = TempDir::new().unwrap();
    let missing = work_dir.path().join("nope.dump");

    let runner = Arc::new(StubRunner::new());
    let run = test_run(work_dir.path(), RunMode::Manual(missing.clone()));

    let mut orchestrator = MigrationOrchestrator::with_runner(run, runner.clone());
    let err = orchestrator.execute().await.unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert!(matches!(err, Error::ArtifactNotFound(path) if path == missing));
    assert_eq!(orchestrator.state(), MigrationState::Failed);
    assert!(runner.calls().is_empty());
}

// ============================================================================
// Config Resolution
// ============================================================================

#[test]
fn manual_mode_without_artifact_is_rejected_before_any_stage() {
    let config = MigrationConfig {
        file: test_config_file(),
        mode: Mode::Manual,
        ..Default::default()
    };

    let err = config.resolve().unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn auto_mode_with_explicit_artifact_is_rejected() {
    let config = MigrationConfig {
        file: test_config_file(),
        artifact: Some(PathBuf::from("old.dump")),
        ..Default::default()
    };

    let err = config.resolve().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

// ============================================================================
// Failure Propagation
// ============================================================================

#[tokio::test]
async fn failed_dump_aborts_before_restore() {
    let work_dir = TempDir::new().unwrap();
    let runner = Arc::new(StubRunner::new().with_exit_code("pg_dump", 2));
    let run = test_run(work_dir.path(), RunMode::Auto);

    let mut orchestrator = MigrationOrchestrator::with_runner(run, runner.clone());
    let err = orchestrator.execute().await.unwrap_err();

    assert_eq!(err.exit_code(), 4);
    assert!(matches!(err, Error::Dump { code: 2, .. }));
    assert_eq!(orchestrator.state(), MigrationState::Failed);
    assert_eq!(runner.count("pg_restore"), 0);
    assert_eq!(runner.count("psql"), 0);
}

#[tokio::test]
async fn failed_restore_aborts_before_verification() {
    let work_dir = TempDir::new().unwrap();
    let runner = Arc::new(StubRunner::new().with_exit_code("pg_restore", 1));
    let run = test_run(work_dir.path(), RunMode::Auto);

    let mut orchestrator = MigrationOrchestrator::with_runner(run, runner.clone());
    let err = orchestrator.execute().await.unwrap_err();

    assert_eq!(err.exit_code(), 5);
    assert!(matches!(err, Error::Restore { code: 1, .. }));
    assert_eq!(orchestrator.state(), MigrationState::Failed);
    assert_eq!(runner.count("pg_restore"), 1);
    assert_eq!(runner.count("psql"), 0);
}

#[tokio::test]
async fn failed_verification_surfaces_error_with_log_paths() {
    let work_dir = TempDir::new().unwrap();
    let runner = Arc::new(StubRunner::new().with_exit_code("psql", 2));
    let run = test_run(work_dir.path(), RunMode::Auto);

    let mut orchestrator = MigrationOrchestrator::with_runner(run, runner.clone());
    let err = orchestrator.execute().await.unwrap_err();

    assert_eq!(orchestrator.state(), MigrationState::Failed);
    // The restore itself completed; only the observation failed.
    assert_eq!(runner.count("pg_restore"), 1);

    match err {
        Error::Verification {
            code,
            stdout_log,
            stderr_log,
        } => {
            assert_eq!(code, 2);
            assert!(stdout_log.exists());
            assert!(stderr_log.exists());
        }
        other => panic!("expected verification error, got {:?}", other),
    }
}

// ============================================================================
// Credential Hygiene
// ============================================================================

#[tokio::test]
async fn passwords_never_reach_arguments_or_debug_output() {
    let work_dir = TempDir::new().unwrap();
    let runner = Arc::new(StubRunner::new());
    let run = test_run(work_dir.path(), RunMode::Auto);

    let mut orchestrator = MigrationOrchestrator::with_runner(run, runner.clone());
    orchestrator.execute().await.unwrap();

    for spec in runner.calls() {
        assert!(spec.args.iter().all(|arg| !arg.contains("s3cret")));
        assert!(!spec.render().contains("s3cret"));
        assert!(!format!("{:?}", spec).contains("s3cret"));
    }
}
