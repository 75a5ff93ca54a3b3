//! PostgreSQL Migration Core Library
//!
//! This crate provides the core functionality for copying a PostgreSQL
//! database between hosts: it sequences pg_dump, pg_restore, and a psql
//! verification query, with per-stage logging and reporting helpers.

pub mod catalog;
pub mod config;
pub mod error;
pub mod logsink;
pub mod orchestrator;
pub mod process;
pub mod report;
pub mod run;
pub mod stages;

pub use catalog::QueryCatalog;
pub use config::{
    ConfigFile, Endpoint, MigrationConfig, Mode, PartialEndpoint, RunMode, Settings,
};
pub use error::{Error, Result};
pub use logsink::{EchoStream, StageLogs, TeeSink};
pub use orchestrator::{MigrationOrchestrator, MigrationState};
pub use process::{CommandSpec, SystemToolRunner, ToolRunner};
pub use report::{CountComparison, InfoReport, QueryExecutor, RowCountReport, TableCount};
pub use run::{
    generate_token, MigrationReport, MigrationRun, Stage, StageResult, StreamName,
};
