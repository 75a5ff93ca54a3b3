//! Scenario tests for pg-migrate-core.
//!
//! These tests drive the real orchestrator and reporting helpers against a
//! scripted stub runner, so they exercise stage ordering, artifact handling,
//! and failure semantics without PostgreSQL installed.

pub mod helpers;
pub mod pipeline;
pub mod reporting;
