//! Reporting scenario tests: introspection catalog and row-count comparison.

use tempfile::TempDir;

use pg_migrate_core::catalog::QueryCatalog;
use pg_migrate_core::report;

use super::helpers::{arg_after, test_endpoint, StubRunner};

// ============================================================================
// Catalog Execution
// ============================================================================

#[tokio::test]
async fn database_info_runs_every_catalog_section_in_order() {
    let dir = TempDir::new().unwrap();
    let catalog: QueryCatalog =
        serde_json::from_str(r#"{"tables": "SELECT 1;", "views": "SELECT 2;"}"#).unwrap();

    let runner = StubRunner::new()
        .with_stdout("psql", &["public.users\t64 kB"])
        .with_stdout("psql", &["public.v_orders"]);

    let report = report::database_info(
        &runner,
        &test_endpoint("host1", "db1"),
        &catalog,
        "source",
        &dir.path().join("info_source"),
    )
    .await
    .unwrap();

    assert_eq!(report.database, "db1");
    assert_eq!(report.client, "source");

    let titles: Vec<&str> = report.sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["tables", "views"]);
    assert_eq!(report.sections[0].rows, [["public.users", "64 kB"]]);
    assert_eq!(report.sections[1].rows, [["public.v_orders"]]);
    assert_eq!(runner.count("psql"), 2);

    // Each section's query was passed through verbatim.
    let calls = runner.calls();
    assert_eq!(arg_after(&calls[0], "--command").as_deref(), Some("SELECT 1;"));
    assert_eq!(arg_after(&calls[1], "--command").as_deref(), Some("SELECT 2;"));

    let rendered = report.render();
    assert!(rendered.contains("tables:"));
    assert!(rendered.contains("Total rows: 1"));
}

#[tokio::test]
async fn builtin_catalog_drives_one_query_per_section() {
    let dir = TempDir::new().unwrap();
    let catalog = QueryCatalog::builtin();
    let runner = StubRunner::new();

    let report = report::database_info(
        &runner,
        &test_endpoint("host1", "db1"),
        &catalog,
        "target",
        &dir.path().join("info_target"),
    )
    .await
    .unwrap();

    assert_eq!(report.sections.len(), catalog.len());
    assert_eq!(runner.count("psql"), catalog.len());
}

// ============================================================================
// Row Count Comparison
// ============================================================================

#[tokio::test]
async fn row_count_report_merges_both_sides() {
    let dir = TempDir::new().unwrap();

    // Four psql calls: ANALYZE on each side, then the count query on each.
    let runner = StubRunner::new()
        .with_stdout("psql", &[])
        .with_stdout("psql", &[])
        .with_stdout("psql", &["public\tusers\t100", "public\torders\t50"])
        .with_stdout("psql", &["public\tusers\t100", "public\torders\t49"]);

    let report = report::row_count_report(
        &runner,
        &test_endpoint("host1", "db1"),
        &test_endpoint("host2", "db2"),
        &dir.path().join("row_counts"),
    )
    .await
    .unwrap();

    assert_eq!(runner.count("psql"), 4);
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.matching(), 1);
    assert_eq!(report.mismatched().len(), 1);
    assert!(!report.is_match());
    assert!(report.render().contains("Result: MISMATCH"));
}

#[tokio::test]
async fn analyze_failures_do_not_block_the_comparison() {
    let dir = TempDir::new().unwrap();

    let runner = StubRunner::new()
        .with_exit_code("psql", 1)
        .with_exit_code("psql", 1)
        .with_stdout("psql", &[])
        .with_stdout("psql", &[])
        .with_stdout("psql", &["public\tusers\t10"])
        .with_stdout("psql", &["public\tusers\t10"]);

    let report = report::row_count_report(
        &runner,
        &test_endpoint("host1", "db1"),
        &test_endpoint("host2", "db2"),
        &dir.path().join("row_counts"),
    )
    .await
    .unwrap();

    assert_eq!(report.entries.len(), 1);
    assert!(report.is_match());
}
