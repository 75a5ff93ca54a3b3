//! Reporting helpers: introspection reports and row-count comparison.
//!
//! Both reporting surfaces reuse the verification stage's query contract: any
//! single SQL string runs through psql with unaligned tab-separated tuples,
//! so captured rows can be split mechanically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::catalog::QueryCatalog;
use crate::config::Endpoint;
use crate::logsink::{EchoStream, StageLogs, TeeSink};
use crate::process::ToolRunner;
use crate::stages::verify;
use crate::{Error, Result};

/// Estimated row counts per user table, freshest after an `ANALYZE`.
pub const ROW_COUNT_SQL: &str = "SELECT schemaname, relname, n_live_tup \
     FROM pg_stat_user_tables \
     ORDER BY schemaname, relname;";

fn append_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Runs ad-hoc SQL against endpoints through the injected runner.
///
/// Every invocation's psql output accumulates in `<prefix>_stdout.log` and
/// `<prefix>_stderr.log`; rows are captured for the caller instead of echoed.
pub struct QueryExecutor<'a> {
    runner: &'a dyn ToolRunner,
    stdout_log: PathBuf,
    stderr_log: PathBuf,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(runner: &'a dyn ToolRunner, log_prefix: &Path) -> Self {
        Self {
            runner,
            stdout_log: append_suffix(log_prefix, "_stdout.log"),
            stderr_log: append_suffix(log_prefix, "_stderr.log"),
        }
    }

    /// Run `sql` and return its tab-separated tuples, blank lines dropped.
    pub async fn fetch(&self, endpoint: &Endpoint, sql: &str) -> Result<Vec<Vec<String>>> {
        let (echo, captured) = EchoStream::capture();
        let mut logs = StageLogs {
            stdout: TeeSink::open(self.stdout_log.clone(), echo).await?,
            stderr: TeeSink::open(self.stderr_log.clone(), EchoStream::Stderr).await?,
        };

        let spec = verify::command(endpoint, sql);
        let code = self.runner.run(&spec, &mut logs).await?;
        if code != 0 {
            return Err(Error::Verification {
                code,
                stdout_log: self.stdout_log.clone(),
                stderr_log: self.stderr_log.clone(),
            });
        }

        let rows = captured
            .lock()
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect();
        Ok(rows)
    }

    /// Run `sql` for its side effects, discarding any output.
    pub async fn execute(&self, endpoint: &Endpoint, sql: &str) -> Result<()> {
        self.fetch(endpoint, sql).await.map(|_| ())
    }
}

/// One titled block of rows in an introspection report.
#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub rows: Vec<Vec<String>>,
}

/// Catalog results for one database.
#[derive(Debug, Clone)]
pub struct InfoReport {
    pub client: String,
    pub database: String,
    pub generated: String,
    pub sections: Vec<Section>,
}

impl InfoReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Database info: {} ({})\n",
            self.database, self.client
        ));
        out.push_str(&format!("Generated:     {}\n", self.generated));

        for section in &self.sections {
            out.push_str(&format!("\n{}:\n", section.title));
            out.push_str(&format!("{}\n", "=".repeat(20)));
            out.push_str(&format!("Total rows: {}\n", section.rows.len()));
            for row in &section.rows {
                out.push_str(&row.join("\t"));
                out.push('\n');
            }
        }

        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

/// Run every catalog query against `endpoint`, in catalog order.
pub async fn database_info(
    runner: &dyn ToolRunner,
    endpoint: &Endpoint,
    catalog: &QueryCatalog,
    client: &str,
    log_prefix: &Path,
) -> Result<InfoReport> {
    let executor = QueryExecutor::new(runner, log_prefix);
    let mut sections = Vec::with_capacity(catalog.len());

    for (title, sql) in catalog.iter() {
        let rows = executor.fetch(endpoint, sql).await?;
        if rows.is_empty() {
            warn!("No rows returned for '{}'", title);
        }
        sections.push(Section {
            title: title.clone(),
            rows,
        });
    }

    Ok(InfoReport {
        client: client.to_string(),
        database: endpoint.database.clone(),
        generated: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        sections,
    })
}

/// Estimated row count for one user table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub schema: String,
    pub table: String,
    pub estimated_rows: i64,
}

/// Parse `ROW_COUNT_SQL` tuples into table counts.
pub fn parse_table_counts(rows: Vec<Vec<String>>) -> Result<Vec<TableCount>> {
    rows.into_iter()
        .map(|row| {
            if row.len() != 3 {
                return Err(Error::Serialization(format!(
                    "expected 3 columns of row-count output, got {}",
                    row.len()
                )));
            }
            let estimated_rows = row[2]
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::Serialization(format!("invalid row count '{}'", row[2])))?;

            Ok(TableCount {
                schema: row[0].clone(),
                table: row[1].clone(),
                estimated_rows,
            })
        })
        .collect()
}

/// One table's source/target estimate pair.
#[derive(Debug, Clone)]
pub struct CountComparison {
    pub schema: String,
    pub table: String,
    pub source_rows: Option<i64>,
    pub target_rows: Option<i64>,
}

impl CountComparison {
    /// Estimates are present on both sides and equal.
    pub fn matches(&self) -> bool {
        match (self.source_rows, self.target_rows) {
            (Some(source), Some(target)) => source == target,
            _ => false,
        }
    }
}

/// Source/target row-count comparison, one entry per table seen on either
/// side, ordered by schema then table.
#[derive(Debug, Clone, Default)]
pub struct RowCountReport {
    pub entries: Vec<CountComparison>,
}

impl RowCountReport {
    pub fn matching(&self) -> usize {
        self.entries.iter().filter(|entry| entry.matches()).count()
    }

    /// Present on both sides with differing estimates.
    pub fn mismatched(&self) -> Vec<&CountComparison> {
        self.entries
            .iter()
            .filter(|entry| entry.source_rows.is_some() && entry.target_rows.is_some())
            .filter(|entry| !entry.matches())
            .collect()
    }

    /// Present only in the target database.
    pub fn missing_in_source(&self) -> Vec<&CountComparison> {
        self.entries
            .iter()
            .filter(|entry| entry.source_rows.is_none())
            .collect()
    }

    /// Present only in the source database.
    pub fn missing_in_target(&self) -> Vec<&CountComparison> {
        self.entries
            .iter()
            .filter(|entry| entry.target_rows.is_none())
            .collect()
    }

    pub fn is_match(&self) -> bool {
        self.entries.iter().all(CountComparison::matches)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("\n=== Row Count Report ===\n\n");
        out.push_str(&format!("Tables Compared:   {}\n", self.entries.len()));
        out.push_str(&format!("Counts Matching:   {}\n", self.matching()));
        out.push_str(&format!("Counts Differing:  {}\n", self.mismatched().len()));
        out.push_str(&format!(
            "Missing in Source: {}\n",
            self.missing_in_source().len()
        ));
        out.push_str(&format!(
            "Missing in Target: {}\n",
            self.missing_in_target().len()
        ));

        let mismatched = self.mismatched();
        if !mismatched.is_empty() {
            out.push_str("\nDiffering counts:\n");
            for entry in mismatched {
                out.push_str(&format!(
                    "  {}.{}: source={} target={}\n",
                    entry.schema,
                    entry.table,
                    entry.source_rows.unwrap_or(0),
                    entry.target_rows.unwrap_or(0),
                ));
            }
        }

        let missing_source = self.missing_in_source();
        if !missing_source.is_empty() {
            out.push_str("\nMissing in source (present only in target):\n");
            for entry in missing_source {
                out.push_str(&format!(
                    "  {}.{} (target rows: {})\n",
                    entry.schema,
                    entry.table,
                    entry.target_rows.unwrap_or(0)
                ));
            }
        }

        let missing_target = self.missing_in_target();
        if !missing_target.is_empty() {
            out.push_str("\nMissing in target (present only in source):\n");
            for entry in missing_target {
                out.push_str(&format!(
                    "  {}.{} (source rows: {})\n",
                    entry.schema,
                    entry.table,
                    entry.source_rows.unwrap_or(0)
                ));
            }
        }

        out.push('\n');
        if self.is_match() {
            out.push_str("Result: MATCH\n");
        } else {
            out.push_str("Result: MISMATCH\n");
        }
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

/// Merge both sides on (schema, table), classifying each table.
pub fn compare_counts(source: Vec<TableCount>, target: Vec<TableCount>) -> RowCountReport {
    let mut merged: BTreeMap<(String, String), (Option<i64>, Option<i64>)> = BTreeMap::new();

    for count in source {
        merged.entry((count.schema, count.table)).or_default().0 = Some(count.estimated_rows);
    }
    for count in target {
        merged.entry((count.schema, count.table)).or_default().1 = Some(count.estimated_rows);
    }

    RowCountReport {
        entries: merged
            .into_iter()
            .map(
                |((schema, table), (source_rows, target_rows))| CountComparison {
                    schema,
                    table,
                    source_rows,
                    target_rows,
                },
            )
            .collect(),
    }
}

/// Refresh estimates and compare row counts across both endpoints.
///
/// ANALYZE failures are logged and ignored; the comparison proceeds with
/// whatever estimates the databases already hold.
pub async fn row_count_report(
    runner: &dyn ToolRunner,
    source: &Endpoint,
    target: &Endpoint,
    log_prefix: &Path,
) -> Result<RowCountReport> {
    let executor = QueryExecutor::new(runner, log_prefix);

    for (which, endpoint) in [("source", source), ("target", target)] {
        if let Err(e) = executor.execute(endpoint, "ANALYZE;").await {
            warn!("ANALYZE on {} failed: {}", which, e);
        }
    }

    let source_counts = parse_table_counts(executor.fetch(source, ROW_COUNT_SQL).await?)?;
    let target_counts = parse_table_counts(executor.fetch(target, ROW_COUNT_SQL).await?)?;

    Ok(compare_counts(source_counts, target_counts))
}
