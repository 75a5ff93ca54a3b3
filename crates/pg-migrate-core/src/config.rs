//! Configuration resolution for migration runs.
//!
//! Connection parameters come from a JSON config file (the shape the setup
//! command generates), from command-line flags, or both; flags override file
//! values field by field. Resolution validates everything up front and
//! produces an immutable [`MigrationRun`](crate::run::MigrationRun).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::run::MigrationRun;

/// Full set of connection parameters for one database instance.
///
/// Only ever built by validation; carries the credential and is therefore
/// deliberately not serializable. The credential is redacted from `Debug`
/// output and reaches child processes solely through a per-invocation
/// `PGPASSWORD` environment entry.
#[derive(Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Endpoint {
    /// Connection summary without the credential.
    pub fn describe(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One endpoint as it appears in the config file or on the command line,
/// before validation. Every field is optional so that flags can override
/// file values individually.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PartialEndpoint {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl PartialEndpoint {
    /// Overlay `other` on top of `self`, field by field.
    pub fn merge(self, other: PartialEndpoint) -> PartialEndpoint {
        PartialEndpoint {
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            database: other.database.or(self.database),
            user: other.user.or(self.user),
            password: other.password.or(self.password),
        }
    }

    /// Require every field, naming `which` endpoint in error messages.
    pub fn into_endpoint(self, which: &str) -> crate::Result<Endpoint> {
        let port = self
            .port
            .ok_or_else(|| crate::Error::Config(format!("{} port is required", which)))?;

        Ok(Endpoint {
            host: require(which, "host", self.host)?,
            port,
            database: require(which, "database", self.database)?,
            user: require(which, "user", self.user)?,
            password: require(which, "password", self.password)?,
        })
    }
}

impl fmt::Debug for PartialEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn require(which: &str, field: &str, value: Option<String>) -> crate::Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(crate::Error::Config(format!(
            "{} {} is required",
            which, field
        ))),
    }
}

/// On-disk configuration file shape (what the setup command generates).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub source: PartialEndpoint,

    #[serde(default)]
    pub target: PartialEndpoint,

    #[serde(default)]
    pub settings: Settings,
}

impl ConfigFile {
    /// Load from a JSON file. Both a missing file and malformed contents are
    /// configuration errors the caller must fix before re-invoking.
    pub async fn load(path: &std::path::Path) -> crate::Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            crate::Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Template written by the setup command, placeholder values included.
    pub fn template() -> Self {
        let endpoint = PartialEndpoint {
            host: Some("localhost".to_string()),
            port: Some(5432),
            database: Some("database_name".to_string()),
            user: Some("user_name".to_string()),
            password: Some("password".to_string()),
        };

        ConfigFile {
            source: endpoint.clone(),
            target: endpoint,
            settings: Settings::default(),
        }
    }
}

/// Tunables that apply to the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Parallel jobs passed to pg_restore
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Directory receiving dump/, dumps/, restore/ and reports/
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Verification query run after the restore
    #[serde(default = "default_verify_sql")]
    pub verify_sql: String,
}

impl Settings {
    /// Validate tunables.
    pub fn validate(&self) -> crate::Result<()> {
        if self.jobs == 0 {
            return Err(crate::Error::Config("jobs must be > 0".to_string()));
        }

        if self.verify_sql.trim().is_empty() {
            return Err(crate::Error::Config(
                "verify_sql must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            work_dir: default_work_dir(),
            verify_sql: default_verify_sql(),
        }
    }
}

fn default_jobs() -> usize {
    4
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_verify_sql() -> String {
    "SELECT schemaname || '.' || tablename FROM pg_tables \
     WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
     ORDER BY 1;"
        .to_string()
}

/// Requested dump mode, before artifact validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Auto,
    Manual,
}

impl std::str::FromStr for Mode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "auto" => Ok(Mode::Auto),
            "manual" => Ok(Mode::Manual),
            other => Err(crate::Error::Config(format!(
                "mode must be auto or manual, got '{}'",
                other
            ))),
        }
    }
}

/// How the dump artifact is obtained, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Produce a fresh artifact with pg_dump.
    Auto,
    /// Reuse an existing artifact at the given path.
    Manual(PathBuf),
}

/// Raw migration inputs: config file values plus command-line overrides.
#[derive(Debug, Default)]
pub struct MigrationConfig {
    pub file: ConfigFile,
    pub source_overrides: PartialEndpoint,
    pub target_overrides: PartialEndpoint,
    pub mode: Mode,
    pub artifact: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub work_dir: Option<PathBuf>,
    pub verify_sql: Option<String>,
}

impl MigrationConfig {
    /// Validate all inputs and produce the immutable run description.
    ///
    /// The run token is generated here and threaded through every stage.
    pub fn resolve(self) -> crate::Result<MigrationRun> {
        let source = self
            .file
            .source
            .merge(self.source_overrides)
            .into_endpoint("source")?;
        let target = self
            .file
            .target
            .merge(self.target_overrides)
            .into_endpoint("target")?;

        let mode = match (self.mode, self.artifact) {
            (Mode::Auto, None) => RunMode::Auto,
            (Mode::Auto, Some(_)) => {
                return Err(crate::Error::Config(
                    "an artifact path cannot be combined with auto mode".to_string(),
                ))
            }
            (Mode::Manual, Some(path)) => RunMode::Manual(path),
            (Mode::Manual, None) => {
                return Err(crate::Error::Config(
                    "manual mode requires an artifact path".to_string(),
                ))
            }
        };

        let mut settings = self.file.settings;
        if let Some(jobs) = self.jobs {
            settings.jobs = jobs;
        }
        if let Some(work_dir) = self.work_dir {
            settings.work_dir = work_dir;
        }
        if let Some(verify_sql) = self.verify_sql {
            settings.verify_sql = verify_sql;
        }
        settings.validate()?;

        Ok(MigrationRun::new(source, target, mode, settings))
    }
}
