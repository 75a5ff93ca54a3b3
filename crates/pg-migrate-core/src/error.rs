//! Error types for the migration core library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the migration library.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Artifact path missing or pointing at an empty file
    #[error("Artifact not found or empty: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// pg_dump exited non-zero
    #[error(
        "pg_dump exited with code {code} (stdout log: {}, stderr log: {})",
        .stdout_log.display(),
        .stderr_log.display()
    )]
    Dump {
        code: i32,
        stdout_log: PathBuf,
        stderr_log: PathBuf,
    },

    /// pg_restore exited non-zero
    #[error(
        "pg_restore exited with code {code} (stdout log: {}, stderr log: {})",
        .stdout_log.display(),
        .stderr_log.display()
    )]
    Restore {
        code: i32,
        stdout_log: PathBuf,
        stderr_log: PathBuf,
    },

    /// Verification query exited non-zero
    #[error(
        "verification query exited with code {code} (stdout log: {}, stderr log: {})",
        .stdout_log.display(),
        .stderr_log.display()
    )]
    Verification {
        code: i32,
        stdout_log: PathBuf,
        stderr_log: PathBuf,
    },

    /// External tool could not be spawned
    #[error("Failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Process exit code for this error, distinct per failing stage.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::ArtifactNotFound(_) => 3,
            Error::Dump { .. } => 4,
            Error::Restore { .. } => 5,
            Error::Verification { .. } => 6,
            _ => 1,
        }
    }

    /// Name of the pipeline stage this error belongs to, if any.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Error::ArtifactNotFound(_) | Error::Dump { .. } => Some("dump"),
            Error::Restore { .. } => Some("restore"),
            Error::Verification { .. } => Some("verify"),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
