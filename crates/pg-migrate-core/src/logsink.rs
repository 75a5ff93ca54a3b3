//! Per-stage log sinks that tee child output to console and file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::run::{MigrationRun, Stage, StreamName};
use crate::Result;

/// Console half of a tee sink: a real standard stream, or an in-memory
/// capture buffer when the caller post-processes the lines (verification,
/// reporting, tests).
#[derive(Clone)]
pub enum EchoStream {
    Stdout,
    Stderr,
    Capture(Arc<Mutex<Vec<String>>>),
}

impl EchoStream {
    /// New capture buffer, returned together with a handle for reading it
    /// back after the child has exited.
    pub fn capture() -> (EchoStream, Arc<Mutex<Vec<String>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        (EchoStream::Capture(buffer.clone()), buffer)
    }

    fn echo(&self, line: &str) {
        match self {
            EchoStream::Stdout => println!("{}", line),
            EchoStream::Stderr => eprintln!("{}", line),
            EchoStream::Capture(buffer) => buffer.lock().push(line.to_string()),
        }
    }
}

/// Line sink that appends to a log file and mirrors every line to a console
/// side. Line order within one sink is preserved; nothing is guaranteed
/// across two sinks.
pub struct TeeSink {
    path: PathBuf,
    file: File,
    echo: EchoStream,
}

impl TeeSink {
    /// Open the log file at `path` for appending, creating it and any parent
    /// directories as needed. Repeated opens of the same path are fine.
    pub async fn open(path: PathBuf, echo: EchoStream) -> Result<TeeSink> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(TeeSink { path, file, echo })
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one line to both destinations.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.echo.echo(line);
        self.file.write_all(line.as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        Ok(())
    }

    /// Flush the file side.
    pub async fn flush(&mut self) -> Result<()> {
        self.file.flush().await?;
        Ok(())
    }
}

/// The stdout/stderr sink pair for one stage of one run.
pub struct StageLogs {
    pub stdout: TeeSink,
    pub stderr: TeeSink,
}

impl StageLogs {
    /// Open both sinks for `stage`, echoing to the real standard streams.
    pub async fn open(run: &MigrationRun, stage: Stage) -> Result<StageLogs> {
        Self::open_with(run, stage, EchoStream::Stdout, EchoStream::Stderr).await
    }

    /// Open both sinks with caller-chosen console sides.
    pub async fn open_with(
        run: &MigrationRun,
        stage: Stage,
        stdout_echo: EchoStream,
        stderr_echo: EchoStream,
    ) -> Result<StageLogs> {
        let stdout = TeeSink::open(run.log_path(stage, StreamName::Stdout), stdout_echo).await?;
        let stderr = TeeSink::open(run.log_path(stage, StreamName::Stderr), stderr_echo).await?;
        Ok(StageLogs { stdout, stderr })
    }

    /// Flush both file sides.
    pub async fn flush(&mut self) -> Result<()> {
        self.stdout.flush().await?;
        self.stderr.flush().await?;
        Ok(())
    }
}
