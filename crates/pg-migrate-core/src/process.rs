//! External tool invocation through a stubbable runner seam.

use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::logsink::StageLogs;
use crate::{Error, Result};

/// Fully rendered invocation of one external tool.
///
/// Environment entries are applied to the spawned child only, never to the
/// parent process, and their values are redacted from `Debug` output.
#[derive(Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Command line as shown in progress output. Environment values are not
    /// rendered.
    pub fn render(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<(&str, &str)> = self
            .env
            .iter()
            .map(|(key, _)| (key.as_str(), "<redacted>"))
            .collect();

        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env)
            .finish()
    }
}

/// Seam between the pipeline and the operating system. The production
/// implementation spawns real child processes; tests substitute a scripted
/// stub that records invocations.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run one tool to completion, draining both of its output streams into
    /// the stage's sinks. Returns the tool's exit code.
    async fn run(&self, spec: &CommandSpec, logs: &mut StageLogs) -> Result<i32>;
}

/// Runner that spawns real child processes.
#[derive(Debug, Default)]
pub struct SystemToolRunner;

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn run(&self, spec: &CommandSpec, logs: &mut StageLogs) -> Result<i32> {
        debug!("Spawning: {}", spec.render());

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| Error::Launch {
            tool: spec.program.clone(),
            source,
        })?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let StageLogs { stdout, stderr } = logs;

        let drain_stdout = async {
            if let Some(pipe) = stdout_pipe {
                let mut lines = BufReader::new(pipe).lines();
                while let Some(line) = lines.next_line().await? {
                    stdout.write_line(&line).await?;
                }
            }
            Ok::<_, Error>(())
        };

        let drain_stderr = async {
            if let Some(pipe) = stderr_pipe {
                let mut lines = BufReader::new(pipe).lines();
                while let Some(line) = lines.next_line().await? {
                    stderr.write_line(&line).await?;
                }
            }
            Ok::<_, Error>(())
        };

        let (stdout_result, stderr_result) = tokio::join!(drain_stdout, drain_stderr);
        stdout_result?;
        stderr_result?;

        let status = child.wait().await?;
        logs.flush().await?;

        // A signal-terminated child has no exit code.
        Ok(status.code().unwrap_or(-1))
    }
}
