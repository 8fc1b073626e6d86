//! External process execution.
//!
//! - **ProcessExecutor**: the seam collectors call to run a command
//! - **CommandExecutor**: `tokio::process` implementation with a hard timeout
//!
//! A hung child is killed when its timeout fires (`kill_on_drop`), so a stuck
//! `zfs` or `kstat` invocation cannot wedge a collection cycle.

use crate::errors::{GuestmonError, GuestmonResult};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into `SourceUnavailable`.
    pub fn check(self, program: &str) -> GuestmonResult<Self> {
        if self.success() {
            return Ok(self);
        }
        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        };
        Err(GuestmonError::SourceUnavailable(format!(
            "{} exited with {}: {}",
            program,
            status,
            self.stderr.trim()
        )))
    }
}

/// Runs external commands on behalf of collectors.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run `argv` to completion, whatever its exit code.
    ///
    /// Spawn failure and timeout are reported as `SourceUnavailable`.
    async fn run(&self, argv: &[String]) -> GuestmonResult<ProcessOutput>;

    /// Run `argv` to completion; a non-zero exit is `SourceUnavailable` too.
    async fn execute(&self, argv: &[String]) -> GuestmonResult<ProcessOutput> {
        let program = argv.first().map(String::as_str).unwrap_or_default();
        self.run(argv).await?.check(program)
    }
}

/// Executes commands with `tokio::process`, bounded by a timeout.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProcessExecutor for CommandExecutor {
    async fn run(&self, argv: &[String]) -> GuestmonResult<ProcessOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| GuestmonError::Internal("empty argv".into()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::trace!(argv = ?argv, timeout_ms = self.timeout.as_millis() as u64, "Executing command");

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(GuestmonError::SourceUnavailable(format!(
                    "failed to execute {}: {}",
                    program, e
                )));
            }
            Err(_) => {
                tracing::warn!(
                    program = %program,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Command timed out, killing child"
                );
                return Err(GuestmonError::SourceUnavailable(format!(
                    "{} timed out after {}ms",
                    program,
                    self.timeout.as_millis()
                )));
            }
        };

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
