//! Runs the diagnostics command through a shell.

use super::ExecError;
use crate::core::CommandRunner;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::trace;

const DEFAULT_SHELL: &str = "bash";

/// A `CommandRunner` that executes commands as `<shell> -c <command>`.
///
/// Without a timeout a hung command blocks the call indefinitely. When a
/// timeout is set and elapses, the child process is killed.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
    timeout: Option<Duration>,
}

impl ShellCommandRunner {
    /// Creates a runner using `bash` and no timeout.
    pub fn new() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            timeout: None,
        }
    }

    /// Uses a different shell binary (it must accept `-c <command>`).
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Bounds each invocation. `None` or a zero duration disables the bound.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str) -> Result<String, ExecError> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait)
                .await
                .map_err(|_| ExecError::Timeout {
                    command: command.to_string(),
                    timeout,
                })?,
            None => wait.await,
        }
        .map_err(|source| ExecError::Spawn {
            command: command.to_string(),
            source,
        })?;

        trace!(
            command,
            status = ?output.status,
            stdout_bytes = output.stdout.len(),
            "Command finished"
        );

        if !output.status.success() {
            return Err(ExecError::NonZeroExit {
                command: command.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
