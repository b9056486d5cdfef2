pub mod shell;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::time::Duration;
use thiserror::Error;

pub use crate::core::CommandRunner;
pub use shell::ShellCommandRunner;

/// Failure to obtain output from the diagnostics command.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}: {stderr}", describe_status(.status))]
    NonZeroExit {
        command: String,
        /// The exit code, or `None` when the process was killed by a signal.
        status: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}
