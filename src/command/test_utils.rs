use crate::command::{CommandRunner, ExecError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum FakeResponse {
    Output(String),
    Failure { status: i32, stderr: String },
    Hang,
}

/// Fake command runner for testing
///
/// Responses are served in the order they were queued. Once the queue is
/// empty the fallback response (if any) is returned on every call.
#[derive(Clone, Default)]
pub struct FakeCommandRunner {
    responses: Arc<Mutex<VecDeque<FakeResponse>>>,
    fallback: Arc<Mutex<Option<FakeResponse>>>,
    call_count: Arc<Mutex<u32>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful run producing `stdout`.
    pub fn add_output(&self, stdout: &str) {
        self.push(FakeResponse::Output(stdout.to_string()));
    }

    /// Queue a run that exits with `status` and writes `stderr`.
    pub fn add_failure(&self, status: i32, stderr: &str) {
        self.push(FakeResponse::Failure {
            status,
            stderr: stderr.to_string(),
        });
    }

    /// Queue a run that never completes.
    pub fn add_hang(&self) {
        self.push(FakeResponse::Hang);
    }

    /// Output returned once the queue is exhausted.
    pub fn set_fallback_output(&self, stdout: &str) {
        *self.fallback.lock().unwrap() = Some(FakeResponse::Output(stdout.to_string()));
    }

    /// Get the number of times the runner was invoked
    pub fn call_count(&self) -> u32 {
        *self.call_count.lock().unwrap()
    }

    fn push(&self, response: FakeResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn next_response(&self) -> Option<FakeResponse> {
        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .or_else(|| self.fallback.lock().unwrap().clone())
    }
}

#[async_trait]
impl CommandRunner for FakeCommandRunner {
    async fn run(&self, command: &str) -> Result<String, ExecError> {
        *self.call_count.lock().unwrap() += 1;

        match self.next_response() {
            Some(FakeResponse::Output(stdout)) => Ok(stdout),
            Some(FakeResponse::Failure { status, stderr }) => Err(ExecError::NonZeroExit {
                command: command.to_string(),
                status: Some(status),
                stderr,
            }),
            Some(FakeResponse::Hang) => std::future::pending().await,
            None => Err(ExecError::NonZeroExit {
                command: command.to_string(),
                status: Some(127),
                stderr: "no more responses configured".to_string(),
            }),
        }
    }
}
