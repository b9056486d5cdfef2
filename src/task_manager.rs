//! Tracks the long-lived tasks of the exporter (sampler, HTTP server) and
//! waits for them on shutdown.
use anyhow::{anyhow, Result};
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

type NamedHandle = (&'static str, JoinHandle<()>);

/// Owns the `JoinHandle` of every spawned task together with the shutdown
/// receiver the tasks listen on.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<NamedHandle>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns `future` on the runtime and records its handle under `name`.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        let handle = tokio::spawn(future);
        self.lock_handles().push((name, handle));
    }

    /// Returns a clone of the shutdown receiver.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn task_count(&self) -> usize {
        self.lock_handles().len()
    }

    /// Waits for all tasks to finish. Fails if any of them panicked.
    pub async fn shutdown(self) -> Result<()> {
        let handles: Vec<NamedHandle> = self.lock_handles().drain(..).collect();
        info!("Waiting for {} tasks to complete...", handles.len());

        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        let panicked: Vec<&'static str> = names
            .into_iter()
            .zip(results)
            .filter_map(|(name, result)| match result {
                Ok(()) => {
                    debug!(task_name = name, "Task shut down gracefully.");
                    None
                }
                Err(e) => {
                    error!(task_name = name, "Task failed during shutdown: {}", e);
                    Some(name)
                }
            })
            .collect();

        if panicked.is_empty() {
            info!("All tasks shut down gracefully.");
            Ok(())
        } else {
            Err(anyhow!("tasks failed during shutdown: {:?}", panicked))
        }
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, Vec<NamedHandle>> {
        // A poisoned lock only means a panic while pushing; the Vec is intact.
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }
}
