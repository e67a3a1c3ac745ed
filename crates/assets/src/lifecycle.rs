//! Worker pool ownership: startup and bounded shutdown.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use parking_lot::Mutex;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// How the loader pool is sized and stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Worker threads. `None` uses the available parallelism.
    pub workers: Option<NonZeroUsize>,
    /// How long [`shutdown`](LifecycleManager::shutdown) waits for in-flight
    /// loads before abandoning them.
    pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: None,
            shutdown_grace: Duration::from_millis(800),
        }
    }
}

fn available_parallelism() -> usize {
    thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

/// Owns the runtime that asset loads execute on.
///
/// Shutdown happens in two steps. First intake closes: no new loads are
/// dispatched and work already running gets up to the grace period to
/// finish. Then everything still pending is cancelled and the runtime is
/// detached without waiting for it.
#[derive(Debug)]
pub struct LifecycleManager {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    workers: usize,
    grace: Duration,
    tracker: TaskTracker,
    /// Cancelled as soon as shutdown starts.
    intake: CancellationToken,
    /// Cancelled once the grace period is over.
    cancel: CancellationToken,
}

impl LifecycleManager {
    pub fn start(config: &PoolConfig) -> Result<Self> {
        let workers = config.workers.map_or_else(available_parallelism, NonZeroUsize::get);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("asset-loader")
            .enable_all()
            .build()
            .or_raise(|| ErrorKind::PoolStart)?;
        tracing::info!(workers, grace_ms = config.shutdown_grace.as_millis() as u64, "asset loader pool started");
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            workers,
            grace: config.shutdown_grace,
            tracker: TaskTracker::new(),
            intake: CancellationToken::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_accepting(&self) -> bool {
        !self.intake.is_cancelled()
    }

    /// Number of tracked tasks that haven't finished yet.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub(crate) fn intake_token(&self) -> CancellationToken {
        self.intake.clone()
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run `task` on the pool.
    ///
    /// Once the runtime is gone the task is dropped without being polled.
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn_on(task, &self.handle);
    }

    /// Stop the pool.
    ///
    /// Returns within the grace period plus the time it takes to signal
    /// cancellation; stragglers are abandoned, never joined. Returns `false`
    /// if the pool was already shut down.
    pub fn shutdown(&self) -> bool {
        let Some(runtime) = self.runtime.lock().take() else {
            return false;
        };
        let started = Instant::now();
        self.intake.cancel();
        self.tracker.close();

        let (drained_tx, drained_rx) = mpsc::channel();
        let tracker = self.tracker.clone();
        runtime.spawn(async move {
            tracker.wait().await;
            let _ = drained_tx.send(());
        });
        let drained = drained_rx.recv_timeout(self.grace).is_ok();

        self.cancel.cancel();
        if !drained {
            tracing::warn!(pending = self.tracker.len(), "abandoning asset loads still running after grace period");
        }
        runtime.shutdown_background();
        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, drained, "asset loader pool shut down");
        true
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            self.intake.cancel();
            self.cancel.cancel();
            runtime.shutdown_background();
        }
    }
}
