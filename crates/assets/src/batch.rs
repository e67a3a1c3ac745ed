//! Batches: many loads tracked as one unit.

use crate::asset::Asset;
use crate::error::{ErrorKind, SharedError};
use crate::handle::{LoadHandle, LoadOutcome};
use crate::key::AssetKey;
use crate::progress::{BatchProgress, ProgressEvent, ProgressReceiver, ProgressTracker};
use async_stream::stream;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Per-key outcomes of a settled batch, in submission order.
#[derive(Debug)]
pub struct BatchReport {
    order: Vec<AssetKey>,
    outcomes: HashMap<AssetKey, LoadOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: &AssetKey) -> Option<&LoadOutcome> {
        self.outcomes.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetKey, &LoadOutcome)> {
        self.order.iter().filter_map(|key| self.outcomes.get(key).map(|outcome| (key, outcome)))
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&AssetKey, &Asset)> {
        self.iter().filter_map(|(key, outcome)| outcome.as_ref().ok().map(|asset| (key, asset)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&AssetKey, &SharedError)> {
        self.iter().filter_map(|(key, outcome)| outcome.as_ref().err().map(|err| (key, err)))
    }

    /// Whether every key loaded.
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(Result::is_ok)
    }
}

/// Wait for every handle, reporting each settlement to `tracker` as it
/// happens (in completion order, not submission order).
pub(crate) async fn collect(handles: Vec<LoadHandle>, tracker: Option<&ProgressTracker>) -> BatchReport {
    let order: Vec<AssetKey> = handles.iter().map(|handle| handle.key().clone()).collect();
    let mut pending: FuturesUnordered<_> = handles
        .into_iter()
        .map(|handle| async move {
            let outcome = handle.wait().await;
            (handle.key().clone(), outcome)
        })
        .collect();

    let mut outcomes = HashMap::with_capacity(order.len());
    while let Some((key, outcome)) = pending.next().await {
        if let Some(tracker) = tracker {
            tracker.on_item_settled(&key, outcome.is_ok());
        }
        if let Err(err) = &outcome {
            let kind: &ErrorKind = err;
            tracing::warn!(%key, error = %kind, "asset failed to load");
        }
        outcomes.insert(key, outcome);
    }
    BatchReport { order, outcomes }
}

/// Drive a batch to completion and publish its report.
///
/// Runs on the worker pool. If the pool is torn down under it, every key it
/// hadn't counted yet is reported on the way out so the progress stream
/// still ends with [`ProgressEvent::Complete`].
pub(crate) fn drive(
    handles: Vec<LoadHandle>,
    tracker: Arc<ProgressTracker>,
    report: watch::Sender<Option<Arc<BatchReport>>>,
) -> impl Future<Output = ()> + Send + 'static {
    // Built before the future is first polled: a task dropped unpolled must
    // still report its keys.
    let guard = SettleOnDrop { handles, tracker };
    async move {
        let collected = collect(guard.handles.clone(), Some(&*guard.tracker)).await;
        report.send_replace(Some(Arc::new(collected)));
    }
}

struct SettleOnDrop {
    handles: Vec<LoadHandle>,
    tracker: Arc<ProgressTracker>,
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        if self.tracker.progress().is_complete() {
            return;
        }
        tracing::debug!(total = self.handles.len(), "batch dropped before settling, reporting the rest");
        for handle in &self.handles {
            if self.tracker.is_settled(handle.key()) {
                continue;
            }
            // Still pending means the runtime that would finish it is gone.
            let success = matches!(handle.try_get(), Some(Ok(_)));
            self.tracker.on_item_settled(handle.key(), success);
        }
    }
}

/// Tracks a batch submitted with
/// [`LoadCoordinator::request_batch`](crate::LoadCoordinator::request_batch).
///
/// Progress can be consumed as an ordered event stream
/// ([`next_event`](Self::next_event), [`events`](Self::events)) or polled
/// ([`progress`](Self::progress)). The batch settles once every key has
/// settled; one key failing never stops the others.
#[derive(Debug)]
pub struct BatchHandle {
    handles: Vec<LoadHandle>,
    tracker: Arc<ProgressTracker>,
    progress: ProgressReceiver,
    report: watch::Receiver<Option<Arc<BatchReport>>>,
}

impl BatchHandle {
    pub(crate) fn new(
        handles: Vec<LoadHandle>,
        tracker: Arc<ProgressTracker>,
        progress: ProgressReceiver,
        report: watch::Receiver<Option<Arc<BatchReport>>>,
    ) -> Self {
        Self {
            handles,
            tracker,
            progress,
            report,
        }
    }

    /// Number of distinct keys in the batch.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.handles.iter().map(LoadHandle::key)
    }

    /// The individual handle for `key`, to consume that asset as soon as it
    /// is ready.
    pub fn handle(&self, key: &AssetKey) -> Option<&LoadHandle> {
        self.handles.iter().find(|handle| handle.key() == key)
    }

    pub fn progress(&self) -> BatchProgress {
        self.progress.progress()
    }

    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.progress.next_event().await
    }

    pub fn blocking_next_event(&mut self) -> Option<ProgressEvent> {
        self.progress.blocking_next_event()
    }

    /// All remaining progress events as a stream, ending after
    /// [`ProgressEvent::Complete`].
    pub fn events(&mut self) -> impl Stream<Item = ProgressEvent> + '_ {
        stream! {
            while let Some(event) = self.progress.next_event().await {
                let done = matches!(event, ProgressEvent::Complete(_));
                yield event;
                if done {
                    break;
                }
            }
        }
    }

    /// Wait for every key to settle.
    pub async fn wait(&self) -> Arc<BatchReport> {
        let mut report = self.report.clone();
        if let Ok(settled) = report.wait_for(Option::is_some).await {
            if let Some(report) = Option::clone(&settled) {
                return report;
            }
        }
        // The batch driver was torn down with the worker pool; the handles
        // themselves still settle (as shut down or abandoned). Keys already
        // counted are skipped by the tracker.
        Arc::new(collect(self.handles.clone(), Some(&*self.tracker)).await)
    }

    pub fn blocking_wait(&self) -> Arc<BatchReport> {
        futures::executor::block_on(self.wait())
    }
}
