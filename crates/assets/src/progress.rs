//! Aggregate progress for a batch of loads.

use crate::key::AssetKey;
use parking_lot::Mutex;
use std::collections::HashSet;
use tokio::sync::{mpsc, watch};

/// Where a batch stands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub total: usize,
    /// Settled loads, successful or not. Never decreases, never exceeds
    /// `total`.
    pub completed: usize,
    /// How many of the settled loads failed.
    pub failed: usize,
    /// The most recently settled key.
    pub last_item: Option<AssetKey>,
}

impl BatchProgress {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }

    /// Completed share in `0.0..=1.0`. An empty batch is already done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }

    /// Status line for a splash screen.
    pub fn message(&self) -> String {
        match &self.last_item {
            Some(key) => format!("Loading: {}", key.name()),
            None => "Loading...".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// One key settled; `progress` already counts it.
    Settled {
        progress: BatchProgress,
        key: AssetKey,
        success: bool,
    },
    /// Every key has settled. Sent exactly once, after the last `Settled`.
    Complete(BatchProgress),
}

impl ProgressEvent {
    pub fn progress(&self) -> &BatchProgress {
        match self {
            Self::Settled { progress, .. } | Self::Complete(progress) => progress,
        }
    }
}

/// Counts settlements for one batch and publishes them in order.
///
/// Each settlement bumps the count and emits its event under one lock, so
/// subscribers see `completed` go up by exactly one per event no matter how
/// many workers report at once. A key is counted once; reporting it again
/// is a no-op. The event channel closes right after
/// [`ProgressEvent::Complete`].
#[derive(Debug)]
pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    snapshot: watch::Sender<BatchProgress>,
}

#[derive(Debug)]
struct TrackerState {
    progress: BatchProgress,
    settled: HashSet<AssetKey>,
    /// Dropped once the batch completes.
    events: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

/// Receiving end of a [`ProgressTracker`].
#[derive(Debug)]
pub struct ProgressReceiver {
    events: mpsc::UnboundedReceiver<ProgressEvent>,
    snapshot: watch::Receiver<BatchProgress>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> (Self, ProgressReceiver) {
        let initial = BatchProgress::new(total);
        let (events, events_rx) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(initial.clone());
        let events = if total == 0 {
            let _ = events.send(ProgressEvent::Complete(initial.clone()));
            None
        } else {
            Some(events)
        };
        let tracker = Self {
            state: Mutex::new(TrackerState {
                progress: initial,
                settled: HashSet::with_capacity(total),
                events,
            }),
            snapshot,
        };
        let receiver = ProgressReceiver {
            events: events_rx,
            snapshot: snapshot_rx,
        };
        (tracker, receiver)
    }

    /// Record that `key` settled.
    ///
    /// Returns the progress after counting it, or `None` if `key` was
    /// already counted or the batch was already complete.
    pub fn on_item_settled(&self, key: &AssetKey, success: bool) -> Option<BatchProgress> {
        let mut state = self.state.lock();
        if state.settled.contains(key) {
            tracing::trace!(%key, "settlement already counted");
            return None;
        }
        if state.progress.is_complete() {
            tracing::warn!(%key, total = state.progress.total, "settlement reported for a completed batch");
            return None;
        }
        state.settled.insert(key.clone());
        state.progress.completed += 1;
        if !success {
            state.progress.failed += 1;
        }
        state.progress.last_item = Some(key.clone());
        let progress = state.progress.clone();

        tracing::debug!(%key, completed = progress.completed, total = progress.total, success, "asset settled");
        if let Some(events) = &state.events {
            // A subscriber that has gone away just stops hearing about it.
            let _ = events.send(ProgressEvent::Settled {
                progress: progress.clone(),
                key: key.clone(),
                success,
            });
        }
        self.snapshot.send_replace(progress.clone());
        if progress.is_complete() {
            tracing::info!(total = progress.total, failed = progress.failed, "batch complete");
            if let Some(events) = state.events.take() {
                let _ = events.send(ProgressEvent::Complete(progress.clone()));
            }
        }
        Some(progress)
    }

    /// Whether `key` has been counted.
    pub fn is_settled(&self, key: &AssetKey) -> bool {
        self.state.lock().settled.contains(key)
    }

    pub fn progress(&self) -> BatchProgress {
        self.state.lock().progress.clone()
    }
}

impl ProgressReceiver {
    /// The latest progress, without consuming any events.
    pub fn progress(&self) -> BatchProgress {
        self.snapshot.borrow().clone()
    }

    /// Next event in emission order, or `None` once every event up to and
    /// including [`ProgressEvent::Complete`] has been received (or the
    /// tracker is gone).
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    pub fn blocking_next_event(&mut self) -> Option<ProgressEvent> {
        futures::executor::block_on(self.next_event())
    }
}
