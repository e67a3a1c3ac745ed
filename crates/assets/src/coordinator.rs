//! Request dispatch, in-flight de-duplication and cache population.

use crate::asset::Asset;
use crate::batch::{self, BatchHandle};
use crate::cache::ResourceCache;
use crate::error::{Error, ErrorKind, Result};
use crate::handle::{LoadHandle, LoadOutcome, OutcomeReceiver, OutcomeSender};
use crate::key::{AssetKey, AssetKind};
use crate::lifecycle::{LifecycleManager, PoolConfig};
use crate::loader::Loader;
use crate::progress::ProgressTracker;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// State shared with load tasks.
#[derive(Debug, Default)]
struct Shared {
    cache: ResourceCache,
    in_flight: Mutex<HashMap<AssetKey, OutcomeReceiver>>,
}

/// Entry point for loading assets.
///
/// One coordinator owns the cache and the worker pool for the process; build
/// it at the composition root and pass it to whoever needs assets.
///
/// A key has at most one load running at any time. Requests for a key that
/// is already loading attach to that load, and every attached handle settles
/// with the same outcome. Successful loads are cached; failures are not, so
/// the next request for a failed key tries again.
#[derive(Debug)]
pub struct LoadCoordinator {
    shared: Arc<Shared>,
    loader: Loader,
    lifecycle: LifecycleManager,
}

impl LoadCoordinator {
    pub fn new(loader: Loader, config: &PoolConfig) -> Result<Self> {
        Ok(Self {
            shared: Arc::new(Shared::default()),
            loader,
            lifecycle: LifecycleManager::start(config)?,
        })
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.shared.cache
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// The cached value for `key`, without loading it.
    pub fn get(&self, key: &AssetKey) -> Option<Asset> {
        self.shared.cache.get(key)
    }

    /// Number of loads currently running.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.lock().len()
    }

    /// Start loading `key`, or join the load already running for it.
    ///
    /// A cached key yields a handle that is already settled. Fails with
    /// [`ShutDown`](ErrorKind::ShutDown) once shutdown has begun.
    #[instrument(level = "trace", skip(self), fields(%key))]
    pub fn request(&self, key: AssetKey) -> Result<LoadHandle> {
        if !self.lifecycle.is_accepting() {
            exn::bail!(ErrorKind::ShutDown);
        }
        if let Some(asset) = self.shared.cache.get(&key) {
            tracing::trace!("cache hit");
            return Ok(LoadHandle::ready(key, Ok(asset)));
        }

        let (sender, receiver) = {
            let mut in_flight = self.shared.in_flight.lock();
            if let Some(receiver) = in_flight.get(&key) {
                tracing::debug!("joining in-flight load");
                return Ok(LoadHandle::new(key, receiver.clone()));
            }
            // The load may have finished between the first lookup and
            // taking the lock.
            if let Some(asset) = self.shared.cache.get(&key) {
                return Ok(LoadHandle::ready(key, Ok(asset)));
            }
            if !self.lifecycle.is_accepting() {
                exn::bail!(ErrorKind::ShutDown);
            }
            let (sender, receiver) = watch::channel(None);
            in_flight.insert(key.clone(), receiver.clone());
            (sender, receiver)
        };

        tracing::debug!("dispatching load");
        // Spawned outside the lock: a task refused by a stopped runtime is
        // dropped on the spot, and its guard needs the lock to clean up.
        let pending = InFlight {
            shared: Arc::clone(&self.shared),
            key: key.clone(),
            sender,
            intake: self.lifecycle.intake_token(),
        };
        self.lifecycle.spawn(run(pending, self.loader.clone(), self.lifecycle.cancel_token()));
        Ok(LoadHandle::new(key, receiver))
    }

    /// Request every key in `keys` as one batch.
    ///
    /// Repeated keys are collapsed into their first occurrence. Keys that
    /// can't be requested (the coordinator is shutting down) settle straight
    /// away as failures rather than failing the whole batch.
    pub fn request_batch(&self, keys: impl IntoIterator<Item = AssetKey>) -> BatchHandle {
        let mut seen = HashSet::new();
        let handles: Vec<LoadHandle> = keys
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .map(|key| match self.request(key.clone()) {
                Ok(handle) => handle,
                Err(err) => LoadHandle::ready(key, Err(Arc::new(err))),
            })
            .collect();
        tracing::info!(total = handles.len(), "batch submitted");

        let (tracker, progress) = ProgressTracker::new(handles.len());
        let tracker = Arc::new(tracker);
        let (report_tx, report_rx) = watch::channel(None);
        let driver = batch::drive(handles.clone(), Arc::clone(&tracker), report_tx);
        if self.lifecycle.is_accepting() {
            self.lifecycle.spawn(driver);
        } else {
            // Every handle is already settled; report synchronously so
            // progress subscribers still see the batch complete.
            futures::executor::block_on(driver);
        }
        BatchHandle::new(handles, tracker, progress, report_rx)
    }

    /// Load `key`, or return it from the cache.
    pub async fn load(&self, key: AssetKey) -> LoadOutcome {
        match self.request(key) {
            Ok(handle) => handle.wait().await,
            Err(err) => Err(Arc::new(err)),
        }
    }

    /// Blocking [`load`](Self::load) for callers outside an async context.
    pub fn load_blocking(&self, key: AssetKey) -> LoadOutcome {
        match self.request(key) {
            Ok(handle) => handle.blocking_wait(),
            Err(err) => Err(Arc::new(err)),
        }
    }

    /// Drop cached entries of `kind`. Loads still running are unaffected and
    /// cache their result when they finish.
    pub fn clear(&self, kind: AssetKind) -> usize {
        let removed = self.shared.cache.clear(kind);
        tracing::debug!(%kind, removed, "cleared cache");
        removed
    }

    pub fn clear_all(&self) -> usize {
        let removed = self.shared.cache.clear_all();
        tracing::debug!(removed, "cleared all caches");
        removed
    }

    /// Stop accepting requests, give running loads the configured grace
    /// period, abandon the rest and empty the cache.
    ///
    /// Calling it again does nothing.
    pub fn shutdown(&self) {
        if self.lifecycle.shutdown() {
            let removed = self.shared.cache.clear_all();
            tracing::info!(removed, "asset cache released");
        }
    }
}

/// An entry in the in-flight table, owned by the task servicing it.
///
/// Dropping it removes the entry. If that happens before the load settled
/// (the task panicked or was dropped by a stopping runtime) attached handles
/// are settled with an error instead of waiting forever.
struct InFlight {
    shared: Arc<Shared>,
    key: AssetKey,
    sender: OutcomeSender,
    intake: CancellationToken,
}

impl InFlight {
    fn settle(self, outcome: LoadOutcome) {
        self.sender.send_replace(Some(outcome));
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let settled = self.sender.borrow().is_some();
        if !settled {
            let kind = if self.intake.is_cancelled() {
                ErrorKind::ShutDown
            } else {
                ErrorKind::Abandoned(self.key.clone())
            };
            tracing::warn!(key = %self.key, error = %kind, "load dropped before settling");
            self.sender.send_replace(Some(Err(Arc::new(Error::from(kind)))));
        }
        self.shared.in_flight.lock().remove(&self.key);
    }
}

async fn run(pending: InFlight, loader: Loader, cancel: CancellationToken) {
    let key = pending.key.clone();
    let outcome = match cancel.run_until_cancelled(loader.load(&key)).await {
        // Cache first, then settle: by the time the in-flight entry is gone
        // the value is visible to `get`. Cancellation is checked again under
        // the shard lock so nothing lands after shutdown empties the cache.
        Some(Ok(asset)) => pending
            .shared
            .cache
            .put_if(&key, asset, || !cancel.is_cancelled())
            .ok_or_else(|| Arc::new(Error::from(ErrorKind::ShutDown))),
        None => Err(Arc::new(Error::from(ErrorKind::ShutDown))),
        Some(Err(err)) => Err(Arc::new(err)),
    };
    pending.settle(outcome);
}
