//! Settle-once load handles.

use crate::asset::Asset;
use crate::error::{ErrorKind, SharedError};
use crate::key::AssetKey;
use futures::future::BoxFuture;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::sync::watch;

/// Final result of one load. Every handle attached to the same load gets a
/// clone of the same outcome: the same [`Asset`] or the same error.
pub type LoadOutcome = std::result::Result<Asset, SharedError>;

pub(crate) type OutcomeSender = watch::Sender<Option<LoadOutcome>>;
pub(crate) type OutcomeReceiver = watch::Receiver<Option<LoadOutcome>>;

/// Observes a single asset load.
///
/// The outcome is written exactly once; afterwards every call to
/// [`wait`](Self::wait), [`blocking_wait`](Self::blocking_wait) or
/// [`try_get`](Self::try_get) returns it. Handles are cheap to clone and can
/// be awaited from any executor, or waited on from a plain thread.
#[derive(Clone, Debug)]
pub struct LoadHandle {
    key: AssetKey,
    outcome: OutcomeReceiver,
}

impl LoadHandle {
    pub(crate) fn new(key: AssetKey, outcome: OutcomeReceiver) -> Self {
        Self { key, outcome }
    }

    /// A handle that is settled from the start.
    pub(crate) fn ready(key: AssetKey, outcome: LoadOutcome) -> Self {
        let (_, outcome) = watch::channel(Some(outcome));
        Self { key, outcome }
    }

    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// The outcome, if the load has settled.
    pub fn try_get(&self) -> Option<LoadOutcome> {
        self.outcome.borrow().clone()
    }

    /// Wait for the load to settle.
    pub async fn wait(&self) -> LoadOutcome {
        let mut outcome = self.outcome.clone();
        let settled = match outcome.wait_for(Option::is_some).await {
            Ok(settled) => Option::clone(&settled),
            Err(_) => None,
        };
        // The sender is only dropped unsettled if the whole coordinator is
        // torn down underneath us.
        settled.unwrap_or_else(|| Err(Arc::new(exn::Exn::from(ErrorKind::Abandoned(self.key.clone())))))
    }

    /// Block the current thread until the load settles.
    ///
    /// Intended for threads that aren't driving an async runtime, such as a
    /// UI thread.
    pub fn blocking_wait(&self) -> LoadOutcome {
        futures::executor::block_on(self.wait())
    }
}

impl IntoFuture for LoadHandle {
    type Output = LoadOutcome;
    type IntoFuture = BoxFuture<'static, LoadOutcome>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::TextLines;
    use std::thread;
    use std::time::Duration;

    fn words() -> Asset {
        Asset::Text(Arc::new(TextLines::from_iter(["apple"])))
    }

    #[test]
    fn ready_handle_is_settled() {
        let asset = words();
        let handle = LoadHandle::ready(AssetKey::text("a.txt"), Ok(asset.clone()));
        assert!(handle.is_settled());
        assert!(handle.try_get().unwrap().unwrap().ptr_eq(&asset));
        assert!(handle.blocking_wait().unwrap().ptr_eq(&asset));
    }

    #[test]
    fn settles_once_for_every_clone() {
        let (tx, rx) = watch::channel(None);
        let handle = LoadHandle::new(AssetKey::text("a.txt"), rx);
        let clones: Vec<_> = (0..4).map(|_| handle.clone()).collect();
        assert!(handle.try_get().is_none());

        let waiters: Vec<_> = clones.into_iter().map(|h| thread::spawn(move || h.blocking_wait())).collect();
        thread::sleep(Duration::from_millis(20));
        let asset = words();
        tx.send_replace(Some(Ok(asset.clone())));

        for waiter in waiters {
            assert!(waiter.join().unwrap().unwrap().ptr_eq(&asset));
        }
    }

    #[tokio::test]
    async fn shares_the_same_failure() {
        let key = AssetKey::image("missing.png");
        let (tx, rx) = watch::channel(None);
        let a = LoadHandle::new(key.clone(), rx.clone());
        let b = LoadHandle::new(key.clone(), rx);
        tx.send_replace(Some(Err(Arc::new(exn::Exn::from(ErrorKind::NotFound(key))))));
        let (a, b) = (a.await.unwrap_err(), b.await.unwrap_err());
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn dropped_sender_is_abandoned() {
        let key = AssetKey::font("a.ttf");
        let (tx, rx) = watch::channel(None);
        let handle = LoadHandle::new(key.clone(), rx);
        drop(tx);
        assert_eq!(**handle.wait().await.unwrap_err(), ErrorKind::Abandoned(key));
    }
}
