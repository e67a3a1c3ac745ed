//! Asynchronous asset loading for the Vocaotology shell.
//!
//! Assets (images, fonts, sounds, word lists, view fragments) are read from a
//! packaged [`AssetStore`](voca_storage::AssetStore), decoded once, and kept
//! in a [`ResourceCache`]. The [`LoadCoordinator`] dispatches loads onto its
//! own worker pool, makes sure concurrent requests for the same asset share
//! one fetch, and reports batch progress for splash screens.
//!
//! ```ignore
//! use voca_assets::{AssetKey, AssetLayout, LoadCoordinator, Loader, PoolConfig};
//!
//! let loader = Loader::new(store, AssetLayout::default());
//! let coordinator = LoadCoordinator::new(loader, &PoolConfig::default())?;
//! let mut batch = coordinator.request_batch([
//!     AssetKey::text("dictionary.txt"),
//!     AssetKey::image("logo.png"),
//! ]);
//! while let Some(event) = batch.blocking_next_event() {
//!     println!("{}", event.progress().message());
//! }
//! let report = batch.blocking_wait();
//! ```

pub mod asset;
mod batch;
mod cache;
mod coordinator;
pub mod error;
mod handle;
mod key;
mod lifecycle;
mod loader;
mod progress;

pub use crate::asset::Asset;
pub use crate::batch::{BatchHandle, BatchReport};
pub use crate::cache::ResourceCache;
pub use crate::coordinator::LoadCoordinator;
pub use crate::handle::{LoadHandle, LoadOutcome};
pub use crate::key::{AssetKey, AssetKind};
pub use crate::lifecycle::{LifecycleManager, PoolConfig};
pub use crate::loader::{AssetLayout, Loader};
pub use crate::progress::{BatchProgress, ProgressEvent, ProgressReceiver, ProgressTracker};
