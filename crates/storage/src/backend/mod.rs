//! Asset store trait and implementations.
//!
//! A store is the runtime side of the asset packaging story: whatever the
//! build produced (a directory next to the executable, or a bundle compiled
//! straight into it) gets exposed through the same read-only interface.

#[cfg(feature = "mock")]
mod counting;
mod embedded;
mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(feature = "mock")]
pub use self::counting::CountingStore;
pub use self::embedded::EmbeddedStore;
pub use self::local::LocalStore;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockStore;
use crate::FileInfo;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified read-only interface over packaged assets.
///
/// # Path Handling
/// All paths are relative to the store root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this, so a path that escapes the root surfaces as
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath) rather than as a
/// read of some unrelated file.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use voca_storage::{AssetStore, error::Result};
///
/// async fn dictionary_size(store: &dyn AssetStore) -> Result<usize> {
///     let path = Path::new("data/dictionary.txt");
///     if store.exists(path).await? {
///         Ok(store.read(path).await?.len())
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Human-readable name of the store, used for logging only.
    fn name(&self) -> &str;

    /// List all files matching an optional prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata matching an optional prefix.
    ///
    /// Prefix matching is component based: `data/dict` matches
    /// `data/dict/a.txt` but not `data/dictionary.txt`. Listing a prefix
    /// that doesn't exist yields nothing rather than an error.
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read the complete contents of a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if nothing is
    /// packaged at `path`.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if nothing is
    /// packaged at `path`.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
