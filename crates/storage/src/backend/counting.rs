//! Instrumented store wrapper for concurrency tests.

use super::FileInfoStream;
use crate::error::Result;
use crate::{AssetStore, FileInfo, StoreHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Wraps another store, counting every [`read`](AssetStore::read) per path
/// and optionally stalling each read.
///
/// The stall keeps loads in flight long enough for tests to pile duplicate
/// requests on top of them, or to trigger a shutdown while work is pending.
pub struct CountingStore {
    inner: StoreHandle,
    delay: Option<Duration>,
    reads: Mutex<HashMap<PathBuf, usize>>,
}

impl CountingStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self {
            inner,
            delay: None,
            reads: Mutex::new(HashMap::new()),
        }
    }

    /// Sleep for `delay` before every read is forwarded.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of reads issued for `path` so far.
    pub fn reads(&self, path: impl AsRef<Path>) -> usize {
        let reads = self.reads.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        reads.get(path.as_ref()).copied().unwrap_or(0)
    }

    /// Number of reads issued across all paths.
    pub fn total_reads(&self) -> usize {
        let reads = self.reads.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        reads.values().sum()
    }
}

#[async_trait]
impl AssetStore for CountingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        self.inner.list_stream(prefix)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        {
            let mut reads = self.reads.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *reads.entry(path.to_path_buf()).or_default() += 1;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.read(path).await
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.inner.stat(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn counts_reads_per_path() {
        let inner = Arc::new(MockStore::with_files([("data/a.txt", Vec::from(*b"a"))]));
        let store = CountingStore::new(inner);
        store.read(Path::new("data/a.txt")).await.unwrap();
        store.read(Path::new("data/a.txt")).await.unwrap();
        assert!(store.read(Path::new("data/b.txt")).await.is_err());
        assert_eq!(store.reads("data/a.txt"), 2);
        assert_eq!(store.reads("data/b.txt"), 1);
        assert_eq!(store.total_reads(), 3);
    }
}
