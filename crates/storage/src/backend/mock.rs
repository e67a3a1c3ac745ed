//! In-memory asset store for testing.

use super::FileInfoStream;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::{AssetStore, FileInfo};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// In-memory asset store for testing.
///
/// Files live in a `HashMap` behind a [`RwLock`]. Unlike the real stores the
/// mock can be modified after construction ([`insert`](Self::insert),
/// [`remove`](Self::remove)) so tests can simulate assets appearing or
/// disappearing between two loads.
///
/// # Examples
///
/// ```ignore
/// use voca_storage::backend::MockStore;
/// use voca_storage::AssetStore;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockStore::with_files([
///     ("data/dictionary.txt", b"apple\nbanana\n"),
/// ]);
/// assert!(store.exists(Path::new("data/dictionary.txt")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockStore {
    name: String,
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MockStore {
    /// Create a mock store pre-populated with files.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then the
    /// test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockStore::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            files: RwLock::new(map),
        }
    }

    /// Change the name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add or replace a file.
    pub async fn insert(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> Result<()> {
        let path = validate_path(path)?;
        self.files.write().await.insert(path, data.into());
        Ok(())
    }

    /// Remove a file, returning whether it existed.
    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files.write().await.remove(&path).is_some())
    }
}
impl Default for MockStore {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl AssetStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding.
            let entries: Vec<(PathBuf, u64)> = {
                let guard = self.files.read().await;
                guard
                    .iter()
                    .filter(|(path, _)| match &validated_prefix {
                        Some(pfx) => path.starts_with(pfx),
                        None => true,
                    })
                    .map(|(path, data)| (path.clone(), data.len() as u64))
                    .collect()
            };
            for (path, size) in entries {
                yield Ok(FileInfo::new(path, size, None));
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        self.files.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        let guard = self.files.read().await;
        let data = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(FileInfo::new(path.clone(), data.len() as u64, None))
    }
}
