//! Directory-backed asset store.
//!
//! The packaged resources live in a plain directory (usually shipped next to
//! the executable). Reads go through `tokio::fs` so they never stall a
//! loader worker on a slow disk.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{AssetStore, FileInfo, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};
use tracing::instrument;

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Directory-backed asset store.
///
/// # Examples
///
/// ```no_run
/// use voca_storage::backend::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("resources", "/opt/vocaotology/resources")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalStore {
    name: String,
    /// Root directory of the packaged resources
    root: PathBuf,
}
impl LocalStore {
    /// Open a store rooted at an existing directory.
    ///
    /// Unlike a writable library, a resource directory is never created on
    /// demand: a missing root means the game was installed incorrectly, and
    /// that should be loud at startup rather than a trickle of `NotFound`s.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or is not a directory, and [`NotFound`](ErrorKind::NotFound)
    /// if it doesn't exist.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        let metadata = std::fs::metadata(&root).map_err(|e| Self::map_io_error(e, &root))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        tracing::debug!(root = %root.display(), "opened local asset store");
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates a store-relative path and joins it onto the root.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Converts an absolute path found while walking back into a
    /// store-relative one.
    fn relative_path(&self, absolute: &Path) -> Result<PathBuf> {
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        validate_path(relative)
    }

    fn file_info(path: &Path, metadata: &Metadata) -> FileInfo {
        let modified = metadata.modified().ok().map(OffsetDateTime::from);
        FileInfo::new(path, metadata.len(), modified)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Pulled out of the `stream!` body so that `?` works.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&Path>) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        let relative = self.relative_path(&path)?;
        if metadata.is_dir() {
            // Keep descending while the directory could still contain matches.
            return match prefix {
                Some(pfx) if !relative.starts_with(pfx) && !pfx.starts_with(&relative) => Ok(WalkEntry::Skip),
                _ => Ok(WalkEntry::Descend(path)),
            };
        }
        if let Some(pfx) = prefix
            && !relative.starts_with(pfx)
        {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(Self::file_info(&relative, &metadata)));
        }
        // Most likely a broken symlink.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl AssetStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        tracing::trace!(dir = %current.display(), "directory vanished during walk");
                        continue;
                    },
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        match fs::metadata(&abs_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io_error(e, path).into()),
        }
    }

    #[instrument(level = "trace", skip(self), fields(store = %self.name, path = %path.display()))]
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        let data = fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        tracing::trace!(bytes = data.len(), "read asset");
        Ok(data)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let abs_path = self.absolute_path(path)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        Ok(Self::file_info(path, &metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> (tempfile::TempDir, LocalStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        for (path, data) in [
            ("assets/images/logo.png", &b"png"[..]),
            ("assets/images/icons/star.png", &b"star"[..]),
            ("data/dictionary.txt", &b"apple\nbanana\n"[..]),
            ("data/dictionary-old.txt", &b"old"[..]),
        ] {
            let full = temp_dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, data).unwrap();
        }
        let store = LocalStore::new("local", temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_new_requires_existing_absolute_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalStore::new("local", temp_dir.path()).is_ok());
        assert!(LocalStore::new("local", "relative/path").is_err());
        let missing = LocalStore::new("local", temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(&*missing, ErrorKind::NotFound(_)));
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        let not_dir = LocalStore::new("local", &file).unwrap_err();
        assert!(matches!(&*not_dir, ErrorKind::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_read() {
        let (_dir, store) = populated();
        let data = store.read(Path::new("data/dictionary.txt")).await.unwrap();
        assert_eq!(data, b"apple\nbanana\n");
        // Classpath-style leading slash resolves to the same file
        let data = store.read(Path::new("/data/dictionary.txt")).await.unwrap();
        assert_eq!(data, b"apple\nbanana\n");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let (_dir, store) = populated();
        let err = store.read(Path::new("data/missing.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_exists() {
        let (_dir, store) = populated();
        assert!(store.exists(Path::new("assets/images/logo.png")).await.unwrap());
        assert!(!store.exists(Path::new("assets/images/missing.png")).await.unwrap());
        // Directories are not assets
        assert!(!store.exists(Path::new("assets/images")).await.unwrap());
    }

    #[tokio::test]
    async fn test_stat() {
        let (_dir, store) = populated();
        let info = store.stat(Path::new("assets/images/icons/star.png")).await.unwrap();
        assert_eq!(info.path, PathBuf::from("assets/images/icons/star.png"));
        assert_eq!(info.size, 4);
        assert!(info.modified.is_some());
        assert!(store.stat(Path::new("assets/images")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_all() {
        let (_dir, store) = populated();
        let files = store.list(None).await.unwrap();
        assert_eq!(files.len(), 4);
    }

    #[tokio::test]
    async fn test_list_with_prefix_is_component_based() {
        let (_dir, store) = populated();
        let images = store.list(Some(Path::new("assets/images"))).await.unwrap();
        assert_eq!(images.len(), 2);
        let paths: Vec<_> = images.iter().map(|f| f.path.clone()).collect();
        assert!(paths.contains(&PathBuf::from("assets/images/logo.png")));
        assert!(paths.contains(&PathBuf::from("assets/images/icons/star.png")));
        let exact = store.list(Some(Path::new("data/dictionary.txt"))).await.unwrap();
        assert_eq!(exact.len(), 1);
    }

    #[tokio::test]
    async fn test_list_nonexistent_prefix() {
        let (_dir, store) = populated();
        let files = store.list(Some(Path::new("fonts/"))).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_dir, store) = populated();
        let err = store.read(Path::new("../etc/passwd")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
        assert!(store.read(Path::new("data/../../passwd")).await.is_err());
        assert!(store.exists(Path::new("../../file")).await.is_err());
    }
}
