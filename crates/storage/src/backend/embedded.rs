//! Compile-time embedded asset bundle.
//!
//! Release builds bake the resource tree into the executable with
//! [`rust-embed`](rust_embed), so a shipped game cannot lose its dictionary
//! to a botched install. In debug builds `rust-embed` reads the same folder
//! from disk instead, which keeps edit-run cycles short.

use super::FileInfoStream;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::{AssetStore, FileInfo};
use async_trait::async_trait;
use rust_embed::RustEmbed;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Asset store over a `#[derive(Embed)]` bundle.
///
/// # Examples
///
/// ```ignore
/// use rust_embed::Embed;
/// use voca_storage::backend::EmbeddedStore;
///
/// #[derive(Embed)]
/// #[folder = "resources/"]
/// struct Resources;
///
/// let store = EmbeddedStore::<Resources>::new("bundled");
/// ```
pub struct EmbeddedStore<E> {
    name: String,
    bundle: PhantomData<fn() -> E>,
}

impl<E: RustEmbed> EmbeddedStore<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bundle: PhantomData,
        }
    }

    /// Embedded paths always use forward slashes, whatever the host OS.
    fn key(path: &Path) -> Result<String> {
        let validated = validate_path(path)?;
        let parts: Option<Vec<&str>> = validated.iter().map(|part| part.to_str()).collect();
        match parts {
            Some(parts) => Ok(parts.join("/")),
            None => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
        }
    }

    fn file_info(key: &str, file: &rust_embed::EmbeddedFile) -> FileInfo {
        let modified = file
            .metadata
            .last_modified()
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok());
        FileInfo::new(key, file.data.len() as u64, modified)
    }
}

#[async_trait]
impl<E: RustEmbed> AssetStore for EmbeddedStore<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        // The bundle is static data; there's nothing to wait on.
        let files: Vec<Result<FileInfo>> = E::iter()
            .filter(|key| match &validated_prefix {
                Some(pfx) => PathBuf::from(key.as_ref()).starts_with(pfx),
                None => true,
            })
            .filter_map(|key| E::get(&key).map(|file| Ok(Self::file_info(&key, &file))))
            .collect();
        Box::pin(futures::stream::iter(files))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let key = Self::key(path)?;
        Ok(E::get(&key).is_some())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = Self::key(path)?;
        match E::get(&key) {
            Some(file) => Ok(file.data.into_owned()),
            None => {
                tracing::trace!(bundle = %self.name, %key, "not in bundle");
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()))
            },
        }
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let key = Self::key(path)?;
        match E::get(&key) {
            Some(file) => Ok(Self::file_info(&key, &file)),
            None => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_embed::Embed;

    #[derive(Embed)]
    #[folder = "fixtures/"]
    struct Fixtures;

    fn store() -> EmbeddedStore<Fixtures> {
        EmbeddedStore::new("fixtures")
    }

    #[tokio::test]
    async fn reads_embedded_file() {
        let data = store().read(Path::new("data/words.txt")).await.unwrap();
        assert_eq!(data, b"apple\n  banana  \n\n");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = store().read(Path::new("data/missing.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(!store().exists(Path::new("data/missing.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn escaping_the_bundle_is_rejected() {
        let err = store().read(Path::new("../Cargo.toml")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[tokio::test]
    async fn lists_with_prefix() {
        let all = store().list(None).await.unwrap();
        assert_eq!(all.len(), 2);
        let views = store().list(Some(Path::new("views"))).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].path, PathBuf::from("views/splash.view"));
    }

    #[tokio::test]
    async fn stat_reports_size() {
        let info = store().stat(Path::new("/views/splash.view")).await.unwrap();
        assert_eq!(info.size, 33);
    }
}
