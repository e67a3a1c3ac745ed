//! Fetch and decode one asset from the packaged store.

use crate::asset::{self, Asset};
use crate::error::{ErrorKind, Result};
use crate::key::{AssetKey, AssetKind};
use exn::ResultExt;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use tracing::instrument;
use voca_storage::{StoreHandle, validate_path};

/// Where each [`AssetKind`] lives inside the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetLayout {
    pub images: PathBuf,
    pub fonts: PathBuf,
    pub sounds: PathBuf,
    pub data: PathBuf,
    pub views: PathBuf,
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self {
            images: PathBuf::from("assets/images"),
            fonts: PathBuf::from("assets/fonts"),
            sounds: PathBuf::from("assets/sounds"),
            data: PathBuf::from("data"),
            views: PathBuf::from("views"),
        }
    }
}

impl AssetLayout {
    pub fn prefix(&self, kind: AssetKind) -> &Path {
        match kind {
            AssetKind::Image => &self.images,
            AssetKind::Font => &self.fonts,
            AssetKind::Audio => &self.sounds,
            AssetKind::Text => &self.data,
            AssetKind::ViewFragment => &self.views,
        }
    }

    /// Store path for `key`: the kind's prefix joined with the key's name.
    ///
    /// The result is not validated; a name that tries to climb out of its
    /// prefix is caught when the path is resolved.
    pub fn path_for(&self, key: &AssetKey) -> PathBuf {
        self.prefix(key.kind()).join(key.name())
    }
}

/// Reads an asset's bytes from the store and runs the decoder for its kind.
///
/// Loading is all-or-nothing: the caller either gets a fully decoded
/// [`Asset`] or an error, never a partial value.
#[derive(Clone)]
pub struct Loader {
    store: StoreHandle,
    layout: AssetLayout,
}

impl Debug for Loader {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Loader").field("store", &self.store.name()).field("layout", &self.layout).finish()
    }
}

impl Loader {
    pub fn new(store: StoreHandle, layout: AssetLayout) -> Self {
        Self { store, layout }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }

    /// Normalized store path for `key`, or `None` if the name escapes its
    /// kind's prefix (or the store root) and so can't be packaged data.
    fn resolve(&self, key: &AssetKey) -> Option<PathBuf> {
        let path = validate_path(self.layout.path_for(key)).ok()?;
        match validate_path(self.layout.prefix(key.kind())) {
            Ok(prefix) => path.starts_with(&prefix).then_some(path),
            // An empty prefix puts the kind at the store root.
            Err(_) => Some(path),
        }
    }

    #[instrument(level = "debug", skip(self), fields(kind = %key.kind(), name = %key.name(), store = self.store.name()))]
    pub async fn load(&self, key: &AssetKey) -> Result<Asset> {
        let Some(path) = self.resolve(key) else {
            exn::bail!(ErrorKind::NotFound(key.clone()));
        };

        let bytes = match self.store.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_missing() => return Err(e).or_raise(|| ErrorKind::NotFound(key.clone())),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io(key.clone())),
        };
        tracing::trace!(size = bytes.len(), "read asset bytes");
        asset::decode(key.kind(), &bytes).or_raise(|| ErrorKind::Decode(key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{audio, font, image};
    use rstest::rstest;
    use std::sync::Arc;
    use voca_storage::backend::MockStore;

    fn loader(files: Vec<(&str, Vec<u8>)>) -> Loader {
        Loader::new(Arc::new(MockStore::with_files(files)), AssetLayout::default())
    }

    #[rstest]
    #[case(AssetKey::image("logo.png"), "assets/images/logo.png")]
    #[case(AssetKey::font("ToThePoint.ttf"), "assets/fonts/ToThePoint.ttf")]
    #[case(AssetKey::audio("click.wav"), "assets/sounds/click.wav")]
    #[case(AssetKey::text("dictionary.txt"), "data/dictionary.txt")]
    #[case(AssetKey::view("splash.view"), "views/splash.view")]
    fn default_layout_paths(#[case] key: AssetKey, #[case] expected: &str) {
        assert_eq!(AssetLayout::default().path_for(&key), PathBuf::from(expected));
    }

    #[tokio::test]
    async fn loads_every_kind() {
        let loader = loader(vec![
            ("assets/images/logo.png", image::tests::png_fixture(2, 2)),
            ("assets/fonts/ToThePoint.ttf", font::tests::ttf_fixture("To The Point")),
            ("assets/sounds/click.wav", audio::tests::wav_fixture(8_000, &[0, 1, 2])),
            ("data/dictionary.txt", b" apple \n\nbanana\n".to_vec()),
            ("views/splash.view", br#"{"element":"VBox"}"#.to_vec()),
        ]);

        let image = loader.load(&AssetKey::image("logo.png")).await.unwrap();
        assert_eq!(image.as_image().unwrap().width(), 2);
        let font = loader.load(&AssetKey::font("ToThePoint.ttf")).await.unwrap();
        assert_eq!(font.as_font().unwrap().family(), Some("To The Point"));
        let audio = loader.load(&AssetKey::audio("click.wav")).await.unwrap();
        assert_eq!(audio.as_audio().unwrap().as_pcm().unwrap().frames(), 3);
        let text = loader.load(&AssetKey::text("dictionary.txt")).await.unwrap();
        assert_eq!(text.as_text().unwrap().lines(), ["apple", "banana"]);
        let view = loader.load(&AssetKey::view("splash.view")).await.unwrap();
        assert_eq!(view.as_view().unwrap().element, "VBox");
    }

    #[tokio::test]
    async fn missing_is_not_found() {
        let key = AssetKey::text("wordclass.txt");
        let err = loader(vec![]).load(&key).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(key));
    }

    #[tokio::test]
    async fn wrong_prefix_is_not_found() {
        // Present in the store, but under another kind's root.
        let key = AssetKey::image("dictionary.txt");
        let err = loader(vec![("data/dictionary.txt", b"apple".to_vec())]).load(&key).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(key));
    }

    #[rstest]
    #[case("../../data/dictionary.txt")]
    #[case("../logo.png")]
    #[tokio::test]
    async fn escaping_prefix_is_not_found(#[case] name: &str) {
        let loader = loader(vec![("data/dictionary.txt", b"apple".to_vec())]);
        let key = AssetKey::image(name);
        assert_eq!(*loader.load(&key).await.unwrap_err(), ErrorKind::NotFound(key));
    }

    #[tokio::test]
    async fn malformed_bytes_are_decode_errors() {
        let key = AssetKey::image("broken.png");
        let err = loader(vec![("assets/images/broken.png", b"not a png".to_vec())]).load(&key).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Decode(key));
    }

    #[tokio::test]
    async fn custom_layout() {
        let layout = AssetLayout {
            data: PathBuf::from("words"),
            ..AssetLayout::default()
        };
        let store = Arc::new(MockStore::with_files([("words/history.txt", b"one\ntwo".to_vec())]));
        let asset = Loader::new(store, layout).load(&AssetKey::text("history.txt")).await.unwrap();
        assert_eq!(asset.as_text().unwrap().len(), 2);
    }
}
