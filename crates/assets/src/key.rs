//! Asset identity.

use crate::error::{ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

/// The category of a packaged asset.
///
/// The kind decides where in the store an asset lives, which decoder runs on
/// its bytes, and which [`Asset`](crate::Asset) variant comes back out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Image,
    Font,
    Audio,
    Text,
    ViewFragment,
}

impl AssetKind {
    pub const ALL: [AssetKind; 5] = [Self::Image, Self::Font, Self::Audio, Self::Text, Self::ViewFragment];

    /// Dense index, used to address per-kind cache shards.
    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Image => 0,
            Self::Font => 1,
            Self::Audio => 2,
            Self::Text => 3,
            Self::ViewFragment => 4,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Font => "font",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::ViewFragment => "view",
        }
    }

    /// Map a file extension (without the dot, any case) onto a kind.
    ///
    /// ```
    /// use voca_assets::AssetKind;
    ///
    /// assert_eq!(AssetKind::from_extension("PNG"), Some(AssetKind::Image));
    /// assert_eq!(AssetKind::from_extension("txt"), Some(AssetKind::Text));
    /// assert_eq!(AssetKind::from_extension("exe"), None);
    /// ```
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" => Some(Self::Image),
            "ttf" | "otf" => Some(Self::Font),
            "wav" | "ogg" | "mp3" => Some(Self::Audio),
            "txt" => Some(Self::Text),
            "view" | "json" => Some(Self::ViewFragment),
            _ => None,
        }
    }

    /// Infer the kind from the extension of `name`.
    pub fn from_name(name: impl AsRef<str>) -> Option<Self> {
        Path::new(name.as_ref()).extension().and_then(|ext| ext.to_str()).and_then(Self::from_extension)
    }
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Identifies one cacheable asset: its kind plus its name relative to the
/// kind's root in the store.
///
/// Cloning is cheap; the name is reference counted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey {
    kind: AssetKind,
    name: Arc<str>,
}

impl AssetKey {
    pub fn new(kind: AssetKind, name: impl AsRef<str>) -> Self {
        Self {
            kind,
            name: Arc::from(name.as_ref()),
        }
    }

    pub fn image(name: impl AsRef<str>) -> Self {
        Self::new(AssetKind::Image, name)
    }

    pub fn font(name: impl AsRef<str>) -> Self {
        Self::new(AssetKind::Font, name)
    }

    pub fn audio(name: impl AsRef<str>) -> Self {
        Self::new(AssetKind::Audio, name)
    }

    pub fn text(name: impl AsRef<str>) -> Self {
        Self::new(AssetKind::Text, name)
    }

    pub fn view(name: impl AsRef<str>) -> Self {
        Self::new(AssetKind::ViewFragment, name)
    }

    /// Build a key from a raw name, inferring the kind from its extension.
    ///
    /// Returns [`UnknownExtension`](ErrorKind::UnknownExtension) when the
    /// extension isn't in the kind table.
    ///
    /// ```
    /// use voca_assets::{AssetKey, AssetKind};
    ///
    /// let key = AssetKey::infer("logo.png").unwrap();
    /// assert_eq!(key.kind(), AssetKind::Image);
    /// assert!(AssetKey::infer("README").is_err());
    /// ```
    pub fn infer(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        match AssetKind::from_name(name) {
            Some(kind) => Ok(Self::new(kind, name)),
            None => exn::bail!(ErrorKind::UnknownExtension(name.to_string())),
        }
    }

    #[inline]
    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for AssetKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.kind, self.name)
    }
}
