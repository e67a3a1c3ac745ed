//! Decoded asset values.
//!
//! Each submodule turns raw bytes into the in-memory form of one
//! [`AssetKind`]. Decoders are pure: the same bytes always give an equal
//! value, and they never touch the store or the cache.

pub mod audio;
pub mod error;
pub mod font;
pub mod image;
pub mod text;
pub mod view;

pub use self::audio::Audio;
pub use self::font::Font;
pub use self::image::Image;
pub use self::text::TextLines;
pub use self::view::ViewNode;

use crate::key::AssetKind;
use std::sync::Arc;

/// A decoded, shareable asset.
///
/// Cloning only bumps a reference count, so every consumer of a cached asset
/// sees the very same value (compare with [`Asset::ptr_eq`]).
#[derive(Clone, Debug)]
pub enum Asset {
    Image(Arc<Image>),
    Font(Arc<Font>),
    Audio(Arc<Audio>),
    Text(Arc<TextLines>),
    View(Arc<ViewNode>),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Image(_) => AssetKind::Image,
            Self::Font(_) => AssetKind::Font,
            Self::Audio(_) => AssetKind::Audio,
            Self::Text(_) => AssetKind::Text,
            Self::View(_) => AssetKind::ViewFragment,
        }
    }

    pub fn as_image(&self) -> Option<&Arc<Image>> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_font(&self) -> Option<&Arc<Font>> {
        match self {
            Self::Font(font) => Some(font),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&Arc<Audio>> {
        match self {
            Self::Audio(audio) => Some(audio),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Arc<TextLines>> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<&Arc<ViewNode>> {
        match self {
            Self::View(view) => Some(view),
            _ => None,
        }
    }

    /// Whether both handles point at the same decoded value.
    pub fn ptr_eq(&self, other: &Asset) -> bool {
        match (self, other) {
            (Self::Image(a), Self::Image(b)) => Arc::ptr_eq(a, b),
            (Self::Font(a), Self::Font(b)) => Arc::ptr_eq(a, b),
            (Self::Audio(a), Self::Audio(b)) => Arc::ptr_eq(a, b),
            (Self::Text(a), Self::Text(b)) => Arc::ptr_eq(a, b),
            (Self::View(a), Self::View(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Run the decoder for `kind` over `bytes`.
pub fn decode(kind: AssetKind, bytes: &[u8]) -> error::Result<Asset> {
    Ok(match kind {
        AssetKind::Image => Asset::Image(Arc::new(image::decode(bytes)?)),
        AssetKind::Font => Asset::Font(Arc::new(font::decode(bytes)?)),
        AssetKind::Audio => Asset::Audio(Arc::new(audio::decode(bytes)?)),
        AssetKind::Text => Asset::Text(Arc::new(text::decode(bytes)?)),
        AssetKind::ViewFragment => Asset::View(Arc::new(view::decode(bytes)?)),
    })
}
