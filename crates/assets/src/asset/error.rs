//! Error types for the [`asset`](super) decoders.
//!
//! Decoders only see bytes, never the key they were read for; the loader
//! raises these into a keyed [`Decode`](crate::error::ErrorKind::Decode).

use derive_more::{Display, Error};

/// A decode error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for decode operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which step of turning bytes into an asset failed.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bytes are not in any supported image format.
    #[display("invalid image data")]
    Image,
    /// Bytes are not a parseable TrueType/OpenType face.
    #[display("invalid font data")]
    Font,
    /// Bytes are neither a decodable WAV nor a recognised encoded stream.
    #[display("invalid audio data")]
    Audio,
    /// Text assets must be UTF-8.
    #[display("text is not valid UTF-8")]
    Utf8,
    /// The view definition is not a well-formed view tree.
    #[display("invalid view definition")]
    View,
}
