//! Newline-delimited word lists and other plain text data.

use crate::asset::error::{ErrorKind, Result};
use exn::ResultExt;
use std::ops::Deref;
use tracing::instrument;

/// A decoded text asset: one entry per non-blank line, trimmed.
///
/// Downstream word-list logic (dictionary lookups, word classes, history)
/// depends on exactly this shape, so it is the only text representation
/// there is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextLines(Vec<String>);

impl TextLines {
    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for TextLines {
    type Target = [String];
    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for TextLines {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Decode UTF-8 text, split it on line boundaries (`\n`, `\r\n` or a lone
/// `\r`), trim every line, and drop the ones left empty.
#[instrument(level = "trace", skip(bytes), fields(size = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<TextLines> {
    let text = std::str::from_utf8(bytes).or_raise(|| ErrorKind::Utf8)?;
    Ok(shape(text))
}

pub(crate) fn shape(text: &str) -> TextLines {
    // A `\r\n` pair splits into a line plus an empty fragment; the empty
    // filter below swallows the fragment.
    text.split(['\n', '\r']).map(str::trim).filter(|line| !line.is_empty()).collect()
}
