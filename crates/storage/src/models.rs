//! Storage models.

use std::path::PathBuf;
use time::OffsetDateTime;

/// Metadata for a single packaged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from the store root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp, when the store knows it. Embedded bundles
    /// built without metadata don't.
    pub modified: Option<OffsetDateTime>,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: Option<OffsetDateTime>) -> Self {
        Self { path: path.into(), size, modified }
    }
}
