//! Store-relative path validation.
//!
//! Asset names arrive from game code and configuration files, so they are
//! treated as untrusted: a name like `../../save.dat` must never resolve to
//! something outside the store root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalizes a store-relative path and rejects anything that would leave the
/// store root.
///
/// Leading slashes are dropped (the original resource paths were written as
/// classpath-absolute, e.g. `/assets/images/logo.png`), `.` segments vanish
/// and `..` segments are resolved as long as they stay inside the root.
/// Null bytes and Windows path prefixes are rejected outright.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use voca_storage::validate_path;
///
/// assert_eq!(validate_path("/assets/images/logo.png").unwrap(), Path::new("assets/images/logo.png"));
/// assert_eq!(validate_path("data/./old/../dictionary.txt").unwrap(), Path::new("data/dictionary.txt"));
/// assert!(validate_path("data/../../dictionary.txt").is_err());
/// assert!(validate_path("").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) => {
                // Null bytes survive Path::components() on Unix but truncate
                // the path once it reaches a syscall.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(segment);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    Ok(components.into_iter().collect())
}
