//! Asset Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The store or decoder failure that
//! caused a load to fail stays attached as a child of the raised kind.

use crate::key::AssetKey;
use derive_more::{Display, Error};
use std::sync::Arc;

/// An asset error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for asset operations.
pub type Result<T> = std::result::Result<T, Error>;
/// A settled load failure, shared by every handle attached to that load.
pub type SharedError = Arc<Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing is packaged where the asset should be.
    #[display("asset not found: {_0}")]
    NotFound(#[error(not(source))] AssetKey),
    /// Bytes were there but don't decode as the asset's kind. Don't retry.
    #[display("asset could not be decoded: {_0}")]
    Decode(#[error(not(source))] AssetKey),
    /// Reading the asset failed; a later request may succeed.
    #[display("I/O error reading asset: {_0}")]
    Io(#[error(not(source))] AssetKey),
    /// The loader stopped accepting or finishing work.
    #[display("asset loader is shut down")]
    ShutDown,
    /// The worker servicing the load disappeared before settling it.
    #[display("asset load abandoned: {_0}")]
    Abandoned(#[error(not(source))] AssetKey),
    /// The worker pool could not be started.
    #[display("failed to start asset loader pool")]
    PoolStart,
    /// A raw asset name carries an extension missing from the kind table.
    #[display("no asset kind for extension of {_0:?}")]
    UnknownExtension(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Abandoned(_))
    }

    /// The asset this error is about, if it is about a single asset.
    pub fn key(&self) -> Option<&AssetKey> {
        match self {
            Self::NotFound(key) | Self::Decode(key) | Self::Io(key) | Self::Abandoned(key) => Some(key),
            Self::ShutDown | Self::PoolStart | Self::UnknownExtension(_) => None,
        }
    }
}
