//! Packaged asset stores.
//!
//! Every store is read-only and rooted: callers hand over a path relative to
//! the store root (e.g. `assets/images/logo.png`) and get the raw bytes back.
//! Decoding those bytes into something useful is someone else's problem.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::AssetStore;
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn AssetStore + Send + Sync>;
