//! Interfaces between the COTS part indexer and the remote project store it
//! mirrors.
//!
//! A store exposes one project as a lazily listed folder tree. Files carry a
//! stable identity and a version, and their preview images are produced
//! asynchronously behind a pollable [`ThumbnailFetch`].

pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::{RemoteStore, StoreProvider};
pub use types::{FetchState, FolderHandle, ProjectInfo, RemoteFile, RemoteFolder, ThumbnailFetch};
