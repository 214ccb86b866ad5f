//! Read-only asset sources for the Ember GPU layer.
//!
//! Texture and buffer loaders never touch the file system directly. They ask a
//! [`Vfs`] for the bytes behind a path, and the `Vfs` routes the request to
//! whichever [`AssetSource`] is mounted under the first path segment.
//!
//! # Sources
//!
//! - [`MemorySource`]: in-memory blobs for tests and embedded assets
//! - [`DirectorySource`]: a directory on the native file system (`directory` feature)
//!
//! All reads return a [`VfsFuture`]. Loader threads that cannot await use
//! [`Vfs::read_blocking`], which drives the future to completion with `pollster`.

mod error;
#[cfg(all(feature = "directory", not(target_arch = "wasm32")))]
mod directory;
mod memory;
pub mod path;
mod source;
mod vfs;

pub use error::VfsError;
#[cfg(all(feature = "directory", not(target_arch = "wasm32")))]
pub use directory::DirectorySource;
pub use memory::MemorySource;
pub use source::{AssetSource, VfsFuture};
pub use vfs::Vfs;
