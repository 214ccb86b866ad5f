use std::future::Future;
use std::pin::Pin;

use crate::VfsError;

/// Boxed `Send` future returned by every asset read.
pub type VfsFuture<T> = Pin<Box<dyn Future<Output = Result<T, VfsError>> + Send>>;

/// A read-only store of asset bytes.
///
/// Paths handed to a source are already normalized by the [`Vfs`](crate::Vfs)
/// and relative to the source's root: forward slashes, no leading slash, no
/// `.` or `..` segments.
pub trait AssetSource: Send + Sync + 'static {
    /// Read the whole file at `path`.
    fn read(&self, path: &str) -> VfsFuture<Vec<u8>>;

    /// Whether a file exists at `path`.
    fn exists(&self, path: &str) -> VfsFuture<bool>;

    /// Short human-readable description used in log lines.
    fn describe(&self) -> String;
}
