use std::path::PathBuf;

use crate::error::VfsError;
use crate::source::{AssetSource, VfsFuture};

/// Asset source backed by a directory on the native file system.
///
/// Reads are plain blocking `std::fs` calls wrapped in a ready future; the
/// texture loader already runs them off the render thread.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl AssetSource for DirectorySource {
    fn read(&self, path: &str) -> VfsFuture<Vec<u8>> {
        let full = self.root.join(path);
        let path = path.to_owned();
        Box::pin(async move {
            log::trace!("reading {}", full.display());
            std::fs::read(&full).map_err(|e| VfsError::from_io(path, e))
        })
    }

    fn exists(&self, path: &str) -> VfsFuture<bool> {
        let full = self.root.join(path);
        Box::pin(async move { Ok(full.is_file()) })
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}
