use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::VfsError;
use crate::source::{AssetSource, VfsFuture};

/// In-memory asset source.
///
/// Clones share the same storage, so blobs can still be inserted after the
/// source has been mounted. Every completed `read` is counted, which lets
/// tests check how often a loader actually hit storage.
#[derive(Clone, Default)]
pub struct MemorySource {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    files: RwLock<HashMap<String, Arc<[u8]>>>,
    reads: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `path`, replacing any previous blob.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let data: Vec<u8> = data.into();
        self.shared.files.write().insert(path.into(), data.into());
    }

    /// Remove the blob at `path`. Returns whether one was present.
    pub fn remove(&self, path: &str) -> bool {
        self.shared.files.write().remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.shared.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of reads served so far, successful or not.
    pub fn read_count(&self) -> usize {
        self.shared.reads.load(Ordering::Acquire)
    }
}

impl AssetSource for MemorySource {
    fn read(&self, path: &str) -> VfsFuture<Vec<u8>> {
        let shared = self.shared.clone();
        let path = path.to_owned();
        Box::pin(async move {
            shared.reads.fetch_add(1, Ordering::AcqRel);
            let blob = shared.files.read().get(&path).cloned();
            blob.map(|bytes| bytes.to_vec()).ok_or(VfsError::NotFound(path))
        })
    }

    fn exists(&self, path: &str) -> VfsFuture<bool> {
        let shared = self.shared.clone();
        let path = path.to_owned();
        Box::pin(async move { Ok(shared.files.read().contains_key(&path)) })
    }

    fn describe(&self) -> String {
        format!("memory ({} blobs)", self.len())
    }
}
