use std::collections::HashMap;
use std::sync::Arc;

use crate::error::VfsError;
use crate::path;
use crate::source::{AssetSource, VfsFuture};

/// Routes asset paths to mounted [`AssetSource`]s.
///
/// The first segment of a normalized path picks the mount. When it names no
/// mount, the whole path is handed to the default source, if one is set.
///
/// Cloning is cheap and clones share the mount table, which is frozen once
/// the first clone exists.
///
/// ```ignore
/// let mut vfs = Vfs::new();
/// vfs.mount("assets", DirectorySource::new("./assets"));
/// vfs.set_default("assets");
///
/// let bytes = vfs.read_blocking("Textures/rock.png")?;
/// ```
#[derive(Clone, Default)]
pub struct Vfs {
    mounts: Arc<Mounts>,
}

#[derive(Default)]
struct Mounts {
    sources: HashMap<String, Arc<dyn AssetSource>>,
    default: Option<String>,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `source` under `name`, replacing an earlier mount of that name.
    ///
    /// # Panics
    ///
    /// Panics if this `Vfs` has already been cloned.
    pub fn mount(&mut self, name: impl Into<String>, source: impl AssetSource) {
        let name = name.into();
        let source: Arc<dyn AssetSource> = Arc::new(source);
        log::debug!("mounting {} as '{name}'", source.describe());
        self.mounts_mut().sources.insert(name, source);
    }

    /// Route unmatched paths to the mount called `name`.
    ///
    /// # Panics
    ///
    /// Panics if this `Vfs` has already been cloned.
    pub fn set_default(&mut self, name: impl Into<String>) {
        self.mounts_mut().default = Some(name.into());
    }

    /// Whether a mount called `name` exists.
    pub fn is_mounted(&self, name: &str) -> bool {
        self.mounts.sources.contains_key(name)
    }

    /// Read the whole file at `raw_path`.
    pub fn read(&self, raw_path: &str) -> VfsFuture<Vec<u8>> {
        match self.route(raw_path) {
            Ok((source, rest)) => source.read(&rest),
            Err(err) => Box::pin(async move { Err(err) }),
        }
    }

    /// Whether a file exists at `raw_path`.
    ///
    /// Paths that cannot be routed simply do not exist.
    pub fn exists(&self, raw_path: &str) -> VfsFuture<bool> {
        match self.route(raw_path) {
            Ok((source, rest)) => source.exists(&rest),
            Err(_) => Box::pin(async { Ok(false) }),
        }
    }

    /// Read `raw_path` on the calling thread, blocking until the bytes arrive.
    pub fn read_blocking(&self, raw_path: &str) -> Result<Vec<u8>, VfsError> {
        pollster::block_on(self.read(raw_path))
    }

    fn mounts_mut(&mut self) -> &mut Mounts {
        match Arc::get_mut(&mut self.mounts) {
            Some(mounts) => mounts,
            None => panic!("the Vfs mount table is frozen once the Vfs has been cloned"),
        }
    }

    fn route(&self, raw_path: &str) -> Result<(Arc<dyn AssetSource>, String), VfsError> {
        let normalized = path::normalize(raw_path)?;
        let (mount, rest) = path::split_mount(&normalized);

        if !rest.is_empty()
            && let Some(source) = self.mounts.sources.get(mount)
        {
            return Ok((source.clone(), rest.to_owned()));
        }

        match &self.mounts.default {
            Some(default) => match self.mounts.sources.get(default) {
                Some(source) => Ok((source.clone(), normalized)),
                None => Err(VfsError::NoSuchMount(default.clone())),
            },
            None => Err(VfsError::NoSuchMount(mount.to_owned())),
        }
    }
}
