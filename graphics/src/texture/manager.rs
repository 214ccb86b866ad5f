use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ember_vfs::{Vfs, path};

use crate::config::GraphicsConfig;
use crate::descriptor::DescriptorHandle;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::DescriptorHeapType;

use super::loader::{TextureLoadError, load_texture};
use super::{
    DefaultTexture, DefaultTextures, ManagedTexture, TextureCache, TextureLoadState, TextureRef,
};

/// Loads textures through the VFS and shares them by key.
///
/// The first request for a key inserts a loading entry and performs the
/// load on the calling thread with no lock held. Concurrent requests for
/// the same key block until that load finishes, then share its result.
/// Failed loads never surface as errors: the texture becomes
/// [`Invalid`](super::TextureLoadState::Invalid) and shows a default texture.
pub struct TextureManager {
    device: GraphicsDevice,
    vfs: Vfs,
    root: String,
    defaults: DefaultTextures,
    cache: Arc<TextureCache>,
    loads: AtomicUsize,
}

impl TextureManager {
    pub fn new(
        device: GraphicsDevice,
        vfs: Vfs,
        config: &GraphicsConfig,
    ) -> Result<Self, GraphicsError> {
        let defaults = DefaultTextures::new(&device)?;
        log::info!("TextureManager: initialized (root '{}')", config.texture_root);
        Ok(Self {
            device,
            vfs,
            root: config.texture_root.clone(),
            defaults,
            cache: Arc::new(TextureCache::new()),
            loads: AtomicUsize::new(0),
        })
    }

    /// Cache key for `file_path`.
    pub fn key_for(file_path: &str, force_srgb: bool) -> String {
        let mut key = path::normalize(file_path).unwrap_or_else(|_| file_path.to_owned());
        if force_srgb {
            key.push_str("_sRGB");
        }
        key
    }

    /// Return the texture for `file_path`, loading it if it is not cached.
    ///
    /// Always returns a usable reference whose state is `Valid` or `Invalid`.
    pub fn find_or_load(
        &self,
        file_path: &str,
        fallback: DefaultTexture,
        force_srgb: bool,
    ) -> TextureRef {
        let key = Self::key_for(file_path, force_srgb);
        let (texture, inserted) = self.cache.acquire(&key, || ManagedTexture::new(key.clone()));
        let handle = TextureRef::adopt(self.cache.clone(), texture);

        if inserted {
            self.load(&handle, file_path, fallback, force_srgb);
        } else {
            handle.wait_for_load();
        }
        handle
    }

    /// Load a texture file the way rendering code asks for it.
    pub fn load_from_file(
        &self,
        file_path: &str,
        fallback: DefaultTexture,
        force_srgb: bool,
    ) -> TextureRef {
        self.find_or_load(file_path, fallback, force_srgb)
    }

    fn load(
        &self,
        texture: &ManagedTexture,
        file_path: &str,
        fallback: DefaultTexture,
        force_srgb: bool,
    ) {
        self.loads.fetch_add(1, Ordering::AcqRel);
        let _unwind = LoadGuard {
            texture,
            fallback_srv: self.defaults.srv(fallback),
        };

        let result = path::join(&self.root, file_path)
            .map_err(TextureLoadError::Read)
            .and_then(|read_path| {
                load_texture(&self.device, &self.vfs, &read_path, texture.key(), force_srgb)
            });

        match result {
            Ok(loaded) => {
                log::debug!(
                    "loaded texture '{}' ({}x{})",
                    texture.key(),
                    loaded.width(),
                    loaded.height()
                );
                texture.complete(loaded);
            }
            Err(e) => {
                log::warn!(
                    "failed to load texture '{}': {}; using {:?}",
                    texture.key(),
                    e,
                    fallback
                );
                let srv = if e.had_source() {
                    self.copy_of_default(fallback)
                } else {
                    self.defaults.srv(fallback)
                };
                texture.fail(srv);
            }
        }
    }

    /// A descriptor of its own holding the view of `fallback`.
    fn copy_of_default(&self, fallback: DefaultTexture) -> DescriptorHandle {
        let source = self.defaults.srv(fallback);
        let copied = self
            .device
            .allocate_descriptor(DescriptorHeapType::CbvSrvUav, 1)
            .and_then(|dest| {
                self.device.raw().copy_descriptors_simple(
                    1,
                    dest.cpu(),
                    source.cpu(),
                    DescriptorHeapType::CbvSrvUav,
                )?;
                Ok(dest)
            });
        match copied {
            Ok(dest) => dest,
            Err(e) => {
                log::error!("failed to copy fallback descriptor: {}", e);
                source
            }
        }
    }

    /// Drop the cache entry for `key` once nothing references it.
    ///
    /// Entries are evicted by their last [`TextureRef`] anyway, so this only
    /// succeeds for entries that are already unreferenced. Live keys are left
    /// alone and `false` is returned.
    pub fn destroy_texture(&self, key: &str) -> bool {
        self.cache.remove(key)
    }

    pub fn cache(&self) -> &Arc<TextureCache> {
        &self.cache
    }

    pub fn defaults(&self) -> &DefaultTextures {
        &self.defaults
    }

    /// Number of loads started, successful or not.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Acquire)
    }

    /// Forget every cached texture.
    pub fn shutdown(&self) {
        self.cache.clear();
        log::info!("TextureManager: shut down");
    }
}

/// Publishes the fallback if a load unwinds before finishing, so waiters
/// never block on an entry that stays `Loading`.
struct LoadGuard<'a> {
    texture: &'a ManagedTexture,
    fallback_srv: DescriptorHandle,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.texture.state() == TextureLoadState::Loading {
            log::error!("loading texture '{}' panicked; using the fallback", self.texture.key());
            self.texture.fail(self.fallback_srv);
        }
    }
}

static_assertions::assert_impl_all!(TextureManager: Send, Sync);
