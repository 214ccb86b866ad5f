//! Graphics core.
//!
//! [`GraphicsCore`] is the entry point of the GPU layer. It creates the
//! backend device selected by the [`GraphicsConfig`], the descriptor
//! allocators and command queues bundled in a [`GraphicsDevice`], and the
//! [`TextureManager`]. Independent cores never share state, so tests can run
//! several side by side.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ember_vfs::Vfs;

use crate::backend::{self, GpuDevice};
use crate::config::GraphicsConfig;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::texture::TextureManager;

/// Owner of every GPU service.
///
/// # Example
///
/// ```
/// use ember_graphics::{GraphicsConfig, GraphicsCore};
/// use ember_vfs::{MemorySource, Vfs};
///
/// let mut vfs = Vfs::new();
/// vfs.mount("memory", MemorySource::new());
/// vfs.set_default("memory");
///
/// let core = GraphicsCore::new(GraphicsConfig::default(), vfs).unwrap();
/// assert_eq!(core.device().raw().name(), "Dummy Backend");
/// core.shutdown().unwrap();
/// ```
pub struct GraphicsCore {
    config: GraphicsConfig,
    device: GraphicsDevice,
    textures: TextureManager,
    shut_down: AtomicBool,
}

impl GraphicsCore {
    /// Create the device selected by `config` and every service on top of it.
    pub fn new(config: GraphicsConfig, vfs: Vfs) -> Result<Self, GraphicsError> {
        let raw = backend::create_device(&config)?;
        Self::with_device(raw, config, vfs)
    }

    /// Build the services on an existing backend device.
    pub fn with_device(
        raw: Arc<dyn GpuDevice>,
        config: GraphicsConfig,
        vfs: Vfs,
    ) -> Result<Self, GraphicsError> {
        crate::profile_function!();
        let device = GraphicsDevice::new(raw, &config)?;
        let textures = TextureManager::new(device.clone(), vfs, &config)?;
        log::info!("GraphicsCore: ready on {} backend", device.raw().name());
        Ok(Self {
            config,
            device,
            textures,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    pub fn device(&self) -> &GraphicsDevice {
        &self.device
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    /// Wait for the GPU, drop cached textures, then release command
    /// allocators and descriptor heaps. Later calls do nothing.
    pub fn shutdown(&self) -> Result<(), GraphicsError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.device.idle_gpu()?;
        self.textures.shutdown();
        self.device.shutdown()?;
        log::info!("GraphicsCore: shut down");
        Ok(())
    }
}

impl Drop for GraphicsCore {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("GraphicsCore: shutdown failed: {}", e);
        }
    }
}

static_assertions::assert_impl_all!(GraphicsCore: Send, Sync);

#[cfg(test)]
mod tests {
    use ember_vfs::MemorySource;

    use super::*;
    use crate::backend::dummy::DummyDevice;
    use crate::config::BackendType;
    use crate::texture::DefaultTexture;

    fn vfs(files: &MemorySource) -> Vfs {
        let mut vfs = Vfs::new();
        vfs.mount("memory", files.clone());
        vfs.set_default("memory");
        vfs
    }

    #[test]
    fn vulkan_request_falls_back_without_the_backend() {
        let config = GraphicsConfig::new().with_backend(BackendType::Vulkan);
        if backend::has_gpu_backend() {
            return;
        }
        let core = GraphicsCore::new(config, vfs(&MemorySource::new())).unwrap();
        assert_eq!(core.device().raw().name(), "Dummy Backend");
    }

    #[test]
    fn required_backend_is_an_error_when_missing() {
        if backend::has_gpu_backend() {
            return;
        }
        let config = GraphicsConfig::new()
            .with_backend(BackendType::Vulkan)
            .with_required_backend(true);
        assert!(matches!(
            GraphicsCore::new(config, vfs(&MemorySource::new())),
            Err(GraphicsError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn shutdown_clears_textures_and_heaps() {
        let files = MemorySource::new();
        let core = GraphicsCore::with_device(
            Arc::new(DummyDevice::new()),
            GraphicsConfig::default(),
            vfs(&files),
        )
        .unwrap();
        let missing =
            core.textures().load_from_file("missing.png", DefaultTexture::Magenta2D, false);
        assert_eq!(core.textures().cache().len(), 1);

        core.shutdown().unwrap();
        assert!(core.textures().cache().is_empty());
        assert_eq!(core.device().descriptors().pool().heap_count(), 0);
        drop(missing);
        core.shutdown().unwrap();
    }
}
