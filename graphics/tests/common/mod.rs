//! Shared setup for the integration tests.
//!
//! Every test runs once per backend through `rstest` cases. Backends that
//! are not compiled in, or that fail to initialize on this machine, are
//! skipped.

#![allow(dead_code)]

use std::sync::Arc;

use ember_graphics::backend::dummy::DummyDevice;
use ember_graphics::{BackendType, GpuDevice, GraphicsConfig, GraphicsCore, GraphicsDevice};
use ember_vfs::{MemorySource, Vfs};

/// Backends the tests can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Headless software device.
    Dummy,
    /// Vulkan through ash.
    Vulkan,
}

impl Backend {
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Dummy => true,
            Backend::Vulkan => ember_graphics::backend::has_gpu_backend(),
        }
    }

    pub fn backend_type(self) -> BackendType {
        match self {
            Backend::Dummy => BackendType::Dummy,
            Backend::Vulkan => BackendType::Vulkan,
        }
    }
}

/// Device, asset files and, on the dummy backend, the dummy device itself.
pub struct TestContext {
    pub backend: Backend,
    pub core: GraphicsCore,
    pub files: MemorySource,
    pub dummy: Option<Arc<DummyDevice>>,
}

impl TestContext {
    pub fn new(backend: Backend) -> Option<Self> {
        Self::with_config(backend, GraphicsConfig::new())
    }

    /// Build a context with `config`; textures are read from the `Textures`
    /// folder of an in-memory source.
    pub fn with_config(backend: Backend, config: GraphicsConfig) -> Option<Self> {
        if !backend.is_available() {
            return None;
        }
        let _ = env_logger::builder().is_test(true).try_init();

        let config = config
            .with_backend(backend.backend_type())
            .with_required_backend(true)
            .with_texture_root("Textures");

        let files = MemorySource::new();
        let mut vfs = Vfs::new();
        vfs.mount("memory", files.clone());
        vfs.set_default("memory");

        let (raw, dummy) = match backend {
            Backend::Dummy => {
                let dummy = Arc::new(DummyDevice::new());
                (dummy.clone() as Arc<dyn GpuDevice>, Some(dummy))
            }
            Backend::Vulkan => match ember_graphics::create_device(&config) {
                Ok(device) => (device, None),
                Err(e) => {
                    eprintln!("Backend {:?} failed to initialize: {}", backend, e);
                    return None;
                }
            },
        };

        let core = GraphicsCore::with_device(raw, config, vfs).ok()?;
        Some(Self {
            backend,
            core,
            files,
            dummy,
        })
    }

    pub fn device(&self) -> &GraphicsDevice {
        self.core.device()
    }
}

/// A solid-color PNG.
pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("PNG encoding into memory cannot fail");
    bytes.into_inner()
}

/// Deterministic byte pattern.
pub fn test_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}
