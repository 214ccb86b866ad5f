//! # Ember Graphics
//!
//! GPU resource and descriptor management for the Ember engine.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`DescriptorAllocators`] - bump allocation of CPU descriptors from a
//!   growing pool of fixed-size heaps, plus the shader-visible [`DescriptorHeap`]
//! - [`CommandListManager`] - graphics, compute and copy queues whose command
//!   allocators are recycled once their fence value has retired
//! - [`GpuBuffer`], [`UploadBuffer`], [`ReadbackBuffer`] and [`Texture`] -
//!   resources with usage-state tracking and derived views
//! - [`TextureManager`] - a reference-counted texture cache that loads each
//!   file once, however many threads ask for it
//! - Backends behind [`GpuDevice`]: Dummy (headless, for testing) and Vulkan
//!
//! ## Example
//!
//! ```
//! use ember_graphics::{DefaultTexture, GraphicsConfig, GraphicsCore, GpuBuffer};
//! use ember_vfs::{MemorySource, Vfs};
//!
//! let mut vfs = Vfs::new();
//! vfs.mount("memory", MemorySource::new());
//! vfs.set_default("memory");
//! let core = GraphicsCore::new(GraphicsConfig::default(), vfs).unwrap();
//!
//! let mut lights = GpuBuffer::structured();
//! lights.create(core.device(), "Lights", 64, 32, None).unwrap();
//!
//! let albedo = core.textures().load_from_file("rock.png", DefaultTexture::Magenta2D, true);
//! assert!(!albedo.srv().is_null());
//! ```

pub mod backend;
pub mod command;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod graphics_core;
pub mod profiling;
pub mod resource;
pub mod root_signature;
pub mod texture;
pub mod types;

pub use backend::{GpuDevice, create_device};
pub use command::{
    CommandAllocator, CommandAllocatorPool, CommandContext, CommandListManager, CommandQueue,
};
pub use config::{BackendType, GraphicsConfig, NUM_FRAMES_IN_FLIGHT};
pub use descriptor::{
    DescriptorAllocator, DescriptorAllocators, DescriptorHandle, DescriptorHeap, DescriptorHeapPool,
};
pub use device::GraphicsDevice;
pub use error::GraphicsError;
pub use graphics_core::GraphicsCore;
pub use resource::{
    BufferKind, ConstantBufferView, GpuBuffer, GpuHeap, GpuResource, IndexBufferView,
    ReadbackBuffer, Texture, UploadBuffer, VertexBufferView,
};
pub use root_signature::{RootParameter, RootSignature};
pub use texture::{DefaultTexture, ManagedTexture, TextureLoadState, TextureManager, TextureRef};
pub use types::{CommandListType, DescriptorHeapType, Format, ResourceState};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
