//! GPU device abstraction.
//!
//! Everything above this module talks to the GPU through the [`GpuDevice`]
//! trait: descriptor heaps and view creation, command allocators, fences,
//! committed and placed resources, and command list submission.
//!
//! # Available Backends
//!
//! - `dummy` (default): headless software device. Descriptor heaps get
//!   synthetic address ranges, resources are backed by CPU memory and copies
//!   execute at submission time. Used by the test suite and the demos.
//! - `vulkan-backend`: native Vulkan through ash and gpu-allocator.
//!
//! Device objects are returned as small enums with one variant per backend.
//! Every variant wraps an `Arc`, so handles are cheap to clone and can be
//! captured by recorded commands while the owning Rust object moves on.

pub mod dummy;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

use std::sync::Arc;

use crate::config::{BackendType, GraphicsConfig};
use crate::error::GraphicsError;
use crate::types::{
    CommandListType, ConstantBufferViewDesc, CpuDescriptorHandle, DescriptorHeapDesc,
    DescriptorHeapType, GpuDescriptorHandle, HeapDesc, HeapType, ResourceDesc, ResourceState,
    ShaderResourceViewDesc, UnorderedAccessViewDesc,
};

/// Device descriptor heap.
#[derive(Clone)]
pub enum GpuDescriptorHeap {
    Dummy(Arc<dummy::DummyDescriptorHeap>),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(Arc<vulkan::VulkanDescriptorHeap>),
}

impl GpuDescriptorHeap {
    pub fn desc(&self) -> DescriptorHeapDesc {
        match self {
            Self::Dummy(heap) => heap.range.desc,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(heap) => heap.range.desc,
        }
    }

    /// CPU handle of the first slot.
    pub fn cpu_start(&self) -> CpuDescriptorHandle {
        match self {
            Self::Dummy(heap) => heap.range.cpu_start,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(heap) => heap.range.cpu_start,
        }
    }

    /// GPU handle of the first slot, `None` unless the heap is shader visible.
    pub fn gpu_start(&self) -> Option<GpuDescriptorHandle> {
        match self {
            Self::Dummy(heap) => heap.range.gpu_start,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(heap) => heap.range.gpu_start,
        }
    }
}

impl std::fmt::Debug for GpuDescriptorHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuDescriptorHeap")
            .field("desc", &self.desc())
            .field("cpu_start", &self.cpu_start())
            .field("gpu_start", &self.gpu_start())
            .finish()
    }
}

/// Address range a descriptor heap occupies. Shared by the backends that
/// emulate descriptor heaps in CPU memory.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorRange {
    pub desc: DescriptorHeapDesc,
    pub cpu_start: CpuDescriptorHandle,
    pub gpu_start: Option<GpuDescriptorHandle>,
    pub increment: u32,
}

impl DescriptorRange {
    pub fn contains(&self, handle: CpuDescriptorHandle) -> bool {
        let end = self.cpu_start.0 + self.desc.num_descriptors as u64 * self.increment as u64;
        handle >= self.cpu_start && handle.0 < end
    }

    pub fn slot_of(&self, handle: CpuDescriptorHandle) -> usize {
        ((handle.0 - self.cpu_start.0) / self.increment as u64) as usize
    }
}

/// Recording memory for command lists of one type.
#[derive(Clone)]
pub enum GpuCommandAllocator {
    Dummy(Arc<dummy::DummyCommandAllocator>),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(Arc<vulkan::VulkanCommandAllocator>),
}

impl GpuCommandAllocator {
    pub fn list_type(&self) -> CommandListType {
        match self {
            Self::Dummy(allocator) => allocator.list_type,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(allocator) => allocator.list_type,
        }
    }
}

/// Monotonic 64-bit fence signaled by a queue.
#[derive(Clone)]
pub enum GpuFence {
    Dummy(Arc<dummy::DummyFence>),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(Arc<vulkan::VulkanFence>),
}

/// Memory heap placed resources are carved out of.
#[derive(Clone)]
pub enum GpuMemoryHeap {
    Dummy(Arc<dummy::DummyMemoryHeap>),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(Arc<vulkan::VulkanMemoryHeap>),
}

impl GpuMemoryHeap {
    pub fn desc(&self) -> HeapDesc {
        match self {
            Self::Dummy(heap) => heap.desc,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(heap) => heap.desc,
        }
    }
}

/// Device resource: a buffer or a texture.
///
/// The device object is released when the last clone is dropped.
#[derive(Clone)]
pub enum GpuResourceHandle {
    Dummy(Arc<dummy::DummyResource>),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(Arc<vulkan::VulkanResource>),
}

impl GpuResourceHandle {
    pub fn desc(&self) -> &ResourceDesc {
        match self {
            Self::Dummy(resource) => &resource.desc,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(resource) => &resource.desc,
        }
    }

    pub fn heap_type(&self) -> HeapType {
        match self {
            Self::Dummy(resource) => resource.heap_type,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(resource) => resource.heap_type,
        }
    }

    /// GPU virtual address of a buffer. Textures report
    /// [`GPU_VIRTUAL_ADDRESS_UNKNOWN`](crate::types::GPU_VIRTUAL_ADDRESS_UNKNOWN).
    pub fn gpu_virtual_address(&self) -> u64 {
        match self {
            Self::Dummy(resource) => resource.gpu_address,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(resource) => resource.gpu_address,
        }
    }

    /// Whether both handles refer to the same device resource.
    pub fn same_resource(&self, other: &GpuResourceHandle) -> bool {
        match (self, other) {
            (Self::Dummy(a), Self::Dummy(b)) => Arc::ptr_eq(a, b),
            #[cfg(feature = "vulkan-backend")]
            (Self::Vulkan(a), Self::Vulkan(b)) => Arc::ptr_eq(a, b),
            #[cfg(feature = "vulkan-backend")]
            _ => false,
        }
    }
}

impl std::fmt::Debug for GpuResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy(resource) => f
                .debug_struct("GpuResourceHandle::Dummy")
                .field("id", &resource.id)
                .field("desc", &resource.desc)
                .finish_non_exhaustive(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(resource) => f
                .debug_struct("GpuResourceHandle::Vulkan")
                .field("desc", &resource.desc)
                .finish_non_exhaustive(),
        }
    }
}

/// Split-barrier phase of a transition barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarrierPhase {
    #[default]
    Full,
    BeginOnly,
    EndOnly,
}

/// A state transition recorded against a resource.
#[derive(Debug, Clone)]
pub struct ResourceBarrier {
    pub resource: GpuResourceHandle,
    pub before: ResourceState,
    pub after: ResourceState,
    pub phase: BarrierPhase,
}

/// Where a texture subresource lives inside a staging buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureCopyRegion {
    pub buffer_offset: u64,
    /// Bytes per row in the staging buffer; rows are tightly packed.
    pub row_pitch: u32,
    pub array_slice: u32,
    pub width: u32,
    pub height: u32,
}

/// A command recorded into a [`CommandContext`](crate::command::CommandContext)
/// and replayed by the device at submission.
#[derive(Debug, Clone)]
pub enum GpuCommand {
    Transition(ResourceBarrier),
    /// Orders unordered-access writes to the same resource.
    UavBarrier(GpuResourceHandle),
    CopyBufferRegion {
        dest: GpuResourceHandle,
        dest_offset: u64,
        src: GpuResourceHandle,
        src_offset: u64,
        num_bytes: u64,
    },
    CopyBufferToTexture {
        dest: GpuResourceHandle,
        src: GpuResourceHandle,
        regions: Vec<TextureCopyRegion>,
    },
}

/// GPU device abstraction.
pub trait GpuDevice: Send + Sync + 'static {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    /// Byte distance between two consecutive descriptors of `heap_type`.
    fn descriptor_increment_size(&self, heap_type: DescriptorHeapType) -> u32;

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
        name: &str,
    ) -> Result<GpuDescriptorHeap, GraphicsError>;

    /// Write a shader resource view into the slot at `dest`.
    ///
    /// A `None` resource writes a null descriptor.
    fn create_shader_resource_view(
        &self,
        resource: Option<&GpuResourceHandle>,
        desc: &ShaderResourceViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), GraphicsError>;

    /// Write an unordered access view, optionally bound to a counter resource.
    fn create_unordered_access_view(
        &self,
        resource: &GpuResourceHandle,
        counter: Option<&GpuResourceHandle>,
        desc: &UnorderedAccessViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), GraphicsError>;

    fn create_constant_buffer_view(
        &self,
        desc: &ConstantBufferViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), GraphicsError>;

    /// Copy `count` consecutive descriptors from `src` to `dest`.
    fn copy_descriptors_simple(
        &self,
        count: u32,
        dest: CpuDescriptorHandle,
        src: CpuDescriptorHandle,
        heap_type: DescriptorHeapType,
    ) -> Result<(), GraphicsError>;

    fn create_command_allocator(
        &self,
        list_type: CommandListType,
    ) -> Result<GpuCommandAllocator, GraphicsError>;

    /// Recycle an allocator's memory. The caller guarantees the GPU is done with it.
    fn reset_command_allocator(&self, allocator: &GpuCommandAllocator) -> Result<(), GraphicsError>;

    fn create_fence(&self, initial_value: u64) -> Result<GpuFence, GraphicsError>;

    /// Highest value the GPU has signaled on `fence`.
    fn fence_completed_value(&self, fence: &GpuFence) -> u64;

    /// Block until `fence` reaches `value`.
    fn wait_for_fence(&self, fence: &GpuFence, value: u64) -> Result<(), GraphicsError>;

    fn create_memory_heap(&self, desc: &HeapDesc) -> Result<GpuMemoryHeap, GraphicsError>;

    fn create_committed_resource(
        &self,
        desc: &ResourceDesc,
        heap_type: HeapType,
        initial_state: ResourceState,
        name: &str,
    ) -> Result<GpuResourceHandle, GraphicsError>;

    /// Create a resource inside `heap` at `heap_offset`.
    fn create_placed_resource(
        &self,
        heap: &GpuMemoryHeap,
        heap_offset: u64,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> Result<GpuResourceHandle, GraphicsError>;

    /// Map a CPU-visible resource and copy `data` in at `offset`.
    fn write_resource(
        &self,
        resource: &GpuResourceHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Map a CPU-visible resource and copy `size` bytes out from `offset`.
    fn read_resource(
        &self,
        resource: &GpuResourceHandle,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, GraphicsError>;

    /// Replay `commands` on the queue of `list_type`, then signal `fence` to
    /// `signal_value` once the GPU has finished them.
    fn execute_command_list(
        &self,
        list_type: CommandListType,
        allocator: &GpuCommandAllocator,
        commands: &[GpuCommand],
        fence: &GpuFence,
        signal_value: u64,
    ) -> Result<(), GraphicsError>;

    /// Block until every queue is idle.
    fn wait_idle(&self) -> Result<(), GraphicsError>;
}

/// Create the device selected by `config`.
///
/// A Vulkan request falls back to the dummy device when Vulkan is not
/// compiled in or fails to initialize, unless `config.require_backend` is set.
pub fn create_device(config: &GraphicsConfig) -> Result<Arc<dyn GpuDevice>, GraphicsError> {
    match config.backend {
        BackendType::Dummy => {
            log::info!("Using dummy backend");
            Ok(Arc::new(dummy::DummyDevice::new()))
        }
        BackendType::Vulkan => {
            #[cfg(feature = "vulkan-backend")]
            {
                match vulkan::VulkanDevice::new(config) {
                    Ok(device) => {
                        log::info!("Using Vulkan backend (ash)");
                        return Ok(Arc::new(device));
                    }
                    Err(e) if config.require_backend => return Err(e),
                    Err(e) => log::warn!("Failed to create Vulkan backend: {}", e),
                }
            }

            #[cfg(not(feature = "vulkan-backend"))]
            if config.require_backend {
                return Err(GraphicsError::BackendUnavailable(
                    "built without the vulkan-backend feature".into(),
                ));
            }

            log::info!("Falling back to dummy backend");
            Ok(Arc::new(dummy::DummyDevice::new()))
        }
    }
}

/// Whether a hardware backend was compiled in.
pub fn has_gpu_backend() -> bool {
    cfg!(feature = "vulkan-backend")
}

static_assertions::assert_impl_all!(GpuResourceHandle: Send, Sync);
static_assertions::assert_impl_all!(GpuFence: Send, Sync);
static_assertions::assert_impl_all!(GpuDescriptorHeap: Send, Sync);
