//! gpu-allocator setup and resource memory helpers.

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};

use crate::error::GraphicsError;
use crate::types::HeapType;

pub fn create_allocator(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
) -> Result<Allocator, GraphicsError> {
    Allocator::new(&AllocatorCreateDesc {
        instance: instance.clone(),
        device,
        physical_device,
        debug_settings: Default::default(),
        buffer_device_address: true,
        allocation_sizes: gpu_allocator::AllocationSizes::default(),
    })
    .map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create memory allocator: {}", e))
    })
}

/// Memory location backing each heap type.
pub fn memory_location(heap_type: HeapType) -> MemoryLocation {
    match heap_type {
        HeapType::Default => MemoryLocation::GpuOnly,
        HeapType::Upload => MemoryLocation::CpuToGpu,
        HeapType::Readback => MemoryLocation::GpuToCpu,
    }
}

/// Allocate memory for `requirements`.
pub fn allocate(
    allocator: &mut Allocator,
    name: &str,
    requirements: vk::MemoryRequirements,
    heap_type: HeapType,
    linear: bool,
) -> Result<Allocation, GraphicsError> {
    allocator
        .allocate(&AllocationCreateDesc {
            name,
            requirements,
            location: memory_location(heap_type),
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| match e {
            gpu_allocator::AllocationError::OutOfMemory => GraphicsError::OutOfMemory,
            e => GraphicsError::ResourceCreationFailed(format!(
                "Failed to allocate memory for '{}': {}",
                name, e
            )),
        })
}
