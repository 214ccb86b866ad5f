//! Vulkan backend through ash and gpu-allocator.
//!
//! The device is headless: no surface or swapchain extensions are enabled.
//! Fences are timeline semaphores, so a 64-bit fence value maps directly onto
//! a semaphore counter. Command allocators are command pools whose buffers
//! are freed when the allocator is reset.
//!
//! Descriptor heaps are emulated on the CPU. Every view written into a slot
//! is kept as a [`VulkanDescriptor`] that names the buffer range or image
//! view a shader binding would use. Image views are owned by their resource
//! and destroyed with it.

mod allocator;
mod conversion;
mod debug;
mod device;
mod instance;

use std::collections::HashMap;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ash::vk;
use gpu_allocator::vulkan::{Allocation, Allocator};
use parking_lot::Mutex;

use crate::config::GraphicsConfig;
use crate::error::GraphicsError;
use crate::types::{
    CommandListType, ConstantBufferViewDesc, CpuDescriptorHandle, DescriptorHeapDesc,
    DescriptorHeapType, Format, GPU_VIRTUAL_ADDRESS_UNKNOWN, GpuDescriptorHandle, HeapDesc,
    HeapType, ResourceDesc, ResourceDimension, ResourceState, ShaderResourceViewDesc,
    SrvDimension, UavDimension, UnorderedAccessViewDesc,
};

use super::{
    BarrierPhase, DescriptorRange, GpuCommand, GpuCommandAllocator, GpuDescriptorHeap, GpuDevice,
    GpuFence, GpuMemoryHeap, GpuResourceHandle, ResourceBarrier, TextureCopyRegion,
};

use device::QueueFamilies;

const CPU_DESCRIPTOR_BASE: u64 = 0x0000_0020_0000_0000;
const GPU_DESCRIPTOR_BASE: u64 = 0x0000_0800_0000_0000;
const DESCRIPTOR_INCREMENT: u32 = 32;
const PLACEMENT_ALIGNMENT: u64 = 64 * 1024;

/// Map a failed Vulkan call onto the error space of the caller.
fn vk_error(what: &str, result: vk::Result, wrap: fn(String) -> GraphicsError) -> GraphicsError {
    match result {
        vk::Result::ERROR_DEVICE_LOST => GraphicsError::DeviceLost,
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
            GraphicsError::OutOfMemory
        }
        e => wrap(format!("{}: {:?}", what, e)),
    }
}

/// Instance, device and allocator shared by every object the device creates.
///
/// Objects hold an `Arc` to it, so the device outlives all of them.
pub(crate) struct VulkanShared {
    _entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    allocator: ManuallyDrop<Mutex<Allocator>>,
    /// Distinct queue families; resources are shared concurrently between them.
    queue_families: Vec<u32>,
}

impl VulkanShared {
    fn sharing_mode(&self) -> vk::SharingMode {
        if self.queue_families.len() > 1 {
            vk::SharingMode::CONCURRENT
        } else {
            vk::SharingMode::EXCLUSIVE
        }
    }

    fn free(&self, allocation: Allocation) {
        if let Err(e) = self.allocator.lock().free(allocation) {
            log::error!("Failed to free GPU allocation: {}", e);
        }
    }
}

impl Drop for VulkanShared {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // The allocator returns its memory blocks to the device, so it
            // goes first.
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
        log::debug!("Vulkan device destroyed");
    }
}

/// A view written into an emulated descriptor slot.
#[derive(Debug, Clone)]
pub enum VulkanDescriptor {
    /// Null shader resource view.
    Null,
    /// Buffer range read as a uniform texel, storage or raw buffer.
    Buffer {
        resource: Weak<VulkanResource>,
        buffer: vk::Buffer,
        offset: u64,
        range: u64,
        /// Texel format for typed views, `UNDEFINED` otherwise.
        format: vk::Format,
        storage: bool,
        counter: Option<(Weak<VulkanResource>, u64)>,
    },
    Image {
        resource: Weak<VulkanResource>,
        view: vk::ImageView,
        layout: vk::ImageLayout,
        storage: bool,
    },
    Uniform {
        address: u64,
        range: u64,
    },
}

/// Descriptor heap emulated in CPU memory.
pub struct VulkanDescriptorHeap {
    pub(crate) range: DescriptorRange,
    pub name: String,
    records: Mutex<Vec<Option<VulkanDescriptor>>>,
}

/// Command pool of one queue family.
pub struct VulkanCommandAllocator {
    pub(crate) list_type: CommandListType,
    pool: vk::CommandPool,
    state: Mutex<AllocatorState>,
    shared: Arc<VulkanShared>,
}

#[derive(Default)]
struct AllocatorState {
    buffers: Vec<vk::CommandBuffer>,
    /// Resources referenced by submitted commands, held until reset.
    retained: Vec<GpuResourceHandle>,
}

impl Drop for VulkanCommandAllocator {
    fn drop(&mut self) {
        unsafe { self.shared.device.destroy_command_pool(self.pool, None) };
    }
}

/// Timeline semaphore.
pub struct VulkanFence {
    semaphore: vk::Semaphore,
    shared: Arc<VulkanShared>,
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe { self.shared.device.destroy_semaphore(self.semaphore, None) };
    }
}

/// One device allocation that placed buffers are bound into.
pub struct VulkanMemoryHeap {
    pub(crate) desc: HeapDesc,
    allocation: Mutex<Option<Allocation>>,
    shared: Arc<VulkanShared>,
}

impl Drop for VulkanMemoryHeap {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.get_mut().take() {
            self.shared.free(allocation);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ResourceObject {
    Buffer(vk::Buffer),
    Image(vk::Image),
}

enum ResourceMemory {
    Owned(Mutex<Option<Allocation>>),
    Placed { heap: Arc<VulkanMemoryHeap>, offset: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ViewKey {
    format: vk::Format,
    view_type: vk::ImageViewType,
    aspect: vk::ImageAspectFlags,
    base_mip: u32,
    mip_count: u32,
    layer_count: u32,
}

/// Buffer or image with its memory.
pub struct VulkanResource {
    pub(crate) desc: ResourceDesc,
    pub(crate) heap_type: HeapType,
    pub(crate) gpu_address: u64,
    pub name: String,
    object: ResourceObject,
    memory: ResourceMemory,
    /// Layout the image will be in once every recorded command has run.
    layout: Mutex<vk::ImageLayout>,
    views: Mutex<HashMap<ViewKey, vk::ImageView>>,
    shared: Arc<VulkanShared>,
}

impl VulkanResource {
    /// The buffer handle, `None` for images.
    pub fn buffer(&self) -> Option<vk::Buffer> {
        match self.object {
            ResourceObject::Buffer(buffer) => Some(buffer),
            ResourceObject::Image(_) => None,
        }
    }

    /// The image handle, `None` for buffers.
    pub fn image(&self) -> Option<vk::Image> {
        match self.object {
            ResourceObject::Image(image) => Some(image),
            ResourceObject::Buffer(_) => None,
        }
    }

    fn with_mapped<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R, GraphicsError> {
        let len = self.desc.byte_size() as usize;
        let not_mapped =
            || GraphicsError::MapFailed(format!("'{}' is not mapped for CPU access", self.name));
        match &self.memory {
            ResourceMemory::Owned(allocation) => {
                let mut guard = allocation.lock();
                let slice = guard
                    .as_mut()
                    .and_then(Allocation::mapped_slice_mut)
                    .ok_or_else(not_mapped)?;
                Ok(f(&mut slice[..len]))
            }
            ResourceMemory::Placed { heap, offset } => {
                let mut guard = heap.allocation.lock();
                let slice = guard
                    .as_mut()
                    .and_then(Allocation::mapped_slice_mut)
                    .ok_or_else(not_mapped)?;
                let start = *offset as usize;
                Ok(f(&mut slice[start..start + len]))
            }
        }
    }

    fn check_range(&self, offset: u64, size: u64) -> Result<(), GraphicsError> {
        let len = self.desc.byte_size();
        if offset.checked_add(size).is_none_or(|end| end > len) {
            return Err(GraphicsError::MapFailed(format!(
                "range {offset}+{size} exceeds resource '{}' of {len} bytes",
                self.name
            )));
        }
        Ok(())
    }

    /// Image view for `key`, created on first use.
    fn image_view(&self, key: ViewKey) -> Result<vk::ImageView, GraphicsError> {
        let ResourceObject::Image(image) = self.object else {
            return Err(GraphicsError::InvalidParameter(format!(
                "'{}' is a buffer and has no image views",
                self.name
            )));
        };
        let mut views = self.views.lock();
        if let Some(view) = views.get(&key) {
            return Ok(*view);
        }

        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(key.view_type)
            .format(key.format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: key.aspect,
                base_mip_level: key.base_mip,
                level_count: key.mip_count,
                base_array_layer: 0,
                layer_count: key.layer_count,
            });
        let view = unsafe { self.shared.device.create_image_view(&create_info, None) }
            .map_err(|e| {
                vk_error("Failed to create image view", e, GraphicsError::ResourceCreationFailed)
            })?;
        views.insert(key, view);
        Ok(view)
    }
}

impl Drop for VulkanResource {
    fn drop(&mut self) {
        let device = &self.shared.device;
        unsafe {
            for view in self.views.get_mut().drain().map(|(_, view)| view) {
                device.destroy_image_view(view, None);
            }
            match self.object {
                ResourceObject::Buffer(buffer) => device.destroy_buffer(buffer, None),
                ResourceObject::Image(image) => device.destroy_image(image, None),
            }
        }
        if let ResourceMemory::Owned(allocation) = &mut self.memory
            && let Some(allocation) = allocation.get_mut().take()
        {
            self.shared.free(allocation);
        }
    }
}

/// Vulkan implementation of [`GpuDevice`].
pub struct VulkanDevice {
    shared: Arc<VulkanShared>,
    families: QueueFamilies,
    /// One queue per command list type. Types that share a family share the
    /// queue and its lock.
    queues: [Arc<Mutex<vk::Queue>>; 3],
    next_cpu_descriptor: AtomicU64,
    next_gpu_descriptor: AtomicU64,
    heaps: Mutex<Vec<Weak<VulkanDescriptorHeap>>>,
}

impl std::fmt::Debug for VulkanDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDevice")
            .field("families", &self.families)
            .finish_non_exhaustive()
    }
}

impl VulkanDevice {
    /// Bring up a headless Vulkan device.
    ///
    /// Fails with [`GraphicsError::InitializationFailed`] when no loader or
    /// suitable GPU is present.
    pub fn new(config: &GraphicsConfig) -> Result<Self, GraphicsError> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!("Failed to load Vulkan: {}", e))
            })?;

        let bundle =
            instance::create_instance(&entry, &config.application_name, config.validation)?;
        let instance = bundle.instance;

        let destroy_instance = |instance: &ash::Instance| unsafe {
            if let (Some(debug_utils), Some(messenger)) =
                (&bundle.debug_utils, bundle.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            instance.destroy_instance(None);
        };

        let selected = device::select_physical_device(&instance).and_then(|physical_device| {
            let families = device::find_queue_families(&instance, physical_device)?;
            let device = device::create_logical_device(&instance, physical_device, &families)?;
            Ok((physical_device, families, device))
        });
        let (physical_device, families, device) = match selected {
            Ok(selected) => selected,
            Err(e) => {
                destroy_instance(&instance);
                return Err(e);
            }
        };

        let created = allocator::create_allocator(&instance, physical_device, device.clone());
        let allocator = match created {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                destroy_instance(&instance);
                return Err(e);
            }
        };

        let unique_families = families.unique();
        let family_queues: HashMap<u32, Arc<Mutex<vk::Queue>>> = unique_families
            .iter()
            .map(|&family| {
                let queue = unsafe { device.get_device_queue(family, 0) };
                (family, Arc::new(Mutex::new(queue)))
            })
            .collect();
        let queues = CommandListType::ALL.map(|ty| family_queues[&families.family(ty)].clone());

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name = unsafe { std::ffi::CStr::from_ptr(properties.device_name.as_ptr()) };
        log::info!(
            "Vulkan device initialized on {:?} (queue families {:?}, validation: {})",
            device_name,
            families.families,
            bundle.debug_messenger.is_some()
        );

        Ok(Self {
            shared: Arc::new(VulkanShared {
                _entry: entry,
                instance,
                debug_utils: bundle.debug_utils,
                debug_messenger: bundle.debug_messenger,
                physical_device,
                device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                queue_families: unique_families,
            }),
            families,
            queues,
            next_cpu_descriptor: AtomicU64::new(CPU_DESCRIPTOR_BASE),
            next_gpu_descriptor: AtomicU64::new(GPU_DESCRIPTOR_BASE),
            heaps: Mutex::new(Vec::new()),
        })
    }

    pub fn raw_device(&self) -> &ash::Device {
        &self.shared.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.shared.physical_device
    }

    /// Queue family serving `list_type`.
    pub fn queue_family(&self, list_type: CommandListType) -> u32 {
        self.families.family(list_type)
    }

    /// The view last written at `handle`, if any.
    pub fn descriptor(&self, handle: CpuDescriptorHandle) -> Option<VulkanDescriptor> {
        let heap = self.find_heap(handle).ok()?;
        let slot = heap.range.slot_of(handle);
        heap.records.lock()[slot].clone()
    }

    fn find_heap(
        &self,
        handle: CpuDescriptorHandle,
    ) -> Result<Arc<VulkanDescriptorHeap>, GraphicsError> {
        let mut heaps = self.heaps.lock();
        heaps.retain(|heap| heap.strong_count() > 0);
        heaps
            .iter()
            .filter_map(Weak::upgrade)
            .find(|heap| heap.range.contains(handle))
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "descriptor handle {:#x} is not inside a live heap",
                    handle.0
                ))
            })
    }

    fn write_descriptor(
        &self,
        dest: CpuDescriptorHandle,
        record: Option<VulkanDescriptor>,
    ) -> Result<(), GraphicsError> {
        let heap = self.find_heap(dest)?;
        let slot = heap.range.slot_of(dest);
        heap.records.lock()[slot] = record;
        Ok(())
    }

    fn create_buffer(
        &self,
        desc: &ResourceDesc,
        name: &str,
    ) -> Result<vk::Buffer, GraphicsError> {
        let families = &self.shared.queue_families;
        let mut buffer_info = vk::BufferCreateInfo::default()
            .size(desc.width)
            .usage(conversion::buffer_usage())
            .sharing_mode(self.shared.sharing_mode());
        if self.shared.sharing_mode() == vk::SharingMode::CONCURRENT {
            buffer_info = buffer_info.queue_family_indices(families);
        }
        unsafe { self.shared.device.create_buffer(&buffer_info, None) }.map_err(|e| {
            vk_error(
                &format!("Failed to create buffer '{}'", name),
                e,
                GraphicsError::ResourceCreationFailed,
            )
        })
    }

    fn buffer_address(&self, buffer: vk::Buffer) -> u64 {
        let info = vk::BufferDeviceAddressInfo::default().buffer(buffer);
        unsafe { self.shared.device.get_buffer_device_address(&info) }
    }

    fn create_image(&self, desc: &ResourceDesc, name: &str) -> Result<vk::Image, GraphicsError> {
        let families = &self.shared.queue_families;
        let mut image_info = vk::ImageCreateInfo::default()
            .flags(conversion::image_create_flags(desc))
            .image_type(vk::ImageType::TYPE_2D)
            .format(conversion::convert_format(desc.format))
            .extent(vk::Extent3D {
                width: desc.width as u32,
                height: desc.height,
                depth: 1,
            })
            .mip_levels(desc.mip_levels as u32)
            .array_layers(desc.depth_or_array_size as u32)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(conversion::image_usage(desc.flags))
            .sharing_mode(self.shared.sharing_mode())
            .initial_layout(vk::ImageLayout::UNDEFINED);
        if self.shared.sharing_mode() == vk::SharingMode::CONCURRENT {
            image_info = image_info.queue_family_indices(families);
        }
        unsafe { self.shared.device.create_image(&image_info, None) }.map_err(|e| {
            vk_error(
                &format!("Failed to create image '{}'", name),
                e,
                GraphicsError::ResourceCreationFailed,
            )
        })
    }

    fn make_resource(
        &self,
        desc: &ResourceDesc,
        heap_type: HeapType,
        name: &str,
        object: ResourceObject,
        memory: ResourceMemory,
    ) -> GpuResourceHandle {
        let gpu_address = match object {
            ResourceObject::Buffer(buffer) => self.buffer_address(buffer),
            ResourceObject::Image(_) => GPU_VIRTUAL_ADDRESS_UNKNOWN,
        };
        GpuResourceHandle::Vulkan(Arc::new(VulkanResource {
            desc: *desc,
            heap_type,
            gpu_address,
            name: name.to_owned(),
            object,
            memory,
            layout: Mutex::new(vk::ImageLayout::UNDEFINED),
            views: Mutex::new(HashMap::new()),
            shared: self.shared.clone(),
        }))
    }

    /// Record `barrier` into `cmd`.
    fn record_transition(
        &self,
        cmd: vk::CommandBuffer,
        barrier: &ResourceBarrier,
    ) -> Result<(), GraphicsError> {
        // Vulkan has no split barriers; the end of a split transition is a
        // full one.
        if barrier.phase == BarrierPhase::BeginOnly {
            return Ok(());
        }
        let resource = vulkan_resource(&barrier.resource)?;
        let (src_access, src_stage) = conversion::access_and_stages(barrier.before);
        let (dst_access, dst_stage) = conversion::access_and_stages(barrier.after);
        let device = &self.shared.device;

        match resource.object {
            ResourceObject::Buffer(buffer) => {
                let buffer_barrier = vk::BufferMemoryBarrier::default()
                    .src_access_mask(src_access)
                    .dst_access_mask(dst_access)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .buffer(buffer)
                    .offset(0)
                    .size(vk::WHOLE_SIZE);
                unsafe {
                    device.cmd_pipeline_barrier(
                        cmd,
                        src_stage,
                        dst_stage,
                        vk::DependencyFlags::empty(),
                        &[],
                        &[buffer_barrier],
                        &[],
                    );
                }
            }
            ResourceObject::Image(image) => {
                let mut layout = resource.layout.lock();
                let new_layout = conversion::image_layout(barrier.after);
                record_image_barrier(
                    device,
                    cmd,
                    image,
                    conversion::aspect_mask(resource.desc.format),
                    (*layout, new_layout),
                    (src_access, src_stage),
                    (dst_access, dst_stage),
                );
                *layout = new_layout;
            }
        }
        Ok(())
    }

    fn record_copy_to_texture(
        &self,
        cmd: vk::CommandBuffer,
        dest: &VulkanResource,
        src: &VulkanResource,
        regions: &[TextureCopyRegion],
    ) -> Result<(), GraphicsError> {
        let (Some(image), Some(buffer)) = (dest.image(), src.buffer()) else {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot copy '{}' into '{}': expected a buffer source and an image destination",
                src.name, dest.name
            )));
        };
        let device = &self.shared.device;
        let aspect = conversion::aspect_mask(dest.desc.format);

        let mut layout = dest.layout.lock();
        if *layout != vk::ImageLayout::TRANSFER_DST_OPTIMAL {
            let (src_access, src_stage) = conversion::access_and_stages(ResourceState::COMMON);
            record_image_barrier(
                device,
                cmd,
                image,
                aspect,
                (*layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
                (src_access, src_stage),
                (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
            );
            *layout = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
        }

        let bpp = dest.desc.format.bytes_per_pixel().max(1);
        let copies: Vec<vk::BufferImageCopy> = regions
            .iter()
            .map(|region| vk::BufferImageCopy {
                buffer_offset: region.buffer_offset,
                buffer_row_length: region.row_pitch / bpp,
                buffer_image_height: 0,
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: aspect,
                    mip_level: 0,
                    base_array_layer: region.array_slice,
                    layer_count: 1,
                },
                image_offset: vk::Offset3D::default(),
                image_extent: vk::Extent3D {
                    width: region.width,
                    height: region.height,
                    depth: 1,
                },
            })
            .collect();

        unsafe {
            device.cmd_copy_buffer_to_image(
                cmd,
                buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &copies,
            );
        }
        Ok(())
    }

    fn record(
        &self,
        cmd: vk::CommandBuffer,
        command: &GpuCommand,
        retained: &mut Vec<GpuResourceHandle>,
    ) -> Result<(), GraphicsError> {
        let device = &self.shared.device;
        match command {
            GpuCommand::Transition(barrier) => {
                self.record_transition(cmd, barrier)?;
                retained.push(barrier.resource.clone());
            }
            GpuCommand::UavBarrier(resource) => {
                let shader_stages = vk::PipelineStageFlags::COMPUTE_SHADER
                    | vk::PipelineStageFlags::FRAGMENT_SHADER;
                let barrier = vk::MemoryBarrier::default()
                    .src_access_mask(vk::AccessFlags::SHADER_WRITE)
                    .dst_access_mask(vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE);
                unsafe {
                    device.cmd_pipeline_barrier(
                        cmd,
                        shader_stages,
                        shader_stages,
                        vk::DependencyFlags::empty(),
                        &[barrier],
                        &[],
                        &[],
                    );
                }
                retained.push(resource.clone());
            }
            GpuCommand::CopyBufferRegion {
                dest,
                dest_offset,
                src,
                src_offset,
                num_bytes,
            } => {
                let (Some(dest_buffer), Some(src_buffer)) =
                    (vulkan_resource(dest)?.buffer(), vulkan_resource(src)?.buffer())
                else {
                    return Err(GraphicsError::InvalidParameter(
                        "buffer copies need buffer resources".into(),
                    ));
                };
                let region = vk::BufferCopy {
                    src_offset: *src_offset,
                    dst_offset: *dest_offset,
                    size: *num_bytes,
                };
                unsafe { device.cmd_copy_buffer(cmd, src_buffer, dest_buffer, &[region]) };
                retained.push(dest.clone());
                retained.push(src.clone());
            }
            GpuCommand::CopyBufferToTexture { dest, src, regions } => {
                self.record_copy_to_texture(
                    cmd,
                    vulkan_resource(dest)?,
                    vulkan_resource(src)?,
                    regions,
                )?;
                retained.push(dest.clone());
                retained.push(src.clone());
            }
        }
        Ok(())
    }

    fn srv_view_key(&self, resource: &VulkanResource, desc: &ShaderResourceViewDesc) -> ViewKey {
        let format = if desc.format == Format::Unknown {
            resource.desc.format
        } else {
            desc.format
        };
        let (view_type, mip_levels, layer_count) = match desc.dimension {
            SrvDimension::Texture2D { mip_levels } => (vk::ImageViewType::TYPE_2D, mip_levels, 1),
            SrvDimension::Texture2DArray { mip_levels, array_size } => {
                (vk::ImageViewType::TYPE_2D_ARRAY, mip_levels, array_size)
            }
            SrvDimension::TextureCube { mip_levels } => (vk::ImageViewType::CUBE, mip_levels, 6),
            SrvDimension::Buffer { .. } => (vk::ImageViewType::TYPE_2D, 1, 1),
        };
        let available = resource.desc.mip_levels as u32;
        ViewKey {
            format: conversion::convert_format(format),
            view_type,
            aspect: conversion::view_aspect(format),
            base_mip: 0,
            mip_count: if mip_levels == 0 { available } else { mip_levels.min(available) },
            layer_count,
        }
    }
}

fn record_image_barrier(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    (old_layout, new_layout): (vk::ImageLayout, vk::ImageLayout),
    (src_access, src_stage): (vk::AccessFlags, vk::PipelineStageFlags),
    (dst_access, dst_stage): (vk::AccessFlags, vk::PipelineStageFlags),
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: vk::REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: vk::REMAINING_ARRAY_LAYERS,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

fn vulkan_resource(handle: &GpuResourceHandle) -> Result<&Arc<VulkanResource>, GraphicsError> {
    match handle {
        GpuResourceHandle::Vulkan(resource) => Ok(resource),
        _ => Err(GraphicsError::InvalidParameter(
            "resource belongs to another backend".into(),
        )),
    }
}

fn vulkan_fence(fence: &GpuFence) -> Result<&VulkanFence, GraphicsError> {
    match fence {
        GpuFence::Vulkan(fence) => Ok(fence),
        _ => Err(GraphicsError::InvalidParameter(
            "fence belongs to another backend".into(),
        )),
    }
}

fn vulkan_allocator(
    allocator: &GpuCommandAllocator,
) -> Result<&VulkanCommandAllocator, GraphicsError> {
    match allocator {
        GpuCommandAllocator::Vulkan(allocator) => Ok(allocator),
        _ => Err(GraphicsError::InvalidParameter(
            "allocator belongs to another backend".into(),
        )),
    }
}

/// Byte range a buffer view covers.
fn buffer_view_range(
    first_element: u64,
    num_elements: u32,
    stride: u32,
    format: Format,
    raw: bool) -> (u64, u64,
) {
    let element_size = if raw {
        4
    } else if stride > 0 {
        stride
    } else {
        format.bytes_per_pixel()
    } as u64;
    (first_element * element_size, num_elements as u64 * element_size)
}

impl GpuDevice for VulkanDevice {
    fn name(&self) -> &'static str {
        "Vulkan Backend (ash)"
    }

    fn descriptor_increment_size(&self, _heap_type: DescriptorHeapType) -> u32 {
        DESCRIPTOR_INCREMENT
    }

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
        name: &str,
    ) -> Result<GpuDescriptorHeap, GraphicsError> {
        if desc.num_descriptors == 0 {
            return Err(GraphicsError::InvalidParameter(
                "descriptor heap must hold at least one descriptor".into(),
            ));
        }
        if desc.shader_visible && !desc.heap_type.can_be_shader_visible() {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} heaps cannot be shader visible",
                desc.heap_type
            )));
        }

        let span = (desc.num_descriptors as u64 * DESCRIPTOR_INCREMENT as u64)
            .next_multiple_of(PLACEMENT_ALIGNMENT);
        let cpu_start =
            CpuDescriptorHandle(self.next_cpu_descriptor.fetch_add(span, Ordering::AcqRel));
        let gpu_start = desc.shader_visible.then(|| {
            GpuDescriptorHandle(self.next_gpu_descriptor.fetch_add(span, Ordering::AcqRel))
        });

        log::debug!(
            "VulkanDevice: creating descriptor heap '{}' ({:?} x{})",
            name,
            desc.heap_type,
            desc.num_descriptors
        );

        let heap = Arc::new(VulkanDescriptorHeap {
            range: DescriptorRange {
                desc: *desc,
                cpu_start,
                gpu_start,
                increment: DESCRIPTOR_INCREMENT,
            },
            name: name.to_owned(),
            records: Mutex::new(vec![None; desc.num_descriptors as usize]),
        });
        self.heaps.lock().push(Arc::downgrade(&heap));
        Ok(GpuDescriptorHeap::Vulkan(heap))
    }

    fn create_shader_resource_view(
        &self,
        resource: Option<&GpuResourceHandle>,
        desc: &ShaderResourceViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), GraphicsError> {
        let Some(resource) = resource else {
            return self.write_descriptor(dest, Some(VulkanDescriptor::Null));
        };
        let resource = vulkan_resource(resource)?;

        let record = match (resource.object, desc.dimension) {
            (
                ResourceObject::Buffer(buffer),
                SrvDimension::Buffer {
                    first_element,
                    num_elements,
                    structure_byte_stride,
                    raw,
                },
            ) => {
                let (offset, range) = buffer_view_range(
                    first_element,
                    num_elements,
                    structure_byte_stride,
                    desc.format,
                    raw,
                );
                VulkanDescriptor::Buffer {
                    resource: Arc::downgrade(resource),
                    buffer,
                    offset,
                    range,
                    format: if raw || structure_byte_stride > 0 {
                        vk::Format::UNDEFINED
                    } else {
                        conversion::convert_format(desc.format)
                    },
                    storage: false,
                    counter: None,
                }
            }
            (ResourceObject::Image(_), dimension)
                if !matches!(dimension, SrvDimension::Buffer { .. }) =>
            {
                let view = resource.image_view(self.srv_view_key(resource, desc))?;
                VulkanDescriptor::Image {
                    resource: Arc::downgrade(resource),
                    view,
                    layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    storage: false,
                }
            }
            _ => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "shader resource view {:?} does not match resource '{}'",
                    desc.dimension, resource.name
                )));
            }
        };
        self.write_descriptor(dest, Some(record))
    }

    fn create_unordered_access_view(
        &self,
        resource: &GpuResourceHandle,
        counter: Option<&GpuResourceHandle>,
        desc: &UnorderedAccessViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), GraphicsError> {
        let resource = vulkan_resource(resource)?;
        let counter = counter.map(vulkan_resource).transpose()?;

        let record = match (resource.object, desc.dimension) {
            (
                ResourceObject::Buffer(buffer),
                UavDimension::Buffer {
                    first_element,
                    num_elements,
                    structure_byte_stride,
                    counter_offset_in_bytes,
                    raw,
                },
            ) => {
                let (offset, range) = buffer_view_range(
                    first_element,
                    num_elements,
                    structure_byte_stride,
                    desc.format,
                    raw,
                );
                VulkanDescriptor::Buffer {
                    resource: Arc::downgrade(resource),
                    buffer,
                    offset,
                    range,
                    format: if raw || structure_byte_stride > 0 {
                        vk::Format::UNDEFINED
                    } else {
                        conversion::convert_format(desc.format)
                    },
                    storage: true,
                    counter: counter
                        .map(|counter| (Arc::downgrade(counter), counter_offset_in_bytes)),
                }
            }
            (ResourceObject::Image(_), UavDimension::Texture2D { mip_slice }) => {
                let format = if desc.format == Format::Unknown {
                    resource.desc.format.uav_format()
                } else {
                    desc.format
                };
                let view = resource.image_view(ViewKey {
                    format: conversion::convert_format(format),
                    view_type: vk::ImageViewType::TYPE_2D,
                    aspect: vk::ImageAspectFlags::COLOR,
                    base_mip: mip_slice,
                    mip_count: 1,
                    layer_count: 1,
                })?;
                VulkanDescriptor::Image {
                    resource: Arc::downgrade(resource),
                    view,
                    layout: vk::ImageLayout::GENERAL,
                    storage: true,
                }
            }
            _ => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "unordered access view {:?} does not match resource '{}'",
                    desc.dimension, resource.name
                )));
            }
        };
        self.write_descriptor(dest, Some(record))
    }

    fn create_constant_buffer_view(
        &self,
        desc: &ConstantBufferViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), GraphicsError> {
        self.write_descriptor(
            dest,
            Some(VulkanDescriptor::Uniform {
                address: desc.buffer_location,
                range: desc.size_in_bytes as u64,
            }),
        )
    }

    fn copy_descriptors_simple(
        &self,
        count: u32,
        dest: CpuDescriptorHandle,
        src: CpuDescriptorHandle,
        _heap_type: DescriptorHeapType,
    ) -> Result<(), GraphicsError> {
        for i in 0..count as u64 {
            let from = src.offset(i * DESCRIPTOR_INCREMENT as u64);
            let to = dest.offset(i * DESCRIPTOR_INCREMENT as u64);
            let source_heap = self.find_heap(from)?;
            let record = source_heap.records.lock()[source_heap.range.slot_of(from)].clone();
            self.write_descriptor(to, record)?;
        }
        Ok(())
    }

    fn create_command_allocator(
        &self,
        list_type: CommandListType,
    ) -> Result<GpuCommandAllocator, GraphicsError> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.families.family(list_type))
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);

        let pool = unsafe { self.shared.device.create_command_pool(&pool_info, None) }
            .map_err(|e| {
                vk_error("Failed to create command pool", e, GraphicsError::ResourceCreationFailed)
            })?;

        log::trace!("VulkanDevice: created {:?} command allocator", list_type);
        Ok(GpuCommandAllocator::Vulkan(Arc::new(VulkanCommandAllocator {
            list_type,
            pool,
            state: Mutex::new(AllocatorState::default()),
            shared: self.shared.clone(),
        })))
    }

    fn reset_command_allocator(
        &self,
        allocator: &GpuCommandAllocator,
    ) -> Result<(), GraphicsError> {
        let allocator = vulkan_allocator(allocator)?;
        let mut state = allocator.state.lock();
        let device = &self.shared.device;
        unsafe {
            if !state.buffers.is_empty() {
                device.free_command_buffers(allocator.pool, &state.buffers);
            }
            device.reset_command_pool(allocator.pool, vk::CommandPoolResetFlags::empty())
        }
        .map_err(|e| vk_error("Failed to reset command pool", e, GraphicsError::Internal))?;
        state.buffers.clear();
        state.retained.clear();
        Ok(())
    }

    fn create_fence(&self, initial_value: u64) -> Result<GpuFence, GraphicsError> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);

        let semaphore = unsafe { self.shared.device.create_semaphore(&create_info, None) }
            .map_err(|e| {
                vk_error(
                    "Failed to create timeline semaphore",
                    e,
                    GraphicsError::ResourceCreationFailed,
                )
            })?;

        Ok(GpuFence::Vulkan(Arc::new(VulkanFence {
            semaphore,
            shared: self.shared.clone(),
        })))
    }

    fn fence_completed_value(&self, fence: &GpuFence) -> u64 {
        let Ok(fence) = vulkan_fence(fence) else {
            return 0;
        };
        match unsafe { self.shared.device.get_semaphore_counter_value(fence.semaphore) } {
            Ok(value) => value,
            Err(e) => {
                log::error!("Failed to query timeline semaphore: {:?}", e);
                0
            }
        }
    }

    fn wait_for_fence(&self, fence: &GpuFence, value: u64) -> Result<(), GraphicsError> {
        let fence = vulkan_fence(fence)?;
        let semaphores = [fence.semaphore];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        unsafe { self.shared.device.wait_semaphores(&wait_info, u64::MAX) }
            .map_err(|e| {
                vk_error("Failed to wait for timeline semaphore", e, GraphicsError::Internal)
            })
    }

    fn create_memory_heap(&self, desc: &HeapDesc) -> Result<GpuMemoryHeap, GraphicsError> {
        if desc.size_in_bytes == 0 {
            return Err(GraphicsError::InvalidParameter("memory heap size is zero".into()));
        }

        // Placed buffers must accept the heap's memory type, so the heap is
        // allocated against the requirements of a buffer spanning all of it.
        let spanning = ResourceDesc::buffer(desc.size_in_bytes, Default::default());
        let sizing_buffer = self.create_buffer(&spanning, "heap sizing")?;
        let requirements =
            unsafe { self.shared.device.get_buffer_memory_requirements(sizing_buffer) };
        unsafe { self.shared.device.destroy_buffer(sizing_buffer, None) };

        let allocation = allocator::allocate(
            &mut self.shared.allocator.lock(),
            "memory heap",
            requirements,
            desc.heap_type,
            true,
        )?;

        Ok(GpuMemoryHeap::Vulkan(Arc::new(VulkanMemoryHeap {
            desc: *desc,
            allocation: Mutex::new(Some(allocation)),
            shared: self.shared.clone(),
        })))
    }

    fn create_committed_resource(
        &self,
        desc: &ResourceDesc,
        heap_type: HeapType,
        _initial_state: ResourceState,
        name: &str,
    ) -> Result<GpuResourceHandle, GraphicsError> {
        if desc.byte_size() == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "resource '{name}' has no storage"
            )));
        }
        let device = &self.shared.device;

        match desc.dimension {
            ResourceDimension::Buffer => {
                let buffer = self.create_buffer(desc, name)?;
                let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
                let allocation = allocator::allocate(
                    &mut self.shared.allocator.lock(),
                    name,
                    requirements,
                    heap_type,
                    true,
                )
                .inspect_err(|_| unsafe { device.destroy_buffer(buffer, None) })?;

                let bound = unsafe {
                    device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                };
                if let Err(e) = bound {
                    unsafe { device.destroy_buffer(buffer, None) };
                    self.shared.free(allocation);
                    return Err(vk_error(
                        "Failed to bind buffer memory",
                        e,
                        GraphicsError::ResourceCreationFailed,
                    ));
                }

                log::trace!(
                    "VulkanDevice: created buffer '{}' ({} bytes, {:?})",
                    name,
                    desc.width,
                    heap_type
                );
                Ok(self.make_resource(
                    desc,
                    heap_type,
                    name,
                    ResourceObject::Buffer(buffer),
                    ResourceMemory::Owned(Mutex::new(Some(allocation))),
                ))
            }
            ResourceDimension::Texture2D => {
                if heap_type != HeapType::Default {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "texture '{name}' must live in the default heap"
                    )));
                }
                let image = self.create_image(desc, name)?;
                let requirements = unsafe { device.get_image_memory_requirements(image) };
                let allocation = allocator::allocate(
                    &mut self.shared.allocator.lock(),
                    name,
                    requirements,
                    heap_type,
                    false,
                )
                .inspect_err(|_| unsafe { device.destroy_image(image, None) })?;

                let bound = unsafe {
                    device.bind_image_memory(image, allocation.memory(), allocation.offset())
                };
                if let Err(e) = bound {
                    unsafe { device.destroy_image(image, None) };
                    self.shared.free(allocation);
                    return Err(vk_error(
                        "Failed to bind image memory",
                        e,
                        GraphicsError::ResourceCreationFailed,
                    ));
                }

                log::trace!(
                    "VulkanDevice: created image '{}' ({}x{}x{}, {:?})",
                    name,
                    desc.width,
                    desc.height,
                    desc.depth_or_array_size,
                    desc.format
                );
                Ok(self.make_resource(
                    desc,
                    heap_type,
                    name,
                    ResourceObject::Image(image),
                    ResourceMemory::Owned(Mutex::new(Some(allocation))),
                ))
            }
        }
    }

    fn create_placed_resource(
        &self,
        heap: &GpuMemoryHeap,
        heap_offset: u64,
        desc: &ResourceDesc,
        _initial_state: ResourceState,
        name: &str,
    ) -> Result<GpuResourceHandle, GraphicsError> {
        let GpuMemoryHeap::Vulkan(heap) = heap else {
            return Err(GraphicsError::InvalidParameter(
                "heap belongs to another backend".into(),
            ));
        };
        if !desc.is_buffer() {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot place texture '{name}': only buffers can be placed"
            )));
        }
        let size = desc.byte_size();
        if heap_offset % PLACEMENT_ALIGNMENT != 0 || heap_offset + size > heap.desc.size_in_bytes {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot place '{name}' ({size} bytes) at offset {heap_offset} of a {} byte heap",
                heap.desc.size_in_bytes
            )));
        }

        let device = &self.shared.device;
        let buffer = self.create_buffer(desc, name)?;
        let bound = {
            let allocation = heap.allocation.lock();
            match allocation.as_ref() {
                Some(allocation) => unsafe {
                    device
                        .bind_buffer_memory(
                            buffer,
                            allocation.memory(),
                            allocation.offset() + heap_offset,
                        )
                        .map_err(|e| {
                            vk_error(
                                "Failed to bind placed buffer",
                                e,
                                GraphicsError::ResourceCreationFailed,
                            )
                        })
                },
                None => Err(GraphicsError::Internal("memory heap has no allocation".into())),
            }
        };
        if let Err(e) = bound {
            unsafe { device.destroy_buffer(buffer, None) };
            return Err(e);
        }

        log::trace!("VulkanDevice: placing '{}' at heap offset {}", name, heap_offset);
        Ok(self.make_resource(
            desc,
            heap.desc.heap_type,
            name,
            ResourceObject::Buffer(buffer),
            ResourceMemory::Placed {
                heap: heap.clone(),
                offset: heap_offset,
            },
        ))
    }

    fn write_resource(
        &self,
        resource: &GpuResourceHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let resource = vulkan_resource(resource)?;
        resource.check_range(offset, data.len() as u64)?;
        resource.with_mapped(|bytes| {
            bytes[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        })
    }

    fn read_resource(
        &self,
        resource: &GpuResourceHandle,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, GraphicsError> {
        let resource = vulkan_resource(resource)?;
        resource.check_range(offset, size)?;
        resource.with_mapped(|bytes| bytes[offset as usize..(offset + size) as usize].to_vec())
    }

    fn execute_command_list(
        &self,
        list_type: CommandListType,
        allocator: &GpuCommandAllocator,
        commands: &[GpuCommand],
        fence: &GpuFence,
        signal_value: u64,
    ) -> Result<(), GraphicsError> {
        let allocator = vulkan_allocator(allocator)?;
        let fence = vulkan_fence(fence)?;
        if allocator.list_type != list_type {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} allocator submitted to the {:?} queue",
                allocator.list_type, list_type
            )));
        }
        let device = &self.shared.device;
        let mut state = allocator.state.lock();

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(allocator.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let cmd = unsafe { device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| {
                vk_error("Failed to allocate command buffer", e, GraphicsError::SubmissionFailed)
            })?
            .first()
            .copied()
            .ok_or_else(|| {
                GraphicsError::SubmissionFailed("driver returned no command buffer".into())
            })?;
        state.buffers.push(cmd);

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(cmd, &begin_info) }
            .map_err(|e| {
                vk_error("Failed to begin command buffer", e, GraphicsError::SubmissionFailed)
            })?;

        for command in commands {
            self.record(cmd, command, &mut state.retained)?;
        }

        unsafe { device.end_command_buffer(cmd) }
            .map_err(|e| {
                vk_error("Failed to end command buffer", e, GraphicsError::SubmissionFailed)
            })?;

        let command_buffers = [cmd];
        let signal_semaphores = [fence.semaphore];
        let signal_values = [signal_value];
        let mut timeline_info =
            vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(&signal_values);
        let submit_info = vk::SubmitInfo::default()
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        let queue = self.queues[list_type.index()].lock();
        unsafe { device.queue_submit(*queue, &[submit_info], vk::Fence::null()) }
            .map_err(|e| {
                vk_error("Failed to submit command buffer", e, GraphicsError::SubmissionFailed)
            })
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        unsafe { self.shared.device.device_wait_idle() }
            .map_err(|e| vk_error("Failed to wait for device idle", e, GraphicsError::Internal))
    }
}

static_assertions::assert_impl_all!(VulkanDevice: Send, Sync);
static_assertions::assert_impl_all!(VulkanResource: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_view_ranges() {
        assert_eq!(buffer_view_range(0, 40, 0, Format::R32Typeless, true), (0, 160));
        assert_eq!(buffer_view_range(2, 10, 16, Format::Unknown, false), (32, 160));
        assert_eq!(buffer_view_range(0, 8, 0, Format::Rgba8Unorm, false), (0, 32));
    }

    #[test]
    fn device_lost_is_reported_as_such() {
        let err =
            vk_error("submit", vk::Result::ERROR_DEVICE_LOST, GraphicsError::SubmissionFailed);
        assert_eq!(err, GraphicsError::DeviceLost);
        let err = vk_error("submit", vk::Result::ERROR_UNKNOWN, GraphicsError::SubmissionFailed);
        assert!(matches!(err, GraphicsError::SubmissionFailed(msg) if msg.starts_with("submit")));
    }

    /// Needs a Vulkan driver; run with `--ignored` on a machine that has one.
    #[test]
    #[ignore]
    fn uploads_round_trip_through_a_real_device() {
        let device = VulkanDevice::new(&GraphicsConfig::default()).unwrap();
        let desc = ResourceDesc::buffer(256, Default::default());
        let buffer = device
            .create_committed_resource(
                &desc,
                HeapType::Upload,
                ResourceState::GENERIC_READ,
                "upload",
            )
            .unwrap();
        device.write_resource(&buffer, 16, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.read_resource(&buffer, 16, 4).unwrap(), vec![1, 2, 3, 4]);
        assert_ne!(buffer.gpu_virtual_address(), GPU_VIRTUAL_ADDRESS_UNKNOWN);

        let fence = device.create_fence(5).unwrap();
        assert_eq!(device.fence_completed_value(&fence), 5);
        device.wait_idle().unwrap();
    }
}
