//! Dummy GPU device for testing and development.
//!
//! The dummy device performs no GPU work but keeps enough state for the
//! layers above it to behave exactly as they would on hardware:
//!
//! - descriptor heaps occupy disjoint synthetic CPU/GPU address ranges and
//!   every view written into them is recorded and can be inspected,
//! - resources are backed by CPU memory, so uploads, copies and readbacks
//!   round-trip real bytes,
//! - fences are signaled when a command list is submitted, or only when the
//!   test calls [`DummyDevice::retire`] if manual fences were requested.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::types::{
    CommandListType, ConstantBufferViewDesc, CpuDescriptorHandle, DescriptorHeapDesc,
    DescriptorHeapType, GPU_VIRTUAL_ADDRESS_UNKNOWN, GpuDescriptorHandle, HeapDesc, HeapType,
    ResourceDesc, ResourceState, ShaderResourceViewDesc, UnorderedAccessViewDesc,
};

use super::{
    DescriptorRange, GpuCommand, GpuCommandAllocator, GpuDescriptorHeap, GpuDevice, GpuFence,
    GpuMemoryHeap, GpuResourceHandle,
};

const CPU_DESCRIPTOR_BASE: u64 = 0x0000_0010_0000_0000;
const GPU_DESCRIPTOR_BASE: u64 = 0x0000_0400_0000_0000;
const RESOURCE_ADDRESS_BASE: u64 = 0x0000_0001_0000_0000;
const PLACEMENT_ALIGNMENT: u64 = 64 * 1024;

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Descriptor heap of the dummy device.
#[derive(Debug)]
pub struct DummyDescriptorHeap {
    pub(crate) range: DescriptorRange,
    pub name: String,
}

/// Command allocator of the dummy device.
#[derive(Debug)]
pub struct DummyCommandAllocator {
    pub(crate) list_type: CommandListType,
    pub id: u64,
    resets: AtomicU64,
}

impl DummyCommandAllocator {
    /// How many times this allocator was reset.
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::Acquire)
    }
}

/// Fence of the dummy device.
#[derive(Debug)]
pub struct DummyFence {
    completed: AtomicU64,
    submitted: AtomicU64,
}

/// Memory heap of the dummy device.
#[derive(Debug)]
pub struct DummyMemoryHeap {
    pub(crate) desc: HeapDesc,
    base_address: u64,
    memory: Mutex<Vec<u8>>,
}

#[derive(Debug)]
enum Storage {
    Committed(Mutex<Vec<u8>>),
    Placed { heap: Arc<DummyMemoryHeap>, offset: u64 },
}

/// Resource of the dummy device, backed by CPU memory.
#[derive(Debug)]
pub struct DummyResource {
    pub(crate) id: u64,
    pub(crate) desc: ResourceDesc,
    pub(crate) heap_type: HeapType,
    pub(crate) gpu_address: u64,
    pub name: String,
    pub initial_state: ResourceState,
    storage: Storage,
    budget: Arc<AtomicU64>,
}

impl DummyResource {
    pub fn id(&self) -> u64 {
        self.id
    }

    fn with_bytes<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let len = self.desc.byte_size() as usize;
        match &self.storage {
            Storage::Committed(memory) => f(&mut memory.lock()[..]),
            Storage::Placed { heap, offset } => {
                let start = *offset as usize;
                f(&mut heap.memory.lock()[start..start + len])
            }
        }
    }

    fn read_range(&self, offset: u64, size: u64) -> Result<Vec<u8>, GraphicsError> {
        check_range(self, offset, size)?;
        Ok(self.with_bytes(|bytes| bytes[offset as usize..(offset + size) as usize].to_vec()))
    }

    fn write_range(&self, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        check_range(self, offset, data.len() as u64)?;
        self.with_bytes(|bytes| {
            bytes[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        });
        Ok(())
    }
}

impl Drop for DummyResource {
    fn drop(&mut self) {
        if let Storage::Committed(_) = self.storage {
            self.budget.fetch_sub(self.desc.byte_size(), Ordering::AcqRel);
        }
    }
}

fn check_range(resource: &DummyResource, offset: u64, size: u64) -> Result<(), GraphicsError> {
    let len = resource.desc.byte_size();
    if offset.checked_add(size).is_none_or(|end| end > len) {
        return Err(GraphicsError::InvalidParameter(format!(
            "range {offset}+{size} exceeds resource '{}' of {len} bytes",
            resource.name
        )));
    }
    Ok(())
}

/// A view written into a dummy descriptor slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorRecord {
    ShaderResource {
        resource: Option<u64>,
        desc: ShaderResourceViewDesc,
    },
    UnorderedAccess {
        resource: u64,
        counter: Option<u64>,
        desc: UnorderedAccessViewDesc,
    },
    ConstantBuffer(ConstantBufferViewDesc),
}

/// Counters describing what the dummy device has been asked to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub descriptor_heaps: u64,
    pub command_allocators: u64,
    pub allocator_resets: u64,
    pub resources: u64,
    pub submissions: u64,
    pub barriers: u64,
}

#[derive(Default)]
struct Counters {
    descriptor_heaps: AtomicU64,
    command_allocators: AtomicU64,
    allocator_resets: AtomicU64,
    resources: AtomicU64,
    submissions: AtomicU64,
    barriers: AtomicU64,
}

/// Headless software device.
pub struct DummyDevice {
    auto_signal: AtomicBool,
    fail_next_reset: AtomicBool,
    memory_budget: Option<u64>,
    allocated: Arc<AtomicU64>,
    next_cpu_descriptor: AtomicU64,
    next_gpu_descriptor: AtomicU64,
    next_address: AtomicU64,
    next_id: AtomicU64,
    heaps: Mutex<Vec<Weak<DummyDescriptorHeap>>>,
    descriptors: Mutex<HashMap<u64, DescriptorRecord>>,
    counters: Counters,
}

impl DummyDevice {
    /// Create a dummy device whose fences signal on submission.
    pub fn new() -> Self {
        Self {
            auto_signal: AtomicBool::new(true),
            fail_next_reset: AtomicBool::new(false),
            memory_budget: None,
            allocated: Arc::new(AtomicU64::new(0)),
            next_cpu_descriptor: AtomicU64::new(CPU_DESCRIPTOR_BASE),
            next_gpu_descriptor: AtomicU64::new(GPU_DESCRIPTOR_BASE),
            next_address: AtomicU64::new(RESOURCE_ADDRESS_BASE),
            next_id: AtomicU64::new(1),
            heaps: Mutex::new(Vec::new()),
            descriptors: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Leave fences unsignaled after submission until [`retire`](Self::retire) is called.
    pub fn with_manual_fences(self) -> Self {
        self.auto_signal.store(false, Ordering::Release);
        self
    }

    /// Fail committed resource creation with `OutOfMemory` beyond `bytes`.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Make the next command allocator reset report `DeviceLost`.
    pub fn fail_next_allocator_reset(&self) {
        self.fail_next_reset.store(true, Ordering::Release);
    }

    /// Pretend the GPU has progressed `fence` to `value`.
    pub fn retire(&self, fence: &GpuFence, value: u64) {
        if let GpuFence::Dummy(fence) = fence {
            fence.completed.fetch_max(value, Ordering::AcqRel);
        }
    }

    /// The view last written at `handle`, if any.
    pub fn descriptor(&self, handle: CpuDescriptorHandle) -> Option<DescriptorRecord> {
        self.descriptors.lock().get(&handle.0).cloned()
    }

    /// Bytes currently held by committed resources.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> DummyStats {
        let c = &self.counters;
        DummyStats {
            descriptor_heaps: c.descriptor_heaps.load(Ordering::Acquire),
            command_allocators: c.command_allocators.load(Ordering::Acquire),
            allocator_resets: c.allocator_resets.load(Ordering::Acquire),
            resources: c.resources.load(Ordering::Acquire),
            submissions: c.submissions.load(Ordering::Acquire),
            barriers: c.barriers.load(Ordering::Acquire),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::AcqRel)
    }

    fn reserve_address(&self, size: u64) -> u64 {
        let span = align_up(size.max(1), PLACEMENT_ALIGNMENT);
        self.next_address.fetch_add(span, Ordering::AcqRel)
    }

    /// Find the live heap that owns `handle`.
    fn check_slot(&self, handle: CpuDescriptorHandle) -> Result<DescriptorRange, GraphicsError> {
        let mut heaps = self.heaps.lock();
        heaps.retain(|heap| heap.strong_count() > 0);
        heaps
            .iter()
            .filter_map(Weak::upgrade)
            .map(|heap| heap.range)
            .find(|range| range.contains(handle))
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "descriptor handle {:#x} is not inside a live heap",
                    handle.0
                ))
            })
    }

    fn record(
        &self,
        dest: CpuDescriptorHandle,
        record: DescriptorRecord,
    ) -> Result<(), GraphicsError> {
        self.check_slot(dest)?;
        self.descriptors.lock().insert(dest.0, record);
        Ok(())
    }

    fn make_resource(
        &self,
        desc: &ResourceDesc,
        heap_type: HeapType,
        initial_state: ResourceState,
        name: &str,
        storage: Storage,
        gpu_address: u64,
    ) -> GpuResourceHandle {
        self.counters.resources.fetch_add(1, Ordering::AcqRel);
        let gpu_address = if desc.is_buffer() {
            gpu_address
        } else {
            GPU_VIRTUAL_ADDRESS_UNKNOWN
        };
        GpuResourceHandle::Dummy(Arc::new(DummyResource {
            id: self.next_id(),
            desc: *desc,
            heap_type,
            gpu_address,
            name: name.to_owned(),
            initial_state,
            storage,
            budget: self.allocated.clone(),
        }))
    }

    fn execute(&self, command: &GpuCommand) -> Result<(), GraphicsError> {
        match command {
            GpuCommand::Transition(_) | GpuCommand::UavBarrier(_) => {
                self.counters.barriers.fetch_add(1, Ordering::AcqRel);
            }
            GpuCommand::CopyBufferRegion {
                dest,
                dest_offset,
                src,
                src_offset,
                num_bytes,
            } => {
                let bytes = dummy_resource(src)?.read_range(*src_offset, *num_bytes)?;
                dummy_resource(dest)?.write_range(*dest_offset, &bytes)?;
            }
            GpuCommand::CopyBufferToTexture { dest, src, regions } => {
                let src = dummy_resource(src)?;
                let dest = dummy_resource(dest)?;
                let bpp = dest.desc.format.bytes_per_pixel() as u64;
                let width = dest.desc.width;
                let slice_size = width * dest.desc.height as u64 * bpp;
                for region in regions {
                    let row_bytes = region.width as u64 * bpp;
                    for row in 0..region.height as u64 {
                        let bytes = src.read_range(
                            region.buffer_offset + row * region.row_pitch as u64,
                            row_bytes,
                        )?;
                        let offset = region.array_slice as u64 * slice_size + row * width * bpp;
                        dest.write_range(offset, &bytes)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn dummy_resource(handle: &GpuResourceHandle) -> Result<&DummyResource, GraphicsError> {
    match handle {
        GpuResourceHandle::Dummy(resource) => Ok(resource),
        #[cfg(feature = "vulkan-backend")]
        _ => Err(GraphicsError::InvalidParameter(
            "resource belongs to another backend".into(),
        )),
    }
}

fn dummy_fence(fence: &GpuFence) -> Result<&DummyFence, GraphicsError> {
    match fence {
        GpuFence::Dummy(fence) => Ok(fence),
        #[cfg(feature = "vulkan-backend")]
        _ => Err(GraphicsError::InvalidParameter(
            "fence belongs to another backend".into(),
        )),
    }
}

impl GpuDevice for DummyDevice {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn descriptor_increment_size(&self, heap_type: DescriptorHeapType) -> u32 {
        match heap_type {
            DescriptorHeapType::CbvSrvUav | DescriptorHeapType::Sampler => 32,
            DescriptorHeapType::Rtv => 32,
            DescriptorHeapType::Dsv => 8,
        }
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

        let increment = self.descriptor_increment_size(desc.heap_type);
        let span = align_up(desc.num_descriptors as u64 * increment as u64, PLACEMENT_ALIGNMENT);
        let cpu_start =
            CpuDescriptorHandle(self.next_cpu_descriptor.fetch_add(span, Ordering::AcqRel));
        let gpu_start = desc.shader_visible.then(|| {
            GpuDescriptorHandle(self.next_gpu_descriptor.fetch_add(span, Ordering::AcqRel))
        });

        log::trace!(
            "DummyDevice: creating descriptor heap '{}' ({:?} x{}) at {:#x}",
            name,
            desc.heap_type,
            desc.num_descriptors,
            cpu_start.0
        );
        self.counters.descriptor_heaps.fetch_add(1, Ordering::AcqRel);

        let heap = Arc::new(DummyDescriptorHeap {
            range: DescriptorRange {
                desc: *desc,
                cpu_start,
                gpu_start,
                increment,
            },
            name: name.to_owned(),
        });
        self.heaps.lock().push(Arc::downgrade(&heap));
        Ok(GpuDescriptorHeap::Dummy(heap))
    }

    fn create_shader_resource_view(
        &self,
        resource: Option<&GpuResourceHandle>,
        desc: &ShaderResourceViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), GraphicsError> {
        let resource = resource.map(dummy_resource).transpose()?.map(DummyResource::id);
        self.record(dest, DescriptorRecord::ShaderResource { resource, desc: *desc })
    }

    fn create_unordered_access_view(
        &self,
        resource: &GpuResourceHandle,
        counter: Option<&GpuResourceHandle>,
        desc: &UnorderedAccessViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), GraphicsError> {
        let resource = dummy_resource(resource)?.id;
        let counter = counter.map(dummy_resource).transpose()?.map(DummyResource::id);
        self.record(
            dest,
            DescriptorRecord::UnorderedAccess {
                resource,
                counter,
                desc: *desc,
            },
        )
    }

    fn create_constant_buffer_view(
        &self,
        desc: &ConstantBufferViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), GraphicsError> {
        self.record(dest, DescriptorRecord::ConstantBuffer(*desc))
    }

    fn copy_descriptors_simple(
        &self,
        count: u32,
        dest: CpuDescriptorHandle,
        src: CpuDescriptorHandle,
        heap_type: DescriptorHeapType,
    ) -> Result<(), GraphicsError> {
        let increment = self.descriptor_increment_size(heap_type) as u64;
        for i in 0..count as u64 {
            let from = src.offset(i * increment);
            let to = dest.offset(i * increment);
            self.check_slot(from)?;
            self.check_slot(to)?;
            let mut descriptors = self.descriptors.lock();
            match descriptors.get(&from.0).cloned() {
                Some(record) => descriptors.insert(to.0, record),
                None => descriptors.remove(&to.0),
            };
        }
        Ok(())
    }

    fn create_command_allocator(
        &self,
        list_type: CommandListType,
    ) -> Result<GpuCommandAllocator, GraphicsError> {
        let id = self.next_id();
        log::trace!("DummyDevice: creating {:?} command allocator #{}", list_type, id);
        self.counters.command_allocators.fetch_add(1, Ordering::AcqRel);
        Ok(GpuCommandAllocator::Dummy(Arc::new(DummyCommandAllocator {
            list_type,
            id,
            resets: AtomicU64::new(0),
        })))
    }

    fn reset_command_allocator(
        &self,
        allocator: &GpuCommandAllocator,
    ) -> Result<(), GraphicsError> {
        match allocator {
            GpuCommandAllocator::Dummy(allocator) => {
                if self.fail_next_reset.swap(false, Ordering::AcqRel) {
                    return Err(GraphicsError::DeviceLost);
                }
                allocator.resets.fetch_add(1, Ordering::AcqRel);
                self.counters.allocator_resets.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
            #[cfg(feature = "vulkan-backend")]
            _ => Err(GraphicsError::InvalidParameter(
                "allocator belongs to another backend".into(),
            )),
        }
    }

    fn create_fence(&self, initial_value: u64) -> Result<GpuFence, GraphicsError> {
        Ok(GpuFence::Dummy(Arc::new(DummyFence {
            completed: AtomicU64::new(initial_value),
            submitted: AtomicU64::new(initial_value),
        })))
    }

    fn fence_completed_value(&self, fence: &GpuFence) -> u64 {
        dummy_fence(fence).map_or(0, |fence| fence.completed.load(Ordering::Acquire))
    }

    fn wait_for_fence(&self, fence: &GpuFence, value: u64) -> Result<(), GraphicsError> {
        let fence = dummy_fence(fence)?;
        if fence.completed.load(Ordering::Acquire) >= value {
            return Ok(());
        }
        // Submitted work finishes as soon as someone waits for it.
        if fence.submitted.load(Ordering::Acquire) >= value {
            fence.completed.fetch_max(value, Ordering::AcqRel);
            return Ok(());
        }
        Err(GraphicsError::InvalidParameter(format!(
            "waiting for fence value {value} which was never submitted"
        )))
    }

    fn create_memory_heap(&self, desc: &HeapDesc) -> Result<GpuMemoryHeap, GraphicsError> {
        if desc.size_in_bytes == 0 {
            return Err(GraphicsError::InvalidParameter("memory heap size is zero".into()));
        }
        Ok(GpuMemoryHeap::Dummy(Arc::new(DummyMemoryHeap {
            desc: *desc,
            base_address: self.reserve_address(desc.size_in_bytes),
            memory: Mutex::new(vec![0; desc.size_in_bytes as usize]),
        })))
    }

    fn create_committed_resource(
        &self,
        desc: &ResourceDesc,
        heap_type: HeapType,
        initial_state: ResourceState,
        name: &str,
    ) -> Result<GpuResourceHandle, GraphicsError> {
        let size = desc.byte_size();
        if size == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "resource '{name}' has no storage"
            )));
        }
        let previous = self.allocated.fetch_add(size, Ordering::AcqRel);
        if let Some(budget) = self.memory_budget
            && previous + size > budget
        {
            self.allocated.fetch_sub(size, Ordering::AcqRel);
            return Err(GraphicsError::OutOfMemory);
        }

        log::trace!(
            "DummyDevice: creating committed resource '{}' ({} bytes, {:?})",
            name,
            size,
            heap_type
        );
        let storage = Storage::Committed(Mutex::new(vec![0; size as usize]));
        let address = self.reserve_address(size);
        Ok(self.make_resource(desc, heap_type, initial_state, name, storage, address))
    }

    fn create_placed_resource(
        &self,
        heap: &GpuMemoryHeap,
        heap_offset: u64,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> Result<GpuResourceHandle, GraphicsError> {
        let heap = match heap {
            GpuMemoryHeap::Dummy(heap) => heap.clone(),
            #[cfg(feature = "vulkan-backend")]
            _ => {
                return Err(GraphicsError::InvalidParameter(
                    "heap belongs to another backend".into(),
                ));
            }
        };
        let size = desc.byte_size();
        if heap_offset % PLACEMENT_ALIGNMENT != 0 || heap_offset + size > heap.desc.size_in_bytes {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot place '{name}' ({size} bytes) at offset {heap_offset} of a {} byte heap",
                heap.desc.size_in_bytes
            )));
        }

        log::trace!("DummyDevice: placing '{}' at heap offset {}", name, heap_offset);
        let address = heap.base_address + heap_offset;
        let heap_type = heap.desc.heap_type;
        let storage = Storage::Placed {
            heap,
            offset: heap_offset,
        };
        Ok(self.make_resource(desc, heap_type, initial_state, name, storage, address))
    }

    fn write_resource(
        &self,
        resource: &GpuResourceHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let resource = dummy_resource(resource)?;
        if !resource.heap_type.is_cpu_visible() {
            return Err(GraphicsError::MapFailed(format!(
                "'{}' is not CPU visible",
                resource.name
            )));
        }
        resource.write_range(offset, data)
    }

    fn read_resource(
        &self,
        resource: &GpuResourceHandle,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, GraphicsError> {
        let resource = dummy_resource(resource)?;
        if !resource.heap_type.is_cpu_visible() {
            return Err(GraphicsError::MapFailed(format!(
                "'{}' is not CPU visible",
                resource.name
            )));
        }
        resource.read_range(offset, size)
    }

    fn execute_command_list(
        &self,
        list_type: CommandListType,
        allocator: &GpuCommandAllocator,
        commands: &[GpuCommand],
        fence: &GpuFence,
        signal_value: u64,
    ) -> Result<(), GraphicsError> {
        if allocator.list_type() != list_type {
            return Err(GraphicsError::SubmissionFailed(format!(
                "{:?} allocator submitted to a {:?} queue",
                allocator.list_type(),
                list_type
            )));
        }

        log::trace!(
            "DummyDevice: executing {} commands on {:?}, signaling {:#x}",
            commands.len(),
            list_type,
            signal_value
        );
        for command in commands {
            self.execute(command)?;
        }

        self.counters.submissions.fetch_add(1, Ordering::AcqRel);
        let fence = dummy_fence(fence)?;
        fence.submitted.fetch_max(signal_value, Ordering::AcqRel);
        if self.auto_signal.load(Ordering::Acquire) {
            fence.completed.fetch_max(signal_value, Ordering::AcqRel);
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceFlags;

    fn upload_buffer(device: &DummyDevice, size: u64) -> GpuResourceHandle {
        device
            .create_committed_resource(
                &ResourceDesc::buffer(size, ResourceFlags::empty()),
                HeapType::Upload,
                ResourceState::GENERIC_READ,
                "upload",
            )
            .unwrap()
    }

    #[test]
    fn descriptor_heaps_do_not_overlap() {
        let device = DummyDevice::new();
        let desc = DescriptorHeapDesc {
            heap_type: DescriptorHeapType::CbvSrvUav,
            num_descriptors: 4096,
            shader_visible: true,
        };
        let a = device.create_descriptor_heap(&desc, "a").unwrap();
        let b = device.create_descriptor_heap(&desc, "b").unwrap();

        let a_end = a.cpu_start().0 + 4096 * 32;
        assert!(b.cpu_start().0 >= a_end);
        assert!(a.gpu_start().is_some());
        assert_eq!(device.stats().descriptor_heaps, 2);
    }

    #[test]
    fn render_target_heaps_cannot_be_shader_visible() {
        let device = DummyDevice::new();
        let desc = DescriptorHeapDesc {
            heap_type: DescriptorHeapType::Rtv,
            num_descriptors: 16,
            shader_visible: true,
        };
        assert!(device.create_descriptor_heap(&desc, "rtv").is_err());
    }

    #[test]
    fn views_outside_heaps_are_rejected() {
        let device = DummyDevice::new();
        let cbv = ConstantBufferViewDesc {
            buffer_location: 0,
            size_in_bytes: 16,
        };
        assert!(device.create_constant_buffer_view(&cbv, CpuDescriptorHandle(42)).is_err());
    }

    #[test]
    fn copies_move_bytes_between_buffers() {
        let device = DummyDevice::new();
        let src = upload_buffer(&device, 8);
        let dest = device
            .create_committed_resource(
                &ResourceDesc::buffer(8, ResourceFlags::empty()),
                HeapType::Readback,
                ResourceState::COPY_DEST,
                "readback",
            )
            .unwrap();
        device.write_resource(&src, 0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        let allocator = device.create_command_allocator(CommandListType::Copy).unwrap();
        let fence = device.create_fence(0).unwrap();
        let copy = GpuCommand::CopyBufferRegion {
            dest: dest.clone(),
            dest_offset: 4,
            src: src.clone(),
            src_offset: 0,
            num_bytes: 4,
        };
        device
            .execute_command_list(CommandListType::Copy, &allocator, &[copy], &fence, 1)
            .unwrap();

        assert_eq!(device.read_resource(&dest, 0, 8).unwrap(), [0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(device.fence_completed_value(&fence), 1);
    }

    #[test]
    fn manual_fences_wait_for_retire() {
        let device = DummyDevice::new().with_manual_fences();
        let allocator = device.create_command_allocator(CommandListType::Direct).unwrap();
        let fence = device.create_fence(0).unwrap();
        device
            .execute_command_list(CommandListType::Direct, &allocator, &[], &fence, 5)
            .unwrap();
        assert_eq!(device.fence_completed_value(&fence), 0);

        device.retire(&fence, 3);
        assert_eq!(device.fence_completed_value(&fence), 3);

        device.wait_for_fence(&fence, 5).unwrap();
        assert_eq!(device.fence_completed_value(&fence), 5);
        assert!(device.wait_for_fence(&fence, 6).is_err());
    }

    #[test]
    fn default_heap_resources_cannot_be_mapped() {
        let device = DummyDevice::new();
        let buffer = device
            .create_committed_resource(
                &ResourceDesc::buffer(16, ResourceFlags::empty()),
                HeapType::Default,
                ResourceState::COMMON,
                "gpu-only",
            )
            .unwrap();
        assert!(matches!(
            device.write_resource(&buffer, 0, &[0; 4]),
            Err(GraphicsError::MapFailed(_))
        ));
    }

    #[test]
    fn memory_budget_is_enforced_and_released() {
        let device = DummyDevice::new().with_memory_budget(1024);
        let first = upload_buffer(&device, 1000);
        assert!(matches!(
            device.create_committed_resource(
                &ResourceDesc::buffer(100, ResourceFlags::empty()),
                HeapType::Upload,
                ResourceState::GENERIC_READ,
                "over",
            ),
            Err(GraphicsError::OutOfMemory)
        ));
        drop(first);
        assert_eq!(device.allocated_bytes(), 0);
        let _second = upload_buffer(&device, 1000);
    }

    #[test]
    fn placed_resources_share_heap_memory() {
        let device = DummyDevice::new();
        let heap = device
            .create_memory_heap(&HeapDesc {
                size_in_bytes: 2 * PLACEMENT_ALIGNMENT,
                heap_type: HeapType::Upload,
            })
            .unwrap();
        let desc = ResourceDesc::buffer(16, ResourceFlags::empty());
        let a = device
            .create_placed_resource(&heap, 0, &desc, ResourceState::GENERIC_READ, "a")
            .unwrap();
        let b = device
            .create_placed_resource(
                &heap,
                PLACEMENT_ALIGNMENT,
                &desc,
                ResourceState::GENERIC_READ,
                "b",
            )
            .unwrap();
        assert_eq!(b.gpu_virtual_address() - a.gpu_virtual_address(), PLACEMENT_ALIGNMENT);

        device.write_resource(&b, 0, &[9; 16]).unwrap();
        assert_eq!(device.read_resource(&a, 0, 16).unwrap(), [0; 16]);
        assert!(
            device
                .create_placed_resource(&heap, 3, &desc, ResourceState::COMMON, "misaligned")
                .is_err()
        );
    }
}
