use std::sync::Arc;

use crate::backend::{GpuDescriptorHeap, GpuDevice};
use crate::error::GraphicsError;
use crate::types::{DescriptorHeapDesc, DescriptorHeapType};

use super::DescriptorHandle;

/// A linearly allocated descriptor heap, shader visible when its type allows.
///
/// Allocation only bumps a cursor; the heap is released as a whole when it
/// is dropped. Handles returned by [`alloc`](Self::alloc) therefore stay
/// valid for the lifetime of the heap.
pub struct DescriptorHeap {
    device: Arc<dyn GpuDevice>,
    heap: GpuDescriptorHeap,
    desc: DescriptorHeapDesc,
    descriptor_size: u32,
    num_free: u32,
    first: DescriptorHandle,
    next_free: DescriptorHandle,
    name: String,
}

impl DescriptorHeap {
    pub fn create(
        device: Arc<dyn GpuDevice>,
        name: &str,
        heap_type: DescriptorHeapType,
        max_count: u32,
    ) -> Result<Self, GraphicsError> {
        let desc = DescriptorHeapDesc {
            heap_type,
            num_descriptors: max_count,
            shader_visible: heap_type.can_be_shader_visible(),
        };
        let heap = device.create_descriptor_heap(&desc, name)?;
        let descriptor_size = device.descriptor_increment_size(heap_type);
        let first = DescriptorHandle::new(heap.cpu_start(), heap.gpu_start());

        log::debug!("created descriptor heap '{name}' ({heap_type:?} x{max_count})");

        Ok(Self {
            device,
            heap,
            desc,
            descriptor_size,
            num_free: max_count,
            first,
            next_free: first,
            name: name.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn heap_type(&self) -> DescriptorHeapType {
        self.desc.heap_type
    }

    pub fn capacity(&self) -> u32 {
        self.desc.num_descriptors
    }

    pub fn num_free(&self) -> u32 {
        self.num_free
    }

    pub fn descriptor_size(&self) -> u32 {
        self.descriptor_size
    }

    /// The device heap, for binding.
    pub fn heap(&self) -> &GpuDescriptorHeap {
        &self.heap
    }

    pub fn has_available_space(&self, count: u32) -> bool {
        count <= self.num_free
    }

    /// Take `count` contiguous slots.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `count` slots remain.
    pub fn alloc(&mut self, count: u32) -> DescriptorHandle {
        assert!(
            self.has_available_space(count),
            "Descriptor heap out of space. Increase heap size. ('{}': {} requested, {} free)",
            self.name,
            count,
            self.num_free
        );
        let handle = self.next_free;
        self.next_free += count as u64 * self.descriptor_size as u64;
        self.num_free -= count;
        handle
    }

    /// Allocate `sources.len()` contiguous slots and copy the CPU-only
    /// descriptors into them, returning the first slot.
    pub fn stage(
        &mut self,
        sources: &[DescriptorHandle],
    ) -> Result<DescriptorHandle, GraphicsError> {
        let first = self.alloc(sources.len() as u32);
        for (index, source) in sources.iter().enumerate() {
            let dest = first + index as u64 * self.descriptor_size as u64;
            self.device
                .copy_descriptors_simple(1, dest.cpu(), source.cpu(), self.desc.heap_type)?;
        }
        Ok(first)
    }

    /// Handle of the slot at `index`.
    pub fn handle_at(&self, index: u32) -> DescriptorHandle {
        self.first + index as u64 * self.descriptor_size as u64
    }

    /// Slot index of a handle allocated from this heap.
    pub fn offset_of_handle(&self, handle: &DescriptorHandle) -> u32 {
        ((handle.cpu_ptr() - self.first.cpu_ptr()) / self.descriptor_size as u64) as u32
    }

    /// Whether `handle` points into this heap with consistent CPU and GPU addresses.
    pub fn validate_handle(&self, handle: &DescriptorHandle) -> bool {
        let start = self.first.cpu_ptr();
        let end = start + self.desc.num_descriptors as u64 * self.descriptor_size as u64;
        if handle.cpu_ptr() < start || handle.cpu_ptr() >= end {
            return false;
        }
        if !self.first.is_shader_visible() {
            return !handle.is_shader_visible();
        }
        handle.gpu_ptr().wrapping_sub(self.first.gpu_ptr()) == handle.cpu_ptr() - start
    }
}

impl std::fmt::Debug for DescriptorHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorHeap")
            .field("name", &self.name)
            .field("desc", &self.desc)
            .field("num_free", &self.num_free)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DescriptorRecord, DummyDevice};
    use crate::types::ConstantBufferViewDesc;

    fn heap(count: u32) -> (Arc<DummyDevice>, DescriptorHeap) {
        let device = Arc::new(DummyDevice::new());
        let heap =
            DescriptorHeap::create(device.clone(), "test", DescriptorHeapType::CbvSrvUav, count)
                .unwrap();
        (device, heap)
    }

    #[test]
    fn alloc_bumps_both_addresses() {
        let (_device, mut heap) = heap(8);
        let a = heap.alloc(3);
        let b = heap.alloc(1);

        assert_eq!(b.cpu_ptr() - a.cpu_ptr(), 3 * heap.descriptor_size() as u64);
        assert_eq!(b.gpu_ptr() - a.gpu_ptr(), 3 * heap.descriptor_size() as u64);
        assert_eq!(heap.num_free(), 4);
        assert_eq!(heap.offset_of_handle(&b), 3);
        assert_eq!(heap.handle_at(3), b);
    }

    #[test]
    fn handles_are_validated_against_the_heap() {
        let (_device, mut heap) = heap(4);
        let handle = heap.alloc(4);
        assert!(heap.validate_handle(&handle));
        assert!(heap.validate_handle(&heap.handle_at(3)));
        assert!(!heap.validate_handle(&heap.handle_at(4)));

        let skewed = DescriptorHandle::new(handle.cpu(), Some(handle.gpu().offset(32)));
        assert!(!heap.validate_handle(&skewed));
        assert!(!heap.validate_handle(&DescriptorHandle::NULL));
    }

    #[test]
    fn exact_fit_is_allowed() {
        let (_device, mut heap) = heap(4);
        assert!(heap.has_available_space(4));
        heap.alloc(4);
        assert!(!heap.has_available_space(1));
        assert!(heap.has_available_space(0));
    }

    #[test]
    #[should_panic(expected = "Descriptor heap out of space")]
    fn overflow_panics() {
        let (_device, mut heap) = heap(4);
        heap.alloc(3);
        heap.alloc(2);
    }

    #[test]
    fn stage_copies_descriptors() {
        let (device, mut visible) = heap(4);
        let mut staging =
            DescriptorHeap::create(device.clone(), "staging", DescriptorHeapType::CbvSrvUav, 2)
                .unwrap();
        let source = staging.alloc(1);
        let cbv = ConstantBufferViewDesc {
            buffer_location: 0x100,
            size_in_bytes: 256,
        };
        device.create_constant_buffer_view(&cbv, source.cpu()).unwrap();

        let table = visible.stage(&[source]).unwrap();
        assert!(visible.validate_handle(&table));
        assert_eq!(device.descriptor(table.cpu()), Some(DescriptorRecord::ConstantBuffer(cbv)));
    }

    #[test]
    fn render_target_heaps_are_cpu_only() {
        let device = Arc::new(DummyDevice::new());
        let mut heap = DescriptorHeap::create(device, "rtv", DescriptorHeapType::Rtv, 2).unwrap();
        let handle = heap.alloc(1);
        assert!(!handle.is_shader_visible());
        assert!(heap.validate_handle(&handle));
    }
}
