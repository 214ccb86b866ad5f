use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{GpuDescriptorHeap, GpuDevice};
use crate::error::GraphicsError;
use crate::types::{DescriptorHeapDesc, DescriptorHeapType};

use super::DescriptorHandle;

/// Growable pool of fixed-size, CPU-only descriptor heaps.
///
/// Heaps are only ever added; they live until [`destroy_all`](Self::destroy_all)
/// or until the pool is dropped. Requests are serialized by one lock.
pub struct DescriptorHeapPool {
    device: Arc<dyn GpuDevice>,
    descriptors_per_heap: u32,
    heaps: Mutex<Vec<GpuDescriptorHeap>>,
}

impl DescriptorHeapPool {
    pub fn new(device: Arc<dyn GpuDevice>, descriptors_per_heap: u32) -> Self {
        assert!(descriptors_per_heap > 0, "descriptor heaps must hold at least one descriptor");
        Self {
            device,
            descriptors_per_heap,
            heaps: Mutex::new(Vec::new()),
        }
    }

    pub fn descriptors_per_heap(&self) -> u32 {
        self.descriptors_per_heap
    }

    /// Create a new heap of `heap_type` and keep it alive in the pool.
    pub fn request_new_heap(
        &self,
        heap_type: DescriptorHeapType,
    ) -> Result<GpuDescriptorHeap, GraphicsError> {
        let mut heaps = self.heaps.lock();

        let desc = DescriptorHeapDesc {
            heap_type,
            num_descriptors: self.descriptors_per_heap,
            shader_visible: false,
        };
        let name = format!("DescriptorAllocator::{:?}#{}", heap_type, heaps.len());
        let heap = self.device.create_descriptor_heap(&desc, &name)?;
        log::debug!("descriptor pool grew to {} heaps ({name})", heaps.len() + 1);

        heaps.push(heap.clone());
        crate::profile_plot!("descriptor heaps", heaps.len());
        Ok(heap)
    }

    /// Number of heaps created so far, of every type.
    pub fn heap_count(&self) -> usize {
        self.heaps.lock().len()
    }

    /// Number of heaps of `heap_type` created so far.
    pub fn heap_count_of(&self, heap_type: DescriptorHeapType) -> usize {
        self.heaps
            .lock()
            .iter()
            .filter(|heap| heap.desc().heap_type == heap_type)
            .count()
    }

    /// Release every heap. Handles allocated from them become dangling.
    pub fn destroy_all(&self) {
        let mut heaps = self.heaps.lock();
        if !heaps.is_empty() {
            log::debug!("releasing {} descriptor heaps", heaps.len());
        }
        heaps.clear();
    }
}

/// Bump allocator for one descriptor heap type.
///
/// Slots come from the current heap until it cannot satisfy a request; then a
/// fresh heap is requested from the pool and allocation restarts at its origin.
/// The tail of the abandoned heap is never reused.
pub struct DescriptorAllocator {
    heap_type: DescriptorHeapType,
    pool: Arc<DescriptorHeapPool>,
    current_heap: Option<GpuDescriptorHeap>,
    current_handle: DescriptorHandle,
    descriptor_size: u32,
    remaining_free_handles: u32,
}

impl DescriptorAllocator {
    pub fn new(heap_type: DescriptorHeapType, pool: Arc<DescriptorHeapPool>) -> Self {
        Self {
            heap_type,
            pool,
            current_heap: None,
            current_handle: DescriptorHandle::NULL,
            descriptor_size: 0,
            remaining_free_handles: 0,
        }
    }

    pub fn heap_type(&self) -> DescriptorHeapType {
        self.heap_type
    }

    /// Take `count` contiguous slots, growing the pool when needed.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the capacity of a single heap.
    pub fn try_allocate(&mut self, count: u32) -> Result<DescriptorHandle, GraphicsError> {
        assert!(
            count <= self.pool.descriptors_per_heap(),
            "cannot allocate {count} {:?} descriptors from heaps of {}",
            self.heap_type,
            self.pool.descriptors_per_heap()
        );

        if self.current_heap.is_none() || self.remaining_free_handles < count {
            let heap = self.pool.request_new_heap(self.heap_type)?;
            self.current_handle = DescriptorHandle::new(heap.cpu_start(), None);
            self.remaining_free_handles = self.pool.descriptors_per_heap();
            if self.descriptor_size == 0 {
                self.descriptor_size = self.pool.device.descriptor_increment_size(self.heap_type);
            }
            self.current_heap = Some(heap);
        }

        let handle = self.current_handle;
        self.current_handle += count as u64 * self.descriptor_size as u64;
        self.remaining_free_handles -= count;
        Ok(handle)
    }

    /// Like [`try_allocate`](Self::try_allocate), treating a device failure as fatal.
    pub fn allocate(&mut self, count: u32) -> DescriptorHandle {
        match self.try_allocate(count) {
            Ok(handle) => handle,
            Err(e) => panic!("failed to grow the {:?} descriptor pool: {e}", self.heap_type),
        }
    }

    /// Forget the current heap so the next request starts a new one.
    fn reset(&mut self) {
        self.current_heap = None;
        self.current_handle = DescriptorHandle::NULL;
        self.remaining_free_handles = 0;
    }
}

/// One [`DescriptorAllocator`] per heap type over a shared pool.
pub struct DescriptorAllocators {
    pool: Arc<DescriptorHeapPool>,
    allocators: [Mutex<DescriptorAllocator>; 4],
}

impl DescriptorAllocators {
    pub fn new(device: Arc<dyn GpuDevice>, descriptors_per_heap: u32) -> Self {
        let pool = Arc::new(DescriptorHeapPool::new(device, descriptors_per_heap));
        let allocators = DescriptorHeapType::ALL
            .map(|ty| Mutex::new(DescriptorAllocator::new(ty, pool.clone())));
        Self { pool, allocators }
    }

    pub fn pool(&self) -> &DescriptorHeapPool {
        &self.pool
    }

    pub fn try_allocate(
        &self,
        heap_type: DescriptorHeapType,
        count: u32,
    ) -> Result<DescriptorHandle, GraphicsError> {
        self.allocators[heap_type.index()].lock().try_allocate(count)
    }

    pub fn allocate(&self, heap_type: DescriptorHeapType, count: u32) -> DescriptorHandle {
        self.allocators[heap_type.index()].lock().allocate(count)
    }

    /// Release every heap. Outstanding handles become dangling.
    pub fn destroy_all(&self) {
        for allocator in &self.allocators {
            allocator.lock().reset();
        }
        self.pool.destroy_all();
    }
}

static_assertions::assert_impl_all!(DescriptorAllocators: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyDevice;

    fn allocator(per_heap: u32) -> (Arc<DescriptorHeapPool>, DescriptorAllocator) {
        let pool = Arc::new(DescriptorHeapPool::new(Arc::new(DummyDevice::new()), per_heap));
        let allocator = DescriptorAllocator::new(DescriptorHeapType::CbvSrvUav, pool.clone());
        (pool, allocator)
    }

    #[test]
    fn sequential_allocations_never_overlap() {
        let (_pool, mut allocator) = allocator(64);
        let mut ranges: Vec<(u64, u64)> = Vec::new();
        for count in [1, 5, 3, 17, 8, 30, 2, 64, 1, 40] {
            let start = allocator.allocate(count).cpu_ptr();
            ranges.push((start, start + count as u64 * 32));
        }

        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                assert!(a.1 <= b.0 || b.1 <= a.0, "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn offsets_increase_within_a_heap() {
        let (_pool, mut allocator) = allocator(100);
        let a = allocator.allocate(10);
        let b = allocator.allocate(10);
        let c = allocator.allocate(1);
        assert!(a.cpu_ptr() < b.cpu_ptr() && b.cpu_ptr() < c.cpu_ptr());
        assert_eq!(b.cpu_ptr() - a.cpu_ptr(), 10 * 32);
        assert!(!a.is_shader_visible());
    }

    #[test]
    fn second_heap_created_on_third_request_of_forty() {
        let (pool, mut allocator) = allocator(100);

        let first = allocator.allocate(40);
        assert_eq!(pool.heap_count(), 1);
        let second = allocator.allocate(40);
        assert_eq!(pool.heap_count(), 1);
        assert_eq!(second.cpu_ptr() - first.cpu_ptr(), 40 * 32);

        let third = allocator.allocate(40);
        assert_eq!(pool.heap_count(), 2);
        assert!(third.cpu_ptr() >= first.cpu_ptr() + 100 * 32);
    }

    #[test]
    #[should_panic(expected = "cannot allocate 101")]
    fn oversized_request_panics() {
        let (_pool, mut allocator) = allocator(100);
        allocator.allocate(101);
    }

    #[test]
    fn each_type_has_its_own_cursor() {
        let allocators = DescriptorAllocators::new(Arc::new(DummyDevice::new()), 16);
        let view = allocators.allocate(DescriptorHeapType::CbvSrvUav, 1);
        let rtv = allocators.allocate(DescriptorHeapType::Rtv, 1);
        assert_ne!(view.cpu_ptr(), rtv.cpu_ptr());
        assert_eq!(allocators.pool().heap_count(), 2);
        assert_eq!(allocators.pool().heap_count_of(DescriptorHeapType::Rtv), 1);
        assert_eq!(allocators.pool().heap_count_of(DescriptorHeapType::Dsv), 0);

        allocators.destroy_all();
        assert_eq!(allocators.pool().heap_count(), 0);
        allocators.allocate(DescriptorHeapType::CbvSrvUav, 1);
        assert_eq!(allocators.pool().heap_count(), 1);
    }

    #[test]
    fn concurrent_allocations_are_disjoint() {
        let allocators = Arc::new(DescriptorAllocators::new(Arc::new(DummyDevice::new()), 32));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let allocators = allocators.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| allocators.allocate(DescriptorHeapType::CbvSrvUav, 3).cpu_ptr())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut starts: Vec<u64> = threads.into_iter().flat_map(|t| t.join().unwrap()).collect();
        starts.sort_unstable();
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= 3 * 32);
        }
    }
}
