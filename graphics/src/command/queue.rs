use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::backend::{GpuCommand, GpuDevice, GpuFence};
use crate::error::GraphicsError;
use crate::types::CommandListType;

use super::{CommandAllocator, CommandAllocatorPool};

/// A device queue of one [`CommandListType`] with its fence and allocator pool.
///
/// Fence values carry the queue type in their top byte (see
/// [`CommandListType::fence_tag`]), so the value alone tells which queue to
/// wait on.
pub struct CommandQueue {
    device: Arc<dyn GpuDevice>,
    list_type: CommandListType,
    fence: GpuFence,
    next_fence_value: Mutex<u64>,
    last_completed_fence_value: AtomicU64,
    allocator_pool: CommandAllocatorPool,
}

impl CommandQueue {
    pub fn new(
        device: Arc<dyn GpuDevice>,
        list_type: CommandListType,
    ) -> Result<Self, GraphicsError> {
        let tag = list_type.fence_tag();
        let fence = device.create_fence(tag)?;
        log::debug!("created {list_type:?} command queue");
        Ok(Self {
            allocator_pool: CommandAllocatorPool::new(device.clone(), list_type),
            device,
            list_type,
            fence,
            next_fence_value: Mutex::new(tag | 1),
            last_completed_fence_value: AtomicU64::new(tag),
        })
    }

    pub fn list_type(&self) -> CommandListType {
        self.list_type
    }

    pub fn allocator_pool(&self) -> &CommandAllocatorPool {
        &self.allocator_pool
    }

    pub fn fence(&self) -> &GpuFence {
        &self.fence
    }

    /// Fence value the next submission will signal.
    pub fn next_fence_value(&self) -> u64 {
        *self.next_fence_value.lock()
    }

    /// Submit `commands` recorded with `allocator` and return the fence
    /// value that marks their completion.
    pub fn execute(
        &self,
        allocator: &CommandAllocator,
        commands: &[GpuCommand],
    ) -> Result<u64, GraphicsError> {
        crate::profile_function!();
        let mut next = self.next_fence_value.lock();
        let value = *next;
        self.device
            .execute_command_list(self.list_type, allocator.raw(), commands, &self.fence, value)?;
        *next += 1;
        Ok(value)
    }

    /// Poll the device for the latest retired fence value.
    pub fn completed_fence_value(&self) -> u64 {
        let completed = self.device.fence_completed_value(&self.fence);
        self.last_completed_fence_value.fetch_max(completed, Ordering::AcqRel).max(completed)
    }

    pub fn is_fence_complete(&self, fence_value: u64) -> bool {
        // Avoid querying the device when the cached value already answers.
        if fence_value > self.last_completed_fence_value.load(Ordering::Acquire) {
            self.completed_fence_value();
        }
        fence_value <= self.last_completed_fence_value.load(Ordering::Acquire)
    }

    /// Block until `fence_value` has been reached.
    pub fn wait_for_fence(&self, fence_value: u64) -> Result<(), GraphicsError> {
        if self.is_fence_complete(fence_value) {
            return Ok(());
        }
        self.device.wait_for_fence(&self.fence, fence_value)?;
        self.last_completed_fence_value.fetch_max(fence_value, Ordering::AcqRel);
        Ok(())
    }

    /// Block until everything submitted so far has completed.
    pub fn wait_for_idle(&self) -> Result<(), GraphicsError> {
        let last_submitted = self.next_fence_value() - 1;
        self.wait_for_fence(last_submitted)
    }

    /// Check out an allocator whose previous work has retired.
    pub fn request_allocator(&self) -> Result<Arc<CommandAllocator>, GraphicsError> {
        let completed = self.completed_fence_value();
        self.allocator_pool.request_allocator(completed)
    }

    /// Return an allocator used by the submission that signals `fence_value`.
    pub fn discard_allocator(&self, fence_value: u64, allocator: Arc<CommandAllocator>) {
        self.allocator_pool.discard_allocator(fence_value, allocator);
    }

    pub fn shutdown(&self) {
        self.allocator_pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyDevice;

    #[test]
    fn fence_values_are_tagged_and_increasing() {
        let device = Arc::new(DummyDevice::new());
        let queue = CommandQueue::new(device, CommandListType::Compute).unwrap();
        let allocator = queue.request_allocator().unwrap();

        let first = queue.execute(&allocator, &[]).unwrap();
        let second = queue.execute(&allocator, &[]).unwrap();
        assert_eq!(first, CommandListType::Compute.fence_tag() | 1);
        assert_eq!(second, first + 1);
        assert_eq!(CommandListType::from_fence_value(second), Some(CommandListType::Compute));
        assert!(queue.is_fence_complete(second));
    }

    #[test]
    fn allocators_wait_for_their_fence() {
        let device = Arc::new(DummyDevice::new().with_manual_fences());
        let queue = CommandQueue::new(device.clone(), CommandListType::Direct).unwrap();

        let allocator = queue.request_allocator().unwrap();
        let fence_value = queue.execute(&allocator, &[]).unwrap();
        queue.discard_allocator(fence_value, allocator.clone());
        assert!(!queue.is_fence_complete(fence_value));

        let busy = queue.request_allocator().unwrap();
        assert!(!Arc::ptr_eq(&busy, &allocator));

        device.retire(queue.fence(), fence_value);
        let reused = queue.request_allocator().unwrap();
        assert!(Arc::ptr_eq(&reused, &allocator));
    }

    #[test]
    fn wait_for_idle_drains_submissions() {
        let device = Arc::new(DummyDevice::new().with_manual_fences());
        let queue = CommandQueue::new(device, CommandListType::Copy).unwrap();
        let allocator = queue.request_allocator().unwrap();
        let last = (0..3).map(|_| queue.execute(&allocator, &[]).unwrap()).last().unwrap();

        assert!(!queue.is_fence_complete(last));
        queue.wait_for_idle().unwrap();
        assert!(queue.is_fence_complete(last));
        assert_eq!(queue.completed_fence_value(), last);
    }
}
