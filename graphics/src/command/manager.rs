use std::sync::Arc;

use crate::backend::GpuDevice;
use crate::error::GraphicsError;
use crate::types::CommandListType;

use super::CommandQueue;

/// The graphics, compute and copy queues of a device.
pub struct CommandListManager {
    queues: [Arc<CommandQueue>; 3],
}

impl CommandListManager {
    pub fn new(device: Arc<dyn GpuDevice>) -> Result<Self, GraphicsError> {
        Ok(Self {
            queues: [
                Arc::new(CommandQueue::new(device.clone(), CommandListType::Direct)?),
                Arc::new(CommandQueue::new(device.clone(), CommandListType::Compute)?),
                Arc::new(CommandQueue::new(device, CommandListType::Copy)?),
            ],
        })
    }

    pub fn queue(&self, list_type: CommandListType) -> &Arc<CommandQueue> {
        &self.queues[list_type.index()]
    }

    pub fn graphics_queue(&self) -> &Arc<CommandQueue> {
        self.queue(CommandListType::Direct)
    }

    pub fn compute_queue(&self) -> &Arc<CommandQueue> {
        self.queue(CommandListType::Compute)
    }

    pub fn copy_queue(&self) -> &Arc<CommandQueue> {
        self.queue(CommandListType::Copy)
    }

    fn queue_for_fence(&self, fence_value: u64) -> &Arc<CommandQueue> {
        match CommandListType::from_fence_value(fence_value) {
            Some(list_type) => self.queue(list_type),
            None => panic!("fence value {fence_value:#x} carries no queue tag"),
        }
    }

    /// Whether the submission tagged with `fence_value` has completed, on
    /// whichever queue issued it.
    pub fn is_fence_complete(&self, fence_value: u64) -> bool {
        self.queue_for_fence(fence_value).is_fence_complete(fence_value)
    }

    pub fn wait_for_fence(&self, fence_value: u64) -> Result<(), GraphicsError> {
        self.queue_for_fence(fence_value).wait_for_fence(fence_value)
    }

    /// Block until every queue is idle.
    pub fn idle_gpu(&self) -> Result<(), GraphicsError> {
        for queue in &self.queues {
            queue.wait_for_idle()?;
        }
        Ok(())
    }

    pub fn shutdown(&self) {
        for queue in &self.queues {
            queue.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyDevice;

    #[test]
    fn fence_values_route_to_their_queue() {
        let device = Arc::new(DummyDevice::new().with_manual_fences());
        let manager = CommandListManager::new(device.clone()).unwrap();

        let copy = manager.copy_queue();
        let allocator = copy.request_allocator().unwrap();
        let fence_value = copy.execute(&allocator, &[]).unwrap();

        assert!(!manager.is_fence_complete(fence_value));
        assert!(manager.is_fence_complete(manager.graphics_queue().next_fence_value() - 1));

        manager.wait_for_fence(fence_value).unwrap();
        assert!(manager.is_fence_complete(fence_value));
    }

    #[test]
    fn idle_gpu_waits_on_every_queue() {
        let device = Arc::new(DummyDevice::new().with_manual_fences());
        let manager = CommandListManager::new(device).unwrap();
        let mut submitted = Vec::new();
        for list_type in CommandListType::ALL {
            let queue = manager.queue(list_type);
            let allocator = queue.request_allocator().unwrap();
            submitted.push(queue.execute(&allocator, &[]).unwrap());
        }

        manager.idle_gpu().unwrap();
        assert!(submitted.iter().all(|value| manager.is_fence_complete(*value)));
    }
}
