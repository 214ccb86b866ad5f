//! Graphics device.
//!
//! The [`GraphicsDevice`] bundles the backend device with the services every
//! resource needs while it is being created: the descriptor allocators for
//! its views and the command queues that upload its initial contents.
//! Resource constructors take `&GraphicsDevice`.

use std::sync::Arc;

use crate::backend::GpuDevice;
use crate::command::{CommandContext, CommandListManager};
use crate::config::GraphicsConfig;
use crate::descriptor::{DescriptorAllocators, DescriptorHandle};
use crate::error::GraphicsError;
use crate::types::{CommandListType, DescriptorHeapType};

/// Backend device plus descriptor allocators and command queues.
///
/// `Clone` is cheap; clones share every service.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync`. Descriptor allocation and queue
/// submission are internally synchronized.
#[derive(Clone)]
pub struct GraphicsDevice {
    device: Arc<dyn GpuDevice>,
    descriptors: Arc<DescriptorAllocators>,
    commands: Arc<CommandListManager>,
    max_pending_barriers: usize,
}

impl GraphicsDevice {
    pub fn new(device: Arc<dyn GpuDevice>, config: &GraphicsConfig) -> Result<Self, GraphicsError> {
        let commands = Arc::new(CommandListManager::new(device.clone())?);
        let descriptors = Arc::new(DescriptorAllocators::new(
            device.clone(),
            config.descriptors_per_heap,
        ));
        log::info!("GraphicsDevice: initialized on {}", device.name());
        Ok(Self {
            device,
            descriptors,
            commands,
            max_pending_barriers: config.max_pending_barriers.max(1),
        })
    }

    /// The backend device.
    pub fn raw(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    pub fn descriptors(&self) -> &DescriptorAllocators {
        &self.descriptors
    }

    pub fn commands(&self) -> &CommandListManager {
        &self.commands
    }

    /// Allocate `count` CPU-only descriptors of `heap_type`.
    pub fn allocate_descriptor(
        &self,
        heap_type: DescriptorHeapType,
        count: u32,
    ) -> Result<DescriptorHandle, GraphicsError> {
        self.descriptors.try_allocate(heap_type, count)
    }

    /// Start recording on the queue of `list_type`.
    pub fn begin_context(
        &self,
        list_type: CommandListType,
        name: &str,
    ) -> Result<CommandContext, GraphicsError> {
        CommandContext::begin(
            self.commands.queue(list_type).clone(),
            name,
            self.max_pending_barriers,
        )
    }

    /// Block until every queue is idle.
    pub fn idle_gpu(&self) -> Result<(), GraphicsError> {
        self.commands.idle_gpu()?;
        self.device.wait_idle()
    }

    /// Wait for the GPU, then release command allocators and descriptor heaps.
    pub fn shutdown(&self) -> Result<(), GraphicsError> {
        self.idle_gpu()?;
        self.commands.shutdown();
        self.descriptors.destroy_all();
        log::info!("GraphicsDevice: shut down");
        Ok(())
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyDevice;

    #[test]
    fn descriptors_come_from_the_configured_heap_size() {
        let config = GraphicsConfig::new().with_descriptors_per_heap(4);
        let device = GraphicsDevice::new(Arc::new(DummyDevice::new()), &config).unwrap();
        for _ in 0..3 {
            device.allocate_descriptor(DescriptorHeapType::CbvSrvUav, 2).unwrap();
        }
        assert_eq!(device.descriptors().pool().heap_count(), 2);
    }

    #[test]
    fn shutdown_releases_pools() {
        let device =
            GraphicsDevice::new(Arc::new(DummyDevice::new()), &GraphicsConfig::default()).unwrap();
        let context = device.begin_context(CommandListType::Direct, "noop").unwrap();
        context.finish(true).unwrap();
        device.allocate_descriptor(DescriptorHeapType::Sampler, 1).unwrap();

        device.shutdown().unwrap();
        assert_eq!(device.commands().graphics_queue().allocator_pool().size(), 0);
        assert_eq!(device.descriptors().pool().heap_count(), 0);
    }
}
