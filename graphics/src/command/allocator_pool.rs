use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{GpuCommandAllocator, GpuDevice};
use crate::error::GraphicsError;
use crate::types::CommandListType;

/// Recording memory for one command list at a time.
#[derive(Clone)]
pub struct CommandAllocator {
    raw: GpuCommandAllocator,
    index: usize,
}

impl CommandAllocator {
    /// The device allocator.
    pub fn raw(&self) -> &GpuCommandAllocator {
        &self.raw
    }

    /// Position of this allocator in its pool's creation order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn list_type(&self) -> CommandListType {
        self.raw.list_type()
    }
}

impl std::fmt::Debug for CommandAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandAllocator")
            .field("index", &self.index)
            .field("list_type", &self.list_type())
            .finish()
    }
}

#[derive(Default)]
struct PoolState {
    all: Vec<Arc<CommandAllocator>>,
    ready: VecDeque<(u64, Arc<CommandAllocator>)>,
}

/// Recycles command allocators of one list type by fence value.
///
/// An allocator is handed out again only after the fence value it was
/// discarded with has been reached. The ready queue is FIFO and only its
/// head is inspected: fence values of one queue retire in order, so a head
/// that is still busy implies every later entry is too.
pub struct CommandAllocatorPool {
    device: Arc<dyn GpuDevice>,
    list_type: CommandListType,
    state: Mutex<PoolState>,
}

impl CommandAllocatorPool {
    pub fn new(device: Arc<dyn GpuDevice>, list_type: CommandListType) -> Self {
        Self {
            device,
            list_type,
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn list_type(&self) -> CommandListType {
        self.list_type
    }

    /// Get an allocator whose previous work has completed.
    ///
    /// `completed_fence_value` is the latest value the queue's fence is known
    /// to have reached. The oldest discarded allocator is reset and reused if
    /// its fence value is no greater; otherwise a new allocator is created.
    pub fn request_allocator(
        &self,
        completed_fence_value: u64,
    ) -> Result<Arc<CommandAllocator>, GraphicsError> {
        let mut state = self.state.lock();

        if let Some((fence_value, allocator)) = state.ready.front()
            && *fence_value <= completed_fence_value
        {
            // A failed reset leaves the allocator queued for the next request.
            self.device.reset_command_allocator(allocator.raw())?;
            if let Some((_, allocator)) = state.ready.pop_front() {
                return Ok(allocator);
            }
        }

        let raw = self.device.create_command_allocator(self.list_type)?;
        let allocator = Arc::new(CommandAllocator {
            raw,
            index: state.all.len(),
        });
        state.all.push(allocator.clone());
        log::debug!("{:?} command allocator pool grew to {}", self.list_type, state.all.len());
        Ok(allocator)
    }

    /// Return an allocator that becomes reusable once `fence_value` is reached.
    pub fn discard_allocator(&self, fence_value: u64, allocator: Arc<CommandAllocator>) {
        self.state.lock().ready.push_back((fence_value, allocator));
    }

    /// Number of allocators ever created.
    pub fn size(&self) -> usize {
        self.state.lock().all.len()
    }

    /// Number of allocators waiting in the ready queue.
    pub fn ready_count(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Release every allocator, whether ready or checked out.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if !state.all.is_empty() {
            log::debug!("releasing {} {:?} command allocators", state.all.len(), self.list_type);
        }
        state.ready.clear();
        state.all.clear();
    }
}

impl Drop for CommandAllocatorPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

static_assertions::assert_impl_all!(CommandAllocatorPool: Send, Sync);
