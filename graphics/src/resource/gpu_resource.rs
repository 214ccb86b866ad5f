use crate::backend::GpuResourceHandle;
use crate::types::{GPU_VIRTUAL_ADDRESS_UNKNOWN, ResourceState};

/// A device resource together with the usage state the CPU believes it is in.
///
/// The state is only changed by a [`CommandContext`](crate::command::CommandContext)
/// recording a transition, which is why transitions take `&mut GpuResource`.
#[derive(Debug)]
pub struct GpuResource {
    raw: Option<GpuResourceHandle>,
    usage_state: ResourceState,
    transitioning_state: Option<ResourceState>,
    gpu_virtual_address: u64,
}

impl GpuResource {
    /// An unallocated resource.
    pub const fn new() -> Self {
        Self {
            raw: None,
            usage_state: ResourceState::COMMON,
            transitioning_state: None,
            gpu_virtual_address: GPU_VIRTUAL_ADDRESS_UNKNOWN,
        }
    }

    pub(crate) fn from_raw(raw: GpuResourceHandle, state: ResourceState) -> Self {
        Self {
            gpu_virtual_address: raw.gpu_virtual_address(),
            raw: Some(raw),
            usage_state: state,
            transitioning_state: None,
        }
    }

    pub fn raw(&self) -> Option<&GpuResourceHandle> {
        self.raw.as_ref()
    }

    pub fn is_allocated(&self) -> bool {
        self.raw.is_some()
    }

    pub fn usage_state(&self) -> ResourceState {
        self.usage_state
    }

    /// Target of a split barrier that has begun but not ended.
    pub fn transitioning_state(&self) -> Option<ResourceState> {
        self.transitioning_state
    }

    pub fn gpu_virtual_address(&self) -> u64 {
        self.gpu_virtual_address
    }

    pub(crate) fn set_usage_state(&mut self, state: ResourceState) {
        self.usage_state = state;
    }

    pub(crate) fn set_transitioning_state(&mut self, state: Option<ResourceState>) {
        self.transitioning_state = state;
    }

    /// Release the device resource and return to the unallocated state.
    pub fn destroy(&mut self) {
        *self = Self::new();
    }
}

impl Default for GpuResource {
    fn default() -> Self {
        Self::new()
    }
}
