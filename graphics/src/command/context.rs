use std::sync::Arc;

use crate::backend::{
    BarrierPhase, GpuCommand, GpuResourceHandle, ResourceBarrier, TextureCopyRegion,
};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resource::{GpuResource, UploadBuffer};
use crate::types::{CommandListType, ResourceState, SubresourceData};

use super::{CommandAllocator, CommandQueue};

/// Records commands against one checked-out allocator.
///
/// Transitions are buffered and flushed in batches, or right before a
/// command that depends on them. [`finish`](Self::finish) submits the
/// recorded work and returns the allocator to its pool. A context dropped
/// without finishing returns its allocator without submitting anything.
pub struct CommandContext {
    queue: Arc<CommandQueue>,
    allocator: Option<Arc<CommandAllocator>>,
    commands: Vec<GpuCommand>,
    pending_barriers: Vec<ResourceBarrier>,
    max_pending_barriers: usize,
    name: String,
}

fn require_raw(resource: &GpuResource) -> GpuResourceHandle {
    match resource.raw() {
        Some(raw) => raw.clone(),
        None => panic!("command recorded against an unallocated resource"),
    }
}

impl CommandContext {
    pub fn begin(
        queue: Arc<CommandQueue>,
        name: &str,
        max_pending_barriers: usize,
    ) -> Result<Self, GraphicsError> {
        let allocator = queue.request_allocator()?;
        log::trace!("CommandContext '{}': begin on {:?}", name, queue.list_type());
        Ok(Self {
            queue,
            allocator: Some(allocator),
            commands: Vec::new(),
            pending_barriers: Vec::with_capacity(max_pending_barriers),
            max_pending_barriers: max_pending_barriers.max(1),
            name: name.to_owned(),
        })
    }

    pub fn list_type(&self) -> CommandListType {
        self.queue.list_type()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Commands recorded so far, including flushed barriers.
    pub fn recorded_commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn pending_barrier_count(&self) -> usize {
        self.pending_barriers.len()
    }

    fn check_compute_state(&self, state: ResourceState) {
        if self.list_type() == CommandListType::Compute {
            assert!(
                ResourceState::VALID_COMPUTE_QUEUE_STATES.contains(state),
                "invalid state {state:?} for a compute command context"
            );
        }
    }

    fn flush_if_needed(&mut self, flush_immediate: bool) {
        if flush_immediate || self.pending_barriers.len() >= self.max_pending_barriers {
            self.flush_resource_barriers();
        }
    }

    /// Record a transition of `resource` to `new_state`.
    ///
    /// Transitioning into the state a resource is already in records nothing,
    /// except for `UNORDERED_ACCESS`, where a UAV barrier orders the writes.
    pub fn transition_resource(
        &mut self,
        resource: &mut GpuResource,
        new_state: ResourceState,
        flush_immediate: bool,
    ) {
        let raw = require_raw(resource);
        let old_state = resource.usage_state();
        self.check_compute_state(old_state);
        self.check_compute_state(new_state);

        if old_state != new_state {
            let phase = if resource.transitioning_state() == Some(new_state) {
                resource.set_transitioning_state(None);
                BarrierPhase::EndOnly
            } else {
                BarrierPhase::Full
            };
            self.pending_barriers.push(ResourceBarrier {
                resource: raw,
                before: old_state,
                after: new_state,
                phase,
            });
            resource.set_usage_state(new_state);
        } else if new_state == ResourceState::UNORDERED_ACCESS {
            self.insert_uav_barrier(resource, flush_immediate);
        }

        self.flush_if_needed(flush_immediate);
    }

    /// Start a split transition; the matching [`transition_resource`](Self::transition_resource)
    /// call ends it.
    pub fn begin_resource_transition(
        &mut self,
        resource: &mut GpuResource,
        new_state: ResourceState,
        flush_immediate: bool,
    ) {
        if let Some(pending) = resource.transitioning_state() {
            self.transition_resource(resource, pending, false);
        }

        let old_state = resource.usage_state();
        if old_state != new_state {
            self.pending_barriers.push(ResourceBarrier {
                resource: require_raw(resource),
                before: old_state,
                after: new_state,
                phase: BarrierPhase::BeginOnly,
            });
            resource.set_transitioning_state(Some(new_state));
        }

        self.flush_if_needed(flush_immediate);
    }

    pub fn insert_uav_barrier(&mut self, resource: &GpuResource, flush_immediate: bool) {
        self.flush_resource_barriers();
        self.commands.push(GpuCommand::UavBarrier(require_raw(resource)));
        self.flush_if_needed(flush_immediate);
    }

    /// Move buffered transitions into the command stream.
    pub fn flush_resource_barriers(&mut self) {
        self.commands
            .extend(self.pending_barriers.drain(..).map(GpuCommand::Transition));
    }

    /// Copy `num_bytes` between buffers. Both must already be in copy states.
    pub fn copy_buffer_region(
        &mut self,
        dest: &GpuResource,
        dest_offset: u64,
        src: &GpuResource,
        src_offset: u64,
        num_bytes: u64,
    ) {
        self.flush_resource_barriers();
        self.commands.push(GpuCommand::CopyBufferRegion {
            dest: require_raw(dest),
            dest_offset,
            src: require_raw(src),
            src_offset,
            num_bytes,
        });
    }

    /// Copy a whole buffer, transitioning both sides into copy states first.
    pub fn copy_buffer(&mut self, dest: &mut GpuResource, src: &mut GpuResource) {
        self.transition_resource(dest, ResourceState::COPY_DEST, false);
        self.transition_resource(src, ResourceState::COPY_SOURCE, false);
        let num_bytes = require_raw(src).desc().width.min(require_raw(dest).desc().width);
        self.copy_buffer_region(dest, 0, src, 0, num_bytes);
    }

    pub fn copy_buffer_to_texture(
        &mut self,
        dest: &GpuResource,
        src: &GpuResource,
        regions: Vec<TextureCopyRegion>,
    ) {
        self.flush_resource_barriers();
        self.commands.push(GpuCommand::CopyBufferToTexture {
            dest: require_raw(dest),
            src: require_raw(src),
            regions,
        });
    }

    /// Submit the recorded commands and return the fence value that marks
    /// their completion. With `wait`, block until the GPU is done.
    pub fn finish(mut self, wait: bool) -> Result<u64, GraphicsError> {
        self.flush_resource_barriers();
        let Some(allocator) = self.allocator.take() else {
            return Err(GraphicsError::Internal(format!(
                "command context '{}' has no allocator",
                self.name
            )));
        };
        let commands = std::mem::take(&mut self.commands);

        let fence_value = match self.queue.execute(&allocator, &commands) {
            Ok(value) => value,
            Err(e) => {
                self.queue.discard_allocator(self.queue.next_fence_value() - 1, allocator);
                return Err(e);
            }
        };
        self.queue.discard_allocator(fence_value, allocator);
        log::trace!(
            "CommandContext '{}': submitted {} commands, fence {:#x}",
            self.name,
            commands.len(),
            fence_value
        );

        if wait {
            self.queue.wait_for_fence(fence_value)?;
        }
        Ok(fence_value)
    }

    /// Fill `dest` at `dest_offset` with `data` through a temporary upload buffer.
    ///
    /// Blocks until the copy has completed; `dest` ends in `GENERIC_READ`.
    pub fn initialize_buffer(
        device: &GraphicsDevice,
        dest: &mut GpuResource,
        data: &[u8],
        dest_offset: u64,
    ) -> Result<(), GraphicsError> {
        if data.is_empty() {
            return Ok(());
        }
        let upload = UploadBuffer::create(device, "InitializeBuffer", data.len() as u64)?;
        upload.write(0, data)?;
        Self::initialize_buffer_from(device, dest, &upload, 0, data.len() as u64, dest_offset)
    }

    /// Copy `num_bytes` from `src` at `src_offset` into `dest` at `dest_offset`.
    ///
    /// Blocks until the copy has completed; `dest` ends in `GENERIC_READ`.
    pub fn initialize_buffer_from(
        device: &GraphicsDevice,
        dest: &mut GpuResource,
        src: &UploadBuffer,
        src_offset: u64,
        num_bytes: u64,
        dest_offset: u64,
    ) -> Result<(), GraphicsError> {
        let mut context = device.begin_context(CommandListType::Direct, "InitializeBuffer")?;
        context.transition_resource(dest, ResourceState::COPY_DEST, true);
        context.copy_buffer_region(dest, dest_offset, src.resource(), src_offset, num_bytes);
        context.transition_resource(dest, ResourceState::GENERIC_READ, true);
        context.finish(true)?;
        Ok(())
    }

    /// Upload one subresource per array slice into the texture `dest`.
    ///
    /// Rows are repacked tightly into a staging buffer. Blocks until the
    /// copy has completed; `dest` ends in `GENERIC_READ`.
    pub fn initialize_texture(
        device: &GraphicsDevice,
        dest: &mut GpuResource,
        subresources: &[SubresourceData<'_>],
    ) -> Result<(), GraphicsError> {
        crate::profile_function!();
        let desc = *require_raw(dest).desc();
        let bpp = desc.format.bytes_per_pixel() as usize;
        let width = desc.width as usize;
        let height = desc.height as usize;
        let row_bytes = width * bpp;
        let slice_bytes = row_bytes * height;

        if slice_bytes == 0 {
            return Err(GraphicsError::InvalidParameter(
                "texture has no texels to initialize".into(),
            ));
        }
        if subresources.len() > desc.depth_or_array_size as usize {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} subresources for a texture with {} array slices",
                subresources.len(),
                desc.depth_or_array_size
            )));
        }

        let mut staging = vec![0u8; slice_bytes * subresources.len()];
        let mut regions = Vec::with_capacity(subresources.len());
        for (slice, subresource) in subresources.iter().enumerate() {
            if subresource.row_pitch < row_bytes
                || subresource.data.len() < subresource.row_pitch * (height - 1) + row_bytes
            {
                return Err(GraphicsError::InvalidParameter(format!(
                    "subresource {slice} is too small for {width}x{height}: {} bytes, row pitch {}",
                    subresource.data.len(),
                    subresource.row_pitch
                )));
            }
            let base = slice * slice_bytes;
            for row in 0..height {
                let src = &subresource.data[row * subresource.row_pitch..][..row_bytes];
                staging[base + row * row_bytes..][..row_bytes].copy_from_slice(src);
            }
            regions.push(TextureCopyRegion {
                buffer_offset: base as u64,
                row_pitch: row_bytes as u32,
                array_slice: slice as u32,
                width: width as u32,
                height: height as u32,
            });
        }

        let upload = UploadBuffer::create(device, "InitializeTexture", staging.len() as u64)?;
        upload.write(0, &staging)?;

        let mut context = device.begin_context(CommandListType::Direct, "InitializeTexture")?;
        context.transition_resource(dest, ResourceState::COPY_DEST, true);
        context.copy_buffer_to_texture(dest, upload.resource(), regions);
        context.transition_resource(dest, ResourceState::GENERIC_READ, true);
        context.finish(true)?;
        Ok(())
    }
}

impl Drop for CommandContext {
    fn drop(&mut self) {
        if let Some(allocator) = self.allocator.take() {
            log::trace!("CommandContext '{}': dropped without finishing", self.name);
            self.queue.discard_allocator(self.queue.next_fence_value() - 1, allocator);
        }
    }
}
