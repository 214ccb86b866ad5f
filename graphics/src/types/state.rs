use bitflags::bitflags;

bitflags! {
    /// Usage state of a resource as seen by the GPU.
    ///
    /// Transitions between states are recorded as barriers by a
    /// [`CommandContext`](crate::command::CommandContext).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceState: u32 {
        const COMMON = 0;
        const VERTEX_AND_CONSTANT_BUFFER = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const RENDER_TARGET = 1 << 2;
        const UNORDERED_ACCESS = 1 << 3;
        const DEPTH_WRITE = 1 << 4;
        const DEPTH_READ = 1 << 5;
        const NON_PIXEL_SHADER_RESOURCE = 1 << 6;
        const PIXEL_SHADER_RESOURCE = 1 << 7;
        const INDIRECT_ARGUMENT = 1 << 9;
        const COPY_DEST = 1 << 10;
        const COPY_SOURCE = 1 << 11;
        /// Every read-only state a buffer can be used in at once.
        const GENERIC_READ = Self::VERTEX_AND_CONSTANT_BUFFER.bits()
            | Self::INDEX_BUFFER.bits()
            | Self::NON_PIXEL_SHADER_RESOURCE.bits()
            | Self::PIXEL_SHADER_RESOURCE.bits()
            | Self::INDIRECT_ARGUMENT.bits()
            | Self::COPY_SOURCE.bits();
    }
}

impl ResourceState {
    /// States a compute queue is allowed to transition into or out of.
    pub const VALID_COMPUTE_QUEUE_STATES: ResourceState = ResourceState::UNORDERED_ACCESS
        .union(ResourceState::NON_PIXEL_SHADER_RESOURCE)
        .union(ResourceState::COPY_DEST)
        .union(ResourceState::COPY_SOURCE);

    /// Whether the state only permits reads.
    pub fn is_read_only(self) -> bool {
        !self.intersects(
            ResourceState::RENDER_TARGET
                | ResourceState::UNORDERED_ACCESS
                | ResourceState::DEPTH_WRITE
                | ResourceState::COPY_DEST,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_read_covers_shader_reads() {
        assert!(ResourceState::GENERIC_READ.contains(ResourceState::PIXEL_SHADER_RESOURCE));
        assert!(ResourceState::GENERIC_READ.contains(ResourceState::COPY_SOURCE));
        assert!(!ResourceState::GENERIC_READ.contains(ResourceState::COPY_DEST));
        assert!(ResourceState::GENERIC_READ.is_read_only());
        assert!(!ResourceState::UNORDERED_ACCESS.is_read_only());
    }

    #[test]
    fn compute_queue_states() {
        assert!(
            ResourceState::VALID_COMPUTE_QUEUE_STATES.contains(ResourceState::UNORDERED_ACCESS)
        );
        assert!(!ResourceState::VALID_COMPUTE_QUEUE_STATES.contains(ResourceState::RENDER_TARGET));
    }
}
