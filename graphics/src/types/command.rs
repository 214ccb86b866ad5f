/// Kind of command list a queue executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandListType {
    /// Graphics queue: accepts every command.
    Direct,
    /// Async compute queue.
    Compute,
    /// Copy-only queue.
    Copy,
}

impl CommandListType {
    pub const ALL: [CommandListType; 3] = [Self::Direct, Self::Compute, Self::Copy];

    /// Dense index, usable for per-type arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::Direct => 0,
            Self::Compute => 1,
            Self::Copy => 2,
        }
    }

    /// Fence values handed out by a queue of this type carry the type in their
    /// top byte, so a bare fence value identifies its queue.
    pub const fn fence_tag(self) -> u64 {
        (self.index() as u64) << 56
    }

    /// Recover the queue type from a tagged fence value.
    pub fn from_fence_value(value: u64) -> Option<Self> {
        Self::ALL.get((value >> 56) as usize).copied()
    }
}
