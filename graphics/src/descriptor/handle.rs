use std::ops::{Add, AddAssign};

use crate::types::{CpuDescriptorHandle, GpuDescriptorHandle};

/// A descriptor slot addressed from the CPU and, for shader-visible heaps,
/// from the GPU.
///
/// Both addresses are [`DescriptorHandle::UNKNOWN`] until the slot is
/// allocated. Adding a byte offset moves both addresses in lock step; unknown
/// addresses stay unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHandle {
    cpu: u64,
    gpu: u64,
}

impl DescriptorHandle {
    /// Address value marking an unallocated handle.
    pub const UNKNOWN: u64 = u64::MAX;

    /// The unallocated handle.
    pub const NULL: DescriptorHandle = DescriptorHandle {
        cpu: Self::UNKNOWN,
        gpu: Self::UNKNOWN,
    };

    pub fn new(cpu: CpuDescriptorHandle, gpu: Option<GpuDescriptorHandle>) -> Self {
        Self {
            cpu: cpu.0,
            gpu: gpu.map_or(Self::UNKNOWN, |gpu| gpu.0),
        }
    }

    pub fn cpu(&self) -> CpuDescriptorHandle {
        CpuDescriptorHandle(self.cpu)
    }

    pub fn gpu(&self) -> GpuDescriptorHandle {
        GpuDescriptorHandle(self.gpu)
    }

    pub fn cpu_ptr(&self) -> u64 {
        self.cpu
    }

    pub fn gpu_ptr(&self) -> u64 {
        self.gpu
    }

    pub fn is_null(&self) -> bool {
        self.cpu == Self::UNKNOWN
    }

    pub fn is_shader_visible(&self) -> bool {
        self.gpu != Self::UNKNOWN
    }
}

impl Default for DescriptorHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl AddAssign<u64> for DescriptorHandle {
    fn add_assign(&mut self, offset_bytes: u64) {
        if self.cpu != Self::UNKNOWN {
            self.cpu += offset_bytes;
        }
        if self.gpu != Self::UNKNOWN {
            self.gpu += offset_bytes;
        }
    }
}

impl Add<u64> for DescriptorHandle {
    type Output = DescriptorHandle;

    fn add(mut self, offset_bytes: u64) -> DescriptorHandle {
        self += offset_bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_null() {
        let handle = DescriptorHandle::default();
        assert!(handle.is_null());
        assert!(!handle.is_shader_visible());
    }

    #[test]
    fn offsets_move_both_addresses() {
        let handle =
            DescriptorHandle::new(CpuDescriptorHandle(0x1000), Some(GpuDescriptorHandle(0x8000)));
        let moved = handle + 64;
        assert_eq!(moved.cpu_ptr(), 0x1040);
        assert_eq!(moved.gpu_ptr(), 0x8040);
    }

    #[test]
    fn offsets_keep_unknown_gpu_address() {
        let mut handle = DescriptorHandle::new(CpuDescriptorHandle(0x1000), None);
        handle += 32;
        assert_eq!(handle.cpu_ptr(), 0x1020);
        assert!(!handle.is_shader_visible());

        let null = DescriptorHandle::NULL + 32;
        assert!(null.is_null());
    }
}
