use crate::backend::GpuMemoryHeap;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::{HeapDesc, HeapType};

/// Alignment of a placed resource inside a [`GpuHeap`].
pub const PLACEMENT_ALIGNMENT: u64 = 64 * 1024;

/// A block of device memory that placed buffers are created inside.
///
/// The heap does not track which ranges are in use; callers choose offsets.
pub struct GpuHeap {
    raw: GpuMemoryHeap,
    name: String,
}

impl GpuHeap {
    pub fn create(
        device: &GraphicsDevice,
        name: &str,
        size_in_bytes: u64,
        heap_type: HeapType,
    ) -> Result<Self, GraphicsError> {
        let size_in_bytes = size_in_bytes.div_ceil(PLACEMENT_ALIGNMENT) * PLACEMENT_ALIGNMENT;
        let raw = device.raw().create_memory_heap(&HeapDesc {
            size_in_bytes,
            heap_type,
        })?;
        log::debug!("created {heap_type:?} memory heap '{name}' of {size_in_bytes} bytes");
        Ok(Self {
            raw,
            name: name.to_owned(),
        })
    }

    pub fn raw(&self) -> &GpuMemoryHeap {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.raw.desc().size_in_bytes
    }

    pub fn heap_type(&self) -> HeapType {
        self.raw.desc().heap_type
    }
}
