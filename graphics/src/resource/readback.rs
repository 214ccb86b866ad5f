use std::sync::Arc;

use crate::backend::GpuDevice;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::{HeapType, ResourceDesc, ResourceFlags, ResourceState};

use super::GpuResource;

/// GPU-writable buffer the CPU reads results back from.
///
/// Lives in `COPY_DEST` for its whole life; copy into it, wait for the
/// fence, then [`read`](Self::read).
pub struct ReadbackBuffer {
    resource: GpuResource,
    device: Arc<dyn GpuDevice>,
    element_count: u32,
    element_size: u32,
    name: String,
}

impl ReadbackBuffer {
    pub fn create(
        device: &GraphicsDevice,
        name: &str,
        num_elements: u32,
        element_size: u32,
    ) -> Result<Self, GraphicsError> {
        let buffer_size = num_elements as u64 * element_size as u64;
        assert!(buffer_size != 0, "readback buffer '{name}' has zero size");
        let raw = device.raw().create_committed_resource(
            &ResourceDesc::buffer(buffer_size, ResourceFlags::empty()),
            HeapType::Readback,
            ResourceState::COPY_DEST,
            name,
        )?;
        Ok(Self {
            resource: GpuResource::from_raw(raw, ResourceState::COPY_DEST),
            device: device.raw().clone(),
            element_count: num_elements,
            element_size,
            name: name.to_owned(),
        })
    }

    pub fn resource(&self) -> &GpuResource {
        &self.resource
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn element_size(&self) -> u32 {
        self.element_size
    }

    pub fn buffer_size(&self) -> u64 {
        self.element_count as u64 * self.element_size as u64
    }

    /// Map the whole buffer and copy its contents out.
    pub fn read(&self) -> Result<Vec<u8>, GraphicsError> {
        self.read_range(0, self.buffer_size())
    }

    /// Map the buffer and copy `size` bytes out from `offset`.
    pub fn read_range(&self, offset: u64, size: u64) -> Result<Vec<u8>, GraphicsError> {
        let Some(raw) = self.resource.raw() else {
            return Err(GraphicsError::MapFailed(format!("'{}' is not allocated", self.name)));
        };
        self.device.read_resource(raw, offset, size)
    }
}
