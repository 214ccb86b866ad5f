use std::sync::Arc;

use crate::backend::GpuDevice;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::{HeapType, ResourceDesc, ResourceFlags, ResourceState};

use super::GpuResource;

/// CPU-writable buffer the GPU reads from, used to stage uploads.
pub struct UploadBuffer {
    resource: GpuResource,
    device: Arc<dyn GpuDevice>,
    buffer_size: u64,
    name: String,
}

impl UploadBuffer {
    pub fn create(
        device: &GraphicsDevice,
        name: &str,
        buffer_size: u64,
    ) -> Result<Self, GraphicsError> {
        assert!(buffer_size != 0, "upload buffer '{name}' has zero size");
        let raw = device.raw().create_committed_resource(
            &ResourceDesc::buffer(buffer_size, ResourceFlags::empty()),
            HeapType::Upload,
            ResourceState::GENERIC_READ,
            name,
        )?;
        Ok(Self {
            resource: GpuResource::from_raw(raw, ResourceState::GENERIC_READ),
            device: device.raw().clone(),
            buffer_size,
            name: name.to_owned(),
        })
    }

    pub fn resource(&self) -> &GpuResource {
        &self.resource
    }

    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gpu_virtual_address(&self) -> u64 {
        self.resource.gpu_virtual_address()
    }

    /// Map the buffer, copy `data` in at `offset`, and unmap.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        let Some(raw) = self.resource.raw() else {
            return Err(GraphicsError::MapFailed(format!("'{}' is not allocated", self.name)));
        };
        self.device.write_resource(raw, offset, data)
    }

    /// Write a slice of plain-old-data values at `offset`.
    pub fn write_pod<T: bytemuck::Pod>(
        &self,
        offset: u64,
        values: &[T],
    ) -> Result<(), GraphicsError> {
        self.write(offset, bytemuck::cast_slice(values))
    }

    /// Map the whole buffer for in-place editing.
    ///
    /// Edits reach the device when the mapping is [unmapped](UploadMapping::unmap)
    /// or dropped.
    pub fn map(&mut self) -> Result<UploadMapping<'_>, GraphicsError> {
        let Some(raw) = self.resource.raw() else {
            return Err(GraphicsError::MapFailed(format!("'{}' is not allocated", self.name)));
        };
        let bytes = self.device.read_resource(raw, 0, self.buffer_size)?;
        Ok(UploadMapping {
            buffer: self,
            bytes,
            flushed: false,
        })
    }
}

/// Mapped contents of an [`UploadBuffer`].
pub struct UploadMapping<'a> {
    buffer: &'a UploadBuffer,
    bytes: Vec<u8>,
    flushed: bool,
}

impl UploadMapping<'_> {
    /// Write the edits back and end the mapping.
    pub fn unmap(mut self) -> Result<(), GraphicsError> {
        self.flush()
    }

    fn flush(&mut self) -> Result<(), GraphicsError> {
        self.flushed = true;
        self.buffer.write(0, &self.bytes)
    }
}

impl std::ops::Deref for UploadMapping<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::ops::DerefMut for UploadMapping<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for UploadMapping<'_> {
    fn drop(&mut self) {
        if !self.flushed
            && let Err(e) = self.flush()
        {
            log::error!("failed to unmap upload buffer '{}': {}", self.buffer.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyDevice;
    use crate::config::GraphicsConfig;

    #[test]
    fn writes_land_in_the_buffer() {
        let device =
            GraphicsDevice::new(Arc::new(DummyDevice::new()), &GraphicsConfig::default()).unwrap();
        let upload = UploadBuffer::create(&device, "upload", 16).unwrap();
        upload.write_pod(4, &[7u32, 9u32]).unwrap();

        let raw = upload.resource().raw().unwrap();
        let bytes = device.raw().read_resource(raw, 0, 16).unwrap();
        assert_eq!(&bytes[4..12], bytemuck::cast_slice::<u32, u8>(&[7, 9]));
        assert!(upload.write(12, &[0; 8]).is_err());
        assert_eq!(upload.resource().usage_state(), ResourceState::GENERIC_READ);
    }

    #[test]
    fn mapped_edits_are_written_back() {
        let device =
            GraphicsDevice::new(Arc::new(DummyDevice::new()), &GraphicsConfig::default()).unwrap();
        let mut upload = UploadBuffer::create(&device, "mapped", 8).unwrap();
        upload.write(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        {
            let mut mapping = upload.map().unwrap();
            assert_eq!(mapping[2], 3);
            mapping[..2].copy_from_slice(&[9, 9]);
        }
        let mut mapping = upload.map().unwrap();
        mapping[7] = 0;
        mapping.unmap().unwrap();

        let raw = upload.resource().raw().unwrap();
        assert_eq!(device.raw().read_resource(raw, 0, 8).unwrap(), [9, 9, 3, 4, 5, 6, 7, 0]);
    }
}
