//! GPU buffers.
//!
//! A [`GpuBuffer`] is a default-heap buffer plus the shader resource and
//! unordered access views its [`BufferKind`] calls for. The views are built
//! once, right after the device resource has been created and its initial
//! contents uploaded. Re-creating a buffer rewrites the views in the same
//! descriptor slots.

use crate::command::CommandContext;
use crate::descriptor::DescriptorHandle;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::{
    ConstantBufferViewDesc, DescriptorHeapType, Format, HeapType, ResourceDesc, ResourceFlags,
    ResourceState, ShaderResourceViewDesc, UnorderedAccessViewDesc,
};

use super::{GpuHeap, GpuResource, UploadBuffer};

/// Name given to the hidden counter of a structured buffer.
const COUNTER_NAME: &str = "StructuredBuffer::Counter";

/// Which views a [`GpuBuffer`] exposes.
#[derive(Debug)]
pub enum BufferKind {
    /// Raw 32-bit addressed view over the whole buffer.
    ByteAddress,
    /// Array of `element_size`-byte structures with an append/consume counter.
    Structured { counter: Option<Box<GpuBuffer>> },
    /// Array of elements of a fixed texel format.
    Typed { format: Format },
}

/// A constant buffer view written into a freshly allocated descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBufferView {
    pub handle: DescriptorHandle,
    pub desc: ConstantBufferViewDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferView {
    pub buffer_location: u64,
    pub size_in_bytes: u32,
    pub stride_in_bytes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferView {
    pub buffer_location: u64,
    pub size_in_bytes: u32,
    pub format: Format,
}

/// A GPU buffer with derived views.
///
/// # Example
///
/// ```
/// # use std::sync::Arc;
/// # use ember_graphics::backend::dummy::DummyDevice;
/// # use ember_graphics::{GraphicsConfig, GraphicsDevice, GpuBuffer};
/// let device =
///     GraphicsDevice::new(Arc::new(DummyDevice::new()), &GraphicsConfig::default()).unwrap();
/// let mut particles = GpuBuffer::structured();
/// particles.create(&device, "Particles", 1024, 32, None).unwrap();
/// assert_eq!(particles.buffer_size(), 32 * 1024);
/// ```
pub struct GpuBuffer {
    resource: GpuResource,
    kind: BufferKind,
    name: String,
    element_count: u32,
    element_size: u32,
    buffer_size: u64,
    flags: ResourceFlags,
    srv: DescriptorHandle,
    uav: DescriptorHandle,
}

impl GpuBuffer {
    /// An unallocated buffer of `kind`.
    pub fn new(kind: BufferKind) -> Self {
        Self {
            resource: GpuResource::new(),
            kind,
            name: String::new(),
            element_count: 0,
            element_size: 0,
            buffer_size: 0,
            flags: ResourceFlags::ALLOW_UNORDERED_ACCESS,
            srv: DescriptorHandle::NULL,
            uav: DescriptorHandle::NULL,
        }
    }

    pub fn byte_address() -> Self {
        Self::new(BufferKind::ByteAddress)
    }

    pub fn structured() -> Self {
        Self::new(BufferKind::Structured { counter: None })
    }

    pub fn typed(format: Format) -> Self {
        Self::new(BufferKind::Typed { format })
    }

    /// Create a committed buffer of `num_elements * element_size` bytes.
    ///
    /// `initial_data` is uploaded before the views are built; the buffer then
    /// rests in `GENERIC_READ`. Without it the buffer stays in `COMMON`.
    pub fn create(
        &mut self,
        device: &GraphicsDevice,
        name: &str,
        num_elements: u32,
        element_size: u32,
        initial_data: Option<&[u8]>,
    ) -> Result<(), GraphicsError> {
        let desc = self.describe_buffer(name, num_elements, element_size);
        check_initial_data(name, initial_data, self.buffer_size)?;

        let raw = device
            .raw()
            .create_committed_resource(&desc, HeapType::Default, ResourceState::COMMON, name)?;
        self.resource = GpuResource::from_raw(raw, ResourceState::COMMON);

        if let Some(data) = initial_data {
            CommandContext::initialize_buffer(device, &mut self.resource, data, 0)?;
        }
        self.create_derived_views(device)
    }

    /// Create the buffer and fill it from `src` starting at `src_offset`.
    pub fn create_from_upload(
        &mut self,
        device: &GraphicsDevice,
        name: &str,
        num_elements: u32,
        element_size: u32,
        src: &UploadBuffer,
        src_offset: u64,
    ) -> Result<(), GraphicsError> {
        let desc = self.describe_buffer(name, num_elements, element_size);
        if src_offset + self.buffer_size > src.buffer_size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "upload buffer '{}' holds {} bytes, '{name}' needs {} from offset {src_offset}",
                src.name(),
                src.buffer_size(),
                self.buffer_size
            )));
        }

        let raw = device
            .raw()
            .create_committed_resource(&desc, HeapType::Default, ResourceState::COMMON, name)?;
        self.resource = GpuResource::from_raw(raw, ResourceState::COMMON);

        CommandContext::initialize_buffer_from(
            device,
            &mut self.resource,
            src,
            src_offset,
            self.buffer_size,
            0,
        )?;
        self.create_derived_views(device)
    }

    /// Create the buffer inside `heap` at `heap_offset`.
    pub fn create_placed(
        &mut self,
        device: &GraphicsDevice,
        name: &str,
        heap: &GpuHeap,
        heap_offset: u64,
        num_elements: u32,
        element_size: u32,
        initial_data: Option<&[u8]>,
    ) -> Result<(), GraphicsError> {
        let desc = self.describe_buffer(name, num_elements, element_size);
        check_initial_data(name, initial_data, self.buffer_size)?;

        let raw = device
            .raw()
            .create_placed_resource(heap.raw(), heap_offset, &desc, ResourceState::COMMON, name)?;
        self.resource = GpuResource::from_raw(raw, ResourceState::COMMON);

        if let Some(data) = initial_data {
            CommandContext::initialize_buffer(device, &mut self.resource, data, 0)?;
        }
        self.create_derived_views(device)
    }

    fn describe_buffer(
        &mut self,
        name: &str,
        num_elements: u32,
        element_size: u32,
    ) -> ResourceDesc {
        let buffer_size = num_elements as u64 * element_size as u64;
        assert!(buffer_size != 0, "buffer '{name}' has zero size");

        self.resource.destroy();
        self.name = name.to_owned();
        self.element_count = num_elements;
        self.element_size = element_size;
        self.buffer_size = buffer_size;
        ResourceDesc::buffer(buffer_size, self.flags)
    }

    fn create_derived_views(&mut self, device: &GraphicsDevice) -> Result<(), GraphicsError> {
        let (srv_desc, uav_desc) = match &self.kind {
            BufferKind::ByteAddress => {
                let words = (self.buffer_size / 4) as u32;
                (
                    ShaderResourceViewDesc::buffer(Format::R32Typeless, words, 0, true),
                    UnorderedAccessViewDesc::buffer(Format::R32Typeless, words, 0, true),
                )
            }
            BufferKind::Structured { .. } => (
                ShaderResourceViewDesc::buffer(
                    Format::Unknown,
                    self.element_count,
                    self.element_size,
                    false,
                ),
                UnorderedAccessViewDesc::buffer(
                    Format::Unknown,
                    self.element_count,
                    self.element_size,
                    false,
                ),
            ),
            BufferKind::Typed { format } => (
                ShaderResourceViewDesc::buffer(*format, self.element_count, 0, false),
                UnorderedAccessViewDesc::buffer(*format, self.element_count, 0, false),
            ),
        };

        if let BufferKind::Structured { counter } = &mut self.kind {
            let counter = counter.get_or_insert_with(|| Box::new(GpuBuffer::byte_address()));
            counter.create(device, COUNTER_NAME, 1, 4, None)?;
        }

        if self.srv.is_null() {
            self.srv = device.allocate_descriptor(DescriptorHeapType::CbvSrvUav, 1)?;
        }
        if self.uav.is_null() {
            self.uav = device.allocate_descriptor(DescriptorHeapType::CbvSrvUav, 1)?;
        }

        let Some(raw) = self.resource.raw() else {
            return Err(GraphicsError::Internal(format!("buffer '{}' has no resource", self.name)));
        };
        let counter_raw = match &self.kind {
            BufferKind::Structured { counter: Some(counter) } => counter.resource.raw(),
            _ => None,
        };

        device.raw().create_shader_resource_view(Some(raw), &srv_desc, self.srv.cpu())?;
        device
            .raw()
            .create_unordered_access_view(raw, counter_raw, &uav_desc, self.uav.cpu())?;
        log::trace!("GpuBuffer '{}': views created ({})", self.name, self.kind_name());
        Ok(())
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            BufferKind::ByteAddress => "byte address",
            BufferKind::Structured { .. } => "structured",
            BufferKind::Typed { .. } => "typed",
        }
    }

    /// Write a constant buffer view of `size` bytes at `offset` into a new descriptor.
    ///
    /// `size` is rounded up to 16 bytes.
    ///
    /// # Panics
    ///
    /// Panics if `offset + size` exceeds the buffer.
    pub fn create_constant_buffer_view(
        &self,
        device: &GraphicsDevice,
        offset: u32,
        size: u32,
    ) -> Result<ConstantBufferView, GraphicsError> {
        assert!(
            offset as u64 + size as u64 <= self.buffer_size,
            "constant buffer view at {offset}+{size} exceeds buffer '{}' of {} bytes",
            self.name,
            self.buffer_size
        );

        let desc = ConstantBufferViewDesc {
            buffer_location: self.resource.gpu_virtual_address() + offset as u64,
            size_in_bytes: size.next_multiple_of(16),
        };
        let handle = device.allocate_descriptor(DescriptorHeapType::CbvSrvUav, 1)?;
        device.raw().create_constant_buffer_view(&desc, handle.cpu())?;
        Ok(ConstantBufferView { handle, desc })
    }

    pub fn vertex_buffer_view(&self, offset: u64, size: u32, stride: u32) -> VertexBufferView {
        VertexBufferView {
            buffer_location: self.resource.gpu_virtual_address() + offset,
            size_in_bytes: size,
            stride_in_bytes: stride,
        }
    }

    /// View of the whole buffer as vertices of `element_size` bytes.
    pub fn full_vertex_buffer_view(&self) -> VertexBufferView {
        self.vertex_buffer_view(0, self.buffer_size as u32, self.element_size)
    }

    pub fn index_buffer_view(&self, offset: u64, size: u32, is_32_bit: bool) -> IndexBufferView {
        IndexBufferView {
            buffer_location: self.resource.gpu_virtual_address() + offset,
            size_in_bytes: size,
            format: if is_32_bit { Format::R32Uint } else { Format::R16Uint },
        }
    }

    /// View of the whole buffer as indices; 4-byte elements select 32-bit indices.
    pub fn full_index_buffer_view(&self) -> IndexBufferView {
        self.index_buffer_view(0, self.buffer_size as u32, self.element_size == 4)
    }

    /// The counter buffer of a structured buffer.
    pub fn counter_buffer(&self) -> Option<&GpuBuffer> {
        match &self.kind {
            BufferKind::Structured { counter } => counter.as_deref(),
            _ => None,
        }
    }

    fn counter_view(
        &mut self,
        context: &mut CommandContext,
        state: ResourceState,
    ) -> DescriptorHandle {
        let BufferKind::Structured { counter: Some(counter) } = &mut self.kind else {
            panic!("buffer '{}' has no counter", self.name);
        };
        context.transition_resource(&mut counter.resource, state, false);
        if state == ResourceState::UNORDERED_ACCESS {
            counter.uav
        } else {
            counter.srv
        }
    }

    /// SRV of the counter, transitioned to `GENERIC_READ` on `context`.
    pub fn counter_srv(&mut self, context: &mut CommandContext) -> DescriptorHandle {
        self.counter_view(context, ResourceState::GENERIC_READ)
    }

    /// UAV of the counter, transitioned to `UNORDERED_ACCESS` on `context`.
    pub fn counter_uav(&mut self, context: &mut CommandContext) -> DescriptorHandle {
        self.counter_view(context, ResourceState::UNORDERED_ACCESS)
    }

    pub fn resource(&self) -> &GpuResource {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut GpuResource {
        &mut self.resource
    }

    pub fn kind(&self) -> &BufferKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn srv(&self) -> DescriptorHandle {
        self.srv
    }

    pub fn uav(&self) -> DescriptorHandle {
        self.uav
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn element_size(&self) -> u32 {
        self.element_size
    }

    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    pub fn gpu_virtual_address(&self) -> u64 {
        self.resource.gpu_virtual_address()
    }

    /// Release the device resource. Descriptor slots stay reserved.
    pub fn destroy(&mut self) {
        if let BufferKind::Structured { counter: Some(counter) } = &mut self.kind {
            counter.destroy();
        }
        self.resource.destroy();
    }
}

fn check_initial_data(
    name: &str,
    data: Option<&[u8]>,
    buffer_size: u64,
) -> Result<(), GraphicsError> {
    match data {
        Some(data) if data.len() as u64 > buffer_size => {
            Err(GraphicsError::InvalidParameter(format!(
                "{} bytes of initial data for buffer '{name}' of {buffer_size} bytes",
                data.len()
            )))
        }
        _ => Ok(()),
    }
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("name", &self.name)
            .field("kind", &self.kind_name())
            .field("element_count", &self.element_count)
            .field("element_size", &self.element_size)
            .field("buffer_size", &self.buffer_size)
            .field("srv", &self.srv)
            .field("uav", &self.uav)
            .finish()
    }
}

static_assertions::assert_impl_all!(GpuBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::GpuResourceHandle;
    use crate::backend::dummy::{DescriptorRecord, DummyDevice};
    use crate::config::GraphicsConfig;
    use crate::resource::ReadbackBuffer;
    use crate::types::{CommandListType, SrvDimension, UavDimension};

    fn device() -> (Arc<DummyDevice>, GraphicsDevice) {
        let dummy = Arc::new(DummyDevice::new());
        let device = GraphicsDevice::new(dummy.clone(), &GraphicsConfig::default()).unwrap();
        (dummy, device)
    }

    fn resource_id(resource: &GpuResource) -> u64 {
        match resource.raw() {
            Some(GpuResourceHandle::Dummy(raw)) => raw.id(),
            _ => panic!("expected a dummy resource"),
        }
    }

    #[test]
    fn byte_address_views_cover_words() {
        let (dummy, device) = device();
        let mut buffer = GpuBuffer::byte_address();
        buffer.create(&device, "raw", 16, 4, None).unwrap();

        match dummy.descriptor(buffer.srv().cpu()) {
            Some(DescriptorRecord::ShaderResource { resource, desc }) => {
                assert_eq!(resource, Some(resource_id(buffer.resource())));
                assert_eq!(desc.format, Format::R32Typeless);
                assert!(matches!(
                    desc.dimension,
                    SrvDimension::Buffer { num_elements: 16, raw: true, .. }
                ));
            }
            other => panic!("unexpected SRV record {other:?}"),
        }
        assert_eq!(buffer.resource().usage_state(), ResourceState::COMMON);
    }

    #[test]
    fn structured_buffer_binds_its_counter() {
        let (dummy, device) = device();
        let mut buffer = GpuBuffer::structured();
        buffer.create(&device, "particles", 10, 16, None).unwrap();

        let counter = buffer.counter_buffer().unwrap();
        assert_eq!(counter.name(), COUNTER_NAME);
        assert_eq!(counter.buffer_size(), 4);

        match dummy.descriptor(buffer.uav().cpu()) {
            Some(DescriptorRecord::UnorderedAccess { counter: bound, desc, .. }) => {
                assert_eq!(bound, Some(resource_id(counter.resource())));
                assert_eq!(desc.format, Format::Unknown);
                assert!(matches!(
                    desc.dimension,
                    UavDimension::Buffer {
                        num_elements: 10,
                        structure_byte_stride: 16,
                        ..
                    }
                ));
            }
            other => panic!("unexpected UAV record {other:?}"),
        }
    }

    #[test]
    fn typed_buffer_uses_its_format() {
        let (dummy, device) = device();
        let mut buffer = GpuBuffer::typed(Format::Rgba16Float);
        buffer.create(&device, "typed", 8, 8, None).unwrap();

        match dummy.descriptor(buffer.srv().cpu()) {
            Some(DescriptorRecord::ShaderResource { desc, .. }) => {
                assert_eq!(desc.format, Format::Rgba16Float);
                assert!(matches!(
                    desc.dimension,
                    SrvDimension::Buffer {
                        num_elements: 8,
                        structure_byte_stride: 0,
                        ..
                    }
                ));
            }
            other => panic!("unexpected SRV record {other:?}"),
        }
    }

    #[test]
    fn recreating_reuses_descriptor_slots() {
        let (_dummy, device) = device();
        let mut buffer = GpuBuffer::byte_address();
        buffer.create(&device, "a", 4, 4, None).unwrap();
        let (srv, uav) = (buffer.srv(), buffer.uav());

        buffer.create(&device, "b", 8, 4, None).unwrap();
        assert_eq!(buffer.srv(), srv);
        assert_eq!(buffer.uav(), uav);
        assert_eq!(buffer.name(), "b");
    }

    #[test]
    fn initial_data_is_uploaded() {
        let (_dummy, device) = device();
        let values: Vec<u32> = (0..4).collect();
        let mut buffer = GpuBuffer::byte_address();
        buffer
            .create(&device, "init", 4, 4, Some(bytemuck::cast_slice(&values)))
            .unwrap();
        assert_eq!(buffer.resource().usage_state(), ResourceState::GENERIC_READ);

        let readback = ReadbackBuffer::create(&device, "readback", 4, 4).unwrap();
        let mut context = device.begin_context(CommandListType::Direct, "readback").unwrap();
        context.copy_buffer_region(readback.resource(), 0, buffer.resource(), 0, 16);
        context.finish(true).unwrap();
        assert_eq!(readback.read().unwrap(), bytemuck::cast_slice::<u32, u8>(&values));
    }

    #[test]
    fn oversized_initial_data_is_rejected() {
        let (_dummy, device) = device();
        let mut buffer = GpuBuffer::byte_address();
        let result = buffer.create(&device, "small", 1, 4, Some(&[0; 8]));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn buffer_from_upload_copies_the_range() {
        let (_dummy, device) = device();
        let upload = UploadBuffer::create(&device, "staging", 16).unwrap();
        upload.write(0, &[9; 16]).unwrap();

        let mut buffer = GpuBuffer::typed(Format::R32Uint);
        buffer.create_from_upload(&device, "typed", 2, 4, &upload, 8).unwrap();
        assert_eq!(buffer.resource().usage_state(), ResourceState::GENERIC_READ);
        assert!(buffer.create_from_upload(&device, "typed", 4, 4, &upload, 8).is_err());
    }

    #[test]
    fn placed_buffers_live_in_the_heap() {
        let (_dummy, device) = device();
        let heap = GpuHeap::create(&device, "heap", 1 << 20, HeapType::Default).unwrap();
        let mut buffer = GpuBuffer::byte_address();
        buffer
            .create_placed(&device, "placed", &heap, 0, 64, 4, Some(&[1; 256]))
            .unwrap();
        assert!(buffer.resource().is_allocated());
        assert!(!buffer.srv().is_null());
    }

    #[test]
    fn constant_buffer_view_rounds_size() {
        let (dummy, device) = device();
        let mut buffer = GpuBuffer::byte_address();
        buffer.create(&device, "constants", 4, 4, None).unwrap();

        let view = buffer.create_constant_buffer_view(&device, 0, 10).unwrap();
        assert_eq!(view.desc.size_in_bytes, 16);
        assert_eq!(view.desc.buffer_location, buffer.gpu_virtual_address());
        assert_eq!(
            dummy.descriptor(view.handle.cpu()),
            Some(DescriptorRecord::ConstantBuffer(view.desc))
        );

        let second = buffer.create_constant_buffer_view(&device, 0, 16).unwrap();
        assert_ne!(second.handle, view.handle);
    }

    #[test]
    #[should_panic(expected = "exceeds buffer")]
    fn constant_buffer_view_out_of_bounds_panics() {
        let (_dummy, device) = device();
        let mut buffer = GpuBuffer::byte_address();
        buffer.create(&device, "constants", 4, 4, None).unwrap();
        let _ = buffer.create_constant_buffer_view(&device, 8, 16);
    }

    #[test]
    #[should_panic(expected = "zero size")]
    fn zero_sized_buffer_panics() {
        let (_dummy, device) = device();
        let _ = GpuBuffer::structured().create(&device, "empty", 0, 16, None);
    }

    #[test]
    fn counter_views_transition_the_counter() {
        let (_dummy, device) = device();
        let mut buffer = GpuBuffer::structured();
        buffer.create(&device, "append", 4, 8, None).unwrap();

        let mut context = device.begin_context(CommandListType::Direct, "counter").unwrap();
        let uav = buffer.counter_uav(&mut context);
        assert_eq!(uav, buffer.counter_buffer().unwrap().uav());
        assert_eq!(
            buffer.counter_buffer().unwrap().resource().usage_state(),
            ResourceState::UNORDERED_ACCESS
        );

        let srv = buffer.counter_srv(&mut context);
        assert_eq!(srv, buffer.counter_buffer().unwrap().srv());
        assert_eq!(
            buffer.counter_buffer().unwrap().resource().usage_state(),
            ResourceState::GENERIC_READ
        );
        assert_eq!(buffer.resource().usage_state(), ResourceState::COMMON);
        context.finish(true).unwrap();
    }

    #[test]
    fn index_views_pick_width_from_element_size() {
        let (_dummy, device) = device();
        let mut indices = GpuBuffer::byte_address();
        indices.create(&device, "indices", 6, 2, None).unwrap();
        assert_eq!(indices.full_index_buffer_view().format, Format::R16Uint);
        assert_eq!(indices.full_index_buffer_view().size_in_bytes, 12);

        let vertices = indices.vertex_buffer_view(4, 8, 2);
        assert_eq!(vertices.buffer_location, indices.gpu_virtual_address() + 4);
    }
}
