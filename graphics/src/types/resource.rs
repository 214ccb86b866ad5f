use bitflags::bitflags;

use super::Format;

/// GPU virtual address of a resource that has not been created yet.
pub const GPU_VIRTUAL_ADDRESS_UNKNOWN: u64 = u64::MAX;

/// Memory pool a resource lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HeapType {
    /// Device-local memory, not CPU accessible.
    #[default]
    Default,
    /// CPU-writable memory read by the GPU.
    Upload,
    /// GPU-writable memory read back by the CPU.
    Readback,
}

impl HeapType {
    pub const fn is_cpu_visible(self) -> bool {
        !matches!(self, Self::Default)
    }
}

bitflags! {
    /// Extra capabilities requested at resource creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceFlags: u32 {
        const ALLOW_RENDER_TARGET = 1 << 0;
        const ALLOW_DEPTH_STENCIL = 1 << 1;
        const ALLOW_UNORDERED_ACCESS = 1 << 2;
        const DENY_SHADER_RESOURCE = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDimension {
    Buffer,
    Texture2D,
}

/// Shape and format of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDesc {
    pub dimension: ResourceDimension,
    /// Byte size for buffers, texel width for textures.
    pub width: u64,
    pub height: u32,
    pub depth_or_array_size: u16,
    pub mip_levels: u16,
    pub format: Format,
    pub flags: ResourceFlags,
}

impl ResourceDesc {
    pub fn buffer(size: u64, flags: ResourceFlags) -> Self {
        Self {
            dimension: ResourceDimension::Buffer,
            width: size,
            height: 1,
            depth_or_array_size: 1,
            mip_levels: 1,
            format: Format::Unknown,
            flags,
        }
    }

    pub fn texture_2d(width: u32, height: u32, array_size: u16, format: Format) -> Self {
        Self {
            dimension: ResourceDimension::Texture2D,
            width: width as u64,
            height,
            depth_or_array_size: array_size,
            mip_levels: 1,
            format,
            flags: ResourceFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: ResourceFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_mip_levels(mut self, mip_levels: u16) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    pub fn is_buffer(&self) -> bool {
        self.dimension == ResourceDimension::Buffer
    }

    /// Bytes of backing storage the top mip of every array slice needs.
    pub fn byte_size(&self) -> u64 {
        match self.dimension {
            ResourceDimension::Buffer => self.width,
            ResourceDimension::Texture2D => {
                self.width
                    * self.height as u64
                    * self.depth_or_array_size as u64
                    * self.format.bytes_per_pixel() as u64
            }
        }
    }
}

/// Creation parameters for a memory heap that placed resources are carved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapDesc {
    pub size_in_bytes: u64,
    pub heap_type: HeapType,
}

/// Initial contents of one texture subresource.
#[derive(Debug, Clone, Copy)]
pub struct SubresourceData<'a> {
    pub data: &'a [u8],
    /// Bytes between the starts of two rows.
    pub row_pitch: usize,
    /// Bytes between the starts of two depth slices.
    pub slice_pitch: usize,
}
