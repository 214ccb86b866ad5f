use super::Format;

/// Shape of a shader resource view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrvDimension {
    Buffer {
        first_element: u64,
        num_elements: u32,
        structure_byte_stride: u32,
        /// Raw (byte address) view.
        raw: bool,
    },
    Texture2D {
        mip_levels: u32,
    },
    Texture2DArray {
        mip_levels: u32,
        array_size: u32,
    },
    TextureCube {
        mip_levels: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderResourceViewDesc {
    pub format: Format,
    pub dimension: SrvDimension,
}

/// Shape of an unordered access view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UavDimension {
    Buffer {
        first_element: u64,
        num_elements: u32,
        structure_byte_stride: u32,
        counter_offset_in_bytes: u64,
        raw: bool,
    },
    Texture2D {
        mip_slice: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnorderedAccessViewDesc {
    pub format: Format,
    pub dimension: UavDimension,
}

/// Constant buffer view: a 16-byte aligned window into a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBufferViewDesc {
    pub buffer_location: u64,
    pub size_in_bytes: u32,
}

impl ShaderResourceViewDesc {
    pub fn buffer(format: Format, num_elements: u32, stride: u32, raw: bool) -> Self {
        Self {
            format,
            dimension: SrvDimension::Buffer {
                first_element: 0,
                num_elements,
                structure_byte_stride: stride,
                raw,
            },
        }
    }

    pub fn texture_2d(format: Format, mip_levels: u32) -> Self {
        Self { format, dimension: SrvDimension::Texture2D { mip_levels } }
    }

    pub fn texture_cube(format: Format, mip_levels: u32) -> Self {
        Self { format, dimension: SrvDimension::TextureCube { mip_levels } }
    }
}

impl UnorderedAccessViewDesc {
    pub fn buffer(format: Format, num_elements: u32, stride: u32, raw: bool) -> Self {
        Self {
            format,
            dimension: UavDimension::Buffer {
                first_element: 0,
                num_elements,
                structure_byte_stride: stride,
                counter_offset_in_bytes: 0,
                raw,
            },
        }
    }
}
