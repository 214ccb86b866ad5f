//! Pixel resources.

use crate::command::CommandContext;
use crate::descriptor::DescriptorHandle;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::{
    DescriptorHeapType, Format, HeapType, ResourceDesc, ResourceState, ShaderResourceViewDesc,
    SubresourceData,
};

use super::GpuResource;

/// A 2D or cube texture with a single shader resource view.
pub struct Texture {
    resource: GpuResource,
    name: String,
    width: u32,
    height: u32,
    depth: u32,
    format: Format,
    srv: DescriptorHandle,
}

impl Texture {
    /// Create a 2D texture from tightly or loosely packed rows.
    ///
    /// `row_pitch` is the byte distance between rows in `data`.
    pub fn create_2d(
        device: &GraphicsDevice,
        name: &str,
        row_pitch: usize,
        width: u32,
        height: u32,
        format: Format,
        data: &[u8],
    ) -> Result<Self, GraphicsError> {
        let subresource = SubresourceData {
            data,
            row_pitch,
            slice_pitch: row_pitch * height as usize,
        };
        Self::create(
            device,
            name,
            ResourceDesc::texture_2d(width, height, 1, format),
            &[subresource],
            ShaderResourceViewDesc::texture_2d(format, 1),
        )
    }

    /// Create a cube texture. `data` holds the six faces back to back, each
    /// `row_pitch * height` bytes.
    pub fn create_cube(
        device: &GraphicsDevice,
        name: &str,
        row_pitch: usize,
        width: u32,
        height: u32,
        format: Format,
        data: &[u8],
    ) -> Result<Self, GraphicsError> {
        let face_bytes = row_pitch * height as usize;
        if data.len() < face_bytes * 6 {
            return Err(GraphicsError::InvalidParameter(format!(
                "cube texture '{name}' needs {} bytes, got {}",
                face_bytes * 6,
                data.len()
            )));
        }
        let faces: Vec<SubresourceData<'_>> = data
            .chunks_exact(face_bytes)
            .take(6)
            .map(|face| SubresourceData {
                data: face,
                row_pitch,
                slice_pitch: face_bytes,
            })
            .collect();
        Self::create(
            device,
            name,
            ResourceDesc::texture_2d(width, height, 6, format),
            &faces,
            ShaderResourceViewDesc::texture_cube(format, 1),
        )
    }

    fn create(
        device: &GraphicsDevice,
        name: &str,
        desc: ResourceDesc,
        subresources: &[SubresourceData<'_>],
        view: ShaderResourceViewDesc,
    ) -> Result<Self, GraphicsError> {
        let raw = device
            .raw()
            .create_committed_resource(&desc, HeapType::Default, ResourceState::COPY_DEST, name)?;
        let mut resource = GpuResource::from_raw(raw, ResourceState::COPY_DEST);
        CommandContext::initialize_texture(device, &mut resource, subresources)?;

        let srv = device.allocate_descriptor(DescriptorHeapType::CbvSrvUav, 1)?;
        device
            .raw()
            .create_shader_resource_view(resource.raw(), &view, srv.cpu())?;
        log::debug!(
            "Texture '{}': {}x{}x{} {:?}",
            name,
            desc.width,
            desc.height,
            desc.depth_or_array_size,
            desc.format
        );

        Ok(Self {
            resource,
            name: name.to_owned(),
            width: desc.width as u32,
            height: desc.height,
            depth: desc.depth_or_array_size as u32,
            format: desc.format,
            srv,
        })
    }

    /// Create a texture from an uncompressed 24- or 32-bit TGA image.
    pub fn create_tga_from_memory(
        device: &GraphicsDevice,
        name: &str,
        bytes: &[u8],
        srgb: bool,
    ) -> Result<Self, GraphicsError> {
        let image = decode_tga(bytes).map_err(|reason| {
            let message = format!("'{name}' is not a supported TGA image: {reason}");
            GraphicsError::InvalidParameter(message)
        })?;
        Self::create_rgba8(device, name, image.width, image.height, &image.pixels, srgb)
    }

    /// Decode an encoded image (PNG, TGA, DDS) into an RGBA8 texture.
    ///
    /// `extension` selects the decoder when given; otherwise the format is
    /// guessed from the leading bytes.
    pub fn create_from_memory(
        device: &GraphicsDevice,
        name: &str,
        bytes: &[u8],
        extension: Option<&str>,
        srgb: bool,
    ) -> Result<Self, GraphicsError> {
        let rgba = decode_image(bytes, extension).map_err(|e| {
            GraphicsError::InvalidParameter(format!("failed to decode '{name}': {e}"))
        })?;
        let (width, height) = rgba.dimensions();
        Self::create_rgba8(device, name, width, height, rgba.as_raw(), srgb)
    }

    fn create_rgba8(
        device: &GraphicsDevice,
        name: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
        srgb: bool,
    ) -> Result<Self, GraphicsError> {
        let format = if srgb { Format::Rgba8UnormSrgb } else { Format::Rgba8Unorm };
        Self::create_2d(device, name, width as usize * 4, width, height, format, pixels)
    }

    pub fn resource(&self) -> &GpuResource {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut GpuResource {
        &mut self.resource
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn srv(&self) -> DescriptorHandle {
        self.srv
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Array size: 1 for 2D textures, 6 for cubes.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Release the device resource. The descriptor slot stays reserved.
    pub fn destroy(&mut self) {
        self.resource.destroy();
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.depth)
            .field("format", &self.format)
            .field("srv", &self.srv)
            .finish()
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);

fn decode_image(bytes: &[u8], extension: Option<&str>) -> image::ImageResult<image::RgbaImage> {
    let hinted = extension.and_then(image::ImageFormat::from_extension);
    let decoded = match hinted {
        Some(format) => image::load_from_memory_with_format(bytes, format)
            .or_else(|_| image::load_from_memory(bytes)),
        None => image::load_from_memory(bytes),
    }?;
    Ok(decoded.to_rgba8())
}

struct TgaImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

const TGA_HEADER_LEN: usize = 18;
const TGA_UNCOMPRESSED_TRUE_COLOR: u8 = 2;
const TGA_TOP_LEFT_ORIGIN: u8 = 0x20;

/// Read an uncompressed true-color TGA into tightly packed RGBA8 rows.
fn decode_tga(bytes: &[u8]) -> Result<TgaImage, &'static str> {
    if bytes.len() < TGA_HEADER_LEN {
        return Err("truncated header");
    }
    let id_length = bytes[0] as usize;
    let color_map_type = bytes[1];
    let image_type = bytes[2];
    let width = u16::from_le_bytes([bytes[12], bytes[13]]) as u32;
    let height = u16::from_le_bytes([bytes[14], bytes[15]]) as u32;
    let bits_per_pixel = bytes[16];
    let descriptor = bytes[17];

    if image_type != TGA_UNCOMPRESSED_TRUE_COLOR || color_map_type != 0 {
        return Err("only uncompressed true-color images are supported");
    }
    let bytes_per_pixel = match bits_per_pixel {
        24 => 3,
        32 => 4,
        _ => return Err("only 24- and 32-bit pixels are supported"),
    };
    if width == 0 || height == 0 {
        return Err("empty image");
    }

    let start = TGA_HEADER_LEN + id_length;
    let row_bytes = width as usize * bytes_per_pixel;
    let Some(body) = bytes.get(start..start + row_bytes * height as usize) else {
        return Err("truncated pixel data");
    };

    let top_down = descriptor & TGA_TOP_LEFT_ORIGIN != 0;
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for row in 0..height as usize {
        let source_row = if top_down { row } else { height as usize - 1 - row };
        for bgra in body[source_row * row_bytes..][..row_bytes].chunks_exact(bytes_per_pixel) {
            let alpha = if bytes_per_pixel == 4 { bgra[3] } else { 0xff };
            pixels.extend_from_slice(&[bgra[2], bgra[1], bgra[0], alpha]);
        }
    }

    Ok(TgaImage {
        width,
        height,
        pixels,
    })
}
