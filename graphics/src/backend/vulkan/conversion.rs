//! Conversions from engine types to Vulkan types.

use ash::vk;

use crate::types::{Format, ResourceDesc, ResourceFlags, ResourceState};

/// Vulkan format for `format`.
///
/// Vulkan has no typeless formats; a typeless family maps to the member
/// the resource is most commonly viewed through and the image is created
/// with `MUTABLE_FORMAT`.
pub fn convert_format(format: Format) -> vk::Format {
    use Format::*;
    match format {
        Unknown => vk::Format::UNDEFINED,

        R8Unorm => vk::Format::R8_UNORM,
        R8Uint => vk::Format::R8_UINT,
        Rg8Unorm => vk::Format::R8G8_UNORM,

        R16Typeless | R16Unorm => vk::Format::R16_UNORM,
        R16Uint => vk::Format::R16_UINT,
        R16Float => vk::Format::R16_SFLOAT,
        D16Unorm => vk::Format::D16_UNORM,

        Rgba8Typeless | Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        Bgra8Typeless | Bgra8Unorm | Bgrx8Typeless | Bgrx8Unorm => vk::Format::B8G8R8A8_UNORM,
        Bgra8UnormSrgb | Bgrx8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
        Rgb10A2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        Rg11B10Float => vk::Format::B10G11R11_UFLOAT_PACK32,
        Rg16Float => vk::Format::R16G16_SFLOAT,
        R32Typeless | R32Float => vk::Format::R32_SFLOAT,
        R32Uint => vk::Format::R32_UINT,
        R32Sint => vk::Format::R32_SINT,
        D32Float => vk::Format::D32_SFLOAT,
        R24G8Typeless | D24UnormS8Uint | R24UnormX8Typeless | X24TypelessG8Uint => {
            vk::Format::D24_UNORM_S8_UINT
        }

        Rgba16Typeless | Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
        Rg32Float => vk::Format::R32G32_SFLOAT,
        R32G8X24Typeless | D32FloatS8X24Uint | R32FloatX8X24Typeless | X32TypelessG8X24Uint => {
            vk::Format::D32_SFLOAT_S8_UINT
        }

        Rgb32Float => vk::Format::R32G32B32_SFLOAT,
        Rgba32Typeless | Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
        Rgba32Uint => vk::Format::R32G32B32A32_UINT,
    }
}

fn is_typeless(format: Format) -> bool {
    use Format::*;
    matches!(
        format,
        R16Typeless
            | Rgba8Typeless
            | Bgra8Typeless
            | Bgrx8Typeless
            | R32Typeless
            | R24G8Typeless
            | Rgba16Typeless
            | R32G8X24Typeless
            | Rgba32Typeless
    )
}

/// Image aspects covered by `format`.
pub fn aspect_mask(format: Format) -> vk::ImageAspectFlags {
    match convert_format(format) {
        vk::Format::D16_UNORM | vk::Format::D32_SFLOAT => vk::ImageAspectFlags::DEPTH,
        vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}

/// Aspect an image view in `format` reads. Depth-stencil resources are
/// sampled one plane at a time.
pub fn view_aspect(format: Format) -> vk::ImageAspectFlags {
    if format.stencil_format() == format && format != Format::Unknown {
        vk::ImageAspectFlags::STENCIL
    } else if aspect_mask(format).contains(vk::ImageAspectFlags::DEPTH) {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Every buffer can be copied, bound and addressed from shaders.
pub fn buffer_usage() -> vk::BufferUsageFlags {
    vk::BufferUsageFlags::TRANSFER_SRC
        | vk::BufferUsageFlags::TRANSFER_DST
        | vk::BufferUsageFlags::UNIFORM_BUFFER
        | vk::BufferUsageFlags::STORAGE_BUFFER
        | vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER
        | vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER
        | vk::BufferUsageFlags::VERTEX_BUFFER
        | vk::BufferUsageFlags::INDEX_BUFFER
        | vk::BufferUsageFlags::INDIRECT_BUFFER
        | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
}

pub fn image_usage(flags: ResourceFlags) -> vk::ImageUsageFlags {
    let mut usage = vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
    if !flags.contains(ResourceFlags::DENY_SHADER_RESOURCE) {
        usage |= vk::ImageUsageFlags::SAMPLED;
    }
    if flags.contains(ResourceFlags::ALLOW_UNORDERED_ACCESS) {
        usage |= vk::ImageUsageFlags::STORAGE;
    }
    if flags.contains(ResourceFlags::ALLOW_RENDER_TARGET) {
        usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if flags.contains(ResourceFlags::ALLOW_DEPTH_STENCIL) {
        usage |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    usage
}

pub fn image_create_flags(desc: &ResourceDesc) -> vk::ImageCreateFlags {
    let mut flags = vk::ImageCreateFlags::empty();
    if is_typeless(desc.format) {
        flags |= vk::ImageCreateFlags::MUTABLE_FORMAT;
    }
    if desc.depth_or_array_size % 6 == 0 && desc.width == desc.height as u64 {
        flags |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
    }
    flags
}

/// Image layout a resource in `state` must be in.
pub fn image_layout(state: ResourceState) -> vk::ImageLayout {
    if state.contains(ResourceState::RENDER_TARGET) {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    } else if state.contains(ResourceState::DEPTH_WRITE) {
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    } else if state.contains(ResourceState::UNORDERED_ACCESS) {
        vk::ImageLayout::GENERAL
    } else if state.contains(ResourceState::COPY_DEST) {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL
    } else if state == ResourceState::COPY_SOURCE {
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL
    } else if state.contains(ResourceState::DEPTH_READ) {
        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
    } else if state.intersects(
        ResourceState::PIXEL_SHADER_RESOURCE | ResourceState::NON_PIXEL_SHADER_RESOURCE,
    ) {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    } else {
        vk::ImageLayout::GENERAL
    }
}

/// Accesses and pipeline stages a resource in `state` takes part in.
pub fn access_and_stages(state: ResourceState) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    const TABLE: [(ResourceState, vk::AccessFlags, vk::PipelineStageFlags); 11] = [
        (
            ResourceState::VERTEX_AND_CONSTANT_BUFFER,
            vk::AccessFlags::from_raw(
                vk::AccessFlags::VERTEX_ATTRIBUTE_READ.as_raw()
                    | vk::AccessFlags::UNIFORM_READ.as_raw(),
            ),
            vk::PipelineStageFlags::from_raw(
                vk::PipelineStageFlags::VERTEX_INPUT.as_raw()
                    | vk::PipelineStageFlags::VERTEX_SHADER.as_raw()
                    | vk::PipelineStageFlags::FRAGMENT_SHADER.as_raw()
                    | vk::PipelineStageFlags::COMPUTE_SHADER.as_raw(),
            ),
        ),
        (
            ResourceState::INDEX_BUFFER,
            vk::AccessFlags::INDEX_READ,
            vk::PipelineStageFlags::VERTEX_INPUT,
        ),
        (
            ResourceState::RENDER_TARGET,
            vk::AccessFlags::from_raw(
                vk::AccessFlags::COLOR_ATTACHMENT_READ.as_raw()
                    | vk::AccessFlags::COLOR_ATTACHMENT_WRITE.as_raw(),
            ),
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        (
            ResourceState::UNORDERED_ACCESS,
            vk::AccessFlags::from_raw(
                vk::AccessFlags::SHADER_READ.as_raw() | vk::AccessFlags::SHADER_WRITE.as_raw(),
            ),
            vk::PipelineStageFlags::from_raw(
                vk::PipelineStageFlags::COMPUTE_SHADER.as_raw()
                    | vk::PipelineStageFlags::FRAGMENT_SHADER.as_raw(),
            ),
        ),
        (
            ResourceState::DEPTH_WRITE,
            vk::AccessFlags::from_raw(
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
            ),
            vk::PipelineStageFlags::from_raw(
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS.as_raw()
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS.as_raw(),
            ),
        ),
        (
            ResourceState::DEPTH_READ,
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        ),
        (
            ResourceState::NON_PIXEL_SHADER_RESOURCE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::from_raw(
                vk::PipelineStageFlags::VERTEX_SHADER.as_raw()
                    | vk::PipelineStageFlags::COMPUTE_SHADER.as_raw(),
            ),
        ),
        (
            ResourceState::PIXEL_SHADER_RESOURCE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        (
            ResourceState::INDIRECT_ARGUMENT,
            vk::AccessFlags::INDIRECT_COMMAND_READ,
            vk::PipelineStageFlags::DRAW_INDIRECT,
        ),
        (
            ResourceState::COPY_DEST,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        (
            ResourceState::COPY_SOURCE,
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        ),
    ];

    let mut access = vk::AccessFlags::empty();
    let mut stages = vk::PipelineStageFlags::empty();
    for (bit, bit_access, bit_stages) in TABLE {
        if state.contains(bit) {
            access |= bit_access;
            stages |= bit_stages;
        }
    }
    if stages.is_empty() {
        // COMMON: synchronize with everything.
        access = vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE;
        stages = vk::PipelineStageFlags::ALL_COMMANDS;
    }
    (access, stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typeless_families_share_a_format() {
        assert_eq!(convert_format(Format::R24G8Typeless), vk::Format::D24_UNORM_S8_UINT);
        assert_eq!(convert_format(Format::R32Typeless), convert_format(Format::R32Float));
        assert_eq!(convert_format(Format::Rgba8UnormSrgb), vk::Format::R8G8B8A8_SRGB);
        assert_eq!(convert_format(Format::Unknown), vk::Format::UNDEFINED);
    }

    #[test]
    fn depth_formats_have_depth_aspects() {
        assert_eq!(aspect_mask(Format::D32Float), vk::ImageAspectFlags::DEPTH);
        assert!(aspect_mask(Format::D24UnormS8Uint).contains(vk::ImageAspectFlags::STENCIL));
        assert_eq!(aspect_mask(Format::Rgba8Unorm), vk::ImageAspectFlags::COLOR);
    }

    #[test]
    fn depth_stencil_views_read_one_plane() {
        assert_eq!(view_aspect(Format::R24UnormX8Typeless), vk::ImageAspectFlags::DEPTH);
        assert_eq!(view_aspect(Format::X24TypelessG8Uint), vk::ImageAspectFlags::STENCIL);
        assert_eq!(view_aspect(Format::Rgba8UnormSrgb), vk::ImageAspectFlags::COLOR);
    }

    #[test]
    fn states_map_to_layouts() {
        assert_eq!(image_layout(ResourceState::COPY_DEST), vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(image_layout(ResourceState::COPY_SOURCE), vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        assert_eq!(
            image_layout(ResourceState::GENERIC_READ),
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        );
        assert_eq!(image_layout(ResourceState::UNORDERED_ACCESS), vk::ImageLayout::GENERAL);
        assert_eq!(image_layout(ResourceState::COMMON), vk::ImageLayout::GENERAL);
    }

    #[test]
    fn common_state_synchronizes_everything() {
        let (access, stages) = access_and_stages(ResourceState::COMMON);
        assert_eq!(stages, vk::PipelineStageFlags::ALL_COMMANDS);
        assert!(access.contains(vk::AccessFlags::MEMORY_WRITE));

        let (access, stages) = access_and_stages(ResourceState::COPY_DEST);
        assert_eq!(access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(stages, vk::PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn typeless_images_are_mutable() {
        let desc = ResourceDesc::texture_2d(4, 4, 1, Format::R24G8Typeless);
        assert!(image_create_flags(&desc).contains(vk::ImageCreateFlags::MUTABLE_FORMAT));
        let desc = ResourceDesc::texture_2d(4, 4, 6, Format::Rgba8Unorm);
        assert_eq!(image_create_flags(&desc), vk::ImageCreateFlags::CUBE_COMPATIBLE);
    }

    #[test]
    fn image_usage_follows_flags() {
        let usage = image_usage(ResourceFlags::ALLOW_UNORDERED_ACCESS);
        assert!(usage.contains(vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::SAMPLED));
        let usage =
            image_usage(ResourceFlags::DENY_SHADER_RESOURCE | ResourceFlags::ALLOW_DEPTH_STENCIL);
        assert!(!usage.contains(vk::ImageUsageFlags::SAMPLED));
        assert!(usage.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
    }
}
