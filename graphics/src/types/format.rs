//! Pixel and element formats.
//!
//! Typeless families share storage between several typed interpretations
//! (a depth buffer read as a float texture, an sRGB texture written through an
//! unorm UAV). The mapping helpers below pick the right member of a family for
//! each kind of view.

/// Element format of a texture, typed buffer or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// No format: structured buffers and format-less views.
    #[default]
    Unknown,

    // 8-bit
    R8Unorm,
    R8Uint,
    Rg8Unorm,

    // 16-bit
    R16Typeless,
    R16Unorm,
    R16Uint,
    R16Float,
    D16Unorm,

    // 32-bit
    Rgba8Typeless,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Typeless,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Bgrx8Typeless,
    Bgrx8Unorm,
    Bgrx8UnormSrgb,
    Rgb10A2Unorm,
    Rg11B10Float,
    Rg16Float,
    R32Typeless,
    R32Float,
    R32Uint,
    R32Sint,
    D32Float,
    R24G8Typeless,
    D24UnormS8Uint,
    R24UnormX8Typeless,
    X24TypelessG8Uint,

    // 64-bit
    Rgba16Typeless,
    Rgba16Float,
    Rg32Float,
    R32G8X24Typeless,
    D32FloatS8X24Uint,
    R32FloatX8X24Typeless,
    X32TypelessG8X24Uint,

    // 96/128-bit
    Rgb32Float,
    Rgba32Typeless,
    Rgba32Float,
    Rgba32Uint,
}

impl Format {
    /// Size of one element in bytes, 0 for [`Format::Unknown`].
    pub const fn bytes_per_pixel(self) -> u32 {
        use Format::*;
        match self {
            Unknown => 0,
            R8Unorm | R8Uint => 1,
            Rg8Unorm | R16Typeless | R16Unorm | R16Uint | R16Float | D16Unorm => 2,
            Rgba8Typeless | Rgba8Unorm | Rgba8UnormSrgb | Bgra8Typeless | Bgra8Unorm
            | Bgra8UnormSrgb | Bgrx8Typeless | Bgrx8Unorm | Bgrx8UnormSrgb | Rgb10A2Unorm
            | Rg11B10Float | Rg16Float | R32Typeless | R32Float | R32Uint | R32Sint | D32Float
            | R24G8Typeless | D24UnormS8Uint | R24UnormX8Typeless | X24TypelessG8Uint => 4,
            Rgba16Typeless | Rgba16Float | Rg32Float | R32G8X24Typeless | D32FloatS8X24Uint
            | R32FloatX8X24Typeless | X32TypelessG8X24Uint => 8,
            Rgb32Float => 12,
            Rgba32Typeless | Rgba32Float | Rgba32Uint => 16,
        }
    }

    pub const fn is_srgb(self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb | Self::Bgrx8UnormSrgb)
    }

    pub const fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            Self::D16Unorm | Self::D32Float | Self::D24UnormS8Uint | Self::D32FloatS8X24Uint
        )
    }

    /// sRGB variant of a unorm color format, or `self` when there is none.
    pub const fn to_srgb(self) -> Format {
        match self {
            Self::Rgba8Unorm => Self::Rgba8UnormSrgb,
            Self::Bgra8Unorm => Self::Bgra8UnormSrgb,
            Self::Bgrx8Unorm => Self::Bgrx8UnormSrgb,
            other => other,
        }
    }

    /// Typeless family the format belongs to; the format a resource is
    /// created with when it will be viewed through several typed formats.
    pub const fn base_format(self) -> Format {
        use Format::*;
        match self {
            Rgba8Unorm | Rgba8UnormSrgb => Rgba8Typeless,
            Bgra8Unorm | Bgra8UnormSrgb => Bgra8Typeless,
            Bgrx8Unorm | Bgrx8UnormSrgb => Bgrx8Typeless,
            D32FloatS8X24Uint | R32FloatX8X24Typeless | X32TypelessG8X24Uint => R32G8X24Typeless,
            D32Float | R32Float => R32Typeless,
            D24UnormS8Uint | R24UnormX8Typeless | X24TypelessG8Uint => R24G8Typeless,
            D16Unorm | R16Unorm => R16Typeless,
            other => other,
        }
    }

    /// Format usable for an unordered access view of this resource.
    ///
    /// # Panics
    ///
    /// Panics for depth-stencil families, which cannot be bound as UAVs.
    pub fn uav_format(self) -> Format {
        use Format::*;
        match self {
            Rgba8Typeless | Rgba8Unorm | Rgba8UnormSrgb => Rgba8Unorm,
            Bgra8Typeless | Bgra8Unorm | Bgra8UnormSrgb => Bgra8Unorm,
            Bgrx8Typeless | Bgrx8Unorm | Bgrx8UnormSrgb => Bgrx8Unorm,
            R32Typeless | R32Float => R32Float,
            R32G8X24Typeless | D32FloatS8X24Uint | R32FloatX8X24Typeless | X32TypelessG8X24Uint
            | D32Float | R24G8Typeless | D24UnormS8Uint | R24UnormX8Typeless | X24TypelessG8Uint
            | D16Unorm => panic!("requested a UAV format for depth-stencil format {self:?}"),
            other => other,
        }
    }

    /// Format of a depth-stencil view over this resource.
    pub const fn dsv_format(self) -> Format {
        use Format::*;
        match self {
            R32G8X24Typeless | D32FloatS8X24Uint | R32FloatX8X24Typeless | X32TypelessG8X24Uint => {
                D32FloatS8X24Uint
            }
            R32Typeless | D32Float | R32Float => D32Float,
            R24G8Typeless | D24UnormS8Uint | R24UnormX8Typeless | X24TypelessG8Uint => {
                D24UnormS8Uint
            }
            R16Typeless | D16Unorm | R16Unorm => D16Unorm,
            other => other,
        }
    }

    /// Format for sampling the depth plane, [`Format::Unknown`] if there is none.
    pub const fn depth_format(self) -> Format {
        use Format::*;
        match self {
            R32G8X24Typeless | D32FloatS8X24Uint | R32FloatX8X24Typeless | X32TypelessG8X24Uint => {
                R32FloatX8X24Typeless
            }
            R32Typeless | D32Float | R32Float => R32Float,
            R24G8Typeless | D24UnormS8Uint | R24UnormX8Typeless | X24TypelessG8Uint => {
                R24UnormX8Typeless
            }
            R16Typeless | D16Unorm | R16Unorm => R16Unorm,
            _ => Unknown,
        }
    }

    /// Format for sampling the stencil plane, [`Format::Unknown`] if there is none.
    pub const fn stencil_format(self) -> Format {
        use Format::*;
        match self {
            R32G8X24Typeless | D32FloatS8X24Uint | R32FloatX8X24Typeless | X32TypelessG8X24Uint => {
                X32TypelessG8X24Uint
            }
            R24G8Typeless | D24UnormS8Uint | R24UnormX8Typeless | X24TypelessG8Uint => {
                X24TypelessG8Uint
            }
            _ => Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_family_mapping() {
        for format in [Format::D24UnormS8Uint, Format::R24G8Typeless, Format::R24UnormX8Typeless] {
            assert_eq!(format.base_format(), Format::R24G8Typeless);
            assert_eq!(format.dsv_format(), Format::D24UnormS8Uint);
            assert_eq!(format.depth_format(), Format::R24UnormX8Typeless);
            assert_eq!(format.stencil_format(), Format::X24TypelessG8Uint);
        }
        assert_eq!(Format::D32Float.stencil_format(), Format::Unknown);
        assert_eq!(Format::D32Float.depth_format(), Format::R32Float);
    }

    #[test]
    fn color_uav_formats_drop_srgb() {
        assert_eq!(Format::Rgba8UnormSrgb.uav_format(), Format::Rgba8Unorm);
        assert_eq!(Format::Bgra8Typeless.uav_format(), Format::Bgra8Unorm);
        assert_eq!(Format::Rgba16Float.uav_format(), Format::Rgba16Float);
        assert_eq!(Format::Rgba8Unorm.base_format(), Format::Rgba8Typeless);
    }

    #[test]
    #[should_panic(expected = "depth-stencil")]
    fn depth_uav_format_panics() {
        Format::D32Float.uav_format();
    }

    #[test]
    fn bytes_per_pixel() {
        assert_eq!(Format::Unknown.bytes_per_pixel(), 0);
        assert_eq!(Format::R8Unorm.bytes_per_pixel(), 1);
        assert_eq!(Format::Rgba8UnormSrgb.bytes_per_pixel(), 4);
        assert_eq!(Format::D32FloatS8X24Uint.bytes_per_pixel(), 8);
        assert_eq!(Format::Rgba32Float.bytes_per_pixel(), 16);
    }

    #[test]
    fn srgb_conversion() {
        assert_eq!(Format::Rgba8Unorm.to_srgb(), Format::Rgba8UnormSrgb);
        assert!(Format::Rgba8Unorm.to_srgb().is_srgb());
        assert_eq!(Format::R32Float.to_srgb(), Format::R32Float);
    }
}
