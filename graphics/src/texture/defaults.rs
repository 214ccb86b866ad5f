use crate::descriptor::DescriptorHandle;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resource::Texture;
use crate::types::Format;

/// Built-in 1x1 textures used as fallbacks for failed loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultTexture {
    Magenta2D,
    BlackOpaque2D,
    BlackTransparent2D,
    WhiteOpaque2D,
    WhiteTransparent2D,
    /// Flat tangent-space normal.
    DefaultNormalMap,
    BlackCubeMap,
}

impl DefaultTexture {
    pub const ALL: [DefaultTexture; 7] = [
        Self::Magenta2D,
        Self::BlackOpaque2D,
        Self::BlackTransparent2D,
        Self::WhiteOpaque2D,
        Self::WhiteTransparent2D,
        Self::DefaultNormalMap,
        Self::BlackCubeMap,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// RGBA8 texel of every face.
    pub const fn texel(self) -> [u8; 4] {
        match self {
            Self::Magenta2D => [0xff, 0x00, 0xff, 0xff],
            Self::BlackOpaque2D => [0x00, 0x00, 0x00, 0xff],
            Self::BlackTransparent2D | Self::BlackCubeMap => [0x00, 0x00, 0x00, 0x00],
            Self::WhiteOpaque2D => [0xff, 0xff, 0xff, 0xff],
            Self::WhiteTransparent2D => [0xff, 0xff, 0xff, 0x00],
            Self::DefaultNormalMap => [0x80, 0x80, 0xff, 0x00],
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Magenta2D => "DefaultTexture::Magenta2D",
            Self::BlackOpaque2D => "DefaultTexture::BlackOpaque2D",
            Self::BlackTransparent2D => "DefaultTexture::BlackTransparent2D",
            Self::WhiteOpaque2D => "DefaultTexture::WhiteOpaque2D",
            Self::WhiteTransparent2D => "DefaultTexture::WhiteTransparent2D",
            Self::DefaultNormalMap => "DefaultTexture::DefaultNormalMap",
            Self::BlackCubeMap => "DefaultTexture::BlackCubeMap",
        }
    }
}

/// One texture per [`DefaultTexture`].
pub struct DefaultTextures {
    textures: Vec<Texture>,
}

impl DefaultTextures {
    pub fn new(device: &GraphicsDevice) -> Result<Self, GraphicsError> {
        let textures = DefaultTexture::ALL
            .iter()
            .map(|&kind| {
                let texel = kind.texel();
                match kind {
                    DefaultTexture::BlackCubeMap => Texture::create_cube(
                        device,
                        kind.name(),
                        4,
                        1,
                        1,
                        Format::Rgba8Unorm,
                        &texel.repeat(6),
                    ),
                    _ => {
                        Texture::create_2d(device, kind.name(), 4, 1, 1, Format::Rgba8Unorm, &texel)
                    }
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("created {} default textures", textures.len());
        Ok(Self { textures })
    }

    pub fn get(&self, kind: DefaultTexture) -> &Texture {
        &self.textures[kind.index()]
    }

    pub fn srv(&self, kind: DefaultTexture) -> DescriptorHandle {
        self.get(kind).srv()
    }
}
