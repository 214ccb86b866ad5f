use ember_vfs::{Vfs, VfsError, path};

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resource::Texture;

/// Why a texture could not be loaded.
#[derive(Debug)]
pub(crate) enum TextureLoadError {
    /// The file could not be read.
    Read(VfsError),
    /// The file exists but holds no bytes.
    Empty(String),
    /// The bytes could not be decoded or uploaded.
    Create(GraphicsError),
}

impl TextureLoadError {
    /// Whether anything was read. Failures before that point never reserve
    /// a descriptor of their own.
    pub(crate) fn had_source(&self) -> bool {
        matches!(self, Self::Create(_))
    }
}

impl std::fmt::Display for TextureLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(e) => write!(f, "read failed: {}", e),
            Self::Empty(path) => write!(f, "'{}' is empty", path),
            Self::Create(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TextureLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read(e) => Some(e),
            Self::Create(e) => Some(e),
            Self::Empty(_) => None,
        }
    }
}

/// Read `read_path` through `vfs` and create an RGBA8 texture named `key`.
pub(crate) fn load_texture(
    device: &GraphicsDevice,
    vfs: &Vfs,
    read_path: &str,
    key: &str,
    srgb: bool,
) -> Result<Texture, TextureLoadError> {
    crate::profile_scope!("load_texture");

    let bytes = vfs.read_blocking(read_path).map_err(TextureLoadError::Read)?;
    if bytes.is_empty() {
        return Err(TextureLoadError::Empty(read_path.to_owned()));
    }

    let extension = path::extension(read_path);
    let texture = match extension.as_deref() {
        // Uncompressed TGA has a fast path; anything else it rejects goes to the decoder.
        Some("tga") => Texture::create_tga_from_memory(device, key, &bytes, srgb)
            .or_else(|_| Texture::create_from_memory(device, key, &bytes, Some("tga"), srgb)),
        hint => Texture::create_from_memory(device, key, &bytes, hint, srgb),
    };
    texture.map_err(TextureLoadError::Create)
}
