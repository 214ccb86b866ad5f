//! # Ember Demos
//!
//! Headless programs that drive the Ember GPU layer.
//!
//! ## Available Demos
//!
//! - `texture_stress` - many threads loading and releasing managed textures

use std::io::Cursor;

use ember_vfs::MemorySource;
use image::{ImageFormat, Rgba, RgbaImage};

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A checkerboard tinted by `seed`, so every generated texture decodes differently.
pub fn checkerboard(size: u32, seed: u32) -> RgbaImage {
    let tint = [
        (seed.wrapping_mul(67) % 256) as u8,
        (seed.wrapping_mul(131) % 256) as u8,
        (seed.wrapping_mul(197) % 256) as u8,
    ];
    RgbaImage::from_fn(size, size, |x, y| {
        if ((x / 8) + (y / 8)) % 2 == 0 {
            Rgba([tint[0], tint[1], tint[2], 255])
        } else {
            Rgba([255 - tint[0], 255 - tint[1], 255 - tint[2], 255])
        }
    })
}

/// Fill `source` with `count` generated textures and return their file names.
///
/// Even indices are written as PNG, odd ones as TGA.
pub fn generate_textures(
    source: &MemorySource,
    count: usize,
    size: u32,
) -> Result<Vec<String>, image::ImageError> {
    let mut names = Vec::with_capacity(count);
    for index in 0..count {
        let (format, ext) = if index % 2 == 0 {
            (ImageFormat::Png, "png")
        } else {
            (ImageFormat::Tga, "tga")
        };

        let mut bytes = Cursor::new(Vec::new());
        checkerboard(size, index as u32).write_to(&mut bytes, format)?;

        let name = format!("stress_{index:03}.{ext}");
        source.insert(name.clone(), bytes.into_inner());
        names.push(name);
    }
    Ok(names)
}
