//! Raster images.

use crate::asset::error::{ErrorKind, Result};
use exn::ResultExt;
use tracing::instrument;

/// A decoded image as a tightly packed RGBA8 pixel buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGBA8 bytes, `width * height * 4` long.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The RGBA value of a single pixel, if it is inside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let rgba = self.pixels.get(offset..offset + 4)?;
        Some([rgba[0], rgba[1], rgba[2], rgba[3]])
    }
}

/// Decode any supported container (PNG, JPEG, GIF, BMP), sniffing the format
/// from the bytes rather than trusting the file name.
#[instrument(level = "trace", skip(bytes), fields(size = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<Image> {
    let decoded = ::image::load_from_memory(bytes).or_raise(|| ErrorKind::Image)?.into_rgba8();
    let (width, height) = decoded.dimensions();
    Ok(Image {
        width,
        height,
        pixels: decoded.into_raw(),
    })
}
