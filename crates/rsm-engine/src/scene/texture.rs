use std::fmt;

use crate::device::RenderDevice;
use crate::error::{EngineError, Result};

/// Decoded RGBA8 image, sRGB encoded.
#[derive(Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn validate(&self, label: &str) -> Result<()> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::asset(label, "image has zero size"));
        }
        if self.pixels.len() != expected {
            return Err(EngineError::asset(
                label,
                format!("expected {expected} bytes of RGBA8, got {}", self.pixels.len()),
            ));
        }
        Ok(())
    }

    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Texture uploaded to a device.
pub struct Texture<D: RenderDevice> {
    label: String,
    width: u32,
    height: u32,
    raw: D::Texture,
}

impl<D: RenderDevice> Texture<D> {
    pub fn upload(device: &mut D, label: impl Into<String>, image: &ImageData) -> Result<Self> {
        let label = label.into();
        image.validate(&label)?;
        let raw = device.create_texture(&label, image);
        Ok(Self {
            label,
            width: image.width,
            height: image.height,
            raw,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn raw(&self) -> &D::Texture {
        &self.raw
    }
}

impl<D: RenderDevice> fmt::Debug for Texture<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("label", &self.label)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_fills_every_texel() {
        let img = ImageData::solid(2, 3, [1, 2, 3, 4]);
        assert!(img.validate("s").is_ok());
        assert_eq!(img.texel(1, 2), [1, 2, 3, 4]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let img = ImageData::new(2, 2, vec![0; 15]);
        assert!(matches!(img.validate("s"), Err(EngineError::Asset { .. })));
    }
}
