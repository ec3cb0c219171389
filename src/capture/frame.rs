//! Frame data structures for sampled video content

use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::time::Instant;

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// An immutable snapshot of the video source
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw RGBA pixel data
    data: Vec<u8>,
    /// Frame width in pixels
    width: u32,
    /// Frame height in pixels
    height: u32,
    /// Timestamp when frame was captured
    timestamp: Instant,
}

impl Frame {
    /// Create a new frame from RGBA data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Create a frame where every pixel has the same colour
    #[cfg(test)]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba.repeat((width * height) as usize);
        Self::new(data, width, height)
    }

    /// Create a frame from a decoded image
    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of complete pixels actually present in the buffer
    pub fn pixel_count(&self) -> usize {
        self.data.len() / BYTES_PER_PIXEL
    }

    /// Encode the frame as PNG, the format handed to external engines
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let image = RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .context("Frame buffer does not match its dimensions")?;

        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("Failed to encode frame as PNG")?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_frame() {
        let frame = Frame::solid(3, 2, [10, 20, 30, 255]);
        assert_eq!(frame.dimensions(), (3, 2));
        assert_eq!(frame.pixel_count(), 6);
        assert_eq!(&frame.data()[4..8], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_encode_png_has_signature() {
        let frame = Frame::solid(4, 4, [255, 255, 255, 255]);
        let png = frame.encode_png().unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_encode_png_rejects_short_buffer() {
        let frame = Frame::new(vec![0; 7], 2, 2);
        assert!(frame.encode_png().is_err());
    }
}
