//! RGBA8 raster buffers and their PNG codec

use crate::{Error, Result};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};

/// A row-major RGBA8 image with a top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// A fully transparent raster of the given size.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// A raster with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self { width, height, pixels }
    }

    /// Wrap an existing buffer; the length must be exactly `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        check_len(width, height, pixels.len())?;
        Ok(Self { width, height, pixels })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    /// Decode PNG bytes (any color type) into RGBA8.
    pub fn decode_png(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        let (width, height) = img.dimensions();
        Self::from_rgba(width, height, img.into_raw())
    }

    /// Encode as an RGBA8 PNG straight from the pixel buffer.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        check_len(self.width, self.height, self.pixels.len())?;
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf).write_image(
            &self.pixels,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(buf)
    }
}

fn check_len(width: u32, height: u32, len: usize) -> Result<()> {
    let expected = width as usize * height as usize * 4;
    if len != expected {
        return Err(Error::Image(format!(
            "RGBA buffer has {} bytes, expected {} for {}x{}",
            len, expected, width, height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_raster_has_expected_layout() {
        let r = RasterImage::filled(3, 2, [1, 2, 3, 4]);
        assert_eq!(r.pixels.len(), 3 * 2 * 4);
        assert_eq!(r.pixel(2, 1), Some([1, 2, 3, 4]));
        assert_eq!(r.pixel(3, 0), None);
    }

    #[test]
    fn from_rgba_rejects_short_buffer() {
        assert!(RasterImage::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(RasterImage::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn png_encoding_preserves_pixels() {
        let mut r = RasterImage::filled(4, 3, [255, 255, 255, 255]);
        r.pixels[0..4].copy_from_slice(&[10, 20, 30, 255]);
        let png = r.encode_png().unwrap();
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
        let back = RasterImage::decode_png(&png).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn encode_refuses_mismatched_buffer() {
        let mut r = RasterImage::filled(4, 4, [0, 0, 0, 255]);
        r.pixels.truncate(60);
        assert!(matches!(r.encode_png(), Err(Error::Image(_))));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = RasterImage::decode_png(b"not a png").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Internal);
    }
}
