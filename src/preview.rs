//! Image previews for terminal display.
//!
//! An image is decoded and downscaled into a small RGB grid. Presentation layers
//! draw two pixel rows per text row using half-block glyphs.

use image::imageops::FilterType;
use serde::Serialize;

/// Largest preview grid, in pixels.
pub const MAX_PREVIEW_WIDTH: u32 = 64;
pub const MAX_PREVIEW_HEIGHT: u32 = 48;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    /// Dimensions of the source image.
    pub source_width: u32,
    pub source_height: u32,
    /// Dimensions of `pixels`.
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub pixels: Vec<[u8; 3]>,
}

impl Preview {
    /// Decode `bytes` (any format the `image` crate is built with) into a preview.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        Self::decode_within(bytes, MAX_PREVIEW_WIDTH, MAX_PREVIEW_HEIGHT)
    }

    pub fn decode_within(
        bytes: &[u8],
        max_width: u32,
        max_height: u32,
    ) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?;
        let (source_width, source_height) = (img.width(), img.height());

        let scaled = if source_width > max_width || source_height > max_height {
            img.resize(max_width.max(1), max_height.max(1), FilterType::Triangle)
        } else {
            img
        };
        let rgb = scaled.to_rgb8();
        let (width, height) = rgb.dimensions();
        let pixels = rgb.pixels().map(|p| p.0).collect();

        Ok(Self {
            source_width,
            source_height,
            width,
            height,
            pixels,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Number of text rows needed at two pixel rows per text row.
    pub fn text_rows(&self) -> u32 {
        self.height.div_ceil(2)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    pub(crate) fn png_bytes(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode png");
        buf
    }

    #[test]
    fn small_image_keeps_its_size() {
        let p = Preview::decode(&png_bytes(4, 3, [10, 20, 30])).unwrap();
        assert_eq!((p.width, p.height), (4, 3));
        assert_eq!((p.source_width, p.source_height), (4, 3));
        assert_eq!(p.pixel(3, 2), Some([10, 20, 30]));
        assert_eq!(p.pixel(4, 0), None);
        assert_eq!(p.text_rows(), 2);
    }

    #[test]
    fn large_image_is_downscaled_preserving_aspect() {
        let p = Preview::decode(&png_bytes(640, 160, [0, 0, 0])).unwrap();
        assert_eq!((p.source_width, p.source_height), (640, 160));
        assert!(p.width <= MAX_PREVIEW_WIDTH);
        assert!(p.height <= MAX_PREVIEW_HEIGHT);
        assert_eq!(p.width, 64);
        assert_eq!(p.height, 16);
        assert_eq!(p.pixels.len(), (p.width * p.height) as usize);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Preview::decode(b"definitely not an image").is_err());
    }
}
