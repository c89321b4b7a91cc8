use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::time::Instant;

/// One captured video frame. Never zero-sized.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbaImage,
    captured_at: Instant,
}

impl Frame {
    /// Returns `None` for an image with a zero dimension.
    pub fn new(image: RgbaImage) -> Option<Self> {
        Self::captured(image, Instant::now())
    }

    pub fn captured(image: RgbaImage, captured_at: Instant) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self { image, captured_at })
    }

    /// Build from raw RGBA bytes (`width * height * 4`).
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, pixels).and_then(Self::new)
    }

    /// Solid-colour frame. Handy for hosts that need a placeholder and for tests.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Option<Self> {
        Self::new(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let [r, g, b, _] = self.image.get_pixel(x, y).0;
        [r, g, b]
    }

    /// Rec. 601 luma of one pixel.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        let [r, g, b] = self.rgb_at(x, y);
        ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
    }

    /// Encode as a JPEG still for the recognition service. Alpha is dropped.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgba8(self.image.clone()).to_rgb8();
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)))
            .context("failed to encode frame as jpeg")?;
        Ok(bytes)
    }
}

/// Encoded still frame handed to the recognition service.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl ImagePayload {
    pub fn jpeg(frame: &Frame, quality: u8) -> Result<Self> {
        Ok(Self {
            bytes: frame.encode_jpeg(quality)?,
            mime_type: "image/jpeg",
            width: frame.width(),
            height: frame.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_images_are_rejected() {
        assert!(Frame::new(RgbaImage::new(0, 10)).is_none());
        assert!(Frame::new(RgbaImage::new(10, 0)).is_none());
        assert!(Frame::from_rgba(2, 2, vec![0; 3]).is_none());
        assert!(Frame::from_rgba(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn jpeg_payload_carries_frame_dimensions() {
        let frame = Frame::filled(32, 24, [200, 10, 10, 255]).unwrap();
        let payload = ImagePayload::jpeg(&frame, 80).unwrap();

        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!((payload.width, payload.height), (32, 24));
        // JPEG SOI marker
        assert_eq!(&payload.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn luma_of_white_and_black() {
        let white = Frame::filled(1, 1, [255, 255, 255, 255]).unwrap();
        let black = Frame::filled(1, 1, [0, 0, 0, 255]).unwrap();
        assert_eq!(white.luma_at(0, 0), 255);
        assert_eq!(black.luma_at(0, 0), 0);
    }
}
