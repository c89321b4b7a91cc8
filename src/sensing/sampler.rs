use anyhow::{Context, Result};
use image::RgbaImage;

use super::frame::Frame;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// A live camera feed, or anything that can paint frames on demand.
pub trait VideoSource: Send {
    /// Native resolution. `(0, 0)` until the stream delivers its first frame.
    fn dimensions(&self) -> (u32, u32);

    /// Paint the current frame into `surface`, already sized to `dimensions()`.
    fn draw(&mut self, surface: &mut RgbaImage) -> Result<()>;

    /// Stop the underlying stream. Called once when sampling ends.
    fn release(&mut self) {}
}

/// Pulls frames out of a [`VideoSource`] into a reusable surface.
pub struct FrameSampler {
    source: Box<dyn VideoSource>,
    surface: Option<RgbaImage>,
    released: bool,
}

impl FrameSampler {
    pub fn new(source: Box<dyn VideoSource>) -> Self {
        Self {
            source,
            surface: None,
            released: false,
        }
    }

    /// `Ok(None)` while the source has no dimensions yet, or after release.
    pub fn sample(&mut self) -> Result<Option<Frame>> {
        if self.released {
            return Ok(None);
        }
        let (width, height) = self.source.dimensions();
        if width == 0 || height == 0 {
            log_debug!("video source not ready, skipping sample");
            return Ok(None);
        }

        if self.surface.as_ref().map(|surface| surface.dimensions()) != Some((width, height)) {
            log_info!("allocating {}x{} sampling surface", width, height);
            self.surface = Some(RgbaImage::new(width, height));
        }
        let Some(surface) = self.surface.as_mut() else {
            return Ok(None);
        };

        self.source
            .draw(surface)
            .context("failed to draw video frame")?;
        Ok(Frame::new(surface.clone()))
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.surface = None;
        self.source.release();
        log_info!("video source released");
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.release();
    }
}
