use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig, ImageHash};
use serde::{Deserialize, Serialize};

use super::frame::Frame;

/// Cells per side of the sampled fingerprint grid.
const FINGERPRINT_GRID: u32 = 8;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FingerprintMode {
    /// Fixed-stride luma sampling, exact match.
    #[default]
    Sampled,
    /// Double-gradient perceptual hash, Hamming-distance match.
    Perceptual,
}

/// Cheap digest of a frame, used for triage only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub mode: FingerprintMode,
    pub value: String,
}

impl Fingerprint {
    pub fn of(frame: &Frame, mode: FingerprintMode) -> Self {
        let value = match mode {
            FingerprintMode::Sampled => compute_sampled_hash(frame),
            FingerprintMode::Perceptual => compute_phash(frame),
        };
        Self { mode, value }
    }

    pub fn sampled(frame: &Frame) -> Self {
        Self::of(frame, FingerprintMode::Sampled)
    }

    /// Sampled fingerprints match exactly; perceptual ones within `tolerance` bits.
    pub fn matches(&self, other: &Fingerprint, tolerance: u32) -> bool {
        if self.mode != other.mode {
            return false;
        }
        match self.mode {
            FingerprintMode::Sampled => self.value == other.value,
            FingerprintMode::Perceptual => {
                compute_hamming_distance(&self.value, &other.value) <= tolerance
            }
        }
    }
}

/// Luma of the centre pixel of each grid cell, quantized to 16 levels,
/// one hex digit per cell.
pub fn compute_sampled_hash(frame: &Frame) -> String {
    let (width, height) = (frame.width(), frame.height());
    let mut digest = String::with_capacity((FINGERPRINT_GRID * FINGERPRINT_GRID) as usize);

    for row in 0..FINGERPRINT_GRID {
        let y = grid_coordinate(row, FINGERPRINT_GRID, height);
        for col in 0..FINGERPRINT_GRID {
            let x = grid_coordinate(col, FINGERPRINT_GRID, width);
            let level = frame.luma_at(x, y) >> 4;
            digest.push(char::from_digit(level as u32, 16).unwrap_or('0'));
        }
    }
    digest
}

pub fn compute_phash(frame: &Frame) -> String {
    let img = DynamicImage::ImageRgba8(frame.image().clone());
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(8, 8)
        .to_hasher();

    let hash = hasher.hash_image(&img);
    hash.to_base64()
}

pub fn compute_hamming_distance(lhs: &str, rhs: &str) -> u32 {
    let Ok(h1) = ImageHash::<Vec<u8>>::from_base64(lhs) else {
        return u32::MAX;
    };
    let Ok(h2) = ImageHash::<Vec<u8>>::from_base64(rhs) else {
        return u32::MAX;
    };
    h1.dist(&h2)
}

/// Centre of cell `index` when `extent` is split into `cells` even parts.
pub(crate) fn grid_coordinate(index: u32, cells: u32, extent: u32) -> u32 {
    let coord = ((2 * index as u64 + 1) * extent as u64) / (2 * cells as u64);
    (coord as u32).min(extent.saturating_sub(1))
}
