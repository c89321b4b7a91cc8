//! Frame-to-frame stability tracking.
//!
//! A scene is "stable" while consecutive frames stay within the configured
//! change threshold. Once it has been stable for the stabilization window the
//! detector hands out the current frame, once per episode.

use std::time::{Duration, Instant};

use super::fingerprint::{grid_coordinate, Fingerprint};
use super::frame::Frame;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Sample points per side used for similarity.
const SAMPLE_GRID: u32 = 32;
/// Per-channel difference still counted as the same pixel.
const NOISE_TOLERANCE: u8 = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityConfig {
    pub stabilization: Duration,
    /// Fraction (0-1) of sampled pixels allowed to differ.
    pub change_threshold: f32,
    /// Time each sampled frame stands for.
    pub sample_interval: Duration,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            stabilization: Duration::from_millis(1200),
            change_threshold: 0.12,
            sample_interval: Duration::from_millis(200),
        }
    }
}

/// Fraction of grid samples whose RGB channels all differ by less than the
/// noise tolerance. Frames of different size are fully dissimilar.
pub fn frame_similarity(previous: &Frame, current: &Frame) -> f32 {
    if previous.width() != current.width() || previous.height() != current.height() {
        return 0.0;
    }

    let (width, height) = (current.width(), current.height());
    let mut same = 0u32;
    for row in 0..SAMPLE_GRID {
        let y = grid_coordinate(row, SAMPLE_GRID, height);
        for col in 0..SAMPLE_GRID {
            let x = grid_coordinate(col, SAMPLE_GRID, width);
            let a = previous.rgb_at(x, y);
            let b = current.rgb_at(x, y);
            let within = a
                .iter()
                .zip(b.iter())
                .all(|(lhs, rhs)| lhs.abs_diff(*rhs) < NOISE_TOLERANCE);
            if within {
                same += 1;
            }
        }
    }

    same as f32 / (SAMPLE_GRID * SAMPLE_GRID) as f32
}

pub struct StabilityDetector {
    config: StabilityConfig,
    previous: Option<Frame>,
    previous_at: Option<Instant>,
    episode_started: Option<Instant>,
    progress: f32,
    last_emitted: Option<Fingerprint>,
}

impl StabilityDetector {
    pub fn new(config: StabilityConfig) -> Self {
        Self {
            config,
            previous: None,
            previous_at: None,
            episode_started: None,
            progress: 0.0,
            last_emitted: None,
        }
    }

    /// 0-1, observable at every tick.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_in_episode(&self) -> bool {
        self.episode_started.is_some()
    }

    /// Feed one frame. Returns the stabilized frame at most once per episode.
    ///
    /// When `ready` is false the pipeline is busy: the episode keeps running and
    /// the emission waits until a later tick where `ready` is true.
    pub fn observe(&mut self, frame: Frame, now: Instant, ready: bool) -> Option<Frame> {
        let Some(previous) = self.previous.take() else {
            self.previous = Some(frame);
            self.previous_at = Some(now);
            return None;
        };

        let similarity = frame_similarity(&previous, &frame);
        let stable = similarity >= 1.0 - self.config.change_threshold;

        if !stable {
            self.progress = 0.0;
            self.episode_started = None;
            self.remember(frame, now);
            return None;
        }

        let started = *self
            .episode_started
            .get_or_insert(self.previous_at.unwrap_or(now));
        // every frame in the episode, the first included, covers one interval
        let elapsed = now.saturating_duration_since(started) + self.config.sample_interval;
        self.progress = progress_for(elapsed, self.config.stabilization);

        let mut emitted = None;
        if elapsed >= self.config.stabilization && ready {
            let fingerprint = Fingerprint::sampled(&frame);
            if self.last_emitted.as_ref() != Some(&fingerprint) {
                log_debug!("scene stable for {}ms, emitting frame", elapsed.as_millis());
                self.last_emitted = Some(fingerprint);
                self.episode_started = None;
                self.progress = 0.0;
                emitted = Some(frame.clone());
            }
        }

        self.remember(frame, now);
        emitted
    }

    fn remember(&mut self, frame: Frame, now: Instant) {
        self.previous = Some(frame);
        self.previous_at = Some(now);
    }
}

fn progress_for(elapsed: Duration, stabilization: Duration) -> f32 {
    if stabilization.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / stabilization.as_secs_f32()).min(1.0)
}
