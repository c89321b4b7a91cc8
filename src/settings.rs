use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::hunting::VerdictThresholds;
use crate::models::GradeContext;
use crate::sensing::{FingerprintMode, StabilityConfig};

const PRESET_ENV: &str = "COMIC_HUNT_PRESET";

/// Tunables for one hunting session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanSettings {
    pub sample_interval_ms: u64,
    pub stabilization_ms: u64,
    pub change_threshold: f32,
    pub fingerprint_mode: FingerprintMode,
    /// Max Hamming distance for perceptual fingerprints.
    pub fingerprint_tolerance: u32,
    pub memory_window_ms: u64,
    pub cache_ttl_ms: u64,
    pub history_limit: usize,
    pub recognition_timeout_ms: u64,
    pub valuation_timeout_ms: u64,
    pub jpeg_quality: u8,
    pub grade_context: GradeContext,
    pub verdict_thresholds: VerdictThresholds,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::hunting()
    }
}

impl ScanSettings {
    /// Deliberate, one-book-at-a-time hunting.
    pub fn hunting() -> Self {
        Self {
            sample_interval_ms: 200,
            stabilization_ms: 1200,
            change_threshold: 0.12,
            fingerprint_mode: FingerprintMode::Sampled,
            fingerprint_tolerance: 4,
            memory_window_ms: 30_000,
            cache_ttl_ms: 30 * 60 * 1000,
            history_limit: 5,
            recognition_timeout_ms: 15_000,
            valuation_timeout_ms: 10_000,
            jpeg_quality: 85,
            grade_context: GradeContext::default(),
            verdict_thresholds: VerdictThresholds::default(),
        }
    }

    /// Flipping through a long box: shorter settle time, looser threshold.
    pub fn rapid_fire() -> Self {
        Self {
            stabilization_ms: 500,
            change_threshold: 0.25,
            ..Self::hunting()
        }
    }

    pub fn from_preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hunting" => Some(Self::hunting()),
            "rapid" | "rapid_fire" | "rapid-fire" => Some(Self::rapid_fire()),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_interval_ms == 0 {
            bail!("sampleIntervalMs must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.change_threshold) {
            bail!("changeThreshold must be within 0..=1, got {}", self.change_threshold);
        }
        if self.history_limit == 0 {
            bail!("historyLimit must be greater than zero");
        }
        if self.recognition_timeout_ms == 0 || self.valuation_timeout_ms == 0 {
            bail!("collaborator timeouts must be greater than zero");
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            bail!("jpegQuality must be within 1..=100, got {}", self.jpeg_quality);
        }
        let thresholds = &self.verdict_thresholds;
        if thresholds.consider_at > thresholds.get_at {
            bail!(
                "verdict considerAt ({}) must not exceed getAt ({})",
                thresholds.consider_at,
                thresholds.get_at
            );
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn stability(&self) -> StabilityConfig {
        StabilityConfig {
            stabilization: Duration::from_millis(self.stabilization_ms),
            change_threshold: self.change_threshold,
            sample_interval: self.sample_interval(),
        }
    }

    pub fn memory_window(&self) -> Duration {
        Duration::from_millis(self.memory_window_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_millis(self.recognition_timeout_ms)
    }

    pub fn valuation_timeout(&self) -> Duration {
        Duration::from_millis(self.valuation_timeout_ms)
    }
}

/// JSON-backed settings file.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ScanSettings>,
}

impl SettingsStore {
    /// Missing file: preset from `COMIC_HUNT_PRESET`, else defaults.
    /// Unparsable or invalid file: defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<ScanSettings>(&contents) {
                Ok(settings) if settings.validate().is_ok() => settings,
                Ok(_) | Err(_) => {
                    log::warn!(
                        "Ignoring invalid settings file {}, using defaults",
                        path.display()
                    );
                    ScanSettings::default()
                }
            }
        } else {
            std::env::var(PRESET_ENV)
                .ok()
                .and_then(|name| ScanSettings::from_preset(&name))
                .unwrap_or_default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> Result<ScanSettings> {
        self.data
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| anyhow!("settings lock poisoned"))
    }

    pub fn update(&self, settings: ScanSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &ScanSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: ScanSettings = serde_json::from_str(&contents)?;
        data.validate()?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = data;
        Ok(())
    }
}
