use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recognition::ScanStage;
use crate::stats::SessionSnapshot;

/// Coarse session state shown to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HuntState {
    Idle,
    Capturing,
    Recognizing,
    Valuing,
}

impl Default for HuntState {
    fn default() -> Self {
        HuntState::Idle
    }
}

impl HuntState {
    pub fn resolve(active: bool, stage: ScanStage) -> Self {
        if !active {
            return HuntState::Idle;
        }
        match stage {
            ScanStage::Detecting | ScanStage::Identifying | ScanStage::Enriching => {
                HuntState::Recognizing
            }
            ScanStage::Valuing => HuntState::Valuing,
            ScanStage::Idle | ScanStage::Complete | ScanStage::Error => HuntState::Capturing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HuntingSnapshot {
    pub session_id: Option<String>,
    pub state: HuntState,
    pub stage: ScanStage,
    /// Stability progress toward the next capture, 0..=1.
    pub progress: f32,
    pub started_at: Option<DateTime<Utc>>,
    pub stats: SessionSnapshot,
}
