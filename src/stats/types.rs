use serde::{Deserialize, Serialize};

use crate::hunting::Verdict;
use crate::models::EnrichedScanResult;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerdictCounts {
    pub get: u64,
    pub consider: u64,
    pub pass: u64,
}

impl VerdictCounts {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Get => self.get += 1,
            Verdict::Consider => self.consider += 1,
            Verdict::Pass => self.pass += 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Results shown to the user, cached ones included.
    pub scan_count: u64,
    pub cache_hits: u64,
    pub no_match_count: u64,
    pub duplicate_count: u64,
    pub error_count: u64,
    pub verdicts: VerdictCounts,
    /// Sum of recommended values over all results.
    pub total_value: f64,
    /// Most recent first.
    pub recent: Vec<EnrichedScanResult>,
}
