mod types;

pub use types::{SessionSnapshot, VerdictCounts};

use std::collections::VecDeque;

use crate::models::EnrichedScanResult;

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Per-session counters plus a short most-recent-first history for display.
/// No deduplication: scanning the same book twice records it twice.
#[derive(Debug)]
pub struct SessionStats {
    history_limit: usize,
    recent: VecDeque<EnrichedScanResult>,
    scan_count: u64,
    cache_hits: u64,
    no_match_count: u64,
    duplicate_count: u64,
    error_count: u64,
    verdicts: VerdictCounts,
    total_value: f64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl SessionStats {
    pub fn new(history_limit: usize) -> Self {
        let history_limit = history_limit.max(1);
        Self {
            history_limit,
            recent: VecDeque::with_capacity(history_limit + 1),
            scan_count: 0,
            cache_hits: 0,
            no_match_count: 0,
            duplicate_count: 0,
            error_count: 0,
            verdicts: VerdictCounts::default(),
            total_value: 0.0,
        }
    }

    pub fn record_result(&mut self, result: &EnrichedScanResult, from_cache: bool) {
        self.scan_count += 1;
        if from_cache {
            self.cache_hits += 1;
        }
        self.verdicts.record(result.verdict);
        if let Some(value) = result.value.recommended_value.filter(|v| v.is_finite()) {
            self.total_value += value;
        }

        self.recent.push_front(result.clone());
        if self.recent.len() > self.history_limit {
            self.recent.pop_back();
        }
    }

    pub fn record_no_match(&mut self) {
        self.no_match_count += 1;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicate_count += 1;
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn scan_count(&self) -> u64 {
        self.scan_count
    }

    pub fn recent(&self) -> impl Iterator<Item = &EnrichedScanResult> {
        self.recent.iter()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            scan_count: self.scan_count,
            cache_hits: self.cache_hits,
            no_match_count: self.no_match_count,
            duplicate_count: self.duplicate_count,
            error_count: self.error_count,
            verdicts: self.verdicts,
            total_value: self.total_value,
            recent: self.recent.iter().cloned().collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.history_limit);
    }
}
