use std::time::{Duration, Instant};

use crate::sensing::Fingerprint;

use super::identity::IdentityKey;

pub const DEFAULT_MEMORY_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct RecentScan {
    fingerprint: Fingerprint,
    seen_at: Instant,
    identity: Option<IdentityKey>,
}

/// Remembers fingerprints that already went through recognition so the same
/// physical book sitting in frame is not resubmitted.
#[derive(Debug)]
pub struct ScanDeduplicator {
    window: Duration,
    tolerance: u32,
    entries: Vec<RecentScan>,
}

impl Default for ScanDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_WINDOW, 0)
    }
}

impl ScanDeduplicator {
    /// `tolerance` only applies to perceptual fingerprints.
    pub fn new(window: Duration, tolerance: u32) -> Self {
        Self {
            window,
            tolerance,
            entries: Vec::new(),
        }
    }

    pub fn was_recently_processed(&mut self, fingerprint: &Fingerprint, now: Instant) -> bool {
        self.prune(now);
        self.find(fingerprint).is_some()
    }

    pub fn mark_processed(&mut self, fingerprint: Fingerprint, now: Instant) {
        self.record(fingerprint, None, now);
    }

    /// Like `mark_processed`, also remembering which book the frame resolved to.
    pub fn mark_identified(&mut self, fingerprint: Fingerprint, key: IdentityKey, now: Instant) {
        self.record(fingerprint, Some(key), now);
    }

    pub fn recent_identity(&mut self, fingerprint: &Fingerprint, now: Instant) -> Option<IdentityKey> {
        self.prune(now);
        self.find(fingerprint)
            .and_then(|entry| entry.identity.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn record(&mut self, fingerprint: Fingerprint, identity: Option<IdentityKey>, now: Instant) {
        self.prune(now);
        let tolerance = self.tolerance;
        self.entries
            .retain(|entry| !entry.fingerprint.matches(&fingerprint, tolerance));
        self.entries.push(RecentScan {
            fingerprint,
            seen_at: now,
            identity,
        });
    }

    fn find(&self, fingerprint: &Fingerprint) -> Option<&RecentScan> {
        // newest first so a re-identified frame wins over an older no-match
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.fingerprint.matches(fingerprint, self.tolerance))
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.entries
            .retain(|entry| now.saturating_duration_since(entry.seen_at) < window);
    }
}
