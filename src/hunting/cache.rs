use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::EnrichedScanResult;

use super::identity::IdentityKey;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    result: EnrichedScanResult,
    inserted_at: Instant,
}

/// Identity key -> enriched result, with lazy expiry on read.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: HashMap<IdentityKey, CacheEntry>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stale entries read as absent but stay stored until overwritten or purged.
    pub fn get(&self, key: &IdentityKey, now: Instant) -> Option<&EnrichedScanResult> {
        self.entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| &entry.result)
    }

    pub fn set(&mut self, key: IdentityKey, result: EnrichedScanResult, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: now,
            },
        );
    }

    /// Drop stale entries. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);
        before - self.entries.len()
    }

    /// Stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) < self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunting::{Ownership, Verdict};
    use crate::models::{ComicIdentity, ScanCandidate, ValueEstimate};

    fn result(title: &str) -> EnrichedScanResult {
        EnrichedScanResult::new(
            ScanCandidate::new(ComicIdentity::new(title, "1")),
            ValueEstimate::default(),
            Verdict::Consider,
            Ownership::default(),
        )
    }

    #[test]
    fn set_then_get() {
        let mut cache = ResultCache::default();
        let now = Instant::now();
        let r = result("Saga");

        cache.set(r.identity_key.clone(), r.clone(), now);
        assert_eq!(cache.get(&r.identity_key, now), Some(&r));
    }

    #[test]
    fn expired_entries_read_as_absent_without_removal() {
        let mut cache = ResultCache::new(Duration::from_secs(60));
        let now = Instant::now();
        let r = result("Saga");

        cache.set(r.identity_key.clone(), r.clone(), now);
        assert!(cache.get(&r.identity_key, now + Duration::from_secs(59)).is_some());
        assert!(cache.get(&r.identity_key, now + Duration::from_secs(61)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overwrite_replaces_result_and_timestamp() {
        let mut cache = ResultCache::new(Duration::from_secs(60));
        let now = Instant::now();
        let first = result("Saga");
        let second = result("Saga");
        let key = first.identity_key.clone();

        cache.set(key.clone(), first, now);
        cache.set(key.clone(), second.clone(), now + Duration::from_secs(50));

        let later = now + Duration::from_secs(100);
        assert_eq!(cache.get(&key, later), Some(&second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn purge_removes_only_stale_entries() {
        let mut cache = ResultCache::new(Duration::from_secs(60));
        let now = Instant::now();
        let old = result("Old");
        let fresh = result("Fresh");

        cache.set(old.identity_key.clone(), old, now);
        cache.set(fresh.identity_key.clone(), fresh.clone(), now + Duration::from_secs(30));

        assert_eq!(cache.purge_expired(now + Duration::from_secs(70)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache
            .get(&fresh.identity_key, now + Duration::from_secs(70))
            .is_some());
    }
}
