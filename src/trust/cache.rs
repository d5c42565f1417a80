// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Short-lived cache of quorum outcomes, keyed by normalised handle

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::quorum::QuorumOutcome;

#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: QuorumOutcome,
    computed_at: Instant,
}

/// Bounded TTL map. When full, the least-recently-computed entry is evicted
/// before a new key is inserted, so `len() <= capacity` always holds.
#[derive(Debug)]
pub struct QuorumCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
}

impl QuorumCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Cached outcome for `key` if computed less than `ttl` before `now`.
    pub fn get(&self, key: &str, now: Instant) -> Option<QuorumOutcome> {
        self.entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.computed_at) < self.ttl)
            .map(|entry| entry.outcome.clone())
    }

    pub fn insert(&mut self, key: impl Into<String>, outcome: QuorumOutcome, now: Instant) {
        let key = key.into();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                outcome,
                computed_at: now,
            },
        );
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.computed_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::quorum::TrustTier;

    fn outcome(count: usize) -> QuorumOutcome {
        QuorumOutcome::from_count(count, 2, 3)
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let mut cache = QuorumCache::new(Duration::from_secs(3600), 10);
        let t0 = Instant::now();
        cache.insert("alice", outcome(2), t0);

        let hit = cache.get("alice", t0 + Duration::from_secs(3599)).unwrap();
        assert_eq!(hit.tier, TrustTier::Trusted);
        assert!(cache.get("alice", t0 + Duration::from_secs(3600)).is_none());
        assert!(cache.get("bob", t0).is_none());
    }

    #[test]
    fn test_full_cache_evicts_oldest_first() {
        let mut cache = QuorumCache::new(Duration::from_secs(3600), 3);
        let t0 = Instant::now();
        cache.insert("a", outcome(0), t0 + Duration::from_secs(2));
        cache.insert("b", outcome(1), t0);
        cache.insert("c", outcome(2), t0 + Duration::from_secs(1));

        cache.insert("d", outcome(3), t0 + Duration::from_secs(3));
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains_key("b"));
        assert!(cache.contains_key("a"));
        assert!(cache.contains_key("d"));
    }

    #[test]
    fn test_overwriting_existing_key_does_not_evict() {
        let mut cache = QuorumCache::new(Duration::from_secs(3600), 2);
        let t0 = Instant::now();
        cache.insert("a", outcome(0), t0);
        cache.insert("b", outcome(0), t0);
        cache.insert("a", outcome(3), t0 + Duration::from_secs(5));

        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key("b"));
        assert_eq!(
            cache.get("a", t0 + Duration::from_secs(5)).unwrap().tier,
            TrustTier::HighlyTrusted
        );
    }
}
