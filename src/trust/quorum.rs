// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Follow quorum over the trusted list
//!
//! A target is trusted when enough trusted accounts follow it:
//!
//! | Follows | Tier             | Trusted |
//! |---------|------------------|---------|
//! | >= 3    | HighlyTrusted    | yes     |
//! | 2       | Trusted          | yes     |
//! | 1       | SomeTrust        | no      |
//! | 0       | NoTrustedFollows | no      |
//!
//! The scan is bounded: at most `scan_cap` candidates are examined, it stops
//! as soon as the highly-trusted threshold is reached, and it gives up after
//! `zero_trust_cap` successful checks without a single follow.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::cache::QuorumCache;
use super::trusted_list::TrustedList;
use crate::adapters::RelationshipChecker;
use crate::config::QuorumConfig;
use crate::error::Result;
use crate::signals::Marker;

/// Quorum tier, ordered from weakest to strongest evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    InvalidHandle,
    CheckFailed,
    NoTrustedFollows,
    SomeTrust,
    Trusted,
    HighlyTrusted,
}

/// Result of a quorum check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumOutcome {
    pub trusted: bool,
    pub count: usize,
    pub tier: TrustTier,
    pub message: String,
}

impl QuorumOutcome {
    /// Tier a follow count against the two thresholds.
    pub fn from_count(count: usize, trusted_threshold: usize, highly_trusted_threshold: usize) -> Self {
        let (tier, message) = if count >= highly_trusted_threshold {
            (
                TrustTier::HighlyTrusted,
                format!("Highly trusted ({}+ follows) {}", count, Marker::Pass),
            )
        } else if count >= trusted_threshold {
            (
                TrustTier::Trusted,
                format!("Trusted ({} follows) {}", count, Marker::Pass),
            )
        } else if count == 1 {
            (
                TrustTier::SomeTrust,
                format!("Some trust (1 follow) {}", Marker::Warn),
            )
        } else if count > 1 {
            (
                TrustTier::SomeTrust,
                format!("Some trust ({} follows) {}", count, Marker::Warn),
            )
        } else {
            (
                TrustTier::NoTrustedFollows,
                format!("No trusted follows {}", Marker::Warn),
            )
        };

        Self {
            trusted: matches!(tier, TrustTier::Trusted | TrustTier::HighlyTrusted),
            count,
            tier,
            message,
        }
    }

    pub fn invalid_handle() -> Self {
        Self {
            trusted: false,
            count: 0,
            tier: TrustTier::InvalidHandle,
            message: "Invalid handle".to_string(),
        }
    }

    /// Substituted when the check could not run (timeout, task failure).
    pub fn check_failed() -> Self {
        Self {
            trusted: false,
            count: 0,
            tier: TrustTier::CheckFailed,
            message: format!("Trust check failed {}", Marker::Warn),
        }
    }
}

/// Lower-case and strip a leading `@`. `None` unless the rest is a
/// non-empty run of alphanumerics.
pub fn normalize_handle(raw: &str) -> Option<String> {
    let handle = raw.trim().trim_start_matches('@').to_lowercase();
    if handle.is_empty() || !handle.chars().all(char::is_alphanumeric) {
        return None;
    }
    Some(handle)
}

/// Bounded, early-terminating follow scan with a result cache
pub struct QuorumVerifier {
    checker: Arc<dyn RelationshipChecker>,
    policy: QuorumConfig,
    cache: Mutex<QuorumCache>,
}

impl QuorumVerifier {
    pub fn new(checker: Arc<dyn RelationshipChecker>, policy: QuorumConfig) -> Result<Self> {
        policy.validate()?;
        let cache = QuorumCache::new(policy.cache_ttl(), policy.cache_capacity);
        Ok(Self {
            checker,
            policy,
            cache: Mutex::new(cache),
        })
    }

    /// Number of cached outcomes
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Check `target` against `trusted`. Never fails; see [`TrustTier`].
    pub async fn verify(&self, target: &str, trusted: &TrustedList) -> QuorumOutcome {
        let Some(handle) = normalize_handle(target) else {
            warn!("Invalid target handle: {:?}", target);
            return QuorumOutcome::invalid_handle();
        };

        if trusted.is_empty() {
            debug!("Trusted list empty, no quorum possible for {}", handle);
            return self.tier(0);
        }

        if let Some(hit) = self.cache.lock().await.get(&handle, Instant::now()) {
            debug!("Quorum cache hit for {}: {}", handle, hit.message);
            return hit;
        }

        let count = self.scan(&handle, trusted).await;
        let outcome = self.tier(count);

        self.cache
            .lock()
            .await
            .insert(handle.clone(), outcome.clone(), Instant::now());

        info!("{} trusted check: {}", handle, outcome.message);
        outcome
    }

    async fn scan(&self, target: &str, trusted: &TrustedList) -> usize {
        let mut count = 0;
        let mut checked = 0;

        for candidate in trusted.handles().iter().take(self.policy.scan_cap) {
            match self.checker.follows(candidate, target).await {
                Ok(follows) => {
                    if follows {
                        count += 1;
                    }
                    checked += 1;

                    if count >= self.policy.highly_trusted_threshold {
                        break;
                    }
                    if count == 0 && checked >= self.policy.zero_trust_cap {
                        debug!("No trusted follows after {} checks, giving up on {}", checked, target);
                        break;
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!("Error checking friendship for {}: {}", candidate, e);
                }
                Err(e) => {
                    warn!("Unexpected error checking friendship for {}: {}", candidate, e);
                }
            }
        }

        debug!("Quorum scan for {}: {} follows in {} checks", target, count, checked);
        count
    }

    fn tier(&self, count: usize) -> QuorumOutcome {
        QuorumOutcome::from_count(
            count,
            self.policy.trusted_threshold,
            self.policy.highly_trusted_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Follows from a fixed set of sources; `failing` sources error out
    struct FixedChecker {
        followers: HashSet<String>,
        failing: HashSet<String>,
        calls: AtomicUsize,
    }

    impl FixedChecker {
        fn new(followers: &[&str], failing: &[&str]) -> Self {
            Self {
                followers: followers.iter().map(|s| s.to_string()).collect(),
                failing: failing.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RelationshipChecker for FixedChecker {
        async fn follows(&self, source: &str, _target: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(source) {
                return Err(Error::RateLimited("429".to_string()));
            }
            Ok(self.followers.contains(source))
        }
    }

    fn trusted(n: usize) -> TrustedList {
        TrustedList::new((0..n).map(|i| format!("t{}", i)), Utc::now())
    }

    fn verifier(checker: Arc<FixedChecker>) -> QuorumVerifier {
        QuorumVerifier::new(checker, QuorumConfig::default()).unwrap()
    }

    #[test]
    fn test_tiers_are_monotonic() {
        let tiers: Vec<TrustTier> = (0..6).map(|c| QuorumOutcome::from_count(c, 2, 3).tier).collect();
        assert!(tiers.windows(2).all(|w| w[0] <= w[1]));

        assert_eq!(QuorumOutcome::from_count(0, 2, 3).message, "No trusted follows ⚠️");
        assert_eq!(QuorumOutcome::from_count(1, 2, 3).message, "Some trust (1 follow) ⚠️");
        assert_eq!(QuorumOutcome::from_count(2, 2, 3).message, "Trusted (2 follows) ✅");
        assert_eq!(QuorumOutcome::from_count(3, 2, 3).message, "Highly trusted (3+ follows) ✅");
        assert!(!QuorumOutcome::from_count(1, 2, 3).trusted);
        assert!(QuorumOutcome::from_count(2, 2, 3).trusted);
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("@Alice").as_deref(), Some("alice"));
        assert_eq!(normalize_handle("bob42").as_deref(), Some("bob42"));
        assert!(normalize_handle("").is_none());
        assert!(normalize_handle("@").is_none());
        assert!(normalize_handle("al ice").is_none());
        assert!(normalize_handle("alice_1").is_none());
    }

    #[tokio::test]
    async fn test_invalid_handle_not_cached() {
        let checker = Arc::new(FixedChecker::new(&[], &[]));
        let verifier = verifier(checker.clone());

        let outcome = verifier.verify("not a handle!", &trusted(5)).await;
        assert_eq!(outcome, QuorumOutcome::invalid_handle());
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
        assert_eq!(verifier.cached().await, 0);
    }

    #[tokio::test]
    async fn test_empty_trusted_list_not_cached() {
        let checker = Arc::new(FixedChecker::new(&[], &[]));
        let verifier = verifier(checker.clone());

        let outcome = verifier.verify("alice", &TrustedList::empty()).await;
        assert_eq!(outcome.tier, TrustTier::NoTrustedFollows);
        assert_eq!(verifier.cached().await, 0);
    }

    #[tokio::test]
    async fn test_stops_at_highly_trusted_threshold() {
        let checker = Arc::new(FixedChecker::new(&["t0", "t1", "t2", "t3", "t4"], &[]));
        let verifier = verifier(checker.clone());

        let outcome = verifier.verify("alice", &trusted(40)).await;
        assert_eq!(outcome.tier, TrustTier::HighlyTrusted);
        assert_eq!(outcome.count, 3);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_trust_cap() {
        let checker = Arc::new(FixedChecker::new(&["t20"], &[]));
        let verifier = verifier(checker.clone());

        let outcome = verifier.verify("alice", &trusted(40)).await;
        assert_eq!(outcome.tier, TrustTier::NoTrustedFollows);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 15);
    }

    #[tokio::test]
    async fn test_failed_checks_skipped_and_not_counted() {
        // 5 failures before the first success; the zero-trust cap only
        // counts the successful ones
        let failing = ["t0", "t1", "t2", "t3", "t4"];
        let checker = Arc::new(FixedChecker::new(&[], &failing));
        let verifier = verifier(checker.clone());

        let outcome = verifier.verify("alice", &trusted(40)).await;
        assert_eq!(outcome.count, 0);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_scan_cap_bounds_checks() {
        // One follow early keeps the zero-trust cap from firing
        let checker = Arc::new(FixedChecker::new(&["t0"], &[]));
        let verifier = verifier(checker.clone());

        let outcome = verifier.verify("alice", &trusted(100)).await;
        assert_eq!(outcome.tier, TrustTier::SomeTrust);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 30);
    }
}
