// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Trust evaluation engine
//!
//! Runs the profile signal, the activity signal and the quorum check as
//! three concurrent tasks, each joined under a timeout:
//!
//! ```text
//!            ┌─ profile  (blocking, 10s) ─┐
//! evaluate ──┼─ activity (blocking, 10s) ─┼──▶ TrustReport
//!            └─ (trusted list → quorum) (8s)┘
//! ```
//!
//! A task that times out or panics is replaced by its degraded default.
//! `evaluate` never returns an error.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::{HttpTrustedListSource, RelationshipChecker};
use crate::config::Config;
use crate::error::Result;
use crate::models::{bounded_sample, AccountProfile, Post};
use crate::report::TrustReport;
use crate::signals::{ActivitySignal, ActivitySignals, ProfileSignal, ProfileSignals, SuspiciousKeywords};
use crate::trust::{QuorumOutcome, QuorumVerifier, TrustedListStore};

/// Evaluates accounts. Cheap to clone; clones share caches.
#[derive(Clone)]
pub struct TrustEngine {
    profile_signal: Arc<ProfileSignal>,
    activity_signal: Arc<ActivitySignal>,
    trusted: Arc<TrustedListStore>,
    verifier: Arc<QuorumVerifier>,
    sample_size: usize,
    account_timeout: Duration,
    quorum_timeout: Duration,
    budget: usize,
}

impl TrustEngine {
    pub fn new(config: &Config, trusted: Arc<TrustedListStore>, verifier: Arc<QuorumVerifier>) -> Self {
        let keywords = SuspiciousKeywords::new(&config.analysis.suspicious_keywords);
        Self {
            profile_signal: Arc::new(ProfileSignal::new(keywords.clone())),
            activity_signal: Arc::new(ActivitySignal::new(keywords)),
            trusted,
            verifier,
            sample_size: config.analysis.sample_size,
            account_timeout: config.analysis.account_timeout(),
            quorum_timeout: config.analysis.quorum_timeout(),
            budget: config.reply.max_length,
        }
    }

    /// Wire the HTTP trusted list source and the given relationship checker.
    pub fn from_config(config: &Config, checker: Arc<dyn RelationshipChecker>) -> Result<Self> {
        let source = HttpTrustedListSource::new(
            config.trusted_list.url.clone(),
            config.trusted_list.fetch_timeout(),
        )?;
        let trusted = TrustedListStore::new(
            Arc::new(source),
            config.trusted_list.cache_file.clone(),
            config.trusted_list.cache_ttl(),
        );
        let verifier = QuorumVerifier::new(checker, config.quorum.clone())?;
        Ok(Self::new(config, Arc::new(trusted), Arc::new(verifier)))
    }

    /// Override the per-task timeouts.
    pub fn with_timeouts(mut self, account: Duration, quorum: Duration) -> Self {
        self.account_timeout = account;
        self.quorum_timeout = quorum;
        self
    }

    pub fn trusted_store(&self) -> &Arc<TrustedListStore> {
        &self.trusted
    }

    pub fn verifier(&self) -> &Arc<QuorumVerifier> {
        &self.verifier
    }

    /// Summary length budget, reply prefix included
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Evaluate with the whole budget available to the summary.
    pub async fn evaluate(&self, profile: AccountProfile, posts: Vec<Post>) -> TrustReport {
        self.evaluate_with_prefix(profile, posts, 0).await
    }

    /// Evaluate, leaving `prefix_len` characters of the budget for a reply
    /// prefix.
    pub async fn evaluate_with_prefix(
        &self,
        profile: AccountProfile,
        posts: Vec<Post>,
        prefix_len: usize,
    ) -> TrustReport {
        let evaluation_id = Uuid::new_v4();
        let handle = profile.handle.clone();
        let span = info_span!("evaluate", %evaluation_id, handle = %handle);

        let engine = self.clone();
        guarded(
            evaluation_id,
            handle,
            async move { engine.run(evaluation_id, profile, posts, prefix_len).await }
                .instrument(span),
        )
        .await
    }

    async fn run(
        &self,
        evaluation_id: Uuid,
        profile: AccountProfile,
        posts: Vec<Post>,
        prefix_len: usize,
    ) -> TrustReport {
        let now = Utc::now();
        let handle = profile.handle.clone();
        let profile = Arc::new(profile);
        let posts = Arc::new(bounded_sample(&posts, self.sample_size).to_vec());

        let profile_task = {
            let signal = Arc::clone(&self.profile_signal);
            let profile = Arc::clone(&profile);
            tokio::task::spawn_blocking(move || signal.analyze(&profile, now))
        };

        let activity_task = {
            let signal = Arc::clone(&self.activity_signal);
            let profile = Arc::clone(&profile);
            let posts = Arc::clone(&posts);
            tokio::task::spawn_blocking(move || signal.analyze(&profile, &posts))
        };

        let quorum_task = {
            let trusted = Arc::clone(&self.trusted);
            let verifier = Arc::clone(&self.verifier);
            let handle = handle.clone();
            let quorum_timeout = self.quorum_timeout;
            tokio::spawn(
                timeout(quorum_timeout, async move {
                    let list = trusted.load().await;
                    verifier.verify(&handle, &list).await
                })
                .in_current_span(),
            )
        };

        let (profile_joined, activity_joined, quorum_joined) = tokio::join!(
            timeout(self.account_timeout, profile_task),
            timeout(self.account_timeout, activity_task),
            quorum_task,
        );

        let profile_signals = settle(profile_joined, "Profile analysis", ProfileSignals::degraded);
        let activity_signals = settle(activity_joined, "Activity analysis", ActivitySignals::degraded);
        let quorum = match quorum_joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                warn!("Quorum check for {} timed out", handle);
                QuorumOutcome::check_failed()
            }
            Err(e) => {
                warn!("Quorum check for {} failed: {}", handle, e);
                QuorumOutcome::check_failed()
            }
        };

        let report = TrustReport::compose(
            evaluation_id,
            handle,
            profile_signals,
            activity_signals,
            quorum,
            prefix_len,
            self.budget,
        );
        info!(
            "Evaluated {}: {} (degraded: {})",
            report.handle,
            report.quorum.message,
            report.is_degraded()
        );
        report
    }
}

/// Run `evaluation` as its own task; a panic yields the failed report.
async fn guarded<F>(evaluation_id: Uuid, handle: String, evaluation: F) -> TrustReport
where
    F: Future<Output = TrustReport> + Send + 'static,
{
    match tokio::spawn(evaluation).await {
        Ok(report) => report,
        Err(e) => {
            error!("Evaluation {} for {} failed: {}", evaluation_id, handle, e);
            TrustReport::failed(evaluation_id, handle)
        }
    }
}

/// Unwrap a timed, joined task or fall back to `degraded`.
fn settle<T>(
    joined: std::result::Result<std::result::Result<T, JoinError>, tokio::time::error::Elapsed>,
    what: &str,
    degraded: fn() -> T,
) -> T {
    match joined {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            warn!("{} task failed: {}", what, e);
            degraded()
        }
        Err(_) => {
            warn!("{} timed out", what);
            degraded()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TrustedListSource;
    use async_trait::async_trait;

    struct StaticSource(Vec<String>);

    #[async_trait]
    impl TrustedListSource for StaticSource {
        async fn fetch(&self) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    /// Trusted list host that answers only after `delay`
    struct SlowSource(Duration);

    #[async_trait]
    impl TrustedListSource for SlowSource {
        async fn fetch(&self) -> Result<Vec<String>> {
            tokio::time::sleep(self.0).await;
            Ok(vec!["t1".to_string(), "t2".to_string()])
        }
    }

    struct PanickingChecker;

    #[async_trait]
    impl RelationshipChecker for PanickingChecker {
        async fn follows(&self, _source: &str, _target: &str) -> Result<bool> {
            panic!("relationship lookup exploded");
        }
    }

    struct NobodyFollows;

    #[async_trait]
    impl RelationshipChecker for NobodyFollows {
        async fn follows(&self, _source: &str, _target: &str) -> Result<bool> {
            Ok(false)
        }
    }

    fn engine_with(
        dir: &tempfile::TempDir,
        source: Arc<dyn TrustedListSource>,
        checker: Arc<dyn RelationshipChecker>,
    ) -> TrustEngine {
        let config = Config::default();
        let trusted = TrustedListStore::new(
            source,
            dir.path().join("trusted_list.json"),
            config.trusted_list.cache_ttl(),
        );
        let verifier = QuorumVerifier::new(checker, config.quorum.clone()).unwrap();
        TrustEngine::new(&config, Arc::new(trusted), Arc::new(verifier))
    }

    fn engine(dir: &tempfile::TempDir) -> TrustEngine {
        engine_with(
            dir,
            Arc::new(StaticSource(vec!["t1".to_string()])),
            Arc::new(NobodyFollows),
        )
    }

    fn profile(handle: &str) -> AccountProfile {
        AccountProfile {
            handle: handle.to_string(),
            created_at: Utc::now() - chrono::Duration::days(30),
            followers: 5,
            following: 50,
            bio: Some("just here".to_string()),
            verified: false,
        }
    }

    #[tokio::test]
    async fn test_evaluate_composes_all_lines() {
        let dir = tempfile::tempdir().unwrap();
        let report = engine(&dir).evaluate(profile("carol"), vec![Post::new("hello")]).await;

        assert_eq!(report.handle, "carol");
        assert_eq!(report.summary.lines().count(), 7);
        assert_eq!(report.summary.lines().last(), Some("No trusted follows ⚠️"));
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn test_sample_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        // Posts past the cap would drag the reply ratio down
        let mut posts: Vec<Post> = (0..20).map(|_| Post::new("hi").as_reply()).collect();
        posts.extend((0..10).map(|_| Post::new("hi")));
        let report = engine(&dir).evaluate(profile("carol"), posts).await;
        assert_eq!(report.engagement.value.reply_ratio, 1.0);
    }

    #[tokio::test]
    async fn test_invalid_handle_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let report = engine(&dir).evaluate(profile("bad handle"), Vec::new()).await;
        assert_eq!(report.quorum.message, "Invalid handle");
        assert_eq!(report.activity.message, "No posts available ⚠️");
    }

    #[tokio::test]
    async fn test_quorum_timeout_covers_trusted_list_load() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(
            &dir,
            Arc::new(SlowSource(Duration::from_secs(3))),
            Arc::new(NobodyFollows),
        )
        .with_timeouts(Duration::from_secs(5), Duration::from_millis(200));

        let started = std::time::Instant::now();
        let report = engine.evaluate(profile("carol"), Vec::new()).await;

        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
        assert_eq!(report.quorum, QuorumOutcome::check_failed());
        assert_eq!(report.summary.lines().last(), Some("Trust check failed ⚠️"));
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn test_panicking_quorum_task_degrades_to_check_failed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(
            &dir,
            Arc::new(StaticSource(vec!["t1".to_string()])),
            Arc::new(PanickingChecker),
        );

        let report = engine.evaluate(profile("carol"), vec![Post::new("hello")]).await;
        assert_eq!(report.quorum.tier, crate::trust::TrustTier::CheckFailed);
        assert_eq!(report.summary.lines().count(), 7);
        assert_eq!(report.verified.message, "Not verified ⚠️");
    }

    #[tokio::test]
    async fn test_panicking_evaluation_yields_failed_report() {
        let id = Uuid::new_v4();
        let report = guarded(id, "carol".to_string(), async {
            panic!("evaluation exploded");
        })
        .await;

        assert_eq!(report.evaluation_id, id);
        assert_eq!(report.handle, "carol");
        assert_eq!(report.summary, "Analysis failed ⚠️");
    }

    #[tokio::test]
    async fn test_settle_substitutes_degraded_signals() {
        let slow = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            ProfileSignals::degraded()
        });
        let timed_out = settle(
            timeout(Duration::from_millis(20), slow).await,
            "Profile analysis",
            ProfileSignals::degraded,
        );
        assert!(timed_out.bio.degraded);
        assert_eq!(timed_out.bio.message, "Bio analysis failed ⚠️");

        let broken = tokio::task::spawn_blocking(|| -> ActivitySignals { panic!("scorer exploded") });
        let panicked = settle(
            timeout(Duration::from_secs(5), broken).await,
            "Activity analysis",
            ActivitySignals::degraded,
        );
        assert!(panicked.engagement.degraded);
        assert_eq!(panicked.activity.message, "Post analysis failed ⚠️");

        let report = TrustReport::compose(
            Uuid::new_v4(),
            "carol",
            timed_out,
            panicked,
            QuorumOutcome::check_failed(),
            0,
            280,
        );
        assert!(report.is_degraded());
        assert_eq!(
            report.summary.lines().collect::<Vec<_>>(),
            vec![
                "Verification unknown ⚠️",
                "Age: 0 days ⚠️",
                "Follower ratio: 0.00 ⚠️",
                "Bio analysis failed ⚠️",
                "Engagement analysis failed ⚠️",
                "Post analysis failed ⚠️",
                "Trust check failed ⚠️",
            ]
        );
    }
}
