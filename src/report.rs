// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Trust report: every signal, the quorum outcome and the rendered summary

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signals::{
    ActivityFindings, ActivitySignals, BioFindings, Engagement, Marker, ProfileSignals, SignalResult,
};
use crate::trust::QuorumOutcome;

/// Appended to a summary cut short to fit the reply budget
const ELLIPSIS: &str = "...";

/// Aggregated evaluation of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustReport {
    pub evaluation_id: Uuid,
    pub handle: String,
    pub verified: SignalResult<bool>,
    pub age_days: SignalResult<u64>,
    pub follower_ratio: SignalResult<f64>,
    pub bio: SignalResult<BioFindings>,
    pub engagement: SignalResult<Engagement>,
    pub activity: SignalResult<ActivityFindings>,
    pub quorum: QuorumOutcome,
    /// Newline-joined report lines, already fitted to the length budget
    pub summary: String,
}

impl TrustReport {
    /// Assemble the report and fit its summary so that
    /// `prefix_len + summary` stays within `budget` characters.
    pub fn compose(
        evaluation_id: Uuid,
        handle: impl Into<String>,
        profile: ProfileSignals,
        activity: ActivitySignals,
        quorum: QuorumOutcome,
        prefix_len: usize,
        budget: usize,
    ) -> Self {
        let mut lines: Vec<&str> = Vec::with_capacity(7);
        lines.extend(profile.lines());
        lines.extend(activity.lines());
        lines.push(&quorum.message);
        let summary = fit_summary(&lines.join("\n"), prefix_len, budget);

        Self {
            evaluation_id,
            handle: handle.into(),
            verified: profile.verified,
            age_days: profile.age_days,
            follower_ratio: profile.follower_ratio,
            bio: profile.bio,
            engagement: activity.engagement,
            activity: activity.activity,
            quorum,
            summary,
        }
    }

    /// Single-line report used when the evaluation itself broke down.
    pub fn failed(evaluation_id: Uuid, handle: impl Into<String>) -> Self {
        let profile = ProfileSignals::degraded();
        let activity = ActivitySignals::degraded();
        Self {
            evaluation_id,
            handle: handle.into(),
            verified: profile.verified,
            age_days: profile.age_days,
            follower_ratio: profile.follower_ratio,
            bio: profile.bio,
            engagement: activity.engagement,
            activity: activity.activity,
            quorum: QuorumOutcome::check_failed(),
            summary: format!("Analysis failed {}", Marker::Warn),
        }
    }

    /// Whether any signal had to fall back to its degraded default.
    pub fn is_degraded(&self) -> bool {
        self.verified.degraded
            || self.age_days.degraded
            || self.follower_ratio.degraded
            || self.bio.degraded
            || self.engagement.degraded
            || self.activity.degraded
    }
}

/// Cut `summary` so that `prefix_len + result` is at most `budget` chars.
///
/// An over-long summary keeps its first `budget - prefix_len - 3` chars and
/// gains `...`. Cuts always fall on char boundaries.
pub fn fit_summary(summary: &str, prefix_len: usize, budget: usize) -> String {
    let room = budget.saturating_sub(prefix_len);
    if summary.chars().count() <= room {
        return summary.to_string();
    }
    if room < ELLIPSIS.len() {
        return ELLIPSIS[..room].to_string();
    }

    let keep = room - ELLIPSIS.len();
    let mut fitted: String = summary.chars().take(keep).collect();
    fitted.push_str(ELLIPSIS);
    fitted
}
