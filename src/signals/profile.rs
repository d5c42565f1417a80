// SPDX-License-Identifier: PMPL-1.0-or-later
//! Profile signal: static account metadata
//!
//! | Check           | Pass when              |
//! |-----------------|------------------------|
//! | Verification    | account is verified    |
//! | Account age     | older than 365 days    |
//! | Follower ratio  | followers/following > 0.5 (following floored at 1) |
//! | Bio             | no suspicious keyword  |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Marker, SignalResult, SuspiciousKeywords};
use crate::error::{Error, Result};
use crate::models::AccountProfile;

/// Accounts older than this many days count as established
pub const ESTABLISHED_AGE_DAYS: u64 = 365;

/// Minimum follower/following ratio that passes
pub const MIN_FOLLOWER_RATIO: f64 = 0.5;

/// Result of bio analysis
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BioFindings {
    /// Bio length in characters
    pub length: usize,
    pub suspicious: bool,
    /// Every keyword found, in configured order
    pub keywords: Vec<String>,
}

/// All profile-derived signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSignals {
    pub verified: SignalResult<bool>,
    pub age_days: SignalResult<u64>,
    pub follower_ratio: SignalResult<f64>,
    pub bio: SignalResult<BioFindings>,
}

impl ProfileSignals {
    /// Zero/false defaults used when the analysis could not run at all.
    pub fn degraded() -> Self {
        Self {
            verified: SignalResult::degraded(false, "Verification unknown"),
            age_days: SignalResult::degraded(0, "Age: 0 days"),
            follower_ratio: SignalResult::degraded(0.0, "Follower ratio: 0.00"),
            bio: SignalResult::degraded(BioFindings::default(), "Bio analysis failed"),
        }
    }

    /// Report lines in composition order.
    pub fn lines(&self) -> [&str; 4] {
        [
            &self.verified.message,
            &self.age_days.message,
            &self.follower_ratio.message,
            &self.bio.message,
        ]
    }
}

/// Extractor for [`ProfileSignals`]
#[derive(Debug, Clone, Default)]
pub struct ProfileSignal {
    keywords: SuspiciousKeywords,
}

impl ProfileSignal {
    pub fn new(keywords: SuspiciousKeywords) -> Self {
        Self { keywords }
    }

    /// Score `profile` as of `now`. Each sub-signal degrades on its own.
    pub fn analyze(&self, profile: &AccountProfile, now: DateTime<Utc>) -> ProfileSignals {
        let verified = if profile.verified {
            SignalResult::new(true, Marker::Pass, "Verified")
        } else {
            SignalResult::new(false, Marker::Warn, "Not verified")
        };

        let age_days = match account_age_days(profile.created_at, now) {
            Ok(days) => SignalResult::new(
                days,
                Marker::from_pass(days > ESTABLISHED_AGE_DAYS),
                format!("Age: {} days", days),
            ),
            Err(e) => {
                warn!("Error calculating account age for {}: {}", profile.handle, e);
                SignalResult::degraded(0, "Age: 0 days")
            }
        };

        let ratio = follower_ratio(profile.followers, profile.following);
        let follower_ratio = SignalResult::new(
            ratio,
            Marker::from_pass(ratio > MIN_FOLLOWER_RATIO),
            format!("Follower ratio: {:.2}", ratio),
        );

        let bio = match self.analyze_bio(profile.bio.as_deref()) {
            Ok(bio) => bio,
            Err(e) => {
                warn!("Error analyzing bio for {}: {}", profile.handle, e);
                SignalResult::degraded(BioFindings::default(), "Bio analysis failed")
            }
        };

        ProfileSignals {
            verified,
            age_days,
            follower_ratio,
            bio,
        }
    }

    /// Length plus suspicious keyword scan. A missing bio is treated as empty.
    pub fn analyze_bio(&self, bio: Option<&str>) -> Result<SignalResult<BioFindings>> {
        let bio = bio.unwrap_or_default();
        if bio.contains('\0') {
            return Err(Error::InvalidInput("bio contains NUL bytes".to_string()));
        }

        let length = bio.chars().count();
        let keywords = self.keywords.substring_matches(bio);
        let suspicious = !keywords.is_empty();

        let result = if suspicious {
            let body = format!(
                "Bio length: {} chars; Suspicious keywords: {}",
                length,
                keywords.join(", ")
            );
            SignalResult::new(
                BioFindings {
                    length,
                    suspicious,
                    keywords,
                },
                Marker::Warn,
                body,
            )
        } else {
            SignalResult::new(
                BioFindings {
                    length,
                    suspicious,
                    keywords,
                },
                Marker::Pass,
                format!("Bio length: {} chars", length),
            )
        };
        Ok(result)
    }
}

/// Whole days between creation and `now`; future creation dates clamp to 0.
pub fn account_age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64> {
    let days = now.signed_duration_since(created_at).num_days();
    u64::try_from(days.max(0))
        .map_err(|_| Error::Internal(format!("account age out of range: {}", days)))
}

/// Followers per following, with following floored at 1.
pub fn follower_ratio(followers: u64, following: u64) -> f64 {
    followers as f64 / following.max(1) as f64
}
