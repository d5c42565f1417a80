// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Activity signal: engagement and language across recent posts

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

use super::{Marker, SentimentAnalyzer, SignalResult, SuspiciousKeywords};
use crate::error::{Error, Result};
use crate::models::{AccountProfile, Post};

/// Mean compound score above which activity reads as positive
pub const POSITIVE_THRESHOLD: f64 = 0.1;

/// Mean compound score below which activity reads as negative
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Overall sentiment of the sampled posts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    /// No posts to classify. Not the same as `Neutral`.
    NoData,
}

impl SentimentLabel {
    pub fn classify(mean: f64) -> Self {
        if mean > POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if mean < NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::NoData => "N/A",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engagement averages over the sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Engagement {
    pub avg_likes: f64,
    pub avg_reposts: f64,
    pub reply_ratio: f64,
}

impl Engagement {
    /// Copy with every average rounded to two decimals.
    pub fn rounded(&self) -> Self {
        Self {
            avg_likes: round2(self.avg_likes),
            avg_reposts: round2(self.avg_reposts),
            reply_ratio: round2(self.reply_ratio),
        }
    }
}

/// Sentiment and flagged topics over the sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityFindings {
    pub sentiment: SentimentLabel,
    /// Mean compound score; absent when there were no posts
    pub avg_sentiment: Option<f64>,
    /// Suspicious keywords used as words in posts, sorted
    pub topics: Vec<String>,
}

impl Default for ActivityFindings {
    fn default() -> Self {
        Self {
            sentiment: SentimentLabel::NoData,
            avg_sentiment: None,
            topics: Vec::new(),
        }
    }
}

/// All activity-derived signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySignals {
    pub engagement: SignalResult<Engagement>,
    pub activity: SignalResult<ActivityFindings>,
}

impl ActivitySignals {
    pub fn degraded() -> Self {
        Self {
            engagement: SignalResult::degraded(Engagement::default(), "Engagement analysis failed"),
            activity: SignalResult::degraded(ActivityFindings::default(), "Post analysis failed"),
        }
    }

    /// Report lines in composition order.
    pub fn lines(&self) -> [&str; 2] {
        [&self.engagement.message, &self.activity.message]
    }
}

/// Extractor for [`ActivitySignals`]
#[derive(Debug, Clone, Default)]
pub struct ActivitySignal {
    keywords: SuspiciousKeywords,
    analyzer: SentimentAnalyzer,
}

impl ActivitySignal {
    pub fn new(keywords: SuspiciousKeywords) -> Self {
        Self {
            keywords,
            analyzer: SentimentAnalyzer::new(),
        }
    }

    /// Score the post sample of `profile`. Each sub-signal degrades on its own.
    pub fn analyze(&self, profile: &AccountProfile, posts: &[Post]) -> ActivitySignals {
        let engagement = match engagement(posts) {
            Ok(stats) => SignalResult::new(
                stats.rounded(),
                Marker::Pass,
                format!(
                    "Avg likes: {:.1}, Avg reposts: {:.1}, Reply ratio: {:.2}",
                    stats.avg_likes, stats.avg_reposts, stats.reply_ratio
                ),
            ),
            Err(e) => {
                warn!("Error analyzing engagement for {}: {}", profile.handle, e);
                SignalResult::degraded(Engagement::default(), "Engagement analysis failed")
            }
        };

        let activity = match self.analyze_posts(posts) {
            Ok(result) => result,
            Err(e) => {
                warn!("Error analyzing posts for {}: {}", profile.handle, e);
                SignalResult::degraded(ActivityFindings::default(), "Post analysis failed")
            }
        };

        ActivitySignals {
            engagement,
            activity,
        }
    }

    /// Sentiment label and flagged topics. An empty sample yields `NoData`.
    pub fn analyze_posts(&self, posts: &[Post]) -> Result<SignalResult<ActivityFindings>> {
        if posts.is_empty() {
            return Ok(SignalResult::new(
                ActivityFindings::default(),
                Marker::Warn,
                "No posts available",
            ));
        }

        let mut total = 0.0;
        let mut topics = BTreeSet::new();
        for post in posts {
            let score = self.analyzer.compound(&post.text);
            if !score.is_finite() {
                return Err(Error::Internal(format!("non-finite sentiment score {}", score)));
            }
            total += score;

            let text = post.text.to_lowercase();
            for word in WORD.find_iter(&text) {
                if self.keywords.is_keyword_token(word.as_str()) {
                    topics.insert(word.as_str().to_string());
                }
            }
        }

        let mean = total / posts.len() as f64;
        let sentiment = SentimentLabel::classify(mean);
        let topics: Vec<String> = topics.into_iter().collect();

        let result = if topics.is_empty() {
            SignalResult::new(
                ActivityFindings {
                    sentiment,
                    avg_sentiment: Some(mean),
                    topics,
                },
                Marker::Pass,
                format!("Sentiment: {} ({:.2})", sentiment, mean),
            )
        } else {
            let body = format!("Sentiment: {} ({:.2}); Topics: {}", sentiment, mean, topics.join(", "));
            SignalResult::new(
                ActivityFindings {
                    sentiment,
                    avg_sentiment: Some(mean),
                    topics,
                },
                Marker::Warn,
                body,
            )
        };
        Ok(result)
    }
}

/// Unrounded averages over the sample; the divisor is floored at 1 for an
/// empty sample.
pub fn engagement(posts: &[Post]) -> Result<Engagement> {
    let count = posts.len().max(1) as f64;

    let mut likes: u64 = 0;
    let mut reposts: u64 = 0;
    let mut replies: u64 = 0;
    for post in posts {
        likes = likes
            .checked_add(post.likes)
            .ok_or_else(|| Error::InvalidInput("like count overflow".to_string()))?;
        reposts = reposts
            .checked_add(post.reposts)
            .ok_or_else(|| Error::InvalidInput("repost count overflow".to_string()))?;
        if post.is_reply {
            replies += 1;
        }
    }

    Ok(Engagement {
        avg_likes: likes as f64 / count,
        avg_reposts: reposts as f64 / count,
        reply_ratio: replies as f64 / count,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
