// SPDX-License-Identifier: PMPL-1.0-or-later
//! Compound sentiment scoring for short social posts.
//!
//! Backed by the full VADER lexicon (slang, emoticons and emoji included)
//! with its negation, booster, caps, "but" and punctuation rules.

use vader_sentiment::SentimentIntensityAnalyzer;

/// Scores text into a compound sentiment value
#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Compound score of `text` in `-1.0..=1.0`; `0.0` when nothing is known.
    pub fn compound(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        SentimentIntensityAnalyzer::new()
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
    }
}
