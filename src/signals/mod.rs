// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Behavioral signals
//!
//! Each signal scores one independent dimension of an account:
//!
//! 1. **Profile**: account age, follower ratio, verification, bio keywords
//! 2. **Activity**: engagement averages, sentiment and flagged topics
//!
//! Extractors never fail outward. Internal faults produce a degraded
//! [`SignalResult`] carrying a warn marker and a failure message.

pub mod activity;
pub mod profile;
pub mod sentiment;

pub use activity::{ActivityFindings, ActivitySignal, ActivitySignals, Engagement, SentimentLabel};
pub use profile::{BioFindings, ProfileSignal, ProfileSignals};
pub use sentiment::SentimentAnalyzer;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pass/warn marker rendered at the end of every report line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Pass,
    Warn,
}

impl Marker {
    pub fn from_pass(pass: bool) -> Self {
        if pass {
            Marker::Pass
        } else {
            Marker::Warn
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Marker::Pass => "✅",
            Marker::Warn => "⚠️",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Outcome of one signal: the computed value, its marker and the rendered line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult<T> {
    pub value: T,
    pub marker: Marker,
    pub message: String,
    /// Set when the value is a default substituted after a failure
    #[serde(default)]
    pub degraded: bool,
}

impl<T> SignalResult<T> {
    /// Render `body` followed by the marker glyph.
    pub fn new(value: T, marker: Marker, body: impl fmt::Display) -> Self {
        Self {
            value,
            marker,
            message: format!("{} {}", body, marker),
            degraded: false,
        }
    }

    /// Default value with a failure message, always marked as a warning.
    pub fn degraded(value: T, failure: impl fmt::Display) -> Self {
        Self {
            value,
            marker: Marker::Warn,
            message: format!("{} {}", failure, Marker::Warn),
            degraded: true,
        }
    }

    pub fn is_warn(&self) -> bool {
        self.marker == Marker::Warn
    }
}

/// Case-insensitive keyword set shared by bio and topic analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspiciousKeywords {
    keywords: Vec<String>,
}

impl SuspiciousKeywords {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Self {
            keywords: normalized,
        }
    }

    /// Keywords occurring anywhere in `text`, in configured order.
    pub fn substring_matches(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|kw| haystack.contains(kw.as_str()))
            .cloned()
            .collect()
    }

    /// Whether a single lowercase word token is a keyword.
    pub fn is_keyword_token(&self, token: &str) -> bool {
        self.keywords.iter().any(|kw| kw == token)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for SuspiciousKeywords {
    fn default() -> Self {
        Self::new(crate::config::default_suspicious_keywords())
    }
}
