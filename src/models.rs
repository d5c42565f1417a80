// SPDX-License-Identifier: PMPL-1.0-or-later
//! Account and post snapshots handed to the engine by the platform layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of an account's profile metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Account handle, without the leading `@`
    pub handle: String,
    pub created_at: DateTime<Utc>,
    pub followers: u64,
    pub following: u64,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

/// A single post from the account's recent activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub text: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub reposts: u64,
    #[serde(default)]
    pub is_reply: bool,
}

impl Post {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            likes: 0,
            reposts: 0,
            is_reply: false,
        }
    }

    pub fn with_engagement(mut self, likes: u64, reposts: u64) -> Self {
        self.likes = likes;
        self.reposts = reposts;
        self
    }

    pub fn as_reply(mut self) -> Self {
        self.is_reply = true;
        self
    }
}

/// Input document for offline evaluation (`vouchbot evaluate`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub profile: AccountProfile,
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// Keep at most `limit` posts, most recent first.
pub fn bounded_sample(posts: &[Post], limit: usize) -> &[Post] {
    &posts[..posts.len().min(limit)]
}
