// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Remote collaborators: the social platform and the trusted list host

pub mod rest;
pub mod trusted_source;

pub use rest::RestPlatformAdapter;
pub use trusted_source::HttpTrustedListSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AccountProfile, Post};

/// Answers "does `source` follow `target`?"
///
/// Errors are treated as transient by the quorum verifier: the candidate is
/// skipped and the scan continues.
#[async_trait]
pub trait RelationshipChecker: Send + Sync {
    async fn follows(&self, source: &str, target: &str) -> Result<bool>;
}

/// Profile and timeline lookups
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Fetch the profile snapshot for `handle`
    async fn profile(&self, handle: &str) -> Result<AccountProfile>;

    /// Fetch up to `count` recent posts, most recent first
    async fn recent_posts(&self, handle: &str, count: usize) -> Result<Vec<Post>>;
}

/// Remote source of trusted account handles
#[async_trait]
pub trait TrustedListSource: Send + Sync {
    /// Fetch and validate the list. Returned handles are lower-cased and
    /// de-duplicated; an empty list is an error.
    async fn fetch(&self) -> Result<Vec<String>>;
}
