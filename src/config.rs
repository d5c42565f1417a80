// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management for vouchbot

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Trusted account list source and cache
    #[serde(default)]
    pub trusted_list: TrustedListConfig,

    /// Peer-trust quorum policy
    #[serde(default)]
    pub quorum: QuorumConfig,

    /// Profile and activity analysis
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Reply formatting
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Social platform API
    #[serde(default)]
    pub platform: PlatformConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrustedListConfig {
    /// URL of the JSON trusted list
    #[serde(default = "default_trusted_list_url")]
    pub url: String,

    /// Local file caching the last fetched list
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    /// How long a fetched list stays valid (hours)
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    /// HTTP timeout for the fetch (seconds)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl TrustedListConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.saturating_mul(3600))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for TrustedListConfig {
    fn default() -> Self {
        Self {
            url: default_trusted_list_url(),
            cache_file: default_cache_file(),
            cache_ttl_hours: default_cache_ttl_hours(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_trusted_list_url() -> String {
    "https://raw.githubusercontent.com/devsyrem/turst-list/main/list".to_string()
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("trusted_list.json")
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_fetch_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuorumConfig {
    /// Trusted follows needed to count as trusted
    #[serde(default = "default_trusted_threshold")]
    pub trusted_threshold: usize,

    /// Trusted follows needed to count as highly trusted (scan stops here)
    #[serde(default = "default_highly_trusted_threshold")]
    pub highly_trusted_threshold: usize,

    /// Maximum trusted accounts examined per check
    #[serde(default = "default_scan_cap")]
    pub scan_cap: usize,

    /// Give up after this many checks without a single trusted follow
    #[serde(default = "default_zero_trust_cap")]
    pub zero_trust_cap: usize,

    /// How long a quorum result stays cached (seconds)
    #[serde(default = "default_quorum_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached quorum results
    #[serde(default = "default_quorum_cache_capacity")]
    pub cache_capacity: usize,
}

impl QuorumConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Reject threshold combinations that would break the tiering.
    pub fn validate(&self) -> Result<()> {
        if self.trusted_threshold == 0 {
            return Err(Error::Config(
                "quorum.trusted_threshold must be at least 1".to_string(),
            ));
        }
        if self.trusted_threshold > self.highly_trusted_threshold {
            return Err(Error::Config(format!(
                "quorum.trusted_threshold ({}) must be <= quorum.highly_trusted_threshold ({})",
                self.trusted_threshold, self.highly_trusted_threshold
            )));
        }
        if self.zero_trust_cap > self.scan_cap {
            return Err(Error::Config(format!(
                "quorum.zero_trust_cap ({}) must be <= quorum.scan_cap ({})",
                self.zero_trust_cap, self.scan_cap
            )));
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config(
                "quorum.cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            trusted_threshold: default_trusted_threshold(),
            highly_trusted_threshold: default_highly_trusted_threshold(),
            scan_cap: default_scan_cap(),
            zero_trust_cap: default_zero_trust_cap(),
            cache_ttl_secs: default_quorum_cache_ttl(),
            cache_capacity: default_quorum_cache_capacity(),
        }
    }
}

fn default_trusted_threshold() -> usize {
    2
}

fn default_highly_trusted_threshold() -> usize {
    3
}

fn default_scan_cap() -> usize {
    30
}

fn default_zero_trust_cap() -> usize {
    15
}

fn default_quorum_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_quorum_cache_capacity() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Number of recent posts sampled per account
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Timeout for profile and activity analysis (seconds)
    #[serde(default = "default_account_timeout")]
    pub account_timeout_secs: u64,

    /// Timeout for the quorum check (seconds)
    #[serde(default = "default_quorum_timeout")]
    pub quorum_timeout_secs: u64,

    /// Keywords that flag a bio or post topic as suspicious
    #[serde(default = "default_suspicious_keywords")]
    pub suspicious_keywords: Vec<String>,
}

impl AnalysisConfig {
    pub fn account_timeout(&self) -> Duration {
        Duration::from_secs(self.account_timeout_secs)
    }

    pub fn quorum_timeout(&self) -> Duration {
        Duration::from_secs(self.quorum_timeout_secs)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            account_timeout_secs: default_account_timeout(),
            quorum_timeout_secs: default_quorum_timeout(),
            suspicious_keywords: default_suspicious_keywords(),
        }
    }
}

fn default_sample_size() -> usize {
    20
}

fn default_account_timeout() -> u64 {
    10
}

fn default_quorum_timeout() -> u64 {
    8
}

pub(crate) fn default_suspicious_keywords() -> Vec<String> {
    ["crypto", "nft", "giveaway", "investment", "earn money"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplyConfig {
    /// Hard length limit of a reply, prefix included (characters)
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Phrase that asks the bot for an evaluation
    #[serde(default = "default_trigger_phrase")]
    pub trigger_phrase: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            trigger_phrase: default_trigger_phrase(),
        }
    }
}

fn default_max_length() -> usize {
    280
}

fn default_trigger_phrase() -> String {
    "riddle me this".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlatformConfig {
    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token (prefer VOUCHBOT__PLATFORM__TOKEN)
    pub token: Option<String>,

    /// Handle the bot posts as (without @)
    #[serde(default = "default_bot_handle")]
    pub bot_handle: String,

    /// HTTP timeout for platform calls (seconds)
    #[serde(default = "default_platform_timeout")]
    pub timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            bot_handle: default_bot_handle(),
            timeout_secs: default_platform_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.twitter.com/1.1".to_string()
}

fn default_bot_handle() -> String {
    "vouchbot".to_string()
}

fn default_platform_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &str) -> Result<Self> {
        let path = Path::new(path);

        let mut builder = config::Config::builder();
        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
        }
        builder = builder.add_source(config::Environment::with_prefix("VOUCHBOT").separator("__"));

        let config = builder.build()?;
        let parsed: Config = config.try_deserialize()?;
        parsed.quorum.validate()?;

        Ok(parsed)
    }
}
