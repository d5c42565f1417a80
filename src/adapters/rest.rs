// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! REST adapter for the social platform API
//!
//! # Security considerations
//!
//! - The bearer token is only passed to `bearer_auth()`. It is never logged,
//!   serialized, or included in error messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{AccountSource, RelationshipChecker};
use crate::config::PlatformConfig;
use crate::error::{Error, Result};
use crate::models::{AccountProfile, Post};

/// Platform timestamps look like `Wed Oct 10 20:19:24 +0000 2018`
const PLATFORM_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Social platform client over its REST API
pub struct RestPlatformAdapter {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RestPlatformAdapter {
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("vouchbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url).query(query);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(Error::from_http)?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited(format!("{} returned 429", path)));
        }
        if !status.is_success() {
            return Err(Error::Platform(format!("{} returned status {}", path, status)));
        }

        response.json().await.map_err(Error::from_http)
    }
}

#[async_trait]
impl RelationshipChecker for RestPlatformAdapter {
    async fn follows(&self, source: &str, target: &str) -> Result<bool> {
        let friendship: FriendshipResponse = self
            .get_json(
                "/friendships/show.json",
                &[
                    ("source_screen_name", source.to_string()),
                    ("target_screen_name", target.to_string()),
                ],
            )
            .await?;
        debug!(
            "{} follows {}: {}",
            source, target, friendship.relationship.source.following
        );
        Ok(friendship.relationship.source.following)
    }
}

#[async_trait]
impl AccountSource for RestPlatformAdapter {
    async fn profile(&self, handle: &str) -> Result<AccountProfile> {
        let user: UserResponse = self
            .get_json("/users/show.json", &[("screen_name", handle.to_string())])
            .await?;
        user.into_profile()
    }

    async fn recent_posts(&self, handle: &str, count: usize) -> Result<Vec<Post>> {
        let statuses: Vec<StatusResponse> = self
            .get_json(
                "/statuses/user_timeline.json",
                &[
                    ("screen_name", handle.to_string()),
                    ("count", count.to_string()),
                    ("tweet_mode", "extended".to_string()),
                    ("exclude_replies", "false".to_string()),
                ],
            )
            .await?;
        Ok(statuses.into_iter().take(count).map(StatusResponse::into_post).collect())
    }
}

#[derive(Debug, Deserialize)]
struct FriendshipResponse {
    relationship: Relationship,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    source: RelationshipSource,
}

#[derive(Debug, Deserialize)]
struct RelationshipSource {
    following: bool,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    screen_name: String,
    created_at: String,
    #[serde(default)]
    followers_count: u64,
    #[serde(default)]
    friends_count: u64,
    description: Option<String>,
    #[serde(default)]
    verified: bool,
}

impl UserResponse {
    fn into_profile(self) -> Result<AccountProfile> {
        let created_at = parse_platform_time(&self.created_at)?;
        Ok(AccountProfile {
            handle: self.screen_name,
            created_at,
            followers: self.followers_count,
            following: self.friends_count,
            bio: self.description,
            verified: self.verified,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    full_text: Option<String>,
    text: Option<String>,
    #[serde(default)]
    favorite_count: u64,
    #[serde(default)]
    retweet_count: u64,
    in_reply_to_status_id: Option<u64>,
}

impl StatusResponse {
    fn into_post(self) -> Post {
        Post {
            text: self.full_text.or(self.text).unwrap_or_default(),
            likes: self.favorite_count,
            reposts: self.retweet_count,
            is_reply: self.in_reply_to_status_id.is_some(),
        }
    }
}

/// Parse a platform timestamp, accepting RFC 3339 as well.
pub fn parse_platform_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(raw, PLATFORM_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("malformed timestamp '{}': {}", raw, e)))
}
