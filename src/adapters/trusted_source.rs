// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! HTTP source for the trusted account list

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::TrustedListSource;
use crate::error::{Error, Result};
use crate::trust::trusted_list::parse_handles;

/// Fetches the trusted list as a JSON array from a fixed URL
pub struct HttpTrustedListSource {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpTrustedListSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vouchbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TrustedListSource for HttpTrustedListSource {
    async fn fetch(&self) -> Result<Vec<String>> {
        debug!("Fetching trusted list from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Error::from_http)?;

        if !response.status().is_success() {
            return Err(Error::TrustedList(format!(
                "trusted list host returned status {}",
                response.status()
            )));
        }

        // The raw host serves JSON as text/plain, so decode the body ourselves.
        let body = response.bytes().await.map_err(Error::from_http)?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        let handles = parse_handles(&value)?;

        if handles.is_empty() {
            return Err(Error::TrustedList(
                "no valid handles found in trusted list".to_string(),
            ));
        }
        Ok(handles)
    }
}
