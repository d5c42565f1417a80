// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Trusted account list with a persisted, time-boxed cache
//!
//! The list is refreshed at most once per validity window (24h by default):
//!
//! 1. A valid in-memory list is returned under a read lock.
//! 2. Otherwise the persisted file is inspected and classified as a
//!    [`CacheState`]. A fresh file is adopted without touching the network.
//! 3. Anything else triggers [`TrustedListStore::refresh`].
//!
//! Fetch failures yield an empty list and leave both the file and the
//! in-memory slot untouched, so the next load retries.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::adapters::TrustedListSource;
use crate::error::{Error, Result};

/// De-duplicated, lower-cased trusted handles plus their fetch time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedList {
    #[serde(rename = "timestamp", deserialize_with = "deserialize_timestamp")]
    fetched_at: DateTime<Utc>,
    handles: Vec<String>,
}

impl TrustedList {
    pub fn new<I, S>(handles: I, fetched_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fetched_at,
            handles: normalize_handles(handles),
        }
    }

    /// The list handed out when nothing could be fetched.
    pub fn empty() -> Self {
        Self {
            fetched_at: DateTime::<Utc>::MIN_UTC,
            handles: Vec::new(),
        }
    }

    pub fn handles(&self) -> &[String] {
        &self.handles
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether the list is still inside its validity window at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.handles.is_empty() {
            return false;
        }
        match now.signed_duration_since(self.fetched_at).to_std() {
            Ok(age) => age < ttl,
            // Fetched "in the future" (clock skew): still valid
            Err(_) => true,
        }
    }
}

/// Accepts RFC 3339 and naive ISO-8601 (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::InvalidInput(format!("bad cache timestamp '{}': {}", raw, e)))
}

fn normalize_handles<I, S>(handles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for handle in handles {
        let handle = handle.as_ref().trim().to_lowercase();
        if !handle.is_empty() && !out.contains(&handle) {
            out.push(handle);
        }
    }
    out
}

/// Extract handles from the trusted list document.
///
/// The document must be a JSON array. Entries that are not objects with a
/// string `handle` field are dropped. Output is lower-cased and
/// de-duplicated, preserving first occurrence.
pub fn parse_handles(value: &serde_json::Value) -> Result<Vec<String>> {
    let entries = value
        .as_array()
        .ok_or_else(|| Error::TrustedList("expected a JSON array".to_string()))?;

    let raw = entries
        .iter()
        .filter_map(|entry| entry.get("handle").and_then(serde_json::Value::as_str));
    Ok(normalize_handles(raw))
}

/// Classification of the persisted cache file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    /// Present and inside the validity window
    Fresh(TrustedList),
    /// Present but older than the window
    Expired(TrustedList),
    /// No file on disk
    Missing,
    /// File present but not usable
    Unreadable(String),
}

/// Owner of the trusted list: memory slot, persisted file and remote source
pub struct TrustedListStore {
    source: Arc<dyn TrustedListSource>,
    cache_path: PathBuf,
    ttl: Duration,
    current: RwLock<Option<Arc<TrustedList>>>,
    /// Serialises refreshes so at most one fetch is in flight
    refresh_lock: Mutex<()>,
}

impl TrustedListStore {
    pub fn new(source: Arc<dyn TrustedListSource>, cache_path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            source,
            cache_path: cache_path.into(),
            ttl,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Current trusted list; empty if it could not be obtained.
    pub async fn load(&self) -> Arc<TrustedList> {
        self.load_at(Utc::now()).await
    }

    /// [`load`](Self::load) as of `now`.
    pub async fn load_at(&self, now: DateTime<Utc>) -> Arc<TrustedList> {
        if let Some(list) = self.valid_in_memory(now).await {
            return list;
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        if let Some(list) = self.valid_in_memory(now).await {
            return list;
        }

        match self.check_persisted(now).await {
            CacheState::Fresh(list) => {
                info!("Loaded {} trusted handles from cache", list.len());
                let list = Arc::new(list);
                *self.current.write().await = Some(Arc::clone(&list));
                list
            }
            CacheState::Expired(_) => {
                debug!("Trusted list cache expired");
                self.refresh_locked(now).await
            }
            CacheState::Missing => {
                debug!("No trusted list cache at {}", self.cache_path.display());
                self.refresh_locked(now).await
            }
            CacheState::Unreadable(reason) => {
                warn!("Ignoring trusted list cache: {}", reason);
                self.refresh_locked(now).await
            }
        }
    }

    /// Fetch from the remote source regardless of cache state.
    pub async fn refresh(&self) -> Arc<TrustedList> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked(Utc::now()).await
    }

    /// Classify the persisted cache file as of `now`.
    pub async fn check_persisted(&self, now: DateTime<Utc>) -> CacheState {
        let bytes = match tokio::fs::read(&self.cache_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheState::Missing,
            Err(e) => return CacheState::Unreadable(e.to_string()),
        };

        let list: TrustedList = match serde_json::from_slice(&bytes) {
            Ok(list) => list,
            Err(e) => return CacheState::Unreadable(e.to_string()),
        };
        // Re-normalise in case the file was edited by hand
        let list = TrustedList::new(list.handles, list.fetched_at);
        if list.is_empty() {
            return CacheState::Unreadable("cache holds no handles".to_string());
        }

        if list.is_valid_at(now, self.ttl) {
            CacheState::Fresh(list)
        } else {
            CacheState::Expired(list)
        }
    }

    async fn valid_in_memory(&self, now: DateTime<Utc>) -> Option<Arc<TrustedList>> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|list| list.is_valid_at(now, self.ttl))
            .map(Arc::clone)
    }

    /// Caller must hold `refresh_lock`.
    async fn refresh_locked(&self, now: DateTime<Utc>) -> Arc<TrustedList> {
        let handles = match self.source.fetch().await {
            Ok(handles) if !handles.is_empty() => handles,
            Ok(_) => {
                warn!("No valid handles found in trusted list");
                return Arc::new(TrustedList::empty());
            }
            Err(e) => {
                warn!("Failed to fetch trusted list: {}", e);
                return Arc::new(TrustedList::empty());
            }
        };

        let list = Arc::new(TrustedList::new(handles, now));
        if let Err(e) = self.persist(&list).await {
            warn!(
                "Failed to write trusted list cache {}: {}",
                self.cache_path.display(),
                e
            );
        }

        *self.current.write().await = Some(Arc::clone(&list));
        info!("Fetched and cached {} trusted handles", list.len());
        list
    }

    async fn persist(&self, list: &TrustedList) -> Result<()> {
        let json = serde_json::to_vec_pretty(list)?;
        let tmp = self.cache_path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.cache_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_handles_filters_and_normalizes() {
        let value = json!([
            {"handle": "Alice"},
            {"handle": "bob", "note": "core"},
            {"name": "no handle"},
            {"handle": 42},
            "plain string",
            {"handle": "ALICE"},
            {"handle": "  "}
        ]);
        assert_eq!(parse_handles(&value).unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_parse_handles_rejects_non_array() {
        let value = json!({"handle": "alice"});
        assert!(matches!(parse_handles(&value), Err(Error::TrustedList(_))));
    }

    #[test]
    fn test_naive_timestamp_read_as_utc() {
        let list: TrustedList = serde_json::from_str(
            r#"{"timestamp": "2024-03-01T12:30:00.123456", "handles": ["a"]}"#,
        )
        .unwrap();
        let expected =
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap() + chrono::Duration::microseconds(123456);
        assert_eq!(list.fetched_at(), expected);

        let list: TrustedList =
            serde_json::from_str(r#"{"timestamp": "2024-03-01T12:30:00", "handles": []}"#).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_rfc3339_written_and_read_back() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let list = TrustedList::new(["Alice", "bob"], at);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["timestamp"], "2024-03-01T12:00:00Z");
        assert_eq!(json["handles"], json!(["alice", "bob"]));

        let back: TrustedList = serde_json::from_value(json).unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn test_validity_window() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let list = TrustedList::new(["alice"], at);
        let day = Duration::from_secs(24 * 3600);

        assert!(list.is_valid_at(at + chrono::Duration::hours(23), day));
        assert!(!list.is_valid_at(at + chrono::Duration::hours(24), day));
        assert!(!TrustedList::empty().is_valid_at(at, day));
    }
}
