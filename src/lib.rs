// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! vouchbot - Account trust evaluation for social platforms
//!
//! Given an account's profile and recent posts, vouchbot scores a handful
//! of behavioral signals and checks whether enough curated trusted accounts
//! follow it, then renders a short report that fits in a reply.
//!
//! # Architecture
//!
//! ```text
//! Mention → AccountSource → TrustEngine ─┬─ ProfileSignal
//!                                        ├─ ActivitySignal
//!                                        └─ TrustedListStore → QuorumVerifier
//!                                                   ↓
//!                                        TrustReport → reply text
//! ```

pub mod adapters;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod reply;
pub mod report;
pub mod signals;
pub mod trust;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::TrustEngine;
    pub use crate::error::{Error, Result};
    pub use crate::models::{AccountProfile, Post};
    pub use crate::report::TrustReport;
    pub use crate::trust::{QuorumOutcome, TrustTier};
}
