// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Peer trust: the curated trusted list and the follow quorum over it
//!
//! ```text
//! TrustedListSource ──fetch──▶ TrustedListStore ──Arc<TrustedList>──▶ QuorumVerifier
//!                                    │                                     │
//!                              trusted_list.json                    RelationshipChecker
//!                                                                   QuorumCache (1h)
//! ```

pub mod cache;
pub mod quorum;
pub mod trusted_list;

pub use cache::QuorumCache;
pub use quorum::{normalize_handle, QuorumOutcome, QuorumVerifier, TrustTier};
pub use trusted_list::{CacheState, TrustedList, TrustedListStore};
