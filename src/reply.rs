// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Mention triggers and reply text

use serde::{Deserialize, Serialize};

use crate::report::{fit_summary, TrustReport};

/// A post that mentions or replies to the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    /// Handle of the requester, without `@`
    pub author: String,
    pub text: String,
    /// Whether the mention replies to another post (whose author is evaluated)
    #[serde(default)]
    pub is_reply: bool,
}

/// Whether `mention` asks the bot for an evaluation.
///
/// Only replies count, since the evaluated account is the author of the
/// post being replied to. The bot never answers itself.
pub fn is_trigger(mention: &Mention, bot_handle: &str, phrase: &str) -> bool {
    let bot = bot_handle.trim_start_matches('@').to_lowercase();
    if mention.author.trim_start_matches('@').to_lowercase() == bot {
        return false;
    }
    if !mention.is_reply {
        return false;
    }

    let text = mention.text.to_lowercase();
    let phrase = phrase.trim().to_lowercase();
    (!phrase.is_empty() && text.contains(&phrase)) || text.contains(&format!("@{}", bot))
}

/// `@requester Trustworthiness of @target:` plus a newline
pub fn reply_prefix(requester: &str, target: &str) -> String {
    format!(
        "@{} Trustworthiness of @{}:\n",
        requester.trim_start_matches('@'),
        target.trim_start_matches('@')
    )
}

/// Full reply text, never longer than `budget` characters.
pub fn compose_reply(requester: &str, report: &TrustReport, budget: usize) -> String {
    let prefix = reply_prefix(requester, &report.handle);
    let prefix_len = prefix.chars().count();
    let summary = fit_summary(&report.summary, prefix_len, budget);

    let reply = prefix + &summary;
    if reply.chars().count() > budget {
        // Only reachable when the prefix alone blows the budget
        return reply.chars().take(budget).collect();
    }
    reply
}

/// Reply to `mention` carrying `report`.
pub fn reply_for(mention: &Mention, report: &TrustReport, budget: usize) -> String {
    compose_reply(&mention.author, report, budget)
}
