// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! vouchbot CLI entry point

use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vouchbot::adapters::{AccountSource, RestPlatformAdapter};
use vouchbot::engine::TrustEngine;
use vouchbot::models::{AccountProfile, EvaluationInput, Post};
use vouchbot::reply::{compose_reply, is_trigger, reply_for, reply_prefix, Mention};
use vouchbot::report::TrustReport;
use vouchbot::{Config, Error, Result};

#[derive(Parser)]
#[command(name = "vouchbot")]
#[command(about = "Account trust evaluation bot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "vouchbot.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an account snapshot from a JSON file
    Evaluate {
        /// File holding `{"profile": {...}, "posts": [...]}`
        #[arg(short, long)]
        input: String,

        /// Render as a reply to this requester instead of JSON
        #[arg(short, long)]
        requester: Option<String>,
    },

    /// Fetch an account from the platform and evaluate it
    Check {
        /// Handle to evaluate (with or without @)
        #[arg(short = 'H', long)]
        handle: String,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run only the trusted follow quorum for a handle
    Quorum {
        /// Handle to check (with or without @)
        #[arg(short = 'H', long)]
        handle: String,
    },

    /// Force a refresh of the trusted account list
    RefreshTrusted,

    /// Handle a mention: print the reply it earns, or `false` if it
    /// does not trigger an evaluation
    Trigger {
        /// Author of the mention
        #[arg(short, long)]
        author: String,

        /// Mention text
        #[arg(short, long)]
        text: String,

        /// The mention replies to another post
        #[arg(long)]
        reply: bool,

        /// Author of the replied-to post, fetched from the platform
        #[arg(long, conflicts_with = "input")]
        target: Option<String>,

        /// Evaluate this snapshot file instead of fetching the target
        #[arg(short, long)]
        input: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load config
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Evaluate { input, requester } => {
            tracing::info!("Evaluating snapshot from {}", input);
            evaluate(&config, &input, requester.as_deref()).await
        }
        Commands::Check { handle, json } => {
            tracing::info!("Checking account {}", handle);
            check(&config, &handle, json).await
        }
        Commands::Quorum { handle } => {
            tracing::info!("Running quorum check for {}", handle);
            quorum(&config, &handle).await
        }
        Commands::RefreshTrusted => {
            tracing::info!("Refreshing trusted list from {}", config.trusted_list.url);
            refresh_trusted(&config).await
        }
        Commands::Trigger {
            author,
            text,
            reply,
            target,
            input,
        } => {
            let mention = Mention {
                author,
                text,
                is_reply: reply,
            };
            trigger(&config, &mention, target.as_deref(), input.as_deref()).await
        }
    }
}

fn build_engine(config: &Config) -> Result<(TrustEngine, Arc<RestPlatformAdapter>)> {
    if config.platform.token.is_none() {
        tracing::warn!("No platform token configured; relationship checks will likely fail");
    }
    let platform = Arc::new(RestPlatformAdapter::new(&config.platform)?);
    let engine = TrustEngine::from_config(config, platform.clone())?;
    Ok((engine, platform))
}

async fn read_snapshot(input: &str) -> Result<EvaluationInput> {
    let raw = tokio::fs::read(Path::new(input)).await?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Profile plus recent posts; a failed timeline fetch yields no posts.
async fn fetch_account(
    platform: &RestPlatformAdapter,
    handle: &str,
    sample_size: usize,
) -> Result<(AccountProfile, Vec<Post>)> {
    let handle = handle.trim_start_matches('@');
    let profile = platform.profile(handle).await?;
    let posts = platform
        .recent_posts(handle, sample_size)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Could not fetch posts for {}: {}", handle, e);
            Vec::new()
        });
    Ok((profile, posts))
}

async fn evaluate(config: &Config, input: &str, requester: Option<&str>) -> Result<()> {
    let snapshot = read_snapshot(input).await?;

    let (engine, _) = build_engine(config)?;
    let report = match requester {
        Some(requester) => {
            let prefix_len = reply_prefix(requester, &snapshot.profile.handle).chars().count();
            engine
                .evaluate_with_prefix(snapshot.profile, snapshot.posts, prefix_len)
                .await
        }
        None => engine.evaluate(snapshot.profile, snapshot.posts).await,
    };

    print_report(&report, requester, engine.budget(), requester.is_none())
}

async fn check(config: &Config, handle: &str, json: bool) -> Result<()> {
    let (engine, platform) = build_engine(config)?;
    let (profile, posts) = fetch_account(&platform, handle, config.analysis.sample_size).await?;

    let report = engine.evaluate(profile, posts).await;
    print_report(&report, None, engine.budget(), json)
}

async fn trigger(
    config: &Config,
    mention: &Mention,
    target: Option<&str>,
    input: Option<&str>,
) -> Result<()> {
    if !is_trigger(mention, &config.platform.bot_handle, &config.reply.trigger_phrase) {
        println!("false");
        return Ok(());
    }

    let (engine, platform) = build_engine(config)?;
    let (profile, posts) = match (input, target) {
        (Some(input), _) => {
            let snapshot = read_snapshot(input).await?;
            (snapshot.profile, snapshot.posts)
        }
        (None, Some(target)) => fetch_account(&platform, target, config.analysis.sample_size).await?,
        (None, None) => {
            return Err(Error::InvalidInput(
                "a triggering mention needs --target or --input".to_string(),
            ))
        }
    };

    tracing::info!("Mention from {} asks about {}", mention.author, profile.handle);
    let prefix_len = reply_prefix(&mention.author, &profile.handle).chars().count();
    let report = engine.evaluate_with_prefix(profile, posts, prefix_len).await;
    println!("{}", reply_for(mention, &report, engine.budget()));
    Ok(())
}

async fn quorum(config: &Config, handle: &str) -> Result<()> {
    let (engine, _) = build_engine(config)?;
    let trusted = engine.trusted_store().load().await;
    if trusted.is_empty() {
        tracing::warn!("Trusted list unavailable; no quorum possible");
    }

    let outcome = engine.verifier().verify(handle, &trusted).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn refresh_trusted(config: &Config) -> Result<()> {
    let (engine, _) = build_engine(config)?;
    let store = engine.trusted_store();
    let list = store.refresh().await;
    if list.is_empty() {
        return Err(Error::TrustedList(
            "refresh failed, cache left untouched".to_string(),
        ));
    }

    println!(
        "Cached {} trusted handles in {} (fetched {})",
        list.len(),
        store.cache_path().display(),
        list.fetched_at().to_rfc3339()
    );
    Ok(())
}

fn print_report(report: &TrustReport, requester: Option<&str>, budget: usize, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else if let Some(requester) = requester {
        println!("{}", compose_reply(requester, report, budget));
    } else {
        println!("{}", report.summary);
    }
    Ok(())
}
