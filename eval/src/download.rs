// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Review download utility
//!
//! Fetches reviews of one Steam game and writes them in the corpus layout,
//! one `review_<n>.txt` file per review:
//!   fetch-reviews --app-id 620 --name "Portal 2" --output reviews/90-100

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use review_eval::corpus::ReviewLayout;
use review_eval::source::{save_reviews, ReviewSource, SteamReviewSource};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fetch-reviews")]
#[command(about = "Download Steam reviews into the review corpus layout")]
#[command(version)]
struct Args {
    /// Steam application id
    #[arg(short, long)]
    app_id: u32,

    /// Game directory name (defaults to the app id)
    #[arg(short, long)]
    name: Option<String>,

    /// Number of reviews to request
    #[arg(short, long, default_value_t = 20, value_parser = clap::value_parser!(u16).range(1..=1000))]
    count: u16,

    /// Review language (all, english, french, german, ...)
    #[arg(short, long, default_value = "all")]
    language: String,

    /// Bracket directory receiving the game directory
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    tracing::info!("Steam Review Download Utility");
    tracing::info!("=============================");

    let name = args
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| args.app_id.to_string());
    let game_dir = args.output.join(&name);

    let source = SteamReviewSource::new().context("Failed to build HTTP client")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Fetching reviews for app {}", args.app_id));
    pb.enable_steady_tick(Duration::from_millis(100));

    let reviews = source.fetch(args.app_id, args.count as usize, &args.language);
    pb.finish_with_message(format!("Received {} reviews", reviews.len()));

    if reviews.is_empty() {
        anyhow::bail!("No reviews retrieved for app {}", args.app_id);
    }

    let written = save_reviews(&reviews, &game_dir, &ReviewLayout::default())
        .with_context(|| format!("Failed to write reviews to {}", game_dir.display()))?;

    println!("{} reviews saved to {}", written, game_dir.display());
    Ok(())
}
