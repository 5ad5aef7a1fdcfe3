// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Sentiment oracle CLI
//!
//! Scores every review with the sentiment oracle, reports the mean
//! sentiment per game and per bracket, and measures how well the oracle
//! agrees with the thumbs-up/thumbs-down label.
//!
//! Usage:
//!   sentiment-report --root ./reviews --brackets 30-40,90-100 --database sentiment.db

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use review_eval::corpus::discover_brackets;
use review_eval::pipeline::{save_results, SentimentConfig, SentimentPipeline};
use review_eval::report::{CsvSink, JsonSink, MetricsReport, Reporter, SqliteSink, SqliteStore, TextSink};
use review_eval::{Bracket, BracketMapping, SentimentOracle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mapping {
    /// (lower bound + offset) / 100
    LowerBound,
    /// bracket midpoint / 100
    Midpoint,
}

#[derive(Parser, Debug)]
#[command(name = "sentiment-report")]
#[command(about = "Score Steam reviews with the sentiment oracle")]
#[command(version)]
struct Args {
    /// Review root directory
    #[arg(short, long, default_value = "reviews")]
    root: PathBuf,

    /// Brackets to analyse (comma-separated; empty = all found)
    #[arg(short, long)]
    brackets: Option<String>,

    /// Expected sentiment implied by a bracket
    #[arg(long, value_enum, default_value = "lower-bound")]
    mapping: Mapping,

    /// Offset added to the bracket lower bound
    #[arg(long, default_value_t = 5.0)]
    offset: f64,

    /// Output directory for results
    #[arg(short, long, default_value = "results")]
    output: PathBuf,

    /// SQLite database receiving per-game sentiment and bracket scores
    #[arg(long)]
    database: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = SentimentConfig {
        output_dir: args.output.clone(),
        mapping: match args.mapping {
            Mapping::LowerBound => BracketMapping::LowerBoundOffset {
                offset: args.offset,
                scale: 100.0,
            },
            Mapping::Midpoint => BracketMapping::Midpoint { scale: 100.0 },
        },
        ..SentimentConfig::default()
    };
    config.corpus.root = args.root.clone();
    config.corpus.brackets = match &args.brackets {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().parse::<Bracket>())
            .collect::<Result<_, _>>()?,
        None => discover_brackets(&config.corpus.root, &config.corpus.layout)?
            .into_iter()
            .map(|s| s.bracket)
            .collect(),
    };

    tracing::info!("Sentiment Oracle Report");
    tracing::info!("=======================");
    tracing::info!("Root: {}", config.corpus.root.display());

    let pipeline = SentimentPipeline::new(config.clone(), SentimentOracle::new());
    let results = pipeline.run().context("Sentiment analysis failed")?;

    println!("\n{}", "=".repeat(72));
    println!("MEAN SENTIMENT PER GAME");
    println!("{}", "=".repeat(72));
    println!("{:<30} {:>8} {:>10} {:>8} {:>10}", "Game", "Bracket", "Sentiment", "Reviews", "Deviation");
    println!("{:-<72}", "");
    for game in &results.games {
        println!(
            "{:<30} {:>8} {:>10.4} {:>8} {:>10.4}",
            game.game,
            game.bracket.to_string(),
            game.mean_sentiment,
            game.review_count,
            game.deviation
        );
    }

    println!("\nMean sentiment per bracket:");
    for bracket in &results.brackets {
        println!("  {:>8}: {:.4} ({} games)", bracket.bracket.to_string(), bracket.mean_sentiment, bracket.games);
    }

    let degraded: usize = results.games.iter().map(|g| g.degraded_reviews).sum();
    if degraded > 0 {
        println!("\n{} reviews could not be scored and count as neutral", degraded);
    }

    std::fs::create_dir_all(&args.output).with_context(|| format!("Failed to create {}", args.output.display()))?;
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let json_path = args.output.join(format!("sentiment_{}.json", timestamp));
    save_results(&results, &json_path)?;
    println!("\nJSON results saved to: {}", json_path.display());

    let report = MetricsReport::from_brackets(&results.oracle_scores);
    println!("\nOracle agreement with review labels:\n{}", report.format());

    let mut reporter = Reporter::new()
        .with_sink(CsvSink::new(args.output.join("bracket_scores.csv")))
        .with_sink(TextSink::new(args.output.join("bracket_scores.txt")))
        .with_sink(JsonSink::new(args.output.join("bracket_scores.json")));

    if let Some(database) = &args.database {
        let mut store = SqliteStore::open(database)?;
        store.save_game_sentiment(&results.games)?;
        tracing::info!("Saved {} games to {}", results.games.len(), database.display());
        reporter = reporter.with_sink(SqliteSink::new(database));
    }
    reporter.publish(&report)?;

    Ok(())
}
