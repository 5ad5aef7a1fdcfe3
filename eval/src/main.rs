// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Classifier comparison CLI
//!
//! Usage:
//!   compare-classifiers --root ./reviews --brackets 70-80,80-90
//!   compare-classifiers --config run.json --no-oversample --format json

use anyhow::{Context, Result};
use clap::Parser;
use review_eval::corpus::discover_brackets;
use review_eval::pipeline::{save_results, EvaluationConfig, EvaluationPipeline};
use review_eval::report::{render_markdown, CsvSink, JsonSink, MetricsReport, Reporter, SqliteSink, TextSink};
use review_eval::{Bracket, FitScope, SplitStrategy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "compare-classifiers")]
#[command(about = "Compare review classifiers on a labeled Steam review corpus")]
#[command(version)]
struct Args {
    /// JSON config used as the base before command-line overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Review root directory
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Brackets to load (comma-separated, e.g. 70-80,80-90; empty = all found)
    #[arg(short, long)]
    brackets: Option<String>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Minimum review length in characters
    #[arg(long)]
    min_length: Option<usize>,

    /// Disable minority-class oversampling
    #[arg(long)]
    no_oversample: bool,

    /// Fit the vocabulary on the whole corpus instead of the training split
    #[arg(long)]
    fit_full_corpus: bool,

    /// Use a plain shuffled split instead of a stratified one
    #[arg(long)]
    shuffled_split: bool,

    /// Number of random forest trees
    #[arg(long)]
    trees: Option<usize>,

    /// Specific classifiers to run (comma-separated, empty = all)
    #[arg(short, long)]
    classifiers: Option<String>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (json, markdown, both)
    #[arg(short, long, default_value = "both")]
    format: String,

    /// Also write the metrics table to this SQLite database
    #[arg(long)]
    database: Option<PathBuf>,
}

fn build_config(args: &Args) -> Result<EvaluationConfig> {
    let mut config = match &args.config {
        Some(path) => EvaluationConfig::from_file(path)?,
        None => EvaluationConfig::default(),
    };

    if let Some(root) = &args.root {
        config.corpus.root = root.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(min_length) = args.min_length {
        config.corpus.min_length = min_length;
    }
    if let Some(trees) = args.trees {
        config.forest_trees = trees;
    }
    if args.no_oversample {
        config.oversample = false;
    }
    if args.fit_full_corpus {
        config.extraction.fit_scope = FitScope::FullCorpus;
    }
    if args.shuffled_split {
        config.split_strategy = SplitStrategy::Shuffled;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(names) = &args.classifiers {
        config.classifier_names = names.split(',').map(|s| s.trim().to_string()).collect();
    }

    if let Some(list) = &args.brackets {
        config.corpus.brackets = list
            .split(',')
            .map(|s| s.trim().parse::<Bracket>())
            .collect::<Result<_, _>>()?;
    }
    if config.corpus.brackets.is_empty() {
        config.corpus.brackets = discover_brackets(&config.corpus.root, &config.corpus.layout)?
            .into_iter()
            .map(|s| s.bracket)
            .collect();
    }

    Ok(config)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let brackets: Vec<String> = config.corpus.brackets.iter().map(|b| b.to_string()).collect();
    tracing::info!("Review Classifier Comparison");
    tracing::info!("============================");
    tracing::info!("Root: {}", config.corpus.root.display());
    tracing::info!("Brackets: {}", brackets.join(", "));
    tracing::info!("Seed: {}", config.seed);

    let pipeline = EvaluationPipeline::new(config.clone());
    let results = pipeline.run().context("Classifier comparison failed")?;

    // Print summary to console
    println!("\n{}", "=".repeat(60));
    println!("CLASSIFIER COMPARISON");
    println!("{}", "=".repeat(60));
    println!(
        "\nReviews: {} used of {} files, train={} (balanced {}), test={}",
        results.corpus_stats.used,
        results.corpus_stats.total_files,
        results.split.train_samples,
        results.split.balanced_train_samples,
        results.split.test_samples
    );
    println!("\nBest Model: {} (F1={:.4})", results.summary.best_model, results.summary.best_f1);
    println!("{:-<60}", "");
    println!("{:<22} {:>10} {:>10} {:>10}", "Model", "Precision", "Recall", "F1");
    println!("{:-<60}", "");
    for result in &results.model_results {
        println!(
            "{:<22} {:>10.4} {:>10.4} {:>10.4}",
            result.model_name, result.precision, result.recall, result.f1
        );
    }
    println!("{:-<60}", "");

    // Save outputs
    let output = &config.output_dir;
    std::fs::create_dir_all(output).with_context(|| format!("Failed to create {}", output.display()))?;
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");

    if args.format == "json" || args.format == "both" {
        let json_path = output.join(format!("comparison_{}.json", timestamp));
        save_results(&results, &json_path)?;
        println!("\nJSON results saved to: {}", json_path.display());
    }

    if args.format == "markdown" || args.format == "both" {
        let md_path = output.join(format!("comparison_{}.md", timestamp));
        std::fs::write(&md_path, render_markdown(&results))
            .with_context(|| format!("Failed to write {}", md_path.display()))?;
        println!("Markdown report saved to: {}", md_path.display());
    }

    let report = MetricsReport::from_models(&results.model_results).with_corpus_stats(results.corpus_stats.clone());
    let mut reporter = Reporter::new()
        .with_sink(CsvSink::new(output.join("model_performance.csv")))
        .with_sink(TextSink::new(output.join("model_performance.txt")))
        .with_sink(JsonSink::new(output.join("model_performance.json")));
    if let Some(database) = &args.database {
        reporter = reporter.with_sink(SqliteSink::new(database));
    }
    reporter.publish(&report)?;

    println!("\nComparison complete!");

    Ok(())
}
