// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Reproducible analysis pipelines
//!
//! Orchestrates:
//! - Classifier comparison: corpus loading, seeded split, TF-IDF extraction,
//!   minority oversampling, battery evaluation
//! - Sentiment run: per-game oracle sentiment and oracle scoring against
//!   the thumbs label, per bracket and globally
//! - Results serialization

use crate::corpus::{label_distribution, Bracket, Corpus, CorpusConfig, CorpusStats, Label, ReviewFile, ReviewManifest};
use crate::error::PipelineError;
use crate::features::{ExtractionConfig, FeatureExtractor};
use crate::harness::{EvaluationHarness, ModelResult};
use crate::metrics::ConfusionMatrix;
use crate::sampling::{train_test_split, ClassBalancer, SplitStrategy};
use crate::sentiment::{BracketMapping, GameSentiment, SentimentOracle, SentimentOutcome};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the pooled row of the oracle evaluation
pub const GLOBAL_ROW: &str = "Global";

/// Configuration for the classifier comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    pub corpus: CorpusConfig,
    pub extraction: ExtractionConfig,
    /// Share of the corpus held out for testing
    pub test_fraction: f64,
    pub split_strategy: SplitStrategy,
    /// Oversample the minority class of the training split
    pub oversample: bool,
    pub forest_trees: usize,
    /// Models to run (empty = all)
    pub classifier_names: Vec<String>,
    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            corpus: CorpusConfig::default(),
            extraction: ExtractionConfig::default(),
            test_fraction: 0.2,
            split_strategy: SplitStrategy::default(),
            oversample: true,
            forest_trees: 50,
            classifier_names: vec![],
            output_dir: PathBuf::from("results"),
        }
    }
}

impl EvaluationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse config {}", path.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitInfo {
    pub total_samples: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Training rows after oversampling
    pub balanced_train_samples: usize,
    pub resampled: bool,
    pub train_distribution: HashMap<String, usize>,
    pub balanced_distribution: HashMap<String, usize>,
    pub test_distribution: HashMap<String, usize>,
    pub vocabulary_size: usize,
}

fn named_distribution(labels: &[Label]) -> HashMap<String, usize> {
    label_distribution(labels)
        .into_iter()
        .map(|(k, v)| (format!("{:?}", k), v))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub best_model: String,
    pub best_f1: f64,
    pub model_comparison: Vec<ModelComparison>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub model: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Complete classifier comparison results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub config: EvaluationConfig,
    pub corpus_stats: CorpusStats,
    pub split: SplitInfo,
    pub model_results: Vec<ModelResult>,
    pub summary: EvaluationSummary,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl EvaluationSummary {
    fn from_results(results: &[ModelResult]) -> Self {
        let mut best_model = "None".to_string();
        let mut best_f1 = 0.0;

        let model_comparison = results
            .iter()
            .map(|r| {
                if r.f1 > best_f1 {
                    best_f1 = r.f1;
                    best_model = r.model_name.clone();
                }
                ModelComparison {
                    model: r.model_name.clone(),
                    precision: r.precision,
                    recall: r.recall,
                    f1: r.f1,
                }
            })
            .collect();

        Self {
            best_model,
            best_f1,
            model_comparison,
        }
    }
}

/// Classifier comparison pipeline
pub struct EvaluationPipeline {
    config: EvaluationConfig,
}

impl EvaluationPipeline {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Load the configured brackets and run the comparison
    pub fn run(&self) -> Result<EvaluationResults, PipelineError> {
        let corpus = Corpus::load(&self.config.corpus)?;
        self.run_on_corpus(&corpus)
    }

    pub fn run_on_corpus(&self, corpus: &Corpus) -> Result<EvaluationResults, PipelineError> {
        let config = &self.config;
        let extractor = FeatureExtractor::new(config.extraction.clone());
        extractor.ensure_rows(corpus.len())?;

        let texts = corpus.texts();
        let labels = corpus.labels();

        let split = train_test_split(&labels, config.test_fraction, config.split_strategy, config.seed);
        let train_y: Vec<Label> = split.train.iter().map(|&i| labels[i]).collect();
        let test_y: Vec<Label> = split.test.iter().map(|&i| labels[i]).collect();

        tracing::info!(
            "Split {} reviews: train={}, test={} ({:?})",
            corpus.len(),
            split.train.len(),
            split.test.len(),
            config.split_strategy
        );

        let features = extractor.extract(&texts, &split)?;
        let balanced = ClassBalancer::new(config.oversample, config.seed).balance(&features.train, &train_y);

        let mut harness = EvaluationHarness::with_battery(config.seed, config.forest_trees)
            .retain_named(&config.classifier_names);
        let model_results = harness.evaluate(&balanced.x, &balanced.y, &features.test, &test_y)?;

        let split_info = SplitInfo {
            total_samples: corpus.len(),
            train_samples: split.train.len(),
            test_samples: split.test.len(),
            balanced_train_samples: balanced.y.len(),
            resampled: balanced.resampled,
            train_distribution: named_distribution(&train_y),
            balanced_distribution: named_distribution(&balanced.y),
            test_distribution: named_distribution(&test_y),
            vocabulary_size: features.vectorizer.n_features(),
        };

        Ok(EvaluationResults {
            config: config.clone(),
            corpus_stats: corpus.stats.clone(),
            split: split_info,
            summary: EvaluationSummary::from_results(&model_results),
            model_results,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

/// Save any serializable results as pretty JSON
pub fn save_results<T: Serialize>(results: &T, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(results)?;
    fs::write(output_path, json).with_context(|| format!("Failed to write {}", output_path.display()))?;
    tracing::info!("Results saved to {}", output_path.display());
    Ok(())
}

/// Configuration for the sentiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub corpus: CorpusConfig,
    pub mapping: BracketMapping,
    pub output_dir: PathBuf,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            corpus: CorpusConfig::default(),
            mapping: BracketMapping::default(),
            output_dir: PathBuf::from("results"),
        }
    }
}

/// Oracle predictions scored against the thumbs label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketResult {
    /// Bracket identifier, or `Global`
    pub bracket: String,
    /// Positive-class precision
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
    /// Reviews the oracle could not score
    pub degraded: usize,
}

impl BracketResult {
    fn from_matrix(bracket: String, cm: &ConfusionMatrix, degraded: usize) -> Self {
        let scores = cm.binary();
        Self {
            bracket,
            precision: scores.precision,
            recall: scores.recall,
            f1: scores.f1_score,
            support: cm.total(),
            degraded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketSentiment {
    pub bracket: Bracket,
    pub games: usize,
    /// Mean of the per-game means
    pub mean_sentiment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResults {
    pub config: SentimentConfig,
    pub games: Vec<GameSentiment>,
    pub brackets: Vec<BracketSentiment>,
    pub oracle_scores: Vec<BracketResult>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

fn read_review(path: &Path) -> Option<ReviewFile> {
    match fs::read_to_string(path) {
        Ok(content) => Some(ReviewFile::parse(&content)),
        Err(e) => {
            tracing::warn!("Skipping unreadable review {}: {}", path.display(), e);
            None
        }
    }
}

/// Sentiment oracle over the review corpus
pub struct SentimentPipeline {
    config: SentimentConfig,
    oracle: SentimentOracle,
}

impl SentimentPipeline {
    pub fn new(config: SentimentConfig, oracle: SentimentOracle) -> Self {
        Self { config, oracle }
    }

    /// Mean sentiment of every game with at least one non-empty review
    pub fn game_sentiments(&self) -> Result<Vec<GameSentiment>, PipelineError> {
        let corpus = &self.config.corpus;
        let manifest = ReviewManifest::scan(&corpus.root, &corpus.brackets, &corpus.layout)?;

        let mut outcomes: BTreeMap<(Bracket, String), Vec<SentimentOutcome>> = BTreeMap::new();
        for entry in manifest.reviews() {
            let Some(file) = read_review(&entry.path) else {
                continue;
            };
            // Labeled files are scored on their body only, so a thumbs line
            // with nothing after it contributes no score.
            let text = file.scoring_text();
            if text.is_empty() {
                continue;
            }
            outcomes
                .entry((entry.bracket, entry.game.clone()))
                .or_default()
                .push(self.oracle.score(&text));
        }

        let games: Vec<GameSentiment> = outcomes
            .into_iter()
            .map(|((bracket, game), scores)| GameSentiment::from_outcomes(&game, bracket, &scores, &self.config.mapping))
            .collect();

        for game in &games {
            tracing::debug!(
                "{} [{}]: mean {:.4} over {} reviews ({} degraded)",
                game.game,
                game.bracket,
                game.mean_sentiment,
                game.review_count,
                game.degraded_reviews
            );
        }
        Ok(games)
    }

    /// Oracle precision/recall/F1 per bracket, then a pooled `Global` row when
    /// any bracket had labeled reviews
    pub fn evaluate_oracle(&self) -> Result<Vec<BracketResult>, PipelineError> {
        let corpus = &self.config.corpus;
        let mut results = Vec::new();
        let mut global = ConfusionMatrix::default();
        let mut global_degraded = 0;

        for bracket in &corpus.brackets {
            let manifest = match ReviewManifest::scan(&corpus.root, std::slice::from_ref(bracket), &corpus.layout) {
                Ok(manifest) => manifest,
                Err(PipelineError::MissingBracket { bracket, .. }) => {
                    tracing::warn!("Skipping missing bracket {}", bracket);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut truth = Vec::new();
            let mut predicted = Vec::new();
            let mut degraded = 0;
            for entry in manifest.reviews() {
                let Some(file) = read_review(&entry.path) else {
                    continue;
                };
                let Some(label) = file.thumb() else {
                    continue;
                };
                let outcome = self.oracle.score(&file.body);
                if outcome.is_degraded() {
                    degraded += 1;
                }
                truth.push(label);
                predicted.push(outcome.label());
            }

            if truth.is_empty() {
                tracing::warn!("Bracket {} has no labeled reviews", bracket);
                continue;
            }

            let cm = ConfusionMatrix::from_predictions(&predicted, &truth);
            let result = BracketResult::from_matrix(bracket.to_string(), &cm, degraded);
            tracing::info!(
                "  {} - Precision: {:.4}, Recall: {:.4}, F1: {:.4} (n={})",
                result.bracket,
                result.precision,
                result.recall,
                result.f1,
                result.support
            );

            global.tn += cm.tn;
            global.fp += cm.fp;
            global.fn_ += cm.fn_;
            global.tp += cm.tp;
            global_degraded += degraded;
            results.push(result);
        }

        if global.total() > 0 {
            results.push(BracketResult::from_matrix(GLOBAL_ROW.to_string(), &global, global_degraded));
        } else {
            tracing::warn!("No labeled reviews in any bracket, no Global row");
        }
        Ok(results)
    }

    pub fn run(&self) -> Result<SentimentResults, PipelineError> {
        let games = self.game_sentiments()?;

        let mut per_bracket: BTreeMap<Bracket, Vec<f64>> = BTreeMap::new();
        for game in &games {
            per_bracket.entry(game.bracket).or_default().push(game.mean_sentiment);
        }
        let brackets = per_bracket
            .into_iter()
            .map(|(bracket, means)| BracketSentiment {
                bracket,
                games: means.len(),
                mean_sentiment: means.iter().sum::<f64>() / means.len() as f64,
            })
            .collect();

        let oracle_scores = self.evaluate_oracle()?;

        Ok(SentimentResults {
            config: self.config.clone(),
            games,
            brackets,
            oracle_scores,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{write_review_file, ReviewLayout};
    use crate::report::MetricsReport;
    use crate::sentiment::ScoreStatus;
    use tempfile::TempDir;

    const POSITIVE: &[&str] = &[
        "great fun with friends",
        "great story and great music",
        "fun combat, great bosses",
        "lovely art and great fun",
        "great value, fun for hours",
        "fun puzzles and great pacing",
        "great soundtrack, fun levels",
        "fun and great controls",
    ];
    const NEGATIVE: &[&str] = &["boring and broken mess", "broken saves, boring quests"];

    fn write_corpus(dir: &Path, bracket: &str, game: &str, positive: &[&str], negative: &[&str]) {
        let layout = ReviewLayout::default();
        let game_dir = dir.join(bracket).join(game);
        let mut index = 1;
        for body in positive {
            write_review_file(&game_dir, &layout, index, Label::Positive, body).unwrap();
            index += 1;
        }
        for body in negative {
            write_review_file(&game_dir, &layout, index, Label::Negative, body).unwrap();
            index += 1;
        }
    }

    fn config_for(root: &Path) -> EvaluationConfig {
        EvaluationConfig {
            corpus: CorpusConfig {
                root: root.to_path_buf(),
                brackets: vec![Bracket::new(70, 80)],
                min_length: 0,
                ..CorpusConfig::default()
            },
            forest_trees: 5,
            ..EvaluationConfig::default()
        }
    }

    #[test]
    fn test_imbalanced_corpus_is_balanced_before_training() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path(), "70-80", "Hollow Knight", POSITIVE, NEGATIVE);

        let results = EvaluationPipeline::new(config_for(dir.path())).run().unwrap();

        assert_eq!(results.corpus_stats.used, 10);
        assert!(results.split.resampled);
        assert_eq!(
            results.split.balanced_distribution["Positive"],
            results.split.balanced_distribution["Negative"]
        );
        assert_eq!(results.model_results.len(), 4);
        assert_eq!(results.split.test_samples + results.split.train_samples, 10);
    }

    #[test]
    fn test_too_few_reviews_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path(), "70-80", "Celeste", &POSITIVE[..7], &NEGATIVE[..2]);

        let err = EvaluationPipeline::new(config_for(dir.path())).run().unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { found: 9, required: 10 }));
    }

    #[test]
    fn test_results_are_reproducible() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path(), "70-80", "Hades", POSITIVE, NEGATIVE);
        write_corpus(dir.path(), "70-80", "Dead Cells", &POSITIVE[..4], NEGATIVE);

        let pipeline = EvaluationPipeline::new(config_for(dir.path()));
        let a = pipeline.run().unwrap();
        let b = pipeline.run().unwrap();
        for (x, y) in a.model_results.iter().zip(&b.model_results) {
            assert_eq!(x.confusion_matrix, y.confusion_matrix);
        }
        assert_eq!(a.summary.best_model, b.summary.best_model);
    }

    #[test]
    fn test_config_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"seed": 7, "forest_trees": 12}"#).unwrap();

        let config = EvaluationConfig::from_file(&path).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.forest_trees, 12);
        assert_eq!(config.test_fraction, 0.2);
        assert!(config.oversample);
    }

    fn sentiment_config(root: &Path, brackets: Vec<Bracket>) -> SentimentConfig {
        SentimentConfig {
            corpus: CorpusConfig {
                root: root.to_path_buf(),
                brackets,
                ..CorpusConfig::default()
            },
            ..SentimentConfig::default()
        }
    }

    #[test]
    fn test_game_sentiments() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path(), "90-100", "Portal", &["I love this game, it is great"], &[]);
        write_corpus(dir.path(), "30-40", "Broken Game", &[], &["this is a terrible and boring game", "12345"]);

        let pipeline = SentimentPipeline::new(
            sentiment_config(dir.path(), vec![Bracket::new(30, 40), Bracket::new(90, 100)]),
            SentimentOracle::new(),
        );
        let games = pipeline.game_sentiments().unwrap();

        assert_eq!(games.len(), 2);
        assert_eq!(games[0].game, "Broken Game");
        assert_eq!(games[0].review_count, 2);
        assert_eq!(games[0].degraded_reviews, 1);
        assert!(games[0].mean_sentiment < 0.0);
        assert!(games[1].mean_sentiment > 0.0);
        assert!((games[1].deviation - (0.95 - games[1].mean_sentiment)).abs() < 1e-12);
    }

    #[test]
    fn test_labeled_file_without_body_has_no_score() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path(), "60-70", "Silent Game", &[""], &[]);
        write_corpus(dir.path(), "60-70", "Chatty Game", &["great fun", ""], &[]);

        let pipeline = SentimentPipeline::new(sentiment_config(dir.path(), vec![Bracket::new(60, 70)]), SentimentOracle::new());
        let games = pipeline.game_sentiments().unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game, "Chatty Game");
        assert_eq!(games[0].review_count, 1);
    }

    #[test]
    fn test_oracle_evaluation_skips_missing_brackets() {
        let dir = TempDir::new().unwrap();
        write_corpus(
            dir.path(),
            "70-80",
            "Stardew Valley",
            &["I love this game, it is great", "this is a great and relaxing game"],
            &["this game is boring", "12345"],
        );

        let pipeline = SentimentPipeline::new(
            sentiment_config(dir.path(), vec![Bracket::new(70, 80), Bracket::new(10, 20)]),
            SentimentOracle::new(),
        );
        let results = pipeline.evaluate_oracle().unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].bracket, "70-80");
        assert_eq!(results[1].bracket, GLOBAL_ROW);
        assert_eq!(results[0].support, 4);
        assert_eq!(results[0].degraded, 1);
        // both positives found, no negative predicted positive
        assert!((results[0].precision - 1.0).abs() < 1e-9);
        assert!((results[0].recall - 1.0).abs() < 1e-9);
        assert_eq!(results[1], BracketResult { bracket: GLOBAL_ROW.to_string(), ..results[0].clone() });
    }

    #[test]
    fn test_oracle_evaluation_without_labeled_reviews_has_no_rows() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("40-50").join("Empty Game")).unwrap();
        fs::write(dir.path().join("40-50").join("Empty Game").join("review_1.txt"), "no label line\nbody").unwrap();

        let pipeline = SentimentPipeline::new(
            sentiment_config(dir.path(), vec![Bracket::new(40, 50), Bracket::new(60, 70)]),
            SentimentOracle::new(),
        );
        let results = pipeline.evaluate_oracle().unwrap();

        assert!(results.is_empty());
        assert!(MetricsReport::from_brackets(&results).rows.is_empty());
    }

    #[test]
    fn test_degraded_outcome_counts_as_negative_prediction() {
        let oracle = SentimentOracle::new();
        let outcome = oracle.score("12345");
        assert_eq!(outcome.status, ScoreStatus::Undetectable);
        assert_eq!(outcome.label(), Label::Negative);
    }
}
