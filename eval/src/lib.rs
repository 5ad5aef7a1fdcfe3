// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Steam review analysis toolkit
//!
//! This crate provides:
//! - Review corpus loading from the `bracket/game/review_<n>.txt` layout
//! - TF-IDF feature extraction with a bounded vocabulary
//! - Seeded train/test splitting and minority-class oversampling
//! - A four-model classifier battery with weighted precision/recall/F1
//! - A language-aware heuristic sentiment oracle
//! - Metrics aggregation with JSON, text, CSV and SQLite sinks
//! - Steam review retrieval and game catalog statistics

pub mod catalog;
pub mod classifiers;
pub mod corpus;
pub mod error;
pub mod features;
pub mod harness;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod sampling;
pub mod sentiment;
pub mod source;

pub use classifiers::{all_classifiers, Classifier, LinearSvm, LogisticRegression, MultinomialNaiveBayes, RandomForest};
pub use corpus::{Bracket, Corpus, CorpusConfig, CorpusStats, Label, ReviewFile, ReviewManifest, ReviewRecord};
pub use error::PipelineError;
pub use features::{FeatureExtractor, FeatureMatrix, FitScope, TfIdfVectorizer};
pub use harness::{EvaluationHarness, ModelResult};
pub use metrics::{ClassificationReport, ConfusionMatrix};
pub use pipeline::{
    BracketResult, EvaluationConfig, EvaluationPipeline, EvaluationResults, SentimentConfig, SentimentPipeline,
    SentimentResults,
};
pub use report::{MetricsReport, ReportSink, Reporter};
pub use sampling::{ClassBalancer, SplitStrategy};
pub use sentiment::{BracketMapping, GameSentiment, ScoreStatus, SentimentOracle, SentimentOutcome};
pub use source::{RawReview, ReviewSource, SteamReviewSource};
