// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! TF-IDF feature extraction
//!
//! Term weighting follows the usual smoothed scheme:
//! `idf(t) = ln((1 + n) / (1 + df(t))) + 1`, raw term counts times idf,
//! then L2 normalisation of each row.

use crate::error::PipelineError;
use crate::sampling::Split;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Dense row-major feature matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub rows: Vec<Vec<f64>>,
    pub n_features: usize,
}

impl FeatureMatrix {
    pub fn new(n_features: usize) -> Self {
        Self {
            rows: Vec::new(),
            n_features,
        }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n_features = rows.first().map_or(0, |r| r.len());
        debug_assert!(rows.iter().all(|r| r.len() == n_features));
        Self { rows, n_features }
    }

    pub fn push(&mut self, row: Vec<f64>) {
        debug_assert_eq!(row.len(), self.n_features);
        self.rows.push(row);
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        &self.rows[idx]
    }

    /// Copy the given rows, in the given order (indices may repeat)
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            n_features: self.n_features,
        }
    }
}

/// Lowercased word tokens of at least two characters
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| s.chars().count() >= 2)
        .map(|s| s.to_string())
        .collect()
}

/// TF-IDF vectorizer with a bounded vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    /// Term to column index, columns in alphabetical term order
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    max_features: usize,
}

impl TfIdfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            max_features,
        }
    }

    /// Build the vocabulary from the most frequent terms of `documents`
    pub fn fit(&mut self, documents: &[&str]) {
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let tokens = tokenize(doc);
            let unique: HashSet<&String> = tokens.iter().collect();
            for token in unique {
                *doc_freq.entry(token.clone()).or_insert(0) += 1;
            }
            for token in tokens {
                *term_counts.entry(token).or_insert(0) += 1;
            }
        }

        // Most frequent first; alphabetical among equals keeps selection stable
        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort();

        let n_docs = documents.len() as f64;
        self.idf = terms
            .iter()
            .map(|t| {
                let df = *doc_freq.get(t).unwrap_or(&0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();

        tracing::debug!("Vocabulary fitted on {} documents: {} terms", documents.len(), self.vocabulary.len());
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.idf.is_empty()
    }

    pub fn transform_one(&self, text: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.n_features()];
        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                row[idx] += 1.0;
            }
        }

        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut row {
                *value /= norm;
            }
        }
        row
    }

    pub fn transform(&self, documents: &[&str]) -> FeatureMatrix {
        let mut matrix = FeatureMatrix::new(self.n_features());
        for doc in documents {
            matrix.push(self.transform_one(doc));
        }
        matrix
    }
}

/// Which documents the vocabulary is fitted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitScope {
    /// Fit on the training split only, so test documents never shape the
    /// vocabulary or idf weights
    #[default]
    TrainingSplit,
    /// Fit on every document before splitting, reproducing older reports
    FullCorpus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub max_features: usize,
    /// Fewer usable documents than this aborts the run
    pub min_rows: usize,
    pub fit_scope: FitScope,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_features: 5000,
            min_rows: 10,
            fit_scope: FitScope::default(),
        }
    }
}

/// Train/test matrices produced with one fitted vocabulary
#[derive(Debug, Clone)]
pub struct ExtractedFeatures {
    pub vectorizer: TfIdfVectorizer,
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
}

pub struct FeatureExtractor {
    config: ExtractionConfig,
}

impl FeatureExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn ensure_rows(&self, found: usize) -> Result<(), PipelineError> {
        if found < self.config.min_rows {
            return Err(PipelineError::InsufficientData {
                found,
                required: self.config.min_rows,
            });
        }
        Ok(())
    }

    /// Fit once on the configured scope, then transform both sides of `split`
    pub fn extract(&self, texts: &[&str], split: &Split) -> Result<ExtractedFeatures, PipelineError> {
        self.ensure_rows(texts.len())?;

        let pick = |indices: &[usize]| -> Vec<&str> { indices.iter().map(|&i| texts[i]).collect() };
        let train_texts = pick(&split.train);
        let test_texts = pick(&split.test);

        let mut vectorizer = TfIdfVectorizer::new(self.config.max_features);
        match self.config.fit_scope {
            FitScope::TrainingSplit => vectorizer.fit(&train_texts),
            FitScope::FullCorpus => vectorizer.fit(texts),
        }

        let train = vectorizer.transform(&train_texts);
        let test = vectorizer.transform(&test_texts);

        Ok(ExtractedFeatures {
            vectorizer,
            train,
            test,
        })
    }
}
