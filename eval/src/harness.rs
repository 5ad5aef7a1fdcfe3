// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Classifier evaluation harness
//!
//! Trains every model of a battery on the same balanced training rows and
//! scores it on the held-out rows. The harness performs no I/O.

use crate::classifiers::{all_classifiers, Classifier};
use crate::corpus::Label;
use crate::error::PipelineError;
use crate::features::FeatureMatrix;
use crate::metrics::{ClassificationReport, ConfusionMatrix};
use serde::{Deserialize, Serialize};

/// Scores of one model on the test split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResult {
    pub model_name: String,
    pub model_description: String,
    /// Support-weighted precision
    pub precision: f64,
    /// Support-weighted recall
    pub recall: f64,
    /// Support-weighted F1
    pub f1: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub report: ClassificationReport,
    pub training_samples: usize,
    pub test_samples: usize,
}

impl ModelResult {
    pub fn from_predictions(
        model: &dyn Classifier,
        predictions: &[Label],
        ground_truth: &[Label],
        training_samples: usize,
    ) -> Self {
        let report = ClassificationReport::from_predictions(predictions, ground_truth);
        Self {
            model_name: model.name().to_string(),
            model_description: model.description().to_string(),
            precision: report.weighted.precision,
            recall: report.weighted.recall,
            f1: report.weighted.f1_score,
            confusion_matrix: report.confusion_matrix,
            report,
            training_samples,
            test_samples: ground_truth.len(),
        }
    }
}

/// Fails unless both labels occur in `labels`
pub fn ensure_both_classes(labels: &[Label]) -> Result<(), PipelineError> {
    let Some(first) = labels.first() else {
        return Err(PipelineError::InsufficientData { found: 0, required: 2 });
    };
    if labels.iter().all(|l| l == first) {
        return Err(PipelineError::DegenerateTrainingSet { label: *first });
    }
    Ok(())
}

pub struct EvaluationHarness {
    classifiers: Vec<Box<dyn Classifier>>,
}

impl EvaluationHarness {
    pub fn new(classifiers: Vec<Box<dyn Classifier>>) -> Self {
        Self { classifiers }
    }

    /// The full four-model battery
    pub fn with_battery(seed: u64, forest_trees: usize) -> Self {
        Self::new(all_classifiers(seed, forest_trees))
    }

    /// Keep only the named models; an empty list keeps all of them
    pub fn retain_named(mut self, names: &[String]) -> Self {
        if !names.is_empty() {
            self.classifiers
                .retain(|c| names.iter().any(|n| n.eq_ignore_ascii_case(c.name())));
        }
        self
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.classifiers.iter().map(|c| c.name()).collect()
    }

    /// Fit each model from scratch and evaluate it, in battery order
    pub fn evaluate(
        &mut self,
        train_x: &FeatureMatrix,
        train_y: &[Label],
        test_x: &FeatureMatrix,
        test_y: &[Label],
    ) -> Result<Vec<ModelResult>, PipelineError> {
        ensure_both_classes(train_y)?;

        let mut results = Vec::with_capacity(self.classifiers.len());
        for model in &mut self.classifiers {
            tracing::info!("Evaluating model: {}", model.name());

            model.fit(train_x, train_y);
            let predictions = model.predict_batch(test_x);
            let result = ModelResult::from_predictions(model.as_ref(), &predictions, test_y, train_y.len());

            tracing::info!(
                "  {} - Precision: {:.4}, Recall: {:.4}, F1: {:.4}",
                result.model_name,
                result.precision,
                result.recall,
                result.f1
            );
            results.push(result);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Positives load on feature 0, negatives on feature 1
    fn separable(n: usize) -> (FeatureMatrix, Vec<Label>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let positive = i % 2 == 0;
            let strength = 0.7 + (i % 4) as f64 * 0.1;
            rows.push(if positive {
                vec![strength, 0.0, 0.1]
            } else {
                vec![0.0, strength, 0.1]
            });
            labels.push(Label::from_positive(positive));
        }
        (FeatureMatrix::from_rows(rows), labels)
    }

    #[test]
    fn test_separable_data_scores_perfectly() {
        let (train_x, train_y) = separable(40);
        let (test_x, test_y) = separable(10);

        let mut harness = EvaluationHarness::with_battery(42, 10);
        let results = harness.evaluate(&train_x, &train_y, &test_x, &test_y).unwrap();

        assert_eq!(results.len(), 4);
        for result in &results {
            assert!((result.f1 - 1.0).abs() < 1e-9, "{} F1 = {}", result.model_name, result.f1);
            assert_eq!(result.confusion_matrix.as_array(), [[5, 0], [0, 5]]);
            assert_eq!(result.training_samples, 40);
            assert_eq!(result.test_samples, 10);
        }
    }

    #[test]
    fn test_single_class_training_set_is_rejected() {
        let train_x = FeatureMatrix::from_rows(vec![vec![1.0, 0.0]; 4]);
        let train_y = vec![Label::Positive; 4];
        let test_x = FeatureMatrix::from_rows(vec![vec![1.0, 0.0]]);

        let mut harness = EvaluationHarness::with_battery(42, 5);
        let err = harness
            .evaluate(&train_x, &train_y, &test_x, &[Label::Negative])
            .unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateTrainingSet { label: Label::Positive }));
    }

    #[test]
    fn test_retain_named() {
        let harness = EvaluationHarness::with_battery(42, 5)
            .retain_named(&["svm".to_string(), "Naive Bayes".to_string()]);
        assert_eq!(harness.model_names(), vec!["Naive Bayes", "SVM"]);

        let all = EvaluationHarness::with_battery(42, 5).retain_named(&[]);
        assert_eq!(all.model_names().len(), 4);
    }
}
