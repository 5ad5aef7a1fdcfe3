// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation metrics for the two-class review problem
//!
//! Implements:
//! - Confusion matrix in `[[TN, FP], [FN, TP]]` layout (Negative, Positive)
//! - Per-class precision, recall and F1
//! - Support-weighted averages and positive-class (binary) scores
//! - Accuracy and Matthews Correlation Coefficient
//!
//! Every ratio with a zero denominator resolves to 0.

use crate::corpus::Label;
use serde::{Deserialize, Serialize};

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        return 0.0;
    }
    num as f64 / denom as f64
}

fn harmonic(precision: f64, recall: f64) -> f64 {
    let denom = precision + recall;
    if denom == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / denom
}

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Negative reviews predicted negative
    pub tn: usize,
    /// Negative reviews predicted positive
    pub fp: usize,
    /// Positive reviews predicted negative
    pub fn_: usize,
    /// Positive reviews predicted positive
    pub tp: usize,
}

impl ConfusionMatrix {
    /// Create from predictions and ground truth labels
    pub fn from_predictions(predictions: &[Label], ground_truth: &[Label]) -> Self {
        assert_eq!(predictions.len(), ground_truth.len(), "Prediction and ground truth lengths must match");

        let mut matrix = Self::default();
        for (pred, truth) in predictions.iter().zip(ground_truth) {
            match (pred, truth) {
                (Label::Negative, Label::Negative) => matrix.tn += 1,
                (Label::Positive, Label::Negative) => matrix.fp += 1,
                (Label::Negative, Label::Positive) => matrix.fn_ += 1,
                (Label::Positive, Label::Positive) => matrix.tp += 1,
            }
        }
        matrix
    }

    /// Rows are actual labels, columns predicted labels, both ordered
    /// (Negative, Positive)
    pub fn as_array(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Number of actual samples of `label`
    pub fn support(&self, label: Label) -> usize {
        match label {
            Label::Negative => self.tn + self.fp,
            Label::Positive => self.tp + self.fn_,
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Precision, recall and F1 treating `label` as the positive class
    pub fn class_metrics(&self, label: Label) -> ClassMetrics {
        let (hits, predicted, actual) = match label {
            Label::Positive => (self.tp, self.tp + self.fp, self.tp + self.fn_),
            Label::Negative => (self.tn, self.tn + self.fn_, self.tn + self.fp),
        };
        let precision = ratio(hits, predicted);
        let recall = ratio(hits, actual);
        ClassMetrics {
            label,
            precision,
            recall,
            f1_score: harmonic(precision, recall),
            support: actual,
        }
    }

    /// Per-class scores averaged with class support as weights
    pub fn weighted_average(&self) -> AveragedScores {
        let total = self.total();
        if total == 0 {
            return AveragedScores::default();
        }

        let mut avg = AveragedScores::default();
        for label in Label::ALL {
            let m = self.class_metrics(label);
            let weight = m.support as f64 / total as f64;
            avg.precision += weight * m.precision;
            avg.recall += weight * m.recall;
            avg.f1_score += weight * m.f1_score;
        }
        avg
    }

    /// Scores of the positive class alone
    pub fn binary(&self) -> AveragedScores {
        let m = self.class_metrics(Label::Positive);
        AveragedScores {
            precision: m.precision,
            recall: m.recall,
            f1_score: m.f1_score,
        }
    }

    /// Matthews Correlation Coefficient, from -1 to 1
    pub fn mcc(&self) -> f64 {
        let tp = self.tp as f64;
        let tn = self.tn as f64;
        let fp = self.fp as f64;
        let fn_ = self.fn_ as f64;

        let numerator = tp * tn - fp * fn_;
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();

        if denominator == 0.0 {
            return 0.0;
        }
        numerator / denominator
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AveragedScores {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Full classification report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub mcc: f64,
    pub per_class: Vec<ClassMetrics>,
    pub weighted: AveragedScores,
    pub support: usize,
}

impl ClassificationReport {
    pub fn from_confusion_matrix(cm: ConfusionMatrix) -> Self {
        Self {
            accuracy: cm.accuracy(),
            mcc: cm.mcc(),
            per_class: Label::ALL.iter().map(|l| cm.class_metrics(*l)).collect(),
            weighted: cm.weighted_average(),
            support: cm.total(),
            confusion_matrix: cm,
        }
    }

    pub fn from_predictions(predictions: &[Label], ground_truth: &[Label]) -> Self {
        Self::from_confusion_matrix(ConfusionMatrix::from_predictions(predictions, ground_truth))
    }

    /// Format as a human-readable string
    pub fn format(&self) -> String {
        let mut output = format!(
            r#"Classification Report
=====================
Accuracy:           {:.4}
MCC:                {:.4}
Weighted Precision: {:.4}
Weighted Recall:    {:.4}
Weighted F1:        {:.4}
Support:            {}

"#,
            self.accuracy,
            self.mcc,
            self.weighted.precision,
            self.weighted.recall,
            self.weighted.f1_score,
            self.support,
        );

        for m in &self.per_class {
            output.push_str(&format!(
                "  {:?}: P={:.4} R={:.4} F1={:.4} (n={})\n",
                m.label, m.precision, m.recall, m.f1_score, m.support
            ));
        }

        let cm = &self.confusion_matrix;
        output.push_str(&format!(
            r#"
Confusion Matrix:
                  Predicted
                  Negative  Positive
Actual Negative  {:>6}    {:>6}
       Positive  {:>6}    {:>6}
"#,
            cm.tn, cm.fp, cm.fn_, cm.tp
        ));
        output
    }
}
