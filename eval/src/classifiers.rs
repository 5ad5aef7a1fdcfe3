// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Classifier battery for review polarity
//!
//! Implements:
//! - Multinomial Naive Bayes (linear probabilistic)
//! - Linear SVM trained with hinge-loss SGD (max-margin)
//! - Random Forest of Gini trees (ensemble)
//! - Logistic Regression trained with batch gradient descent (discriminative)
//!
//! Every model is trained from scratch by `fit`; nothing is shared between
//! models. Stochastic models take an explicit seed.

use crate::corpus::Label;
use crate::features::FeatureMatrix;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Trait for all models of the battery
pub trait Classifier: Send + Sync {
    /// Train the model, discarding any previous state
    fn fit(&mut self, x: &FeatureMatrix, y: &[Label]);

    /// Predict the label of one feature row
    fn predict(&self, row: &[f64]) -> Label;

    /// Predict labels for every row of `x`
    fn predict_batch(&self, x: &FeatureMatrix) -> Vec<Label> {
        x.rows.iter().map(|row| self.predict(row)).collect()
    }

    fn name(&self) -> &str;

    fn description(&self) -> &str;
}

type SparseRow = Vec<(usize, f64)>;

fn sparse_rows(x: &FeatureMatrix) -> Vec<SparseRow> {
    x.rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(_, v)| **v != 0.0)
                .map(|(i, v)| (i, *v))
                .collect()
        })
        .collect()
}

fn dot(weights: &[f64], row: &[f64]) -> f64 {
    weights.iter().zip(row).map(|(w, v)| w * v).sum()
}

fn sparse_dot(weights: &[f64], row: &SparseRow) -> f64 {
    row.iter().map(|(i, v)| weights[*i] * v).sum()
}

fn sign(label: Label) -> f64 {
    match label {
        Label::Positive => 1.0,
        Label::Negative => -1.0,
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Multinomial Naive Bayes with Laplace smoothing
#[derive(Debug, Clone)]
pub struct MultinomialNaiveBayes {
    alpha: f64,
    log_prior: [f64; 2],
    feature_log_prob: [Vec<f64>; 2],
}

impl MultinomialNaiveBayes {
    pub fn new() -> Self {
        Self {
            alpha: 1.0,
            log_prior: [0.0; 2],
            feature_log_prob: [Vec::new(), Vec::new()],
        }
    }

    fn joint_log_likelihood(&self, row: &[f64], label: Label) -> f64 {
        let c = label.index();
        self.log_prior[c] + dot(&self.feature_log_prob[c], row)
    }
}

impl Default for MultinomialNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for MultinomialNaiveBayes {
    fn fit(&mut self, x: &FeatureMatrix, y: &[Label]) {
        let d = x.n_features;
        let mut class_count = [0usize; 2];
        let mut feature_count = [vec![0.0; d], vec![0.0; d]];

        for (row, label) in x.rows.iter().zip(y) {
            let c = label.index();
            class_count[c] += 1;
            for (acc, v) in feature_count[c].iter_mut().zip(row) {
                *acc += v;
            }
        }

        let n = y.len().max(1) as f64;
        for c in 0..2 {
            self.log_prior[c] = if class_count[c] == 0 {
                f64::NEG_INFINITY
            } else {
                (class_count[c] as f64 / n).ln()
            };

            let total: f64 = feature_count[c].iter().sum::<f64>() + self.alpha * d as f64;
            self.feature_log_prob[c] = feature_count[c]
                .iter()
                .map(|count| ((count + self.alpha) / total).ln())
                .collect();
        }
    }

    fn predict(&self, row: &[f64]) -> Label {
        let positive = self.joint_log_likelihood(row, Label::Positive);
        let negative = self.joint_log_likelihood(row, Label::Negative);
        Label::from_positive(positive > negative)
    }

    fn name(&self) -> &str {
        "Naive Bayes"
    }

    fn description(&self) -> &str {
        "Multinomial Naive Bayes over TF-IDF weights (Laplace smoothing)"
    }
}

/// Linear support vector machine, hinge loss with L2 penalty
#[derive(Debug, Clone)]
pub struct LinearSvm {
    seed: u64,
    epochs: usize,
    learning_rate: f64,
    lambda: f64,
    weights: Vec<f64>,
    bias: f64,
}

impl LinearSvm {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            epochs: 50,
            learning_rate: 0.1,
            lambda: 1e-4,
            weights: Vec::new(),
            bias: 0.0,
        }
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn decision_function(&self, row: &[f64]) -> f64 {
        dot(&self.weights, row) + self.bias
    }
}

impl Classifier for LinearSvm {
    fn fit(&mut self, x: &FeatureMatrix, y: &[Label]) {
        let rows = sparse_rows(x);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        // weights = scale * v, so the L2 decay stays O(1) per step
        let mut v = vec![0.0; x.n_features];
        let mut scale = 1.0;
        let mut bias = 0.0;
        let decay = 1.0 - self.learning_rate * self.lambda;
        let mut order: Vec<usize> = (0..rows.len()).collect();

        for _ in 0..self.epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                let target = sign(y[i]);
                let margin = target * (scale * sparse_dot(&v, &rows[i]) + bias);

                scale *= decay;
                if margin < 1.0 {
                    let step = self.learning_rate * target / scale;
                    for (f, value) in &rows[i] {
                        v[*f] += step * value;
                    }
                    bias += self.learning_rate * target;
                }

                if scale < 1e-9 {
                    for w in &mut v {
                        *w *= scale;
                    }
                    scale = 1.0;
                }
            }
        }

        self.weights = v.into_iter().map(|w| w * scale).collect();
        self.bias = bias;
    }

    fn predict(&self, row: &[f64]) -> Label {
        Label::from_positive(self.decision_function(row) > 0.0)
    }

    fn name(&self) -> &str {
        "SVM"
    }

    fn description(&self) -> &str {
        "Linear SVM, hinge loss with L2 penalty, seeded SGD"
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        positive_fraction: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART tree grown until leaves are pure
#[derive(Debug, Clone, Default)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn grow(
        x: &FeatureMatrix,
        y: &[Label],
        indices: Vec<usize>,
        max_features: usize,
        max_depth: Option<usize>,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut tree = Self::default();
        tree.build(x, y, indices, max_features, max_depth, 0, rng);
        tree
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &mut self,
        x: &FeatureMatrix,
        y: &[Label],
        indices: Vec<usize>,
        max_features: usize,
        max_depth: Option<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| y[i] == Label::Positive).count();
        let positive_fraction = if n == 0 { 0.0 } else { positives as f64 / n as f64 };

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { positive_fraction });

        let pure = positives == 0 || positives == n;
        if pure || n < 2 || max_depth.is_some_and(|limit| depth >= limit) {
            return node_id;
        }

        // Inspect `max_features` random features, continuing past that only
        // while no valid split has been found
        let mut features: Vec<usize> = (0..x.n_features).collect();
        features.shuffle(rng);

        let mut best: Option<(usize, f64, f64)> = None;
        for (k, &feature) in features.iter().enumerate() {
            if k >= max_features && best.is_some() {
                break;
            }
            if let Some((threshold, impurity)) = best_threshold(x, y, &indices, feature, positives) {
                if best.map_or(true, |(_, _, b)| impurity < b) {
                    best = Some((feature, threshold, impurity));
                }
            }
        }

        let Some((feature, threshold, _)) = best else {
            return node_id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&i| x.rows[i][feature] <= threshold);

        let left = self.build(x, y, left_idx, max_features, max_depth, depth + 1, rng);
        let right = self.build(x, y, right_idx, max_features, max_depth, depth + 1, rng);
        self.nodes[node_id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node_id
    }

    fn positive_fraction(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { positive_fraction } => return *positive_fraction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

/// Lowest weighted Gini impurity split on one feature, as (threshold, impurity)
fn best_threshold(
    x: &FeatureMatrix,
    y: &[Label],
    indices: &[usize],
    feature: usize,
    positives: usize,
) -> Option<(f64, f64)> {
    let mut values: Vec<(f64, bool)> = indices
        .iter()
        .map(|&i| (x.rows[i][feature], y[i] == Label::Positive))
        .collect();
    values.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = values.len();
    if n < 2 || values[0].0 == values[n - 1].0 {
        return None;
    }

    let mut best: Option<(f64, f64)> = None;
    let mut left_pos = 0;
    for i in 0..n - 1 {
        if values[i].1 {
            left_pos += 1;
        }
        if values[i].0 == values[i + 1].0 {
            continue;
        }
        let left_n = i + 1;
        let right_n = n - left_n;
        let impurity = (left_n as f64 * gini(left_pos, left_n)
            + right_n as f64 * gini(positives - left_pos, right_n))
            / n as f64;
        if best.map_or(true, |(_, b)| impurity < b) {
            best = Some(((values[i].0 + values[i + 1].0) / 2.0, impurity));
        }
    }
    best
}

/// Bagged decision trees with per-split feature sampling
#[derive(Debug, Clone)]
pub struct RandomForest {
    seed: u64,
    n_trees: usize,
    max_depth: Option<usize>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(seed: u64, n_trees: usize) -> Self {
        Self {
            seed,
            n_trees: n_trees.max(1),
            max_depth: None,
            trees: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Mean positive fraction of the leaves reached in each tree
    pub fn positive_probability(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.positive_fraction(row)).sum::<f64>() / self.trees.len() as f64
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &FeatureMatrix, y: &[Label]) {
        let n = y.len();
        let max_features = ((x.n_features as f64).sqrt() as usize).max(1);

        self.trees = (0..self.n_trees)
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::grow(x, y, bootstrap, max_features, self.max_depth, &mut rng)
            })
            .collect();
    }

    fn predict(&self, row: &[f64]) -> Label {
        Label::from_positive(self.positive_probability(row) > 0.5)
    }

    fn name(&self) -> &str {
        "Random Forest"
    }

    fn description(&self) -> &str {
        "Bootstrap-aggregated Gini trees with sqrt(d) features per split"
    }
}

/// L2-regularised logistic regression
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    max_iter: usize,
    learning_rate: f64,
    /// Inverse regularisation strength
    c: f64,
    tolerance: f64,
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            max_iter: 1000,
            learning_rate: 1.0,
            c: 1.0,
            tolerance: 1e-6,
            weights: Vec::new(),
            bias: 0.0,
        }
    }

    pub fn probability(&self, row: &[f64]) -> f64 {
        sigmoid(dot(&self.weights, row) + self.bias)
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &FeatureMatrix, y: &[Label]) {
        let rows = sparse_rows(x);
        let n = rows.len().max(1) as f64;
        let lambda = 1.0 / (self.c * n);

        self.weights = vec![0.0; x.n_features];
        self.bias = 0.0;

        for iteration in 0..self.max_iter {
            let mut grad_w: Vec<f64> = self.weights.iter().map(|w| lambda * w).collect();
            let mut grad_b = 0.0;

            for (row, label) in rows.iter().zip(y) {
                let target = label.to_binary() as f64;
                let error = sigmoid(sparse_dot(&self.weights, row) + self.bias) - target;
                for (f, value) in row {
                    grad_w[*f] += error * value / n;
                }
                grad_b += error / n;
            }

            let grad_norm = (grad_w.iter().map(|g| g * g).sum::<f64>() + grad_b * grad_b).sqrt();
            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * g;
            }
            self.bias -= self.learning_rate * grad_b;

            if grad_norm < self.tolerance {
                tracing::debug!("Logistic regression converged after {} iterations", iteration + 1);
                break;
            }
        }
    }

    fn predict(&self, row: &[f64]) -> Label {
        Label::from_positive(self.probability(row) > 0.5)
    }

    fn name(&self) -> &str {
        "Logistic Regression"
    }

    fn description(&self) -> &str {
        "L2-regularised logistic regression, batch gradient descent"
    }
}

/// Factory function creating the full battery in reporting order
pub fn all_classifiers(seed: u64, forest_trees: usize) -> Vec<Box<dyn Classifier>> {
    vec![
        Box::new(MultinomialNaiveBayes::new()),
        Box::new(LinearSvm::new(seed)),
        Box::new(RandomForest::new(seed, forest_trees)),
        Box::new(LogisticRegression::new()),
    ]
}
