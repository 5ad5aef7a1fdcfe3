// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Seeded train/test partitioning and minority-class oversampling

use crate::corpus::Label;
use crate::features::FeatureMatrix;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row indices of a train/test partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Split each class separately so both keep their share of the training set
    #[default]
    Stratified,
    /// One seeded permutation of all rows
    Shuffled,
}

/// Partition `labels.len()` rows; the same seed always yields the same split
pub fn train_test_split(labels: &[Label], test_fraction: f64, strategy: SplitStrategy, seed: u64) -> Split {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut split = Split::default();

    match strategy {
        SplitStrategy::Shuffled => {
            let mut indices: Vec<usize> = (0..labels.len()).collect();
            indices.shuffle(&mut rng);
            let n_test = ((labels.len() as f64 * fraction).ceil() as usize).min(labels.len());
            split.test = indices[..n_test].to_vec();
            split.train = indices[n_test..].to_vec();
        }
        SplitStrategy::Stratified => {
            for class in Label::ALL {
                let mut indices: Vec<usize> = labels
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| **l == class)
                    .map(|(i, _)| i)
                    .collect();
                indices.shuffle(&mut rng);

                let mut n_test = (indices.len() as f64 * fraction).round() as usize;
                if indices.len() >= 2 {
                    n_test = n_test.min(indices.len() - 1);
                }
                n_test = n_test.min(indices.len());

                split.test.extend_from_slice(&indices[..n_test]);
                split.train.extend_from_slice(&indices[n_test..]);
            }
        }
    }

    split.train.sort_unstable();
    split.test.sort_unstable();
    split
}

/// Training rows after balancing
#[derive(Debug, Clone)]
pub struct Balanced {
    pub x: FeatureMatrix,
    pub y: Vec<Label>,
    /// Whether minority rows were resampled
    pub resampled: bool,
}

/// Oversamples the minority class with replacement up to the majority count
#[derive(Debug, Clone)]
pub struct ClassBalancer {
    enabled: bool,
    seed: u64,
}

impl ClassBalancer {
    pub fn new(enabled: bool, seed: u64) -> Self {
        Self { enabled, seed }
    }

    /// Returns the input unchanged when disabled, when a class is absent or
    /// when both classes already have the same count. Output rows are the
    /// majority rows in input order followed by the resampled minority rows.
    pub fn balance(&self, x: &FeatureMatrix, y: &[Label]) -> Balanced {
        let unchanged = || Balanced {
            x: x.clone(),
            y: y.to_vec(),
            resampled: false,
        };

        if !self.enabled {
            return unchanged();
        }

        let negatives: Vec<usize> = (0..y.len()).filter(|&i| y[i] == Label::Negative).collect();
        let positives: Vec<usize> = (0..y.len()).filter(|&i| y[i] == Label::Positive).collect();

        if negatives.is_empty() || positives.is_empty() || negatives.len() == positives.len() {
            return unchanged();
        }

        let (majority, minority) = if negatives.len() > positives.len() {
            (negatives, positives)
        } else {
            (positives, negatives)
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let upsampled: Vec<usize> = (0..majority.len())
            .map(|_| minority[rng.gen_range(0..minority.len())])
            .collect();

        tracing::info!(
            "Oversampling {:?}: {} -> {} rows",
            y[minority[0]],
            minority.len(),
            upsampled.len()
        );

        let indices: Vec<usize> = majority.iter().chain(upsampled.iter()).copied().collect();
        Balanced {
            x: x.select(&indices),
            y: indices.iter().map(|&i| y[i]).collect(),
            resampled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::label_distribution;

    fn labels(pos: usize, neg: usize) -> Vec<Label> {
        let mut y = vec![Label::Positive; pos];
        y.extend(vec![Label::Negative; neg]);
        y
    }

    fn matrix(n: usize) -> FeatureMatrix {
        FeatureMatrix::from_rows((0..n).map(|i| vec![i as f64, 1.0]).collect())
    }

    #[test]
    fn test_split_is_reproducible() {
        let y = labels(30, 20);
        let a = train_test_split(&y, 0.2, SplitStrategy::Shuffled, 42);
        let b = train_test_split(&y, 0.2, SplitStrategy::Shuffled, 42);
        assert_eq!(a, b);
        assert_eq!(a.test.len(), 10);
        assert_eq!(a.train.len(), 40);

        let c = train_test_split(&y, 0.2, SplitStrategy::Stratified, 42);
        let d = train_test_split(&y, 0.2, SplitStrategy::Stratified, 42);
        assert_eq!(c, d);
    }

    #[test]
    fn test_split_partitions_all_rows() {
        let y = labels(17, 6);
        for strategy in [SplitStrategy::Shuffled, SplitStrategy::Stratified] {
            let split = train_test_split(&y, 0.2, strategy, 7);
            let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
            all.sort_unstable();
            assert_eq!(all, (0..23).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_stratified_split_keeps_small_class_in_training() {
        let y = labels(8, 2);
        let split = train_test_split(&y, 0.2, SplitStrategy::Stratified, 42);
        let train_labels: Vec<Label> = split.train.iter().map(|&i| y[i]).collect();
        let dist = label_distribution(&train_labels);

        assert_eq!(split.test.len(), 2);
        assert_eq!(dist[&Label::Positive], 6);
        assert_eq!(dist[&Label::Negative], 2);
    }

    #[test]
    fn test_balance_equalises_classes() {
        let y = labels(12, 3);
        let x = matrix(15);
        let balanced = ClassBalancer::new(true, 42).balance(&x, &y);
        let dist = label_distribution(&balanced.y);

        assert!(balanced.resampled);
        assert_eq!(dist[&Label::Positive], 12);
        assert_eq!(dist[&Label::Negative], 12);
        assert_eq!(balanced.x.n_rows(), 24);

        // resampled rows are copies of original negative rows
        for (row, label) in balanced.x.rows.iter().zip(&balanced.y) {
            if *label == Label::Negative {
                assert!(row[0] >= 12.0);
            }
        }
    }

    #[test]
    fn test_balance_is_deterministic() {
        let y = labels(3, 9);
        let x = matrix(12);
        let a = ClassBalancer::new(true, 42).balance(&x, &y);
        let b = ClassBalancer::new(true, 42).balance(&x, &y);
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
    }

    #[test]
    fn test_balance_noop_cases() {
        let x = matrix(5);

        let single_class = labels(5, 0);
        let out = ClassBalancer::new(true, 42).balance(&x, &single_class);
        assert!(!out.resampled);
        assert_eq!(out.y, single_class);
        assert_eq!(out.x, x);

        let imbalanced = labels(4, 1);
        let out = ClassBalancer::new(false, 42).balance(&x, &imbalanced);
        assert!(!out.resampled);
        assert_eq!(out.y, imbalanced);
    }
}
