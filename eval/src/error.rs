// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error taxonomy for the analysis pipeline
//!
//! Only failures that stop a run surface here. Per-file read errors are
//! counted in the corpus statistics and language detection problems become a
//! sentiment status instead.

use crate::corpus::Label;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("review root {0} does not exist or is not a directory")]
    MissingRoot(PathBuf),

    #[error("bracket '{bracket}' has no directory under {root}")]
    MissingBracket { bracket: String, root: PathBuf },

    #[error("invalid bracket identifier '{0}': expected a range such as 30-40")]
    InvalidBracket(String),

    #[error("insufficient data: {found} usable reviews, at least {required} required")]
    InsufficientData { found: usize, required: usize },

    #[error("degenerate training set: every training sample is {label:?}")]
    DegenerateTrainingSet { label: Label },

    #[error("failed to scan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
