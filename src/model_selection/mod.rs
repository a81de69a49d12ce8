//! Model selection utilities for cross-validation and hyperparameter search.
//!
//! This module provides tools for:
//! - K-Fold splitting
//! - Cross-validation of a single configuration
//! - Exhaustive grid search over candidate parameter sets ([`GridSearchCV`])

mod grid_search;

pub use grid_search::{CandidateResult, GridSearchCV, GridSearchResult};

use crate::error::{NmfRecError, Result};
use crate::metrics::Scorer;
use crate::primitives::Matrix;
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};

/// Results from cross-validation.
#[derive(Debug, Clone)]
pub struct CrossValidationResult {
    /// Score for each fold
    pub scores: Vec<f32>,
}

impl CrossValidationResult {
    /// Calculate mean score across folds
    #[must_use]
    pub fn mean(&self) -> f32 {
        mean(&self.scores)
    }

    /// Calculate standard deviation of scores
    #[must_use]
    pub fn std(&self) -> f32 {
        std_dev(&self.scores)
    }
}

pub(crate) fn mean(scores: &[f32]) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f32>() / scores.len() as f32
}

/// Population standard deviation.
pub(crate) fn std_dev(scores: &[f32]) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }
    let mean = mean(scores);
    let variance = scores
        .iter()
        .map(|&score| (score - mean).powi(2))
        .sum::<f32>()
        / scores.len() as f32;
    variance.sqrt()
}

/// Run cross-validation on an estimator.
///
/// Each fold fits a clone of `estimator` on the training rows of `x`,
/// predicts the held-out rows of `x`, and scores them against the same rows
/// of `y`.
///
/// # Example
///
/// ```rust
/// use nmfrec::prelude::*;
/// use nmfrec::model_selection::{cross_validate, KFold};
///
/// let x = Matrix::from_fn(9, 4, |i, j| ((i + 2 * j) % 5) as f32 / 4.0);
/// let model = NmfRecommender::new(NmfParams::default().with_n_components(2).with_random_state(0));
///
/// let results = cross_validate(&model, &x, &x, &KFold::new(3), &Scorer::neg_rmse())
///     .expect("cross-validation should succeed");
/// assert_eq!(results.scores.len(), 3);
/// assert!(results.mean() <= 0.0);
/// ```
///
/// # Errors
///
/// Returns the first fold failure, or an error if `x` and `y` disagree on
/// row count or the fold count does not fit the data.
pub fn cross_validate<E>(
    estimator: &E,
    x: &Matrix<f32>,
    y: &Matrix<f32>,
    cv: &KFold,
    scorer: &Scorer,
) -> Result<CrossValidationResult>
where
    E: Estimator + Clone,
{
    check_targets(x, y)?;
    cv.check(x.n_rows())?;

    let scores = cv
        .split(x.n_rows())
        .iter()
        .map(|(train_idx, test_idx)| {
            fit_and_score(estimator.clone(), x, y, train_idx, test_idx, scorer)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CrossValidationResult { scores })
}

/// Fits `model` on one fold and scores its held-out predictions.
pub(crate) fn fit_and_score<E: Estimator>(
    mut model: E,
    x: &Matrix<f32>,
    y: &Matrix<f32>,
    train_idx: &[usize],
    test_idx: &[usize],
    scorer: &Scorer,
) -> Result<f32> {
    model.fit(&x.select_rows(train_idx))?;
    let y_pred = model.predict(&x.select_rows(test_idx))?;
    scorer.score(&y.select_rows(test_idx), &y_pred)
}

pub(crate) fn check_targets(x: &Matrix<f32>, y: &Matrix<f32>) -> Result<()> {
    if x.n_rows() != y.n_rows() {
        return Err(NmfRecError::DimensionMismatch {
            expected: format!("{} target rows", x.n_rows()),
            actual: format!("{} target rows", y.n_rows()),
        });
    }
    Ok(())
}

/// K-Fold cross-validator.
///
/// Splits data into K consecutive folds. Each fold is used once as test set
/// while the remaining K-1 folds form the training set. The first
/// `n_samples % K` folds get one extra sample.
///
/// # Example
///
/// ```rust
/// use nmfrec::model_selection::KFold;
///
/// let kfold = KFold::new(3);
/// let splits = kfold.split(10);
/// assert_eq!(splits[0].1, vec![0, 1, 2, 3]);
/// assert_eq!(splits[2].1, vec![7, 8, 9]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl Default for KFold {
    fn default() -> Self {
        Self::new(3)
    }
}

impl KFold {
    /// Create a new K-Fold cross-validator.
    ///
    /// # Arguments
    ///
    /// * `n_splits` - Number of folds. Must be at least 2.
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Enable shuffling before splitting into batches.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducible shuffling.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true; // Shuffle is implied when random_state is set
        self
    }

    /// Number of folds.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Checks that `n_samples` rows can be split into the configured folds.
    ///
    /// # Errors
    ///
    /// Returns an error if `n_splits < 2` or `n_splits > n_samples`.
    pub fn check(&self, n_samples: usize) -> Result<()> {
        if self.n_splits < 2 {
            return Err(NmfRecError::invalid_param("n_splits", self.n_splits, ">= 2"));
        }
        if self.n_splits > n_samples {
            return Err(NmfRecError::invalid_param(
                "n_splits",
                self.n_splits,
                &format!("<= n_samples ({n_samples})"),
            ));
        }
        Ok(())
    }

    /// Generate train/test indices for each fold.
    ///
    /// Returns a vector of (train_indices, test_indices) tuples. Callers
    /// should [`check`](Self::check) the sample count first; with more folds
    /// than samples the trailing test sets are empty.
    #[must_use]
    pub fn split(&self, n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut indices: Vec<usize> = (0..n_samples).collect();

        if self.shuffle {
            if let Some(seed) = self.random_state {
                let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
                indices.shuffle(&mut rng);
            } else {
                let mut rng = rand::thread_rng();
                indices.shuffle(&mut rng);
            }
        }

        let n_splits = self.n_splits.max(1);
        let fold_size = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut result = Vec::with_capacity(n_splits);
        let mut start = 0;

        for i in 0..n_splits {
            // Distribute remainder across first folds
            let current_fold_size = if i < remainder {
                fold_size + 1
            } else {
                fold_size
            };
            let end = start + current_fold_size;

            let test_indices: Vec<usize> = indices[start..end].to_vec();

            let mut train_indices = Vec::with_capacity(n_samples - current_fold_size);
            train_indices.extend_from_slice(&indices[..start]);
            train_indices.extend_from_slice(&indices[end..]);

            result.push((train_indices, test_indices));
            start = end;
        }

        result
    }
}
