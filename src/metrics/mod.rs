//! Evaluation metrics for reconstruction models.
//!
//! Slice-level regression metrics (MSE, RMSE), a matrix-level RMSE used for
//! whole-reconstruction evaluation, and [`Scorer`], the signed scoring rule
//! consumed by grid search.

use crate::error::{NmfRecError, Result};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Computes the Mean Squared Error (MSE).
///
/// MSE = (1/n) * `Σ(y_true - y_pred)²`
///
/// # Examples
///
/// ```
/// use nmfrec::metrics::mse;
///
/// let y_true = [3.0, -0.5, 2.0, 7.0];
/// let y_pred = [2.5, 0.0, 2.0, 8.0];
/// let error = mse(&y_pred, &y_true);
/// assert!((error - 0.375).abs() < 1e-6);
/// ```
///
/// # Panics
///
/// Panics if slices have different lengths or are empty.
#[must_use]
pub fn mse(y_pred: &[f32], y_true: &[f32]) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Slices must have same length");
    assert!(!y_true.is_empty(), "Slices cannot be empty");

    let sum_sq_error: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| f64::from(t - p).powi(2))
        .sum();

    (sum_sq_error / y_true.len() as f64) as f32
}

/// Computes the Root Mean Squared Error (RMSE).
///
/// RMSE = sqrt(MSE)
///
/// # Examples
///
/// ```
/// use nmfrec::metrics::rmse;
///
/// let y_true = [1.0, 2.0, 3.0];
/// let y_pred = [1.0, 2.0, 3.0];
/// assert_eq!(rmse(&y_pred, &y_true), 0.0);
/// ```
///
/// # Panics
///
/// Panics if slices have different lengths or are empty.
#[must_use]
pub fn rmse(y_pred: &[f32], y_true: &[f32]) -> f32 {
    mse(y_pred, y_true).sqrt()
}

/// RMSE over every entry of two equally shaped matrices.
///
/// # Errors
///
/// Returns an error if the shapes differ or the matrices are empty.
pub fn matrix_rmse(y_true: &Matrix<f32>, y_pred: &Matrix<f32>) -> Result<f32> {
    if y_true.shape() != y_pred.shape() {
        return Err(NmfRecError::shape_mismatch(y_true.shape(), y_pred.shape()));
    }
    if y_true.is_empty() {
        return Err(NmfRecError::ValidationError {
            message: "cannot score an empty matrix".to_string(),
        });
    }
    Ok(rmse(y_pred.as_slice(), y_true.as_slice()))
}

/// The quantity a [`Scorer`] computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreKind {
    /// Root mean squared error over all entries.
    Rmse,
    /// Mean squared error over all entries.
    Mse,
}

/// A signed scoring rule: higher scores are always better.
///
/// Loss metrics are negated so that search can maximise uniformly.
///
/// ```
/// use nmfrec::metrics::Scorer;
/// use nmfrec::primitives::Matrix;
///
/// let scorer = Scorer::neg_rmse();
/// let y = Matrix::from_vec(1, 2, vec![1.0, 2.0]).expect("1x2");
/// let p = Matrix::from_vec(1, 2, vec![1.0, 4.0]).expect("1x2");
/// let score = scorer.score(&y, &p).expect("same shape");
/// assert!((score + 2.0_f32.sqrt()).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorer {
    name: String,
    kind: ScoreKind,
    greater_is_better: bool,
}

impl Scorer {
    /// Negative root mean squared error.
    #[must_use]
    pub fn neg_rmse() -> Self {
        Self {
            name: "neg_root_mean_squared_error".to_string(),
            kind: ScoreKind::Rmse,
            greater_is_better: false,
        }
    }

    /// Negative mean squared error.
    #[must_use]
    pub fn neg_mse() -> Self {
        Self {
            name: "neg_mean_squared_error".to_string(),
            kind: ScoreKind::Mse,
            greater_is_better: false,
        }
    }

    /// Scorer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the underlying metric grows with quality. When false the
    /// score is the negated metric.
    #[must_use]
    pub fn greater_is_better(&self) -> bool {
        self.greater_is_better
    }

    /// Signed score of `y_pred` against `y_true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes differ or the matrices are empty.
    pub fn score(&self, y_true: &Matrix<f32>, y_pred: &Matrix<f32>) -> Result<f32> {
        let raw = match self.kind {
            ScoreKind::Rmse => matrix_rmse(y_true, y_pred)?,
            ScoreKind::Mse => {
                let r = matrix_rmse(y_true, y_pred)?;
                r * r
            }
        };
        Ok(self.sign() * raw)
    }

    /// Converts a signed score back to the raw metric value.
    #[must_use]
    pub fn to_metric(&self, score: f32) -> f32 {
        self.sign() * score
    }

    fn sign(&self) -> f32 {
        if self.greater_is_better {
            1.0
        } else {
            -1.0
        }
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::neg_rmse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_known_value() {
        let y_true = [3.0, -0.5, 2.0, 7.0];
        let y_pred = [2.5, 0.0, 2.0, 8.0];
        assert!((mse(&y_pred, &y_true) - 0.375).abs() < 1e-6);
    }

    #[test]
    fn test_rmse_known_value() {
        let y_true = [0.0, 0.0];
        let y_pred = [3.0, 4.0];
        // mse = 12.5
        assert!((rmse(&y_pred, &y_true) - 12.5_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "Slices must have same length")]
    fn test_mse_length_mismatch_panics() {
        let _ = mse(&[1.0], &[1.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "Slices cannot be empty")]
    fn test_mse_empty_panics() {
        let _ = mse(&[], &[]);
    }

    #[test]
    fn test_matrix_rmse() {
        let a = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).expect("2x2");
        let b = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 6.0]).expect("2x2");
        assert!((matrix_rmse(&a, &b).expect("same shape") - 1.0).abs() < 1e-6);
        assert_eq!(matrix_rmse(&a, &a).expect("same shape"), 0.0);
    }

    #[test]
    fn test_matrix_rmse_shape_mismatch() {
        let a = Matrix::zeros(2, 2);
        let b = Matrix::zeros(2, 3);
        assert!(matches!(
            matrix_rmse(&a, &b),
            Err(NmfRecError::DimensionMismatch { .. })
        ));
        assert!(matrix_rmse(&Matrix::zeros(0, 2), &Matrix::zeros(0, 2)).is_err());
    }

    #[test]
    fn test_neg_rmse_scorer() {
        let scorer = Scorer::neg_rmse();
        assert_eq!(scorer.name(), "neg_root_mean_squared_error");
        assert!(!scorer.greater_is_better());

        let y = Matrix::from_vec(1, 2, vec![0.0, 0.0]).expect("1x2");
        let perfect = scorer.score(&y, &y).expect("score");
        let worse = scorer
            .score(&y, &Matrix::filled(1, 2, 1.0))
            .expect("score");
        assert_eq!(perfect, 0.0);
        assert!((worse + 1.0).abs() < 1e-6);
        assert!(perfect > worse);
        assert!((scorer.to_metric(worse) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_neg_mse_scorer() {
        let scorer = Scorer::neg_mse();
        let y = Matrix::zeros(1, 2);
        let p = Matrix::filled(1, 2, 2.0);
        assert!((scorer.score(&y, &p).expect("score") + 4.0).abs() < 1e-5);
        assert_eq!(Scorer::default(), Scorer::neg_rmse());
    }
}
