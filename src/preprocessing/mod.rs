//! Preprocessing transformers applied before factorization.
//!
//! The pipeline imputes missing values with training column means, rescales
//! each column to `[0, 1]` using training min/max, then clamps anything that
//! fell below zero. Every statistic is learned from training data only.
//!
//! # Example
//!
//! ```
//! use nmfrec::prelude::*;
//! use nmfrec::preprocessing::Preprocessor;
//!
//! let train = Matrix::from_vec(3, 2, vec![
//!     0.0, 10.0,
//!     f32::NAN, 20.0,
//!     4.0, 30.0,
//! ]).expect("valid matrix dimensions");
//! let val = Matrix::from_vec(1, 2, vec![-2.0, 40.0]).expect("valid matrix dimensions");
//!
//! let mut pre = Preprocessor::new();
//! let (train_p, val_p) = pre.fit_transform_pair(&train, &val).expect("preprocess");
//!
//! assert!((train_p.get(1, 0) - 0.5).abs() < 1e-6); // NaN -> mean 2.0 -> 0.5
//! assert_eq!(val_p.get(0, 0), 0.0);                 // below training min, clamped
//! assert!((val_p.get(0, 1) - 1.5).abs() < 1e-6);    // above training max, kept
//! ```

use crate::error::{NmfRecError, Result};
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Replaces `NaN` entries with the per-column mean of the training data.
///
/// A column with no observed values in training is filled with `0.0`, so the
/// output always has the input's shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleImputer {
    /// Fill value of each feature (computed during fit).
    statistics: Option<Vec<f32>>,
}

impl SimpleImputer {
    /// Creates an unfitted mean imputer.
    #[must_use]
    pub fn new() -> Self {
        Self { statistics: None }
    }

    /// Per-column fill values, once fitted.
    #[must_use]
    pub fn statistics(&self) -> Option<&[f32]> {
        self.statistics.as_deref()
    }

    /// Returns true if the imputer has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.statistics.is_some()
    }
}

impl Transformer for SimpleImputer {
    /// Computes the NaN-ignoring mean of each feature.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err("Cannot fit with zero samples".into());
        }

        let mut sums = vec![0.0_f64; n_features];
        let mut counts = vec![0_usize; n_features];
        for i in 0..n_samples {
            for (j, &val) in x.row(i).iter().enumerate() {
                if !val.is_nan() {
                    sums[j] += f64::from(val);
                    counts[j] += 1;
                }
            }
        }

        let statistics = sums
            .iter()
            .zip(&counts)
            .map(|(&sum, &count)| {
                if count == 0 {
                    0.0
                } else {
                    (sum / count as f64) as f32
                }
            })
            .collect::<Vec<_>>();

        let missing_columns = counts.iter().filter(|&&c| c == 0).count();
        if missing_columns > 0 {
            tracing::warn!(
                missing_columns,
                "columns without observed values imputed with 0.0"
            );
        }

        self.statistics = Some(statistics);
        Ok(())
    }

    /// Fills NaN entries with the learned column means.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let statistics = self
            .statistics
            .as_ref()
            .ok_or_else(|| NmfRecError::not_fitted("SimpleImputer"))?;

        let n_features = x.n_cols();
        if n_features != statistics.len() {
            return Err(NmfRecError::feature_mismatch(statistics.len(), n_features));
        }

        let mut result = x.clone();
        for (idx, v) in result.as_mut_slice().iter_mut().enumerate() {
            if v.is_nan() {
                *v = statistics[idx % n_features];
            }
        }
        Ok(result)
    }
}

/// Scales features to a given range (default [0, 1]).
///
/// The transformation is: X_scaled = (X - X_min) / (X_max - X_min)
///
/// `NaN` entries are ignored while fitting and pass through `transform`
/// unchanged.
///
/// # Example
///
/// ```
/// use nmfrec::prelude::*;
/// use nmfrec::preprocessing::MinMaxScaler;
///
/// let data = Matrix::from_vec(3, 2, vec![
///     0.0, 0.0,
///     5.0, 10.0,
///     10.0, 20.0,
/// ]).expect("valid matrix dimensions");
///
/// let mut scaler = MinMaxScaler::new();
/// let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
///
/// assert!((scaled.get(0, 0) - 0.0).abs() < 1e-6);
/// assert!((scaled.get(2, 0) - 1.0).abs() < 1e-6);
/// assert!((scaled.get(1, 0) - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    /// Minimum value of each feature (computed during fit).
    data_min: Option<Vec<f32>>,
    /// Maximum value of each feature (computed during fit).
    data_max: Option<Vec<f32>>,
    /// Target minimum for scaling (default 0.0).
    feature_min: f32,
    /// Target maximum for scaling (default 1.0).
    feature_max: f32,
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl MinMaxScaler {
    /// Creates a new `MinMaxScaler` with default range [0, 1].
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_min: None,
            data_max: None,
            feature_min: 0.0,
            feature_max: 1.0,
        }
    }

    /// Sets the target range for scaling.
    ///
    /// ```
    /// use nmfrec::preprocessing::MinMaxScaler;
    ///
    /// let scaler = MinMaxScaler::new().with_range(-1.0, 1.0);
    /// ```
    #[must_use]
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.feature_min = min;
        self.feature_max = max;
        self
    }

    /// Minimum of each feature seen during fit.
    #[must_use]
    pub fn data_min(&self) -> Option<&[f32]> {
        self.data_min.as_deref()
    }

    /// Maximum of each feature seen during fit.
    #[must_use]
    pub fn data_max(&self) -> Option<&[f32]> {
        self.data_max.as_deref()
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.data_min.is_some()
    }

    fn fitted_range(&self, n_features: usize) -> Result<(&[f32], &[f32])> {
        let (Some(data_min), Some(data_max)) = (&self.data_min, &self.data_max) else {
            return Err(NmfRecError::not_fitted("MinMaxScaler"));
        };
        if n_features != data_min.len() {
            return Err(NmfRecError::feature_mismatch(data_min.len(), n_features));
        }
        Ok((data_min, data_max))
    }

    /// Transforms data back to original scale.
    ///
    /// # Errors
    ///
    /// Returns an error if the scaler is not fitted or dimensions mismatch.
    pub fn inverse_transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let (n_samples, n_features) = x.shape();
        let (data_min, data_max) = self.fitted_range(n_features)?;
        let feature_range = self.feature_max - self.feature_min;

        Ok(Matrix::from_fn(n_samples, n_features, |i, j| {
            let scale = column_scale(data_max[j] - data_min[j], feature_range);
            (x.get(i, j) - self.feature_min) / scale + data_min[j]
        }))
    }
}

impl Transformer for MinMaxScaler {
    /// Computes the min and max of each feature, skipping NaN.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();

        if n_samples == 0 {
            return Err("Cannot fit with zero samples".into());
        }
        if self.feature_min.is_nan() || self.feature_max.is_nan() || self.feature_min >= self.feature_max {
            return Err(NmfRecError::invalid_param(
                "feature_range",
                format!("({}, {})", self.feature_min, self.feature_max),
                "min < max",
            ));
        }

        let mut data_min = vec![f32::INFINITY; n_features];
        let mut data_max = vec![f32::NEG_INFINITY; n_features];

        for i in 0..n_samples {
            for (j, &val) in x.row(i).iter().enumerate() {
                if val < data_min[j] {
                    data_min[j] = val;
                }
                if val > data_max[j] {
                    data_max[j] = val;
                }
            }
        }

        // Columns with no observed values scale like constant columns
        for (lo, hi) in data_min.iter_mut().zip(data_max.iter_mut()) {
            if *lo > *hi {
                *lo = 0.0;
                *hi = 0.0;
            }
        }

        self.data_min = Some(data_min);
        self.data_max = Some(data_max);

        Ok(())
    }

    /// Scales the data to the target range.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let (n_samples, n_features) = x.shape();
        let (data_min, data_max) = self.fitted_range(n_features)?;
        let feature_range = self.feature_max - self.feature_min;

        Ok(Matrix::from_fn(n_samples, n_features, |i, j| {
            let val = x.get(i, j);
            if val.is_nan() {
                val
            } else {
                let scale = column_scale(data_max[j] - data_min[j], feature_range);
                (val - data_min[j]) * scale + self.feature_min
            }
        }))
    }
}

/// Per-column multiplier; a constant column uses a data range of 1.
fn column_scale(data_range: f32, feature_range: f32) -> f32 {
    if data_range.abs() > 1e-10 {
        feature_range / data_range
    } else {
        feature_range
    }
}

/// Clamps negative entries to zero, in place.
pub fn clip_negative(x: &mut Matrix<f32>) {
    for v in x.as_mut_slice() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

/// Imputation, min-max scaling and non-negative clamping as one step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preprocessor {
    imputer: SimpleImputer,
    scaler: MinMaxScaler,
}

impl Preprocessor {
    /// Creates an unfitted preprocessor with a `[0, 1]` target range.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The fitted imputer.
    #[must_use]
    pub fn imputer(&self) -> &SimpleImputer {
        &self.imputer
    }

    /// The fitted scaler.
    #[must_use]
    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    /// Fits on `train`, then transforms both `train` and `val`.
    ///
    /// # Errors
    ///
    /// Returns an error if `train` is empty or the column counts differ.
    pub fn fit_transform_pair(
        &mut self,
        train: &Matrix<f32>,
        val: &Matrix<f32>,
    ) -> Result<(Matrix<f32>, Matrix<f32>)> {
        if train.n_cols() != val.n_cols() {
            return Err(NmfRecError::feature_mismatch(train.n_cols(), val.n_cols()));
        }
        let train_p = self.fit_transform(train)?;
        let val_p = self.transform(val)?;
        tracing::debug!(
            train_shape = ?train_p.shape(),
            val_shape = ?val_p.shape(),
            "preprocessing complete"
        );
        Ok((train_p, val_p))
    }
}

impl Transformer for Preprocessor {
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let imputed = self.imputer.fit_transform(x)?;
        self.scaler.fit(&imputed)
    }

    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let imputed = self.imputer.transform(x)?;
        let mut scaled = self.scaler.transform(&imputed)?;
        clip_negative(&mut scaled);
        Ok(scaled)
    }
}
