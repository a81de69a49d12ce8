//! Core traits for estimators and transformers.
//!
//! These traits define the API contracts that let a generic search harness
//! drive any model: fit/predict for estimators, fit/transform for
//! preprocessing steps, and explicit parameter get/set for tuning.

use crate::error::Result;
use crate::primitives::Matrix;
use std::fmt::Debug;

/// Trait for models that learn from a feature matrix and reconstruct or
/// predict a matrix of the same row count.
///
/// # Examples
///
/// ```
/// use nmfrec::prelude::*;
///
/// let x = Matrix::from_vec(4, 3, vec![
///     1.0, 0.5, 0.0,
///     0.9, 0.4, 0.1,
///     0.0, 0.2, 1.0,
///     0.1, 0.3, 0.9,
/// ]).unwrap();
///
/// let mut model = NmfRecommender::new(NmfParams::default().with_n_components(2).with_random_state(0));
/// model.fit(&x).unwrap();
/// let reconstruction = model.predict(&x).unwrap();
/// assert_eq!(reconstruction.shape(), x.shape());
/// ```
pub trait Estimator {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (invalid input, bad hyperparameters).
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Predicts (reconstructs) values for input data.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or the input has the
    /// wrong number of columns.
    fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Returns true once `fit` has succeeded.
    fn is_fitted(&self) -> bool;
}

/// Explicit hyperparameter access, used by grid search to configure clones of
/// a prototype estimator.
pub trait Hyperparameters {
    /// The parameter set type.
    type Params: Clone + Debug;

    /// Returns a copy of the current parameters.
    fn params(&self) -> Self::Params;

    /// Replaces the parameters. Any fitted state is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid.
    fn set_params(&mut self, params: Self::Params) -> Result<()>;
}

/// Trait for data transformers (scalers, imputers, decompositions).
///
/// ```text
/// let mut scaler = MinMaxScaler::new();
/// let x_scaled = scaler.fit_transform(&x)?;
/// let x_test_scaled = scaler.transform(&x_test)?;
/// ```
pub trait Transformer {
    /// Fits the transformer to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Transforms data using fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if transformer is not fitted.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.fit(x)?;
        self.transform(x)
    }
}
