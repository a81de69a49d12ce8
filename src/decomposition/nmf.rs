//! Non-negative Matrix Factorization.
//!
//! Factorizes `X ≈ W·H` with `W, H ≥ 0` by minimising
//!
//! ```text
//! 0.5 * ||X - WH||²_F
//!   + l1_w * ||W||_1 + 0.5 * l2_w * ||W||²_F
//!   + l1_h * ||H||_1 + 0.5 * l2_h * ||H||²_F
//! ```
//!
//! with cyclic coordinate descent (Cichocki & Phan, 2009). The per-factor
//! penalties are scaled by the opposite dimension:
//! `l*_w ∝ n_features * alpha_w`, `l*_h ∝ n_samples * alpha_h`, split between
//! L1 and L2 by `l1_ratio`.

use super::init::{initialize, Init};
use crate::error::{NmfRecError, Result};
use crate::primitives::{dot, Matrix};
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Per-factor regularization strengths after scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Regularization {
    pub l1_w: f32,
    pub l1_h: f32,
    pub l2_w: f32,
    pub l2_h: f32,
}

/// Non-negative Matrix Factorization with a coordinate-descent solver.
///
/// # Example
///
/// ```
/// use nmfrec::decomposition::{Init, Nmf};
/// use nmfrec::primitives::Matrix;
/// use nmfrec::traits::Transformer;
///
/// let x = Matrix::from_vec(4, 3, vec![
///     1.0, 0.0, 2.0,
///     2.0, 0.0, 4.0,
///     0.0, 3.0, 0.0,
///     0.0, 6.0, 0.0,
/// ]).expect("valid matrix dimensions");
///
/// let mut nmf = Nmf::new(2).with_init(Init::Nndsvd).with_random_state(0);
/// let w = nmf.fit_transform(&x).expect("fit_transform should succeed");
/// assert_eq!(w.shape(), (4, 2));
/// assert_eq!(nmf.components().expect("fitted").shape(), (2, 3));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nmf {
    /// Number of latent components.
    n_components: usize,
    /// Factor initialisation strategy.
    init: Init,
    /// Regularization weight on W.
    alpha_w: f32,
    /// Regularization weight on H.
    alpha_h: f32,
    /// Share of the penalty applied as L1 (0.0 = pure L2).
    l1_ratio: f32,
    /// Maximum number of outer iterations.
    max_iter: usize,
    /// Relative stopping tolerance on the projected-gradient violation.
    tol: f32,
    /// Seed for random initialisation.
    random_state: Option<u64>,
    /// Fitted H (n_components x n_features).
    components: Option<Matrix<f32>>,
    /// Iterations used by the last fit.
    n_iter: usize,
    /// Frobenius norm of the training residual after fit.
    reconstruction_err: f32,
}

impl Default for Nmf {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Nmf {
    /// Default iteration cap.
    pub const DEFAULT_MAX_ITER: usize = 200;
    /// Default stopping tolerance.
    pub const DEFAULT_TOL: f32 = 1e-4;

    /// Creates an unfitted NMF with `n_components` components.
    #[must_use]
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            init: Init::Random,
            alpha_w: 0.0,
            alpha_h: 0.0,
            l1_ratio: 0.0,
            max_iter: Self::DEFAULT_MAX_ITER,
            tol: Self::DEFAULT_TOL,
            random_state: None,
            components: None,
            n_iter: 0,
            reconstruction_err: 0.0,
        }
    }

    /// Sets the initialisation strategy.
    #[must_use]
    pub fn with_init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }

    /// Sets the regularization weight on W.
    #[must_use]
    pub fn with_alpha_w(mut self, alpha_w: f32) -> Self {
        self.alpha_w = alpha_w;
        self
    }

    /// Sets the regularization weight on H.
    #[must_use]
    pub fn with_alpha_h(mut self, alpha_h: f32) -> Self {
        self.alpha_h = alpha_h;
        self
    }

    /// Sets the L1 share of the penalty.
    #[must_use]
    pub fn with_l1_ratio(mut self, l1_ratio: f32) -> Self {
        self.l1_ratio = l1_ratio;
        self
    }

    /// Sets the iteration cap.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the stopping tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Number of components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Fitted components H, if any.
    #[must_use]
    pub fn components(&self) -> Option<&Matrix<f32>> {
        self.components.as_ref()
    }

    /// Iterations used by the last fit.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Frobenius norm of `X - WH` on the training data.
    #[must_use]
    pub fn reconstruction_err(&self) -> f32 {
        self.reconstruction_err
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.components.is_some()
    }

    /// Maps factor weights back to data space: `W · H`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or `w` has the wrong
    /// number of columns.
    pub fn inverse_transform(&self, w: &Matrix<f32>) -> Result<Matrix<f32>> {
        let h = self.fitted_components()?;
        if w.n_cols() != h.n_rows() {
            return Err(NmfRecError::feature_mismatch(h.n_rows(), w.n_cols()));
        }
        Ok(w.matmul(h)?)
    }

    /// Fits the model and returns the training factor W.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid input or hyperparameters.
    pub fn fit_factors(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.validate_params()?;
        validate_input(x)?;

        let (mut w, h) = initialize(x, self.n_components, self.init, self.random_state)?;
        let mut ht = h.transpose();
        let reg = self.regularization(x.n_rows(), x.n_cols());

        let n_iter = solve_coordinate_descent(x, &mut w, &mut ht, true, reg, self.max_iter, self.tol)?;
        if n_iter == self.max_iter && self.tol > 0.0 {
            tracing::warn!(
                max_iter = self.max_iter,
                n_components = self.n_components,
                "NMF reached the iteration cap before converging"
            );
        }

        let h = ht.transpose();
        let residual = x.sub(&w.matmul(&h)?)?;
        self.reconstruction_err = residual.frobenius_norm();
        self.n_iter = n_iter;
        self.components = Some(h);

        tracing::debug!(
            n_components = self.n_components,
            init = %self.init,
            n_iter,
            reconstruction_err = self.reconstruction_err,
            "NMF fitted"
        );

        Ok(w)
    }

    fn fitted_components(&self) -> Result<&Matrix<f32>> {
        self.components
            .as_ref()
            .ok_or_else(|| NmfRecError::not_fitted("NMF"))
    }

    pub(crate) fn regularization(&self, n_samples: usize, n_features: usize) -> Regularization {
        let (n_samples, n_features) = (n_samples as f32, n_features as f32);
        Regularization {
            l1_w: n_features * self.alpha_w * self.l1_ratio,
            l1_h: n_samples * self.alpha_h * self.l1_ratio,
            l2_w: n_features * self.alpha_w * (1.0 - self.l1_ratio),
            l2_h: n_samples * self.alpha_h * (1.0 - self.l1_ratio),
        }
    }

    fn validate_params(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(NmfRecError::invalid_param(
                "n_components",
                self.n_components,
                ">= 1",
            ));
        }
        if self.alpha_w.is_nan() || self.alpha_w < 0.0 {
            return Err(NmfRecError::invalid_param("alpha_w", self.alpha_w, ">= 0"));
        }
        if self.alpha_h.is_nan() || self.alpha_h < 0.0 {
            return Err(NmfRecError::invalid_param("alpha_h", self.alpha_h, ">= 0"));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(NmfRecError::invalid_param(
                "l1_ratio",
                self.l1_ratio,
                "in [0, 1]",
            ));
        }
        if self.max_iter == 0 {
            return Err(NmfRecError::invalid_param("max_iter", self.max_iter, ">= 1"));
        }
        if self.tol.is_nan() || self.tol < 0.0 {
            return Err(NmfRecError::invalid_param("tol", self.tol, ">= 0"));
        }
        Ok(())
    }
}

impl Transformer for Nmf {
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        self.fit_factors(x).map(|_| ())
    }

    /// Solves for W with H fixed, starting from zeros.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let h = self.fitted_components()?;
        if x.n_cols() != h.n_cols() {
            return Err(NmfRecError::feature_mismatch(h.n_cols(), x.n_cols()));
        }
        validate_input(x)?;

        let mut w = Matrix::zeros(x.n_rows(), self.n_components);
        let mut ht = h.transpose();
        let reg = self.regularization(x.n_rows(), x.n_cols());

        let n_iter = solve_coordinate_descent(x, &mut w, &mut ht, false, reg, self.max_iter, self.tol)?;
        if n_iter == self.max_iter && self.tol > 0.0 {
            tracing::debug!(max_iter = self.max_iter, "NMF transform hit the iteration cap");
        }

        Ok(w)
    }

    fn fit_transform(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.fit_factors(x)
    }
}

/// Rejects empty, NaN-containing or negative input.
pub(crate) fn validate_input(x: &Matrix<f32>) -> Result<()> {
    if x.n_rows() == 0 || x.n_cols() == 0 {
        return Err(NmfRecError::ValidationError {
            message: format!(
                "NMF needs a non-empty matrix, got {}x{}",
                x.n_rows(),
                x.n_cols()
            ),
        });
    }
    if x.has_nan() {
        return Err(NmfRecError::ValidationError {
            message: "Input contains NaN; impute missing values before NMF".to_string(),
        });
    }
    if !x.is_non_negative() {
        return Err(NmfRecError::ValidationError {
            message: "Negative values in data passed to NMF".to_string(),
        });
    }
    Ok(())
}

/// Runs alternating coordinate descent and returns the iteration count.
///
/// # Errors
///
/// Returns an error if the factor shapes do not line up with `x`.
///
/// `w` is `n x k`, `ht` is `m x k` (H transposed). When `update_h` is false
/// only `w` moves.
fn solve_coordinate_descent(
    x: &Matrix<f32>,
    w: &mut Matrix<f32>,
    ht: &mut Matrix<f32>,
    update_h: bool,
    reg: Regularization,
    max_iter: usize,
    tol: f32,
) -> Result<usize> {
    let xt = update_h.then(|| x.transpose());
    let mut violation_init = 0.0;

    for n_iter in 1..=max_iter {
        let mut violation = update_factor(x, w, ht, reg.l1_w, reg.l2_w)?;
        if let Some(xt) = &xt {
            violation += update_factor(xt, ht, w, reg.l1_h, reg.l2_h)?;
        }

        if n_iter == 1 {
            violation_init = violation;
        }
        if violation_init == 0.0 || violation / violation_init <= f64::from(tol) {
            return Ok(n_iter);
        }
    }

    Ok(max_iter)
}

/// One sweep of coordinate updates on `w` (n x k) against fixed `ht` (m x k).
///
/// Returns the summed projected-gradient violation.
fn update_factor(
    x: &Matrix<f32>,
    w: &mut Matrix<f32>,
    ht: &Matrix<f32>,
    l1: f32,
    l2: f32,
) -> Result<f64> {
    let k = w.n_cols();
    let n = w.n_rows();

    // HHt = Ht^T Ht (k x k), XHt = X Ht (n x k)
    let h = ht.transpose();
    let mut hht = h.matmul_transpose(&h)?;
    let mut xht = x.matmul(ht)?;

    if l2 != 0.0 {
        for t in 0..k {
            hht.set(t, t, hht.get(t, t) + l2);
        }
    }
    if l1 != 0.0 {
        for v in xht.as_mut_slice() {
            *v -= l1;
        }
    }

    let mut violation = 0.0_f64;
    for t in 0..k {
        let hess = hht.get(t, t);
        let hht_row = hht.row(t).to_vec();
        for i in 0..n {
            let grad = dot(&hht_row, w.row(i)) - xht.get(i, t);
            let current = w.get(i, t);
            let projected = if current == 0.0 { grad.min(0.0) } else { grad };
            violation += f64::from(projected.abs());

            if hess != 0.0 {
                w.set(i, t, (current - grad / hess).max(0.0));
            }
        }
    }

    Ok(violation)
}

#[cfg(test)]
#[path = "nmf_tests.rs"]
mod tests;
