//! NMF-based reconstruction recommender.

use crate::decomposition::{Init, Nmf};
use crate::error::{NmfRecError, Result};
use crate::primitives::Matrix;
use crate::traits::{Estimator, Hyperparameters, Transformer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hyperparameters of an [`NmfRecommender`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NmfParams {
    /// Number of latent components.
    pub n_components: usize,
    /// Regularization weight on the sample factors W.
    pub alpha_w: f32,
    /// Regularization weight on the components H.
    pub alpha_h: f32,
    /// Factor initialisation strategy.
    pub init: Init,
    /// Seed for the factorization; `None` draws from entropy.
    pub random_state: Option<u64>,
}

impl Default for NmfParams {
    fn default() -> Self {
        Self {
            n_components: 10,
            alpha_w: 0.1,
            alpha_h: 0.1,
            init: Init::Random,
            random_state: None,
        }
    }
}

impl NmfParams {
    /// Sets the number of components.
    #[must_use]
    pub fn with_n_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    /// Sets the W regularization weight.
    #[must_use]
    pub fn with_alpha_w(mut self, alpha_w: f32) -> Self {
        self.alpha_w = alpha_w;
        self
    }

    /// Sets the H regularization weight.
    #[must_use]
    pub fn with_alpha_h(mut self, alpha_h: f32) -> Self {
        self.alpha_h = alpha_h;
        self
    }

    /// Sets the initialisation strategy.
    #[must_use]
    pub fn with_init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }

    /// Sets the factorization seed.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Checks value ranges that do not depend on the data.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for a zero component count or a
    /// negative or non-finite regularization weight.
    pub fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(NmfRecError::invalid_param(
                "n_components",
                self.n_components,
                ">= 1",
            ));
        }
        for (name, value) in [("alpha_w", self.alpha_w), ("alpha_h", self.alpha_h)] {
            if !value.is_finite() || value < 0.0 {
                return Err(NmfRecError::invalid_param(name, value, "finite and >= 0"));
            }
        }
        Ok(())
    }

    fn to_nmf(&self) -> Nmf {
        let nmf = Nmf::new(self.n_components)
            .with_init(self.init)
            .with_alpha_w(self.alpha_w)
            .with_alpha_h(self.alpha_h);
        match self.random_state {
            Some(seed) => nmf.with_random_state(seed),
            None => nmf,
        }
    }
}

impl fmt::Display for NmfParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{alpha_h: {}, alpha_w: {}, init: {}, n_components: {}",
            self.alpha_h, self.alpha_w, self.init, self.n_components
        )?;
        if let Some(seed) = self.random_state {
            write!(f, ", random_state: {seed}")?;
        }
        f.write_str("}")
    }
}

/// Discrete candidate values for each hyperparameter.
///
/// The default grid is `n_components ∈ {20, 50, 100}`,
/// `alpha_w, alpha_h ∈ {0.1, 0.5, 1.0}`, `init ∈ {random, nndsvd}`: 54
/// candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NmfParamGrid {
    /// Candidate component counts.
    pub n_components: Vec<usize>,
    /// Candidate W regularization weights.
    pub alpha_w: Vec<f32>,
    /// Candidate H regularization weights.
    pub alpha_h: Vec<f32>,
    /// Candidate initialisation strategies.
    pub init: Vec<Init>,
    /// Seed shared by every candidate.
    pub random_state: Option<u64>,
}

impl Default for NmfParamGrid {
    fn default() -> Self {
        Self {
            n_components: vec![20, 50, 100],
            alpha_w: vec![0.1, 0.5, 1.0],
            alpha_h: vec![0.1, 0.5, 1.0],
            init: vec![Init::Random, Init::Nndsvd],
            random_state: None,
        }
    }
}

impl NmfParamGrid {
    /// The default grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the component counts.
    #[must_use]
    pub fn with_n_components(mut self, values: Vec<usize>) -> Self {
        self.n_components = values;
        self
    }

    /// Replaces the W regularization weights.
    #[must_use]
    pub fn with_alpha_w(mut self, values: Vec<f32>) -> Self {
        self.alpha_w = values;
        self
    }

    /// Replaces the H regularization weights.
    #[must_use]
    pub fn with_alpha_h(mut self, values: Vec<f32>) -> Self {
        self.alpha_h = values;
        self
    }

    /// Replaces the initialisation strategies.
    #[must_use]
    pub fn with_init(mut self, values: Vec<Init>) -> Self {
        self.init = values;
        self
    }

    /// Sets the seed shared by every candidate.
    #[must_use]
    pub fn with_random_state(mut self, random_state: Option<u64>) -> Self {
        self.random_state = random_state;
        self
    }

    /// Number of candidates in the Cartesian product.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_components.len() * self.alpha_w.len() * self.alpha_h.len() * self.init.len()
    }

    /// Returns true if any axis is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerates the Cartesian product.
    ///
    /// Axes are visited in name order (`alpha_h`, `alpha_w`, `init`,
    /// `n_components`) with the last varying fastest.
    ///
    /// ```
    /// use nmfrec::recommend::NmfParamGrid;
    ///
    /// let candidates = NmfParamGrid::new().candidates();
    /// assert_eq!(candidates.len(), 54);
    /// assert_eq!(candidates[0].n_components, 20);
    /// assert_eq!(candidates[1].n_components, 50);
    /// assert_eq!(candidates[3].init.as_str(), "nndsvd");
    /// ```
    #[must_use]
    pub fn candidates(&self) -> Vec<NmfParams> {
        let mut out = Vec::with_capacity(self.len());
        for &alpha_h in &self.alpha_h {
            for &alpha_w in &self.alpha_w {
                for &init in &self.init {
                    for &n_components in &self.n_components {
                        out.push(NmfParams {
                            n_components,
                            alpha_w,
                            alpha_h,
                            init,
                            random_state: self.random_state,
                        });
                    }
                }
            }
        }
        out
    }
}

/// Reconstruction recommender backed by [`Nmf`].
///
/// `fit` factorizes the training matrix into W·H. `predict` projects any rows
/// with the same columns onto the learned components and returns their
/// reconstruction `transform(X)·H`, so held-out rows are scored against
/// their own reconstruction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NmfRecommender {
    params: NmfParams,
    nmf: Option<Nmf>,
    /// Training factors W (n_samples x n_components).
    w: Option<Matrix<f32>>,
}

impl NmfRecommender {
    /// Creates an unfitted recommender.
    #[must_use]
    pub fn new(params: NmfParams) -> Self {
        Self {
            params,
            nmf: None,
            w: None,
        }
    }

    fn fitted(&self) -> Result<(&Nmf, &Matrix<f32>)> {
        match (&self.nmf, &self.w) {
            (Some(nmf), Some(w)) => Ok((nmf, w)),
            _ => Err(NmfRecError::not_fitted("NmfRecommender")),
        }
    }

    /// Projects `x` onto the fitted components (n_samples x n_components).
    ///
    /// # Errors
    ///
    /// Returns `NotFitted` before `fit`, a dimension mismatch for a wrong
    /// column count, or a validation error for negative/NaN input.
    pub fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let (nmf, _) = self.fitted()?;
        nmf.transform(x)
    }

    /// The stored training reconstruction W·H.
    ///
    /// # Errors
    ///
    /// Returns `NotFitted` before `fit`.
    pub fn reconstruction(&self) -> Result<Matrix<f32>> {
        let (nmf, w) = self.fitted()?;
        nmf.inverse_transform(w)
    }

    /// Fitted components H (n_components x n_features).
    #[must_use]
    pub fn components(&self) -> Option<&Matrix<f32>> {
        self.nmf.as_ref().and_then(Nmf::components)
    }

    /// Training factors W (n_samples x n_components).
    #[must_use]
    pub fn training_factors(&self) -> Option<&Matrix<f32>> {
        self.w.as_ref()
    }

    /// Solver iterations used by the last fit (0 if unfitted).
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.nmf.as_ref().map_or(0, Nmf::n_iter)
    }

    /// Frobenius norm of the training residual, once fitted.
    #[must_use]
    pub fn reconstruction_err(&self) -> Option<f32> {
        self.nmf.as_ref().map(Nmf::reconstruction_err)
    }
}

impl Estimator for NmfRecommender {
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        self.params.validate()?;
        let mut nmf = self.params.to_nmf();
        let w = nmf.fit_factors(x)?;
        self.nmf = Some(nmf);
        self.w = Some(w);
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let (nmf, _) = self.fitted()?;
        let w = nmf.transform(x)?;
        nmf.inverse_transform(&w)
    }

    fn is_fitted(&self) -> bool {
        self.nmf.is_some() && self.w.is_some()
    }
}

impl Hyperparameters for NmfRecommender {
    type Params = NmfParams;

    fn params(&self) -> NmfParams {
        self.params.clone()
    }

    fn set_params(&mut self, params: NmfParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.nmf = None;
        self.w = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "nmf_recommender_tests.rs"]
mod tests;
