//! Factor initialisation for NMF.
//!
//! `random` draws scaled half-normal factors; the NNDSVD family seeds the
//! factors from the leading singular triplets of the data (Boutsidis &
//! Gallopoulos, 2008), keeping the dominant non-negative part of each one.

use crate::error::{NmfRecError, Result};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values below this are zeroed after NNDSVD.
const NNDSVD_EPS: f32 = 1e-6;

/// Initialisation strategy for the factor matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Init {
    /// Scaled `|N(0, 1)|` draws: `sqrt(mean(X) / k) * |z|`.
    Random,
    /// Non-negative double SVD; zeros stay zero (good for sparse factors).
    Nndsvd,
    /// NNDSVD with zeros filled by the data mean.
    Nndsvda,
    /// NNDSVD with zeros filled by small random values.
    Nndsvdar,
}

impl Init {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Init::Random => "random",
            Init::Nndsvd => "nndsvd",
            Init::Nndsvda => "nndsvda",
            Init::Nndsvdar => "nndsvdar",
        }
    }

    /// Parses a strategy name (case-insensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "random" => Some(Init::Random),
            "nndsvd" => Some(Init::Nndsvd),
            "nndsvda" => Some(Init::Nndsvda),
            "nndsvdar" => Some(Init::Nndsvdar),
            _ => None,
        }
    }

    /// Returns true for the SVD-based strategies.
    #[must_use]
    pub fn is_svd_based(&self) -> bool {
        !matches!(self, Init::Random)
    }
}

impl fmt::Display for Init {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seeded generator, or an entropy-seeded one when no seed is given.
pub(crate) fn make_rng(random_state: Option<u64>) -> StdRng {
    match random_state {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Computes initial `(W, H)` for `x` (n_samples x n_features).
///
/// # Errors
///
/// Returns an error when an SVD-based strategy is asked for more components
/// than `min(n_samples, n_features)`.
pub(crate) fn initialize(
    x: &Matrix<f32>,
    n_components: usize,
    init: Init,
    random_state: Option<u64>,
) -> Result<(Matrix<f32>, Matrix<f32>)> {
    let (n_samples, n_features) = x.shape();

    if init.is_svd_based() && n_components > n_samples.min(n_features) {
        return Err(NmfRecError::invalid_param(
            "init",
            init,
            &format!(
                "n_components <= min(n_samples, n_features) = {} (got n_components = {n_components})",
                n_samples.min(n_features)
            ),
        ));
    }

    match init {
        Init::Random => Ok(random_init(x, n_components, random_state)),
        Init::Nndsvd | Init::Nndsvda | Init::Nndsvdar => {
            let (mut w, mut h) = nndsvd(x, n_components);
            let avg = x.mean();
            match init {
                Init::Nndsvda => {
                    fill_zeros(&mut w, |_| avg);
                    fill_zeros(&mut h, |_| avg);
                }
                Init::Nndsvdar => {
                    let mut rng = make_rng(random_state);
                    fill_zeros(&mut w, |_| {
                        (avg * rng.sample::<f32, _>(StandardNormal) / 100.0).abs()
                    });
                    fill_zeros(&mut h, |_| {
                        (avg * rng.sample::<f32, _>(StandardNormal) / 100.0).abs()
                    });
                }
                _ => {}
            }
            Ok((w, h))
        }
    }
}

fn random_init(
    x: &Matrix<f32>,
    n_components: usize,
    random_state: Option<u64>,
) -> (Matrix<f32>, Matrix<f32>) {
    let (n_samples, n_features) = x.shape();
    let avg = (x.mean() / n_components as f32).sqrt();
    let mut rng = make_rng(random_state);

    // Draw order: H, then W
    let h = Matrix::from_fn(n_components, n_features, |_, _| {
        (avg * rng.sample::<f32, _>(StandardNormal)).abs()
    });
    let w = Matrix::from_fn(n_samples, n_components, |_, _| {
        (avg * rng.sample::<f32, _>(StandardNormal)).abs()
    });
    (w, h)
}

fn fill_zeros(m: &mut Matrix<f32>, mut value: impl FnMut(usize) -> f32) {
    for (idx, v) in m.as_mut_slice().iter_mut().enumerate() {
        if *v == 0.0 {
            *v = value(idx);
        }
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Plain NNDSVD. Caller guarantees `n_components <= min(shape)`.
fn nndsvd(x: &Matrix<f32>, n_components: usize) -> (Matrix<f32>, Matrix<f32>) {
    use nalgebra::DMatrix;

    let (n_samples, n_features) = x.shape();
    let data: Vec<f64> = x.as_slice().iter().map(|&v| f64::from(v)).collect();
    let svd = DMatrix::from_row_slice(n_samples, n_features, &data).svd(true, true);

    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        // nalgebra always returns the requested factors
        return (
            Matrix::zeros(n_samples, n_components),
            Matrix::zeros(n_components, n_features),
        );
    };
    let singular = svd.singular_values;

    // Sort by singular value (descending)
    let mut order: Vec<usize> = (0..singular.len()).collect();
    order.sort_by(|&a, &b| {
        singular[b]
            .partial_cmp(&singular[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut w = Matrix::zeros(n_samples, n_components);
    let mut h = Matrix::zeros(n_components, n_features);

    for (j, &idx) in order.iter().take(n_components).enumerate() {
        let s = singular[idx];
        let left: Vec<f64> = (0..n_samples).map(|i| u[(i, idx)]).collect();
        let right: Vec<f64> = (0..n_features).map(|f| v_t[(idx, f)]).collect();

        if j == 0 {
            // Leading singular vectors of a non-negative matrix share one sign
            let scale = s.sqrt();
            for (i, l) in left.iter().enumerate() {
                w.set(i, 0, (scale * l.abs()) as f32);
            }
            for (f, r) in right.iter().enumerate() {
                h.set(0, f, (scale * r.abs()) as f32);
            }
            continue;
        }

        let x_p: Vec<f64> = left.iter().map(|&v| v.max(0.0)).collect();
        let y_p: Vec<f64> = right.iter().map(|&v| v.max(0.0)).collect();
        let x_n: Vec<f64> = left.iter().map(|&v| (-v).max(0.0)).collect();
        let y_n: Vec<f64> = right.iter().map(|&v| (-v).max(0.0)).collect();

        let (x_p_nrm, y_p_nrm) = (norm(&x_p), norm(&y_p));
        let (x_n_nrm, y_n_nrm) = (norm(&x_n), norm(&y_n));
        let m_p = x_p_nrm * y_p_nrm;
        let m_n = x_n_nrm * y_n_nrm;

        let (u_part, v_part, u_nrm, v_nrm, sigma) = if m_p > m_n {
            (x_p, y_p, x_p_nrm, y_p_nrm, m_p)
        } else {
            (x_n, y_n, x_n_nrm, y_n_nrm, m_n)
        };

        if u_nrm == 0.0 || v_nrm == 0.0 {
            continue;
        }

        let lbd = (s * sigma).sqrt();
        for (i, val) in u_part.iter().enumerate() {
            w.set(i, j, (lbd * val / u_nrm) as f32);
        }
        for (f, val) in v_part.iter().enumerate() {
            h.set(j, f, (lbd * val / v_nrm) as f32);
        }
    }

    for v in w.as_mut_slice().iter_mut().chain(h.as_mut_slice().iter_mut()) {
        if *v < NNDSVD_EPS {
            *v = 0.0;
        }
    }

    (w, h)
}
