//! Seeded synthetic feature matrices.

use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Train and validation matrices drawn uniformly from `[0, 1)` with one
/// generator, train first.
#[must_use]
pub fn synthetic_split(
    train_rows: usize,
    val_rows: usize,
    n_features: usize,
    seed: u64,
) -> (Matrix<f32>, Matrix<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let train = uniform(&mut rng, train_rows, n_features);
    let val = uniform(&mut rng, val_rows, n_features);
    (train, val)
}

fn uniform(rng: &mut StdRng, rows: usize, cols: usize) -> Matrix<f32> {
    Matrix::from_fn(rows, cols, |_, _| rng.gen::<f32>())
}
