//! nmfrec: non-negative matrix factorization recommender with
//! cross-validated hyperparameter search.
//!
//! The crate carries a small estimator stack: a dense matrix primitive, an
//! NMF solver, preprocessing transformers, metrics, k-fold grid search, a
//! checksummed artifact format, and a resumable training pipeline.
//!
//! # Quick Start
//!
//! ```
//! use nmfrec::prelude::*;
//!
//! // 6 users x 4 items, two taste groups
//! let x = Matrix::from_vec(6, 4, vec![
//!     1.0, 0.9, 0.0, 0.1,
//!     0.9, 1.0, 0.1, 0.0,
//!     0.8, 0.9, 0.0, 0.0,
//!     0.0, 0.1, 1.0, 0.9,
//!     0.1, 0.0, 0.9, 1.0,
//!     0.0, 0.0, 0.8, 0.9,
//! ]).unwrap();
//!
//! let grid = NmfParamGrid::new()
//!     .with_n_components(vec![1, 2])
//!     .with_alpha_w(vec![0.0])
//!     .with_alpha_h(vec![0.0])
//!     .with_init(vec![Init::Nndsvda])
//!     .with_random_state(Some(0));
//!
//! let result = GridSearchCV::new(NmfRecommender::default(), grid.candidates())
//!     .fit(&x, &x)
//!     .unwrap();
//!
//! let model = result.best_estimator.unwrap();
//! assert_eq!(model.predict(&x).unwrap().shape(), (6, 4));
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Dense row-major `Matrix`
//! - [`decomposition`]: NMF solver and initialisation strategies
//! - [`recommend`]: NMF recommender behind the estimator interface
//! - [`preprocessing`]: Mean imputation, min-max scaling, clamping
//! - [`metrics`]: RMSE/MSE and signed scorers
//! - [`model_selection`]: K-fold splitting and grid search
//! - [`format`]: Checksummed binary artifacts
//! - [`pipeline`]: Resumable search, retrain and evaluation run

pub mod decomposition;
pub mod error;
pub mod format;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod recommend;
pub mod traits;

pub use error::{NmfRecError, Result};
pub use primitives::Matrix;
pub use traits::{Estimator, Hyperparameters, Transformer};
