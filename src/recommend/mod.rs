//! Recommendation models.
//!
//! This module wraps matrix factorization behind the estimator interface so
//! it can be cross-validated and tuned like any other model.
//!
//! # Algorithms
//!
//! - **NMF**: user/item matrix reconstruction from non-negative latent
//!   factors ([`NmfRecommender`])
//!
//! # Quick Start
//!
//! ```
//! use nmfrec::prelude::*;
//!
//! // 4 users x 3 items
//! let ratings = Matrix::from_vec(4, 3, vec![
//!     1.0, 0.9, 0.0,
//!     0.8, 1.0, 0.1,
//!     0.0, 0.1, 1.0,
//!     0.1, 0.0, 0.9,
//! ]).expect("valid matrix dimensions");
//!
//! let mut recommender = NmfRecommender::new(
//!     NmfParams::default()
//!         .with_n_components(2)
//!         .with_init(Init::Nndsvd)
//!         .with_random_state(0),
//! );
//! recommender.fit(&ratings).expect("fit");
//!
//! let scores = recommender.predict(&ratings).expect("fitted");
//! assert_eq!(scores.shape(), (4, 3));
//! ```

mod nmf_recommender;

pub use nmf_recommender::{NmfParamGrid, NmfParams, NmfRecommender};
