//! Convenience re-exports for common usage.
//!
//! ```
//! use nmfrec::prelude::*;
//! ```

pub use crate::decomposition::{Init, Nmf};
pub use crate::error::{NmfRecError, Result};
pub use crate::metrics::{matrix_rmse, rmse, Scorer};
pub use crate::model_selection::{GridSearchCV, KFold};
pub use crate::preprocessing::{MinMaxScaler, Preprocessor, SimpleImputer};
pub use crate::primitives::Matrix;
pub use crate::recommend::{NmfParamGrid, NmfParams, NmfRecommender};
pub use crate::traits::{Estimator, Hyperparameters, Transformer};
