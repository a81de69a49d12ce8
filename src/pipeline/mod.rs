//! End-to-end training run: preprocess, search (or resume), retrain,
//! persist, evaluate.
//!
//! ```no_run
//! use nmfrec::pipeline::{run, RunConfig};
//!
//! let report = run(&RunConfig::default()).expect("run should succeed");
//! println!("best: {} (validation RMSE {})", report.best_params, report.validation_rmse);
//! ```

mod checkpoint;
mod data;

pub use checkpoint::load_or_compute;
pub use data::synthetic_split;

use crate::error::Result;
use crate::format::{self, ArtifactKind};
use crate::metrics::{matrix_rmse, Scorer};
use crate::model_selection::{GridSearchCV, GridSearchResult, KFold};
use crate::preprocessing::Preprocessor;
use crate::primitives::Matrix;
use crate::recommend::{NmfParamGrid, NmfParams, NmfRecommender};
use crate::traits::Estimator;
use serde::Serialize;
use std::path::PathBuf;

/// A completed search over [`NmfRecommender`] candidates, as checkpointed.
pub type NmfSearchResult = GridSearchResult<NmfRecommender, NmfParams>;

/// Default checkpoint file name.
pub const DEFAULT_CHECKPOINT: &str = "nmf_grid_search_checkpoint.pkl";

/// Default trained-model file name.
pub const DEFAULT_MODEL: &str = "nmf_best_model.pkl";

/// Configuration for a training run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Search checkpoint location
    pub checkpoint_path: PathBuf,
    /// Trained model location
    pub model_path: PathBuf,
    /// Seed for the synthetic data
    pub data_seed: u64,
    /// Number of CV folds
    pub n_folds: usize,
    /// Synthetic training rows
    pub train_rows: usize,
    /// Synthetic validation rows
    pub val_rows: usize,
    /// Synthetic feature count
    pub n_features: usize,
    /// Candidate hyperparameters (including the shared NMF seed)
    pub grid: NmfParamGrid,
    /// Evaluate candidates in parallel
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT),
            model_path: PathBuf::from(DEFAULT_MODEL),
            data_seed: 0,
            n_folds: 3,
            train_rows: 100,
            val_rows: 20,
            n_features: 50,
            grid: NmfParamGrid::default(),
            parallel: false,
        }
    }
}

impl RunConfig {
    /// Sets the checkpoint path.
    #[must_use]
    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = path.into();
        self
    }

    /// Sets the trained model path.
    #[must_use]
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    /// Sets the synthetic data seed.
    #[must_use]
    pub fn with_data_seed(mut self, seed: u64) -> Self {
        self.data_seed = seed;
        self
    }

    /// Sets the NMF seed shared by every candidate.
    #[must_use]
    pub fn with_random_state(mut self, random_state: Option<u64>) -> Self {
        self.grid.random_state = random_state;
        self
    }

    /// Sets the number of CV folds.
    #[must_use]
    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    /// Sets the synthetic data shape.
    #[must_use]
    pub fn with_shape(mut self, train_rows: usize, val_rows: usize, n_features: usize) -> Self {
        self.train_rows = train_rows;
        self.val_rows = val_rows;
        self.n_features = n_features;
        self
    }

    /// Replaces the candidate grid.
    #[must_use]
    pub fn with_grid(mut self, grid: NmfParamGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Enables parallel candidate evaluation.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Selected hyperparameters
    pub best_params: NmfParams,
    /// Mean cross-validated RMSE of the selection
    pub best_cv_rmse: f32,
    /// RMSE of the retrained model on the validation set
    pub validation_rmse: f32,
    /// True if the search result was loaded instead of recomputed
    pub checkpoint_reused: bool,
    /// Candidates in the search
    pub n_candidates: usize,
    /// Candidates that failed to fit
    pub n_failed: usize,
    /// Search checkpoint location
    pub checkpoint_path: PathBuf,
    /// Trained model location
    pub model_path: PathBuf,
}

/// Runs the pipeline on seeded synthetic data shaped by `config`.
///
/// # Errors
///
/// Propagates any preprocessing, search, artifact or evaluation error.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    let (train, val) = synthetic_split(
        config.train_rows,
        config.val_rows,
        config.n_features,
        config.data_seed,
    );
    tracing::info!(
        train_shape = ?train.shape(),
        val_shape = ?val.shape(),
        seed = config.data_seed,
        "generated synthetic data"
    );
    run_with_data(config, &train, &val)
}

/// Runs the pipeline on caller-provided raw matrices (`NaN` = missing).
///
/// The raw matrices double as reconstruction targets.
///
/// # Errors
///
/// Propagates any preprocessing, search, artifact or evaluation error.
pub fn run_with_data(config: &RunConfig, train: &Matrix<f32>, val: &Matrix<f32>) -> Result<RunReport> {
    let y_train = train.clone();
    let y_val = val.clone();

    let mut preprocessor = Preprocessor::new();
    let (x_train, x_val) = preprocessor.fit_transform_pair(train, val)?;

    let scorer = Scorer::neg_rmse();
    let search = GridSearchCV::new(NmfRecommender::default(), config.grid.candidates())
        .with_cv(KFold::new(config.n_folds))
        .with_scorer(scorer.clone())
        .with_parallel(config.parallel);

    let (result, checkpoint_reused): (NmfSearchResult, bool) = load_or_compute(
        &config.checkpoint_path,
        ArtifactKind::SearchCheckpoint,
        || search.fit(&x_train, &y_train),
    )?;

    let best_params = result.best_params.clone();
    tracing::info!(best_params = %best_params, "Best model parameters");

    let mut best_model = NmfRecommender::new(best_params.clone());
    best_model.fit(&x_train)?;
    format::save(&best_model, ArtifactKind::TrainedModel, &config.model_path)?;
    tracing::info!(path = %config.model_path.display(), "Trained model saved");

    let y_pred_val = best_model.predict(&x_val)?;
    let validation_rmse = matrix_rmse(&y_val, &y_pred_val)?;
    tracing::info!(validation_rmse, "Validation RMSE");

    Ok(RunReport {
        best_params,
        best_cv_rmse: scorer.to_metric(result.best_score),
        validation_rmse,
        checkpoint_reused,
        n_candidates: result.n_candidates(),
        n_failed: result.n_failed(),
        checkpoint_path: config.checkpoint_path.clone(),
        model_path: config.model_path.clone(),
    })
}
