//! Integration tests for nmfrec.
//!
//! These tests drive the public API end to end: preprocessing, grid search,
//! checkpoint resume, retraining and artifact persistence.

use nmfrec::format::{self, ArtifactKind};
use nmfrec::pipeline::{self, synthetic_split, NmfSearchResult, RunConfig};
use nmfrec::prelude::*;
use std::path::Path;

fn small_grid() -> NmfParamGrid {
    NmfParamGrid::new()
        .with_n_components(vec![2, 4])
        .with_alpha_w(vec![0.01, 0.1])
        .with_alpha_h(vec![0.1])
        .with_init(vec![Init::Random, Init::Nndsvda])
}

fn small_config(dir: &Path) -> RunConfig {
    RunConfig::default()
        .with_checkpoint_path(dir.join("nmf_grid_search_checkpoint.pkl"))
        .with_model_path(dir.join("nmf_best_model.pkl"))
        .with_shape(24, 6, 10)
        .with_grid(small_grid())
        .with_random_state(Some(0))
}

#[test]
fn test_end_to_end_small_grid() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = small_config(dir.path());

    let report = pipeline::run(&config).expect("run should succeed");

    assert!(!report.checkpoint_reused);
    assert_eq!(report.n_candidates, 8);
    assert_eq!(report.n_failed, 0);
    assert!(report.validation_rmse.is_finite());
    assert!(report.validation_rmse >= 0.0);
    assert!(config.checkpoint_path.exists());
    assert!(config.model_path.exists());

    let search: NmfSearchResult =
        format::load(&config.checkpoint_path, ArtifactKind::SearchCheckpoint).expect("checkpoint");
    assert_eq!(search.best_params, report.best_params);
    assert_eq!(search.n_splits, 3);
    assert!(search.candidates.iter().any(|c| c.rank == 1));

    let model: NmfRecommender =
        format::load(&config.model_path, ArtifactKind::TrainedModel).expect("model");
    assert_eq!(model.params(), report.best_params);
    assert_eq!(
        model.components().map(Matrix::shape),
        Some((report.best_params.n_components, 10))
    );
}

#[test]
fn test_checkpoint_resume_skips_search() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = small_config(dir.path());

    let first = pipeline::run(&config).expect("first run");
    let bytes_before = std::fs::read(&config.checkpoint_path).expect("checkpoint bytes");
    let mtime_before = std::fs::metadata(&config.checkpoint_path)
        .and_then(|m| m.modified())
        .expect("mtime");

    let second = pipeline::run(&config).expect("second run");

    assert!(second.checkpoint_reused);
    assert_eq!(second.best_params, first.best_params);
    assert_eq!(second.best_cv_rmse, first.best_cv_rmse);
    assert_eq!(
        std::fs::read(&config.checkpoint_path).expect("checkpoint bytes"),
        bytes_before
    );
    assert_eq!(
        std::fs::metadata(&config.checkpoint_path)
            .and_then(|m| m.modified())
            .expect("mtime"),
        mtime_before
    );
}

#[test]
fn test_checkpoint_survives_changed_grid() {
    // A present checkpoint wins even if the grid would now pick differently.
    let dir = tempfile::tempdir().expect("tempdir");
    let config = small_config(dir.path());
    let first = pipeline::run(&config).expect("first run");

    let other_grid = NmfParamGrid::new()
        .with_n_components(vec![3])
        .with_alpha_w(vec![0.5])
        .with_alpha_h(vec![0.5])
        .with_init(vec![Init::Random]);
    let resumed = pipeline::run(&config.clone().with_grid(other_grid)).expect("resumed run");

    assert!(resumed.checkpoint_reused);
    assert_eq!(resumed.best_params.n_components, first.best_params.n_components);
    assert_eq!(resumed.n_candidates, 8);
}

#[test]
fn test_fixed_random_state_is_deterministic() {
    let dir_a = tempfile::tempdir().expect("tempdir");
    let dir_b = tempfile::tempdir().expect("tempdir");

    let a = pipeline::run(&small_config(dir_a.path())).expect("run a");
    let b = pipeline::run(&small_config(dir_b.path())).expect("run b");

    assert_eq!(a.best_params, b.best_params);
    assert_eq!(a.best_cv_rmse, b.best_cv_rmse);
    assert_eq!(a.validation_rmse, b.validation_rmse);
}

#[test]
fn test_parallel_search_matches_sequential() {
    let dir_a = tempfile::tempdir().expect("tempdir");
    let dir_b = tempfile::tempdir().expect("tempdir");

    let sequential = pipeline::run(&small_config(dir_a.path())).expect("sequential");
    let parallel =
        pipeline::run(&small_config(dir_b.path()).with_parallel(true)).expect("parallel");

    assert_eq!(sequential.best_params, parallel.best_params);
    assert_eq!(sequential.best_cv_rmse, parallel.best_cv_rmse);
}

#[test]
fn test_corrupt_checkpoint_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = small_config(dir.path());
    pipeline::run(&config).expect("first run");

    let mut bytes = std::fs::read(&config.checkpoint_path).expect("checkpoint bytes");
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    std::fs::write(&config.checkpoint_path, &bytes).expect("write corrupted");

    let err = pipeline::run(&config).expect_err("corrupt checkpoint must fail");
    assert!(matches!(err, NmfRecError::ChecksumMismatch { .. }));
}

#[test]
fn test_missing_targets_fail_every_candidate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = small_config(dir.path());
    let (mut train, val) = synthetic_split(24, 6, 10, 3);
    for row in 0..24 {
        train.set(row, 0, if row % 2 == 0 { f32::NAN } else { 0.5 });
    }

    // Inputs are imputed, but the raw targets keep NaN so no fold scores.
    let err = pipeline::run_with_data(&config, &train, &val).expect_err("search must fail");
    assert!(matches!(err, NmfRecError::SearchFailed { candidates: 8, .. }));
    assert!(!config.checkpoint_path.exists());
}

#[test]
fn test_missing_inputs_with_clean_targets() {
    let (mut x, _) = synthetic_split(24, 1, 10, 3);
    let y = x.clone();
    x.set(0, 0, f32::NAN);
    x.set(5, 7, f32::NAN);

    let mut preprocessor = Preprocessor::new();
    let x = preprocessor.fit_transform(&x).expect("preprocess");
    assert!(!x.has_nan());

    let candidates = small_grid().with_random_state(Some(0)).candidates();
    let result = GridSearchCV::new(NmfRecommender::default(), candidates)
        .fit(&x, &y)
        .expect("search");
    assert_eq!(result.n_failed(), 0);
    assert!(result.best_estimator.is_some());
}

#[test]
fn test_preprocessing_fits_on_training_data_only() {
    let train = Matrix::from_vec(3, 2, vec![0.0, 10.0, 2.0, f32::NAN, 4.0, 30.0]).expect("train");
    let val = Matrix::from_vec(2, 2, vec![100.0, -5.0, f32::NAN, 20.0]).expect("val");

    let mut preprocessor = Preprocessor::new();
    let (x_train, x_val) = preprocessor.fit_transform_pair(&train, &val).expect("preprocess");

    assert_eq!(preprocessor.imputer().statistics(), Some(&[2.0, 20.0][..]));
    assert_eq!(preprocessor.scaler().data_min(), Some(&[0.0, 10.0][..]));
    assert_eq!(preprocessor.scaler().data_max(), Some(&[4.0, 30.0][..]));

    // Training rows land in [0, 1]; validation rows are clamped only below.
    assert!(x_train.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    assert!((x_val.get(0, 0) - 25.0).abs() < 1e-5);
    assert_eq!(x_val.get(0, 1), 0.0);
    assert!((x_val.get(1, 0) - 0.5).abs() < 1e-6);
    assert!((x_val.get(1, 1) - 0.5).abs() < 1e-6);
}

#[test]
fn test_unfitted_recommender_errors() {
    let model = NmfRecommender::default();
    let x = Matrix::filled(2, 3, 0.5);

    assert!(!model.is_fitted());
    assert!(model.predict(&x).expect_err("predict").is_not_fitted());
    assert!(model.transform(&x).expect_err("transform").is_not_fitted());
    assert!(model.reconstruction().expect_err("reconstruction").is_not_fitted());
}

#[test]
fn test_retrained_model_round_trips_through_artifact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("model.pkl");
    let (train, val) = synthetic_split(20, 5, 8, 1);

    let mut model = NmfRecommender::new(
        NmfParams::default()
            .with_n_components(3)
            .with_init(Init::Nndsvd)
            .with_random_state(0),
    );
    model.fit(&train).expect("fit");
    format::save(&model, ArtifactKind::TrainedModel, &path).expect("save");

    let loaded: NmfRecommender = format::load(&path, ArtifactKind::TrainedModel).expect("load");
    assert_eq!(
        loaded.predict(&val).expect("loaded predict"),
        model.predict(&val).expect("predict")
    );

    let wrong_kind = format::load::<NmfRecommender>(&path, ArtifactKind::SearchCheckpoint);
    assert!(wrong_kind.is_err());
}

#[test]
fn test_full_batch_job_scenario() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = RunConfig::default()
        .with_checkpoint_path(dir.path().join("nmf_grid_search_checkpoint.pkl"))
        .with_model_path(dir.path().join("nmf_best_model.pkl"))
        .with_random_state(Some(0))
        .with_parallel(true);

    let report = pipeline::run(&config).expect("run");
    assert_eq!(report.n_candidates, 54);
    // nndsvd rejects 100 components on ~66-row folds: one per alpha pair
    assert_eq!(report.n_failed, 9);
    assert!(report.best_params.n_components < 100 || report.best_params.init == Init::Random);
    assert!(report.validation_rmse.is_finite());

    let resumed = pipeline::run(&config).expect("resumed");
    assert!(resumed.checkpoint_reused);
    assert_eq!(resumed.best_params, report.best_params);
}
