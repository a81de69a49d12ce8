use super::*;
use crate::decomposition::Init;
use crate::recommend::{NmfParamGrid, NmfRecommender};

/// Predicts every row as `scale * column_means`; negative scale fails to fit.
#[derive(Debug, Clone, Default)]
struct ScaledMean {
    scale: f32,
    means: Option<Vec<f32>>,
}

impl Estimator for ScaledMean {
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        if self.scale < 0.0 {
            return Err(NmfRecError::invalid_param("scale", self.scale, ">= 0"));
        }
        let means = (0..x.n_cols())
            .map(|j| self.scale * mean(&x.column(j)))
            .collect();
        self.means = Some(means);
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let means = self
            .means
            .as_ref()
            .ok_or_else(|| NmfRecError::not_fitted("ScaledMean"))?;
        Ok(Matrix::from_fn(x.n_rows(), means.len(), |_, j| means[j]))
    }

    fn is_fitted(&self) -> bool {
        self.means.is_some()
    }
}

impl Hyperparameters for ScaledMean {
    type Params = f32;

    fn params(&self) -> f32 {
        self.scale
    }

    fn set_params(&mut self, params: f32) -> Result<()> {
        self.scale = params;
        self.means = None;
        Ok(())
    }
}

fn constant_rows() -> Matrix<f32> {
    Matrix::from_fn(6, 2, |_, j| (j + 1) as f32)
}

#[test]
fn test_selects_lowest_rmse() {
    let search = GridSearchCV::new(ScaledMean::default(), vec![0.5, 1.0, 2.0]);
    let result = search.fit(&constant_rows(), &constant_rows()).expect("search");

    assert_eq!(result.best_index, 1);
    assert!((result.best_params - 1.0).abs() < f32::EPSILON);
    assert!(result.best_score.abs() < 1e-6);
    assert_eq!(result.best_candidate().rank, 1);
    assert_eq!(result.n_splits, 3);
    assert_eq!(result.scorer, "neg_root_mean_squared_error");

    for c in &result.candidates {
        assert_eq!(c.fold_scores.len(), 3);
        assert!(!c.fit_failed);
        assert!(c.error.is_none());
    }

    let refit = result.best_estimator.as_ref().expect("refit enabled");
    assert!(refit.is_fitted());
    assert_eq!(refit.params(), 1.0);
}

#[test]
fn test_ties_go_to_first_candidate() {
    let search = GridSearchCV::new(ScaledMean::default(), vec![0.0, 1.0, 1.0]);
    let result = search.fit(&constant_rows(), &constant_rows()).expect("search");

    assert_eq!(result.best_index, 1);
    assert_eq!(result.candidates[1].rank, 1);
    assert_eq!(result.candidates[2].rank, 1);
    assert_eq!(result.candidates[0].rank, 3);
}

#[test]
fn test_failed_candidates_rank_last() {
    let search = GridSearchCV::new(ScaledMean::default(), vec![-1.0, 0.5, 1.0, -2.0]);
    let result = search.fit(&constant_rows(), &constant_rows()).expect("search");

    assert_eq!(result.best_index, 2);
    assert_eq!(result.n_failed(), 2);

    let failed = &result.candidates[0];
    assert!(failed.fit_failed);
    assert!(failed.mean_score.is_nan());
    assert!(failed.fold_scores.iter().all(|s| s.is_nan()));
    assert!(failed.error.as_deref().is_some_and(|e| e.contains("scale")));
    assert_eq!(failed.rank, 3);
    assert_eq!(result.candidates[3].rank, 3);

    let ranked: Vec<f32> = result.ranked().iter().map(|c| c.params).collect();
    assert_eq!(ranked, vec![1.0, 0.5, -1.0, -2.0]);
}

#[test]
fn test_all_candidates_failing_is_an_error() {
    let search = GridSearchCV::new(ScaledMean::default(), vec![-1.0, -2.0]);
    let err = search.fit(&constant_rows(), &constant_rows()).unwrap_err();
    match err {
        NmfRecError::SearchFailed {
            candidates,
            last_error,
        } => {
            assert_eq!(candidates, 2);
            assert!(last_error.contains("scale"));
        }
        other => panic!("expected SearchFailed, got {other}"),
    }
}

#[test]
fn test_input_validation() {
    let x = constant_rows();
    let empty = GridSearchCV::new(ScaledMean::default(), vec![]);
    assert!(matches!(
        empty.fit(&x, &x),
        Err(NmfRecError::InvalidHyperparameter { .. })
    ));

    let search = GridSearchCV::new(ScaledMean::default(), vec![1.0]);
    assert!(matches!(
        search.fit(&x, &Matrix::zeros(5, 2)),
        Err(NmfRecError::DimensionMismatch { .. })
    ));

    let too_many_folds = GridSearchCV::new(ScaledMean::default(), vec![1.0]).with_cv(KFold::new(7));
    assert!(too_many_folds.fit(&x, &x).is_err());
}

#[test]
fn test_without_refit() {
    let search = GridSearchCV::new(ScaledMean::default(), vec![1.0]).with_refit(false);
    let result = search.fit(&constant_rows(), &constant_rows()).expect("search");
    assert!(result.best_estimator.is_none());
}

#[test]
fn test_parallel_matches_sequential() {
    let x = Matrix::from_fn(12, 6, |i, j| ((i * 5 + j * 3) % 11) as f32 / 10.0);
    let grid = NmfParamGrid::new()
        .with_n_components(vec![1, 2, 3])
        .with_alpha_w(vec![0.0, 0.1])
        .with_alpha_h(vec![0.1])
        .with_init(vec![Init::Random, Init::Nndsvd])
        .with_random_state(Some(3));

    let sequential = GridSearchCV::new(NmfRecommender::default(), grid.candidates())
        .fit(&x, &x)
        .expect("sequential search");
    let parallel = GridSearchCV::new(NmfRecommender::default(), grid.candidates())
        .with_parallel(true)
        .fit(&x, &x)
        .expect("parallel search");

    assert_eq!(sequential.best_index, parallel.best_index);
    assert_eq!(sequential.best_params, parallel.best_params);
    for (a, b) in sequential.candidates.iter().zip(&parallel.candidates) {
        assert_eq!(a.params, b.params);
        assert_eq!(a.fold_scores, b.fold_scores);
        assert_eq!(a.rank, b.rank);
    }
}

#[test]
fn test_nndsvd_too_many_components_fails_only_that_candidate() {
    // Folds train on 4 rows, so nndsvd with 5 components is rejected
    let x = Matrix::from_fn(6, 8, |i, j| ((i + j) % 4) as f32 / 3.0);
    let grid = NmfParamGrid::new()
        .with_n_components(vec![2, 5])
        .with_alpha_w(vec![0.1])
        .with_alpha_h(vec![0.1])
        .with_init(vec![Init::Random, Init::Nndsvd])
        .with_random_state(Some(0));

    let result = GridSearchCV::new(NmfRecommender::default(), grid.candidates())
        .fit(&x, &x)
        .expect("search");

    let failed: Vec<_> = result.candidates.iter().filter(|c| c.fit_failed).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].params.n_components, 5);
    assert_eq!(failed[0].params.init, Init::Nndsvd);
    assert!(!result.best_candidate().fit_failed);
}
