//! Exhaustive cross-validated search over candidate parameter sets.

use super::{check_targets, fit_and_score, mean, std_dev, KFold};
use crate::error::{NmfRecError, Result};
use crate::metrics::Scorer;
use crate::primitives::Matrix;
use crate::traits::{Estimator, Hyperparameters};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Cross-validation outcome for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult<P> {
    /// Candidate parameters
    pub params: P,
    /// Signed score per fold; `NaN` where the fold failed
    pub fold_scores: Vec<f32>,
    /// Mean of `fold_scores` (`NaN` if any fold failed)
    pub mean_score: f32,
    /// Population standard deviation of `fold_scores`
    pub std_score: f32,
    /// 1 = best; equal scores share the lowest rank, failures rank last
    pub rank: usize,
    /// True if fitting or scoring failed on any fold
    pub fit_failed: bool,
    /// Wall-clock seconds spent on all folds
    pub fit_seconds: f64,
    /// Last fold error, if any
    pub error: Option<String>,
}

/// Completed search: every candidate's scores plus the selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult<E, P> {
    /// Per-candidate results, in enumeration order
    pub candidates: Vec<CandidateResult<P>>,
    /// Index of the selected candidate
    pub best_index: usize,
    /// Parameters of the selected candidate
    pub best_params: P,
    /// Mean CV score of the selected candidate
    pub best_score: f32,
    /// Selected configuration refitted on the full data (if refit was on)
    pub best_estimator: Option<E>,
    /// Name of the scorer that produced the scores
    pub scorer: String,
    /// Number of CV folds
    pub n_splits: usize,
}

impl<E, P> GridSearchResult<E, P> {
    /// Number of evaluated candidates.
    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// The selected candidate's full result.
    #[must_use]
    pub fn best_candidate(&self) -> &CandidateResult<P> {
        &self.candidates[self.best_index]
    }

    /// Candidates ordered by rank, enumeration order within a rank.
    #[must_use]
    pub fn ranked(&self) -> Vec<&CandidateResult<P>> {
        let mut ranked: Vec<&CandidateResult<P>> = self.candidates.iter().collect();
        ranked.sort_by_key(|c| c.rank);
        ranked
    }

    /// Number of candidates whose fit failed on at least one fold.
    #[must_use]
    pub fn n_failed(&self) -> usize {
        self.candidates.iter().filter(|c| c.fit_failed).count()
    }
}

/// Grid search with k-fold cross-validation.
///
/// Every candidate is evaluated on every fold by cloning the prototype
/// estimator, applying the candidate's parameters, fitting on the training
/// rows of `x`, and scoring predictions for the held-out rows against `y`.
/// A candidate that fails on any fold gets a `NaN` score for that fold and is
/// ranked after all successful candidates. Ties go to the candidate seen
/// first.
///
/// ```
/// use nmfrec::prelude::*;
///
/// let x = Matrix::from_fn(9, 4, |i, j| ((i + j) % 3) as f32 / 2.0);
/// let grid = NmfParamGrid::new()
///     .with_n_components(vec![1, 2])
///     .with_alpha_w(vec![0.0])
///     .with_alpha_h(vec![0.0])
///     .with_init(vec![Init::Random])
///     .with_random_state(Some(0));
///
/// let search = GridSearchCV::new(NmfRecommender::default(), grid.candidates());
/// let result = search.fit(&x, &x).expect("search should succeed");
/// assert_eq!(result.n_candidates(), 2);
/// assert!(result.best_estimator.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct GridSearchCV<E: Hyperparameters> {
    estimator: E,
    candidates: Vec<E::Params>,
    cv: KFold,
    scorer: Scorer,
    parallel: bool,
    refit: bool,
}

impl<E> GridSearchCV<E>
where
    E: Estimator + Hyperparameters + Clone + Send + Sync,
    E::Params: Send + Sync,
{
    /// Creates a search over `candidates` with 3-fold CV, negative RMSE
    /// scoring, sequential evaluation and refit enabled.
    #[must_use]
    pub fn new(estimator: E, candidates: Vec<E::Params>) -> Self {
        Self {
            estimator,
            candidates,
            cv: KFold::new(3),
            scorer: Scorer::neg_rmse(),
            parallel: false,
            refit: true,
        }
    }

    /// Sets the cross-validation splitter.
    #[must_use]
    pub fn with_cv(mut self, cv: KFold) -> Self {
        self.cv = cv;
        self
    }

    /// Sets the scoring rule.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Evaluates candidates on the rayon pool. Results keep enumeration order.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Whether to refit the best candidate on the full data.
    #[must_use]
    pub fn with_refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    /// Candidate parameter sets, in enumeration order.
    #[must_use]
    pub fn candidates(&self) -> &[E::Params] {
        &self.candidates
    }

    /// Runs the search.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no candidates, `x` and `y` disagree on
    /// row count, the fold count does not fit the data, every candidate
    /// fails, or the refit of the best candidate fails.
    pub fn fit(&self, x: &Matrix<f32>, y: &Matrix<f32>) -> Result<GridSearchResult<E, E::Params>> {
        if self.candidates.is_empty() {
            return Err(NmfRecError::invalid_param(
                "param_grid",
                "empty",
                "at least one candidate",
            ));
        }
        check_targets(x, y)?;
        self.cv.check(x.n_rows())?;

        let splits = self.cv.split(x.n_rows());
        tracing::info!(
            n_splits = splits.len(),
            n_candidates = self.candidates.len(),
            total_fits = splits.len() * self.candidates.len(),
            parallel = self.parallel,
            scorer = self.scorer.name(),
            "Starting grid search"
        );

        let evaluate = |(idx, params): (usize, &E::Params)| self.evaluate(idx, params, x, y, &splits);
        let mut candidates: Vec<CandidateResult<E::Params>> = if self.parallel {
            self.candidates.par_iter().enumerate().map(evaluate).collect()
        } else {
            self.candidates.iter().enumerate().map(evaluate).collect()
        };

        assign_ranks(&mut candidates);

        let failed = candidates.iter().filter(|c| c.fit_failed).count();
        if failed == candidates.len() {
            let last_error = candidates
                .iter()
                .rev()
                .find_map(|c| c.error.clone())
                .unwrap_or_else(|| "non-finite scores".to_string());
            return Err(NmfRecError::SearchFailed {
                candidates: candidates.len(),
                last_error,
            });
        }
        if failed > 0 {
            tracing::warn!(
                failed,
                total = candidates.len(),
                "some candidates failed to fit and were ranked last"
            );
        }

        let best_index = candidates
            .iter()
            .position(|c| c.rank == 1)
            .unwrap_or_default();
        let best = &candidates[best_index];
        let best_params = best.params.clone();
        let best_score = best.mean_score;
        tracing::info!(
            best_index,
            best_score,
            best_params = ?best_params,
            "Grid search complete"
        );

        let best_estimator = if self.refit {
            let mut model = self.estimator.clone();
            model.set_params(best_params.clone())?;
            model.fit(x)?;
            Some(model)
        } else {
            None
        };

        Ok(GridSearchResult {
            candidates,
            best_index,
            best_params,
            best_score,
            best_estimator,
            scorer: self.scorer.name().to_string(),
            n_splits: splits.len(),
        })
    }

    fn configured(&self, params: &E::Params) -> Result<E> {
        let mut model = self.estimator.clone();
        model.set_params(params.clone())?;
        Ok(model)
    }

    fn evaluate(
        &self,
        idx: usize,
        params: &E::Params,
        x: &Matrix<f32>,
        y: &Matrix<f32>,
        splits: &[(Vec<usize>, Vec<usize>)],
    ) -> CandidateResult<E::Params> {
        let start = Instant::now();
        let mut error = None;

        let fold_scores: Vec<f32> = splits
            .iter()
            .enumerate()
            .map(|(fold, (train_idx, test_idx))| {
                let outcome = self
                    .configured(params)
                    .and_then(|model| fit_and_score(model, x, y, train_idx, test_idx, &self.scorer));
                match outcome {
                    Ok(score) => score,
                    Err(err) => {
                        tracing::warn!(
                            candidate = idx,
                            fold,
                            params = ?params,
                            error = %err,
                            "fit failed; score set to NaN"
                        );
                        error = Some(err.to_string());
                        f32::NAN
                    }
                }
            })
            .collect();

        let mean_score = mean(&fold_scores);
        let std_score = std_dev(&fold_scores);
        let fit_seconds = start.elapsed().as_secs_f64();

        tracing::debug!(
            candidate = idx,
            params = ?params,
            mean_score,
            std_score,
            fit_seconds,
            "candidate evaluated"
        );

        CandidateResult {
            params: params.clone(),
            fold_scores,
            mean_score,
            std_score,
            rank: 0,
            fit_failed: error.is_some(),
            fit_seconds,
            error,
        }
    }
}

/// Ranks by mean score, highest first. Equal scores share the lowest rank;
/// candidates with a `NaN` mean share the rank after the worst finite one.
fn assign_ranks<P>(candidates: &mut [CandidateResult<P>]) {
    for c in candidates.iter_mut() {
        if c.mean_score.is_nan() {
            c.fit_failed = true;
        }
    }

    let scores: Vec<Option<f32>> = candidates
        .iter()
        .map(|c| (!c.fit_failed).then_some(c.mean_score))
        .collect();

    for (i, c) in candidates.iter_mut().enumerate() {
        c.rank = match scores[i] {
            Some(own) => 1 + scores.iter().flatten().filter(|&&other| other > own).count(),
            None => 1 + scores.iter().flatten().count(),
        };
    }
}

#[cfg(test)]
#[path = "grid_search_tests.rs"]
mod tests;
