use ndarray::{ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::config::{FoldFailurePolicy, RunnerConfig};
use crate::cv::SplitPlan;
use crate::error::{Result, RunnerError};
use crate::fitter::fit_model;
use crate::models::{Estimator, FitParams, TrainedModel};

/// Run `job` once per fold and return the outputs in fold order.
///
/// In parallel mode every fold runs on the rayon pool and failures are
/// picked in fold order afterwards, so the outcome matches the sequential
/// run. Sequential fail-fast stops at the first failing fold.
pub(crate) fn run_per_fold<T, F>(
    n_folds: usize,
    parallel: bool,
    policy: FoldFailurePolicy,
    job: F,
) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    let results: Vec<Result<T>> = if parallel {
        (0..n_folds).into_par_iter().map(&job).collect()
    } else if policy == FoldFailurePolicy::FailFast {
        let mut outputs = Vec::with_capacity(n_folds);
        for fold in 0..n_folds {
            outputs.push(job(fold)?);
        }
        return Ok(outputs);
    } else {
        (0..n_folds).map(&job).collect()
    };

    let mut outputs = Vec::with_capacity(n_folds);
    let mut failures = Vec::new();
    for (fold, result) in results.into_iter().enumerate() {
        match result {
            Ok(output) => outputs.push(output),
            Err(err) => match policy {
                FoldFailurePolicy::FailFast => return Err(err),
                FoldFailurePolicy::CollectAll => {
                    log::debug!("fold {} failed: {}", fold, err);
                    failures.push((fold, err));
                }
            },
        }
    }

    if failures.is_empty() {
        Ok(outputs)
    } else {
        Err(RunnerError::FoldsFailed(failures))
    }
}

/// Fit one copy of `template` per fold of `plan`, fold 0 first.
///
/// Each fold trains on `x[train_idx]` and hands `x[val_idx]` to the fitter
/// as its validation split.
pub fn train_folds(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    template: &dyn Estimator,
    plan: &SplitPlan,
    params: Option<&FitParams>,
    config: &RunnerConfig,
) -> Result<Vec<TrainedModel>> {
    if x.nrows() != y.len() {
        return Err(RunnerError::ShapeMismatch(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    plan.check_bounds(x.nrows())?;

    log::debug!(
        "training {} on {} folds ({} rows, parallel: {})",
        template.name(),
        plan.len(),
        x.nrows(),
        config.parallel_folds
    );

    run_per_fold(plan.len(), config.parallel_folds, config.fold_failure, |i| {
        let fold = &plan.folds()[i];
        let x_train = x.select(Axis(0), &fold.train_idx);
        let y_train = y.select(Axis(0), &fold.train_idx);
        let x_val = x.select(Axis(0), &fold.val_idx);
        let y_val = y.select(Axis(0), &fold.val_idx);

        log::trace!(
            "fold {}: {} train rows, {} validation rows",
            i,
            fold.train_idx.len(),
            fold.val_idx.len()
        );

        fit_model(
            template,
            (x_train.view(), y_train.view()),
            Some((x_val.view(), y_val.view())),
            params,
            Some(i),
        )
    })
}
