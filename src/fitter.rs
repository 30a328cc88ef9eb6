use ndarray::{ArrayView1, ArrayView2};

use crate::error::{Result, RunnerError};
use crate::models::{Estimator, EvalSet, FitParams, TrainedModel};

/// Features and labels of one side of a fold.
pub type DataSplit<'a> = (ArrayView2<'a, f64>, ArrayView1<'a, f64>);

/// Fit a fresh copy of `template` on `train`.
///
/// The template itself is never modified. Only
/// [`ModelKind::EarlyStoppingBoosted`](crate::models::ModelKind) models see
/// `validation`, as their evaluation set; every other kind ignores it.
pub fn fit_model(
    template: &dyn Estimator,
    train: DataSplit<'_>,
    validation: Option<DataSplit<'_>>,
    params: Option<&FitParams>,
    fold: Option<usize>,
) -> Result<TrainedModel> {
    template
        .check_params()
        .map_err(|e| RunnerError::InvalidModelType {
            model: template.name().to_string(),
            reason: e.to_string(),
        })?;

    let (x, y) = train;
    if x.nrows() != y.len() {
        return Err(RunnerError::ShapeMismatch(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }

    let empty = FitParams::new();
    let params = params.unwrap_or(&empty);

    let eval_set = if template.kind().uses_eval_set() {
        validation.map(|(x, y)| EvalSet { x, y })
    } else {
        None
    };

    let mut model = template.clone_unfitted();
    model
        .fit(x, y, eval_set, params)
        .map_err(|e| RunnerError::FitFailure {
            fold,
            model: template.name().to_string(),
            source: e.into(),
        })?;
    Ok(model)
}
