use std::fmt;

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::prediction::Prediction;

/// Fit-time options forwarded to [`Estimator::fit`].
pub type FitParams = serde_json::Map<String, serde_json::Value>;

/// A model returned by the fold trainer, owned by the caller.
pub type TrainedModel = Box<dyn Estimator>;

/// Held-out split handed to boosting models for early stopping or monitoring.
#[derive(Debug, Clone, Copy)]
pub struct EvalSet<'a> {
    pub x: ArrayView2<'a, f64>,
    pub y: ArrayView1<'a, f64>,
}

/// Model family. Declared by the wrapper type and used for every dispatch
/// decision instead of probing for methods at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Classifier with calibrated `predict_proba`.
    ProbabilisticClassifier,
    /// Classifier that only exposes `decision_function` scores.
    ScoringClassifier,
    Regressor,
    /// Boosting model that consumes the validation split while fitting.
    /// Classification variants are expected to provide `predict_proba`.
    EarlyStoppingBoosted,
}

impl ModelKind {
    pub fn has_probabilities(&self) -> bool {
        matches!(
            self,
            ModelKind::ProbabilisticClassifier | ModelKind::EarlyStoppingBoosted
        )
    }

    pub fn has_decision_scores(&self) -> bool {
        matches!(self, ModelKind::ScoringClassifier)
    }

    pub fn uses_eval_set(&self) -> bool {
        matches!(self, ModelKind::EarlyStoppingBoosted)
    }
}

/// The contract every model wrapper fulfils.
///
/// `y` always holds numeric labels: class values (0, 1, 2, ...) for
/// classification and real values for regression.
pub trait Estimator: Send + Sync {
    /// Human readable name, used as the default display label.
    fn name(&self) -> &str;

    fn kind(&self) -> ModelKind;

    /// Validate hyper-parameters before any fitting happens.
    fn check_params(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fresh, unfitted instance with the same hyper-parameters. The fold
    /// trainer fits one of these per fold, the template is never touched.
    fn clone_unfitted(&self) -> Box<dyn Estimator>;

    /// Fit on `(x, y)`. `eval_set` is only passed to
    /// [`ModelKind::EarlyStoppingBoosted`] models.
    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        eval_set: Option<EvalSet<'_>>,
        params: &FitParams,
    ) -> anyhow::Result<()>;

    /// Direct prediction: regression values or class labels.
    fn predict(&self, x: ArrayView2<'_, f64>) -> anyhow::Result<Array1<f64>>;

    /// Class probabilities, `[n]` (positive class) or `[n, n_classes]`.
    fn predict_proba(&self, _x: ArrayView2<'_, f64>) -> anyhow::Result<Prediction> {
        anyhow::bail!("{} does not provide predict_proba", self.name())
    }

    /// Uncalibrated decision scores, `[n]` or `[n, n_classes]`.
    fn decision_function(&self, _x: ArrayView2<'_, f64>) -> anyhow::Result<Prediction> {
        anyhow::bail!("{} does not provide decision_function", self.name())
    }
}

impl fmt::Debug for dyn Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Estimator")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// A template estimator plus its fit options and display name.
#[derive(Debug)]
pub struct ModelSet {
    pub model: Box<dyn Estimator>,
    pub fit_params: Option<FitParams>,
    pub model_name: String,
}

impl ModelSet {
    pub fn new(model: Box<dyn Estimator>) -> Self {
        let model_name = model.name().to_string();
        ModelSet {
            model,
            fit_params: None,
            model_name,
        }
    }

    pub fn with_fit_params(mut self, fit_params: FitParams) -> Self {
        self.fit_params = Some(fit_params);
        self
    }

    pub fn with_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }
}

/// Read an unsigned integer option, if present.
pub(crate) fn param_u64(params: &FitParams, key: &str) -> anyhow::Result<Option<u64>> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("fit option `{}` must be a non-negative integer, got {}", key, value)),
    }
}
