//! Out-of-fold evaluation.
//!
//! The [`Evaluator`] pairs every trained model with the validation rows of
//! its fold, writes their predictions into a full-length out-of-fold array,
//! averages test-set predictions across folds and scores the folds and the
//! assembled array with an optional [`Metric`].
use std::fmt;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::FoldFailurePolicy;
use crate::cv::SplitPlan;
use crate::error::{Result, RunnerError};
use crate::metrics::Metric;
use crate::models::TrainedModel;
use crate::prediction::Prediction;
use crate::predictor::predict;
use crate::progress::{LogSink, ProgressSink};
use crate::target::{class_size as detect_class_size, encode_labels, TargetType};
use crate::trainer::run_per_fold;

static DEFAULT_SINK: LogSink = LogSink;

/// Everything produced by one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    /// One row per training example, `[n]` or `[n, n_classes]`.
    pub oof: Prediction,
    /// Per-fold scores, in fold order, when a metric was given.
    pub scores: Option<Array1<f64>>,
    /// Metric over the whole `oof` array (not the mean of `scores`).
    pub overall_score: Option<f64>,
    /// Fold-averaged test-set predictions, when test features were given.
    pub test_probas: Option<Prediction>,
    pub model_name: Option<String>,
    /// Target type after resolving `Auto`.
    pub target_type: TargetType,
}

impl EvalResult {
    /// Mean and population standard deviation of the fold scores.
    pub fn score_summary(&self) -> Option<(f64, f64)> {
        let scores = self.scores.as_ref()?;
        let mean = scores.mean()?;
        Some((mean, scores.std(0.0)))
    }

    pub fn summary(&self) -> EvalSummary {
        let (score_mean, score_std) = match self.score_summary() {
            Some((mean, std)) => (Some(mean), Some(std)),
            None => (None, None),
        };
        EvalSummary {
            model_name: self.model_name.clone(),
            target_type: self.target_type,
            oof_shape: self.oof.shape(),
            test_shape: self.test_probas.as_ref().map(Prediction::shape),
            scores: self.scores.as_ref().map(|s| s.to_vec()),
            score_mean,
            score_std,
            overall_score: self.overall_score,
        }
    }
}

impl fmt::Display for EvalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "model: {}",
            self.model_name.as_deref().unwrap_or("None")
        )?;
        writeln!(f, "oof: {:?}", self.oof.shape())?;
        match (self.scores.as_ref(), self.score_summary()) {
            (Some(scores), Some((mean, std))) => {
                writeln!(f, "scores: {:.4}/{:.4} {}", mean, std, scores)?
            }
            _ => writeln!(f, "scores: Not Available Metric Function")?,
        }
        match &self.test_probas {
            Some(test) => write!(f, "test_probas: {:?}", test.shape()),
            None => write!(f, "test_probas: None"),
        }
    }
}

/// Serializable digest of an [`EvalResult`], without the prediction arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    pub model_name: Option<String>,
    pub target_type: TargetType,
    pub oof_shape: Vec<usize>,
    pub test_shape: Option<Vec<usize>>,
    pub scores: Option<Vec<f64>>,
    pub score_mean: Option<f64>,
    pub score_std: Option<f64>,
    pub overall_score: Option<f64>,
}

/// Out-of-fold evaluator, configured builder style.
///
/// ```ignore
/// let result = Evaluator::new(x.view(), y.view(), &plan)
///     .target_type(TargetType::Binary)
///     .metric(&metric)
///     .evaluate(&models)?;
/// ```
pub struct Evaluator<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    plan: &'a SplitPlan,
    target_type: TargetType,
    class_size: Option<usize>,
    test_x: Option<ArrayView2<'a, f64>>,
    metric: Option<&'a Metric>,
    sink: &'a dyn ProgressSink,
    parallel: bool,
    fold_failure: FoldFailurePolicy,
    model_name: Option<String>,
}

/// Predictions of one fold: validation rows and, optionally, the test set.
struct FoldOutput {
    val: Prediction,
    test: Option<Prediction>,
}

impl<'a> Evaluator<'a> {
    pub fn new(x: ArrayView2<'a, f64>, y: ArrayView1<'a, f64>, plan: &'a SplitPlan) -> Self {
        Evaluator {
            x,
            y,
            plan,
            target_type: TargetType::Auto,
            class_size: None,
            test_x: None,
            metric: None,
            sink: &DEFAULT_SINK,
            parallel: false,
            fold_failure: FoldFailurePolicy::FailFast,
            model_name: None,
        }
    }

    pub fn target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    /// Override the number of prediction columns. Detected from the labels
    /// when unset.
    pub fn class_size(mut self, class_size: usize) -> Self {
        self.class_size = Some(class_size);
        self
    }

    pub fn test_features(mut self, test_x: ArrayView2<'a, f64>) -> Self {
        self.test_x = Some(test_x);
        self
    }

    /// Score folds and the assembled out-of-fold array with `metric`.
    ///
    /// Classification labels reach the metric as prediction column indices,
    /// see [`encode_labels`].
    pub fn metric(mut self, metric: &'a Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn sink(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn fold_failure(mut self, policy: FoldFailurePolicy) -> Self {
        self.fold_failure = policy;
        self
    }

    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    /// Evaluate `models[i]` on fold `i` of the plan.
    pub fn evaluate(&self, models: &[TrainedModel]) -> Result<EvalResult> {
        let n_folds = self.plan.len();
        if models.len() != n_folds {
            return Err(RunnerError::FoldCountMismatch {
                models: models.len(),
                folds: n_folds,
            });
        }

        let n_rows = self.x.nrows();
        if n_rows != self.y.len() {
            return Err(RunnerError::ShapeMismatch(format!(
                "{} feature rows but {} labels",
                n_rows,
                self.y.len()
            )));
        }
        if let Some(test_x) = self.test_x {
            if test_x.ncols() != self.x.ncols() {
                return Err(RunnerError::ShapeMismatch(format!(
                    "test set has {} columns, training set has {}",
                    test_x.ncols(),
                    self.x.ncols()
                )));
            }
        }
        self.plan.check_bounds(n_rows)?;

        let target_type = self.target_type.resolve(self.y);
        let class_size = self
            .class_size
            .unwrap_or_else(|| detect_class_size(self.y, target_type));
        log::debug!(
            "evaluating {} folds: target {}, class size {}",
            n_folds,
            target_type,
            class_size
        );

        let outputs = run_per_fold(n_folds, self.parallel, self.fold_failure, |i| {
            let model = models[i].as_ref();
            let x_val = self.x.select(Axis(0), &self.plan.folds()[i].val_idx);
            let val = predict(x_val.view(), model, target_type, self.sink, Some(i))?;
            let test = match self.test_x {
                Some(test_x) => Some(predict(test_x, model, target_type, self.sink, Some(i))?),
                None => None,
            };
            Ok(FoldOutput { val, test })
        })?;

        let mut oof = Prediction::zeros(n_rows, class_size);
        let mut test_probas = self
            .test_x
            .map(|test_x| Prediction::zeros(test_x.nrows(), class_size));
        let mut scores = self.metric.map(|_| Array1::<f64>::zeros(n_folds));
        let y_scored = encode_labels(self.y, target_type);

        for (i, (fold, output)) in self.plan.iter().zip(outputs).enumerate() {
            oof.assign_rows(&fold.val_idx, &output.val)?;

            if let (Some(acc), Some(test)) = (test_probas.as_mut(), output.test.as_ref()) {
                acc.add_divided(test, n_folds as f64)?;
            }

            if let (Some(metric), Some(scores)) = (self.metric, scores.as_mut()) {
                let y_val = y_scored.select(Axis(0), &fold.val_idx);
                let score = metric
                    .score(&y_val, &oof.select(&fold.val_idx))
                    .map_err(|e| RunnerError::MetricFailure {
                        fold: Some(i),
                        metric: metric.name().to_string(),
                        source: e.into(),
                    })?;
                scores[i] = score;
                self.sink.fold_score(i, score);
            }
        }

        let overall_score = match self.metric {
            Some(metric) => {
                let score = metric
                    .score(&y_scored, &oof)
                    .map_err(|e| RunnerError::MetricFailure {
                        fold: None,
                        metric: metric.name().to_string(),
                        source: e.into(),
                    })?;
                self.sink.overall_score(score);
                Some(score)
            }
            None => None,
        };

        Ok(EvalResult {
            oof,
            scores,
            overall_score,
            test_probas,
            model_name: self.model_name.clone(),
            target_type,
        })
    }
}
