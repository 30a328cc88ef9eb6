//! Cross-validation runners.
//!
//! A [`Runner`] binds one [`TableDataset`] and runs the fold trainer and the
//! out-of-fold evaluator over it. A [`StackedRunner`] drives several
//! independent `(model, runner)` pairs and turns their out-of-fold outputs
//! into second-level features.
use std::sync::Arc;

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::config::RunnerConfig;
use crate::dataset::TableDataset;
use crate::error::{Result, RunnerError};
use crate::evaluator::{EvalResult, Evaluator};
use crate::metrics::Metric;
use crate::models::{ModelSet, TrainedModel};
use crate::prediction::Prediction;
use crate::progress::{LogSink, ProgressSink};
use crate::trainer::train_folds;

pub struct Runner {
    dataset: Arc<TableDataset>,
    metric: Option<Metric>,
    sink: Arc<dyn ProgressSink>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(dataset: Arc<TableDataset>) -> Self {
        Runner {
            dataset,
            metric: None,
            sink: Arc::new(LogSink),
            config: RunnerConfig::default(),
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Apply a runner configuration. A metric named in the configuration
    /// replaces the current one.
    pub fn with_config(mut self, config: RunnerConfig) -> Result<Self> {
        if let Some(name) = config.metric.as_deref() {
            let metric = Metric::from_name(name)
                .ok_or_else(|| RunnerError::Config(format!("unknown metric `{}`", name)))?;
            self.metric = Some(metric);
        }
        self.config = config;
        Ok(self)
    }

    pub fn dataset(&self) -> &TableDataset {
        &self.dataset
    }

    pub fn metric(&self) -> Option<&Metric> {
        self.metric.as_ref()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Train one model per fold of the bound split plan.
    pub fn fit(&self, model_set: &ModelSet) -> Result<Vec<TrainedModel>> {
        train_folds(
            self.dataset.train_x().view(),
            self.dataset.train_y().view(),
            model_set.model.as_ref(),
            self.dataset.cv(),
            model_set.fit_params.as_ref(),
            &self.config,
        )
    }

    /// Out-of-fold evaluation of models returned by [`Runner::fit`]. The
    /// result is named after the first trained model.
    pub fn evaluate(&self, trained_models: &[TrainedModel]) -> Result<EvalResult> {
        let dataset = &self.dataset;
        let mut evaluator = Evaluator::new(
            dataset.train_x().view(),
            dataset.train_y().view(),
            dataset.cv(),
        )
        .target_type(dataset.type_of_target())
        .class_size(dataset.class_size())
        .sink(self.sink.as_ref())
        .parallel(self.config.parallel_folds)
        .fold_failure(self.config.fold_failure);

        if let Some(model) = trained_models.first() {
            evaluator = evaluator.model_name(model.name());
        }
        if let Some(test_x) = dataset.test_x() {
            evaluator = evaluator.test_features(test_x.view());
        }
        if let Some(metric) = self.metric.as_ref() {
            evaluator = evaluator.metric(metric);
        }
        evaluator.evaluate(trained_models)
    }

    pub fn fit_evaluate(&self, model_set: &ModelSet) -> Result<(EvalResult, Vec<TrainedModel>)> {
        let trained_models = self.fit(model_set)?;
        let eval_result = self.evaluate(&trained_models)?;
        Ok((eval_result, trained_models))
    }
}

/// A model template paired with the runner that trains it.
pub struct RunnerSet {
    pub model_set: ModelSet,
    pub runner: Runner,
}

impl RunnerSet {
    pub fn new(model_set: ModelSet, runner: Runner) -> Self {
        RunnerSet { model_set, runner }
    }
}

/// Runs several independent runner sets, optionally in parallel. Results
/// always come back in input order.
pub struct StackedRunner {
    sink: Arc<dyn ProgressSink>,
    parallel: bool,
}

impl Default for StackedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl StackedRunner {
    pub fn new() -> Self {
        StackedRunner {
            sink: Arc::new(LogSink),
            parallel: false,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn map_sets<T, F>(&self, runner_sets: &[RunnerSet], job: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize, &RunnerSet) -> Result<T> + Sync + Send,
    {
        let results: Vec<Result<T>> = if self.parallel {
            runner_sets
                .par_iter()
                .enumerate()
                .map(|(i, set)| job(i, set))
                .collect()
        } else {
            runner_sets
                .iter()
                .enumerate()
                .map(|(i, set)| job(i, set))
                .collect()
        };
        results.into_iter().collect()
    }

    /// Fit every runner set on its own dataset.
    pub fn train(&self, runner_sets: &[RunnerSet]) -> Result<Vec<Vec<TrainedModel>>> {
        self.map_sets(runner_sets, |_, set| {
            self.sink.model_started(&set.model_set.model_name);
            set.runner.fit(&set.model_set)
        })
    }

    /// Evaluate `trained_models[i]` with the runner of `runner_sets[i]`.
    pub fn evaluate(
        &self,
        runner_sets: &[RunnerSet],
        trained_models: &[Vec<TrainedModel>],
    ) -> Result<Vec<EvalResult>> {
        if runner_sets.len() != trained_models.len() {
            return Err(RunnerError::ShapeMismatch(format!(
                "{} runner sets but {} groups of trained models",
                runner_sets.len(),
                trained_models.len()
            )));
        }
        self.map_sets(runner_sets, |i, set| set.runner.evaluate(&trained_models[i]))
    }

    pub fn fit_evaluate(
        &self,
        runner_sets: &[RunnerSet],
    ) -> Result<Vec<(EvalResult, Vec<TrainedModel>)>> {
        self.map_sets(runner_sets, |_, set| {
            self.sink.model_started(&set.model_set.model_name);
            set.runner.fit_evaluate(&set.model_set)
        })
    }
}

/// Second-level features from first-level results: the out-of-fold columns
/// of every result side by side, and the matching test columns when every
/// result carries test predictions.
pub fn stack_features(results: &[EvalResult]) -> Result<(Array2<f64>, Option<Array2<f64>>)> {
    if results.is_empty() {
        return Err(RunnerError::ShapeMismatch(
            "no results to stack".to_string(),
        ));
    }

    let oof: Vec<Array2<f64>> = results.iter().map(|r| r.oof.to_columns()).collect();
    let train = hstack(&oof, "oof")?;

    let test: Option<Vec<Array2<f64>>> = results
        .iter()
        .map(|r| r.test_probas.as_ref().map(Prediction::to_columns))
        .collect();
    let test = match test {
        Some(columns) => Some(hstack(&columns, "test")?),
        None => None,
    };

    Ok((train, test))
}

fn hstack(blocks: &[Array2<f64>], what: &str) -> Result<Array2<f64>> {
    let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(1), &views).map_err(|e| {
        RunnerError::ShapeMismatch(format!("cannot stack {} predictions: {}", what, e))
    })
}
