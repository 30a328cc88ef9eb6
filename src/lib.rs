//! racoon: cross-validation runner and experiment tracking for tabular
//! machine learning.
//!
//! The crate fits estimators fold by fold over a split plan, assembles
//! out-of-fold predictions, averages test-set predictions across folds and
//! scores everything with a metric. Experiment directories are versioned on
//! disk by [`experiment::ExpManager`].
//!
//! Built-in models wrap `gbdt` (always) and `linfa-svm` (feature `svm`);
//! anything implementing [`models::Estimator`] can be plugged in.
pub mod config;
pub mod cv;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod experiment;
pub mod fitter;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod prediction;
pub mod predictor;
pub mod progress;
pub mod runner;
pub mod target;
pub mod trainer;

pub use error::{Result, RunnerError};
pub use evaluator::{EvalResult, Evaluator};
pub use models::{Estimator, ModelKind, ModelSet};
pub use prediction::Prediction;
pub use runner::{Runner, RunnerSet, StackedRunner};
