pub mod estimator;
pub mod factory;
pub mod gbdt;
pub mod one_vs_rest;
#[cfg(feature = "svm")]
pub mod svm;

pub use estimator::{Estimator, EvalSet, FitParams, ModelKind, ModelSet, TrainedModel};
