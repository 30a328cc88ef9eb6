use thiserror::Error;

use crate::target::TargetType;

/// Boxed error coming back from an estimator or metric implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Simplified `Result` using [`RunnerError`] as error type
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Failures raised while fitting, predicting or scoring folds.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The template cannot be used as an estimator (bad hyper-parameters or unknown model).
    #[error("invalid model type `{model}`: {reason}")]
    InvalidModelType { model: String, reason: String },

    /// A classification target needs probabilities or decision scores.
    #[error("estimator {model} exposes neither predict_proba nor decision_function, required for a {target} target")]
    UnsupportedModelCapability { model: String, target: TargetType },

    #[error("fitting {model} failed on fold {}", display_fold(.fold))]
    FitFailure {
        fold: Option<usize>,
        model: String,
        #[source]
        source: BoxError,
    },

    #[error("prediction with {model} failed on fold {}", display_fold(.fold))]
    PredictFailure {
        fold: Option<usize>,
        model: String,
        #[source]
        source: BoxError,
    },

    #[error("got {models} trained models for a split plan of {folds} folds")]
    FoldCountMismatch { models: usize, folds: usize },

    #[error("metric {metric} failed on fold {}", display_fold(.fold))]
    MetricFailure {
        fold: Option<usize>,
        metric: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid split plan: {0}")]
    InvalidSplitPlan(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Every failing fold, reported when the collect-all failure policy is active.
    #[error("{} fold(s) failed: {}", .0.len(), summarize_failures(.0))]
    FoldsFailed(Vec<(usize, RunnerError)>),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RunnerError {
    /// Fold index the error is attached to, if any.
    pub fn fold(&self) -> Option<usize> {
        match self {
            RunnerError::FitFailure { fold, .. }
            | RunnerError::PredictFailure { fold, .. }
            | RunnerError::MetricFailure { fold, .. } => *fold,
            _ => None,
        }
    }
}

fn display_fold(fold: &Option<usize>) -> String {
    match fold {
        Some(i) => i.to_string(),
        None => "-".to_string(),
    }
}

fn summarize_failures(failures: &[(usize, RunnerError)]) -> String {
    failures
        .iter()
        .map(|(fold, err)| format!("[fold {}] {}", fold, err))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collected_failures_keep_their_folds() {
        let err = RunnerError::FoldsFailed(vec![
            (0, RunnerError::Config("a".to_string())),
            (
                2,
                RunnerError::PredictFailure {
                    fold: Some(2),
                    model: "m".to_string(),
                    source: "boom".into(),
                },
            ),
        ]);
        assert_eq!(err.fold(), None);
        let text = err.to_string();
        assert!(text.starts_with("2 fold(s) failed"));
        assert!(text.contains("[fold 2] prediction with m failed on fold 2"));
    }
}
