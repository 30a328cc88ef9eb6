//! Progress and score notifications.
//!
//! The runner never prints. It hands fold scores, the overall score and
//! degraded-prediction warnings to a [`ProgressSink`]; the default sink
//! forwards them to the `log` facade, tests use [`CapturingSink`].
use std::sync::Mutex;

/// Receiver for runner notifications. Implementations must not panic.
pub trait ProgressSink: Send + Sync {
    fn fold_score(&self, fold: usize, score: f64);

    fn overall_score(&self, score: f64);

    fn warning(&self, message: &str);

    /// A runner set starts training (stacked runs).
    fn model_started(&self, _model_name: &str) {}
}

/// Forwards notifications to `log` using the classic text format.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn fold_score(&self, fold: usize, score: f64) {
        log::info!("[Fold {} Score]: {:.4}", fold, score);
    }

    fn overall_score(&self, score: f64) {
        log::info!("[Overall Score]: {:.4}", score);
    }

    fn warning(&self, message: &str) {
        log::warn!("{}", message);
    }

    fn model_started(&self, model_name: &str) {
        log::info!("Train: {}", model_name);
    }
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn fold_score(&self, _fold: usize, _score: f64) {}
    fn overall_score(&self, _score: f64) {}
    fn warning(&self, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    FoldScore { fold: usize, score: f64 },
    OverallScore(f64),
    Warning(String),
    ModelStarted(String),
}

/// Records notifications in arrival order.
#[derive(Debug, Default)]
pub struct CapturingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn fold_scores(&self) -> Vec<(usize, f64)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::FoldScore { fold, score } => Some((fold, score)),
                _ => None,
            })
            .collect()
    }

    pub fn overall_scores(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::OverallScore(score) => Some(score),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Warning(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ProgressEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl ProgressSink for CapturingSink {
    fn fold_score(&self, fold: usize, score: f64) {
        self.push(ProgressEvent::FoldScore { fold, score });
    }

    fn overall_score(&self, score: f64) {
        self.push(ProgressEvent::OverallScore(score));
    }

    fn warning(&self, message: &str) {
        self.push(ProgressEvent::Warning(message.to_string()));
    }

    fn model_started(&self, model_name: &str) {
        self.push(ProgressEvent::ModelStarted(model_name.to_string()));
    }
}
