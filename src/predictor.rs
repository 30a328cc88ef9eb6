use ndarray::ArrayView2;

use crate::error::{Result, RunnerError};
use crate::models::Estimator;
use crate::prediction::Prediction;
use crate::progress::ProgressSink;
use crate::target::TargetType;

/// Predict `x` with a fitted model.
///
/// Classification targets use `predict_proba`, falling back to
/// `decision_function` (with a warning on `sink`) for scoring classifiers.
/// A two-column binary output is reduced to its positive column. Continuous
/// targets use `predict`. `fold` only labels errors.
pub fn predict(
    x: ArrayView2<'_, f64>,
    model: &dyn Estimator,
    target_type: TargetType,
    sink: &dyn ProgressSink,
    fold: Option<usize>,
) -> Result<Prediction> {
    let predict_failure = |e: anyhow::Error| RunnerError::PredictFailure {
        fold,
        model: model.name().to_string(),
        source: e.into(),
    };

    match target_type {
        TargetType::Binary | TargetType::Multiclass => {
            let kind = model.kind();
            let raw = if kind.has_probabilities() {
                model.predict_proba(x).map_err(predict_failure)?
            } else if kind.has_decision_scores() {
                sink.warning(&format!(
                    "Since {} does not have predict_proba, decision_function is used for the prediction instead.",
                    model.name()
                ));
                model.decision_function(x).map_err(predict_failure)?
            } else {
                return Err(RunnerError::UnsupportedModelCapability {
                    model: model.name().to_string(),
                    target: target_type,
                });
            };
            Ok(collapse_binary(raw))
        }
        TargetType::Continuous => Ok(Prediction::Vector(
            model.predict(x).map_err(predict_failure)?,
        )),
        TargetType::Auto => Err(RunnerError::Config(
            "target type must be resolved before prediction".to_string(),
        )),
    }
}

/// `[n, 2]` binary output becomes the `[n]` positive-class column; anything
/// else is returned unchanged.
pub fn collapse_binary(raw: Prediction) -> Prediction {
    match raw {
        Prediction::Matrix(m) if m.ncols() == 2 => Prediction::Vector(m.column(1).to_owned()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvalSet, FitParams, ModelKind};
    use crate::progress::CapturingSink;
    use ndarray::{array, Array1, ArrayView1};

    struct Fixed {
        kind: ModelKind,
        output: Prediction,
    }

    impl Estimator for Fixed {
        fn name(&self) -> &str {
            "Fixed"
        }
        fn kind(&self) -> ModelKind {
            self.kind
        }
        fn clone_unfitted(&self) -> Box<dyn Estimator> {
            Box::new(Fixed {
                kind: self.kind,
                output: self.output.clone(),
            })
        }
        fn fit(
            &mut self,
            _x: ArrayView2<'_, f64>,
            _y: ArrayView1<'_, f64>,
            _eval_set: Option<EvalSet<'_>>,
            _params: &FitParams,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        fn predict(&self, x: ArrayView2<'_, f64>) -> anyhow::Result<Array1<f64>> {
            Ok(Array1::from_elem(x.nrows(), 7.0))
        }
        fn predict_proba(&self, _x: ArrayView2<'_, f64>) -> anyhow::Result<Prediction> {
            match self.kind {
                ModelKind::ProbabilisticClassifier => Ok(self.output.clone()),
                _ => anyhow::bail!("no probabilities"),
            }
        }
        fn decision_function(&self, _x: ArrayView2<'_, f64>) -> anyhow::Result<Prediction> {
            Ok(self.output.clone())
        }
    }

    #[test]
    fn binary_matrix_collapses_to_positive_column() {
        let model = Fixed {
            kind: ModelKind::ProbabilisticClassifier,
            output: Prediction::Matrix(array![[0.9, 0.1], [0.3, 0.7]]),
        };
        let x = array![[0.0], [1.0]];
        let p = predict(x.view(), &model, TargetType::Binary, &CapturingSink::new(), None).unwrap();
        assert_eq!(p, Prediction::Vector(array![0.1, 0.7]));
    }

    #[test]
    fn multiclass_matrix_is_kept() {
        let proba = array![[0.2, 0.3, 0.5]];
        let model = Fixed {
            kind: ModelKind::ProbabilisticClassifier,
            output: Prediction::Matrix(proba.clone()),
        };
        let x = array![[0.0]];
        let p = predict(x.view(), &model, TargetType::Multiclass, &CapturingSink::new(), None).unwrap();
        assert_eq!(p, Prediction::Matrix(proba));
    }

    #[test]
    fn scoring_classifier_falls_back_with_warning() {
        let model = Fixed {
            kind: ModelKind::ScoringClassifier,
            output: Prediction::Vector(array![-1.5, 2.0]),
        };
        let sink = CapturingSink::new();
        let x = array![[0.0], [1.0]];
        let p = predict(x.view(), &model, TargetType::Binary, &sink, None).unwrap();
        assert_eq!(p, Prediction::Vector(array![-1.5, 2.0]));
        assert_eq!(sink.warnings().len(), 1);
        assert!(sink.warnings()[0].contains("decision_function"));
    }

    #[test]
    fn regressor_under_classification_is_unsupported() {
        let model = Fixed {
            kind: ModelKind::Regressor,
            output: Prediction::Vector(array![0.0]),
        };
        let x = array![[0.0]];
        let err = predict(x.view(), &model, TargetType::Binary, &CapturingSink::new(), Some(3)).unwrap_err();
        assert!(matches!(err, RunnerError::UnsupportedModelCapability { .. }));
    }

    #[test]
    fn continuous_uses_predict() {
        let model = Fixed {
            kind: ModelKind::Regressor,
            output: Prediction::Vector(array![0.0]),
        };
        let x = array![[0.0], [1.0], [2.0]];
        let p = predict(x.view(), &model, TargetType::Continuous, &CapturingSink::new(), None).unwrap();
        assert_eq!(p, Prediction::Vector(array![7.0, 7.0, 7.0]));
    }

    #[test]
    fn estimator_errors_carry_the_fold() {
        let model = Fixed {
            kind: ModelKind::EarlyStoppingBoosted,
            output: Prediction::Vector(array![0.0]),
        };
        let x = array![[0.0]];
        let err = predict(x.view(), &model, TargetType::Binary, &CapturingSink::new(), Some(2)).unwrap_err();
        assert!(matches!(err, RunnerError::PredictFailure { .. }));
        assert_eq!(err.fold(), Some(2));
    }
}
