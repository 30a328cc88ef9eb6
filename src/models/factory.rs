use crate::config::{ModelConfig, ModelType};
use crate::error::{Result, RunnerError};
use crate::models::estimator::{Estimator, ModelSet};
use crate::models::gbdt::{GbdtModel, GbdtParams};
use crate::models::one_vs_rest::OneVsRest;

/// Build a boxed estimator from a `ModelConfig`, validating its parameters.
pub fn build_model(params: ModelConfig) -> Result<Box<dyn Estimator>> {
    let model: Box<dyn Estimator> = match params.model_type {
        ModelType::GBDT {
            max_depth,
            num_boost_round,
            debug,
            training_optimization_level,
            loss_type,
        } => Box::new(GbdtModel::new(GbdtParams {
            learning_rate: params.learning_rate,
            max_depth,
            num_boost_round,
            debug,
            training_optimization_level,
            loss_type,
        })),

        #[cfg(feature = "svm")]
        ModelType::SVM {
            eps,
            c,
            kernel,
            gaussian_kernel_eps,
            polynomial_kernel_constant,
            polynomial_kernel_degree,
        } => Box::new(crate::models::svm::SvmModel::new(crate::models::svm::SvmConfig {
            eps,
            c,
            kernel,
            gaussian_kernel_eps,
            polynomial_kernel_constant,
            polynomial_kernel_degree,
        })),
    };

    let model: Box<dyn Estimator> = if params.one_vs_rest {
        Box::new(OneVsRest::new(model))
    } else {
        model
    };

    model
        .check_params()
        .map_err(|e| RunnerError::InvalidModelType {
            model: model.name().to_string(),
            reason: e.to_string(),
        })?;
    Ok(model)
}

/// Build a `ModelSet` (no fit options) from a `ModelConfig`.
pub fn build_model_set(params: ModelConfig) -> Result<ModelSet> {
    Ok(ModelSet::new(build_model(params)?))
}

/// Resolve a model by name ("gbdt", "gbdt-regression", "svm") with default
/// hyper-parameters.
pub fn build_model_by_name(name: &str, learning_rate: f32) -> Result<Box<dyn Estimator>> {
    let model_type: ModelType = name.parse().map_err(|reason| RunnerError::InvalidModelType {
        model: name.to_string(),
        reason,
    })?;
    build_model(ModelConfig::new(learning_rate, model_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::estimator::ModelKind;

    #[test]
    fn builds_gbdt_from_default_config() {
        let model = build_model(ModelConfig::default()).unwrap();
        assert_eq!(model.name(), "GBDT");
        assert_eq!(model.kind(), ModelKind::EarlyStoppingBoosted);
    }

    #[test]
    fn wraps_in_one_vs_rest() {
        let mut config = ModelConfig::default();
        config.one_vs_rest = true;
        let model = build_model(config).unwrap();
        assert_eq!(model.name(), "OneVsRest(GBDT)");
        assert_eq!(model.kind(), ModelKind::ProbabilisticClassifier);
    }

    #[test]
    fn invalid_parameters_are_invalid_model_type() {
        let config = ModelConfig::new(
            0.1,
            ModelType::GBDT {
                max_depth: 0,
                num_boost_round: 10,
                debug: false,
                training_optimization_level: 2,
                loss_type: "LogLikelyhood".to_string(),
            },
        );
        assert!(matches!(
            build_model(config),
            Err(RunnerError::InvalidModelType { .. })
        ));
    }

    #[test]
    fn unknown_name_is_invalid_model_type() {
        let err = build_model_by_name("catboost", 0.1).unwrap_err();
        assert!(matches!(err, RunnerError::InvalidModelType { .. }));
    }
}
