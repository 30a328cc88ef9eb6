use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Central configuration for built-in models.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelConfig {
    pub learning_rate: f32,

    /// Wrap the model in a one-vs-rest classifier (multiclass targets).
    #[serde(default)]
    pub one_vs_rest: bool,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub enum ModelType {
    #[cfg(feature = "svm")]
    SVM {
        eps: f64,
        c: (f64, f64),
        kernel: String,
        gaussian_kernel_eps: f64,
        polynomial_kernel_constant: f64,
        polynomial_kernel_degree: f64,
    },
    GBDT {
        max_depth: u32,
        num_boost_round: u32,
        debug: bool,
        training_optimization_level: u8,
        loss_type: String,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::GBDT {
            max_depth: 6,
            num_boost_round: 3,
            debug: false,
            training_optimization_level: 2,
            loss_type: "LogLikelyhood".to_string(),
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gbdt" => Ok(ModelType::default()),
            "gbdt-regression" => Ok(ModelType::GBDT {
                max_depth: 6,
                num_boost_round: 3,
                debug: false,
                training_optimization_level: 2,
                loss_type: "SquaredError".to_string(),
            }),
            #[cfg(feature = "svm")]
            "svm" => Ok(ModelType::SVM {
                eps: 0.1,
                c: (1.0, 1.0),
                kernel: "linear".to_string(),
                gaussian_kernel_eps: 0.1,
                polynomial_kernel_constant: 1.0,
                polynomial_kernel_degree: 3.0,
            }),
            _ => Err(format!(
                "Unknown model type: {}. To use svm, please compile with `--features svm`",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(learning_rate: f32, model_type: ModelType) -> Self {
        Self {
            learning_rate,
            one_vs_rest: false,
            model_type,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            one_vs_rest: false,
            model_type: ModelType::GBDT {
                max_depth: 6,
                num_boost_round: 50,
                debug: false,
                training_optimization_level: 2,
                loss_type: "LogLikelyhood".to_string(),
            },
        }
    }
}

/// What to do when a fold fails to fit.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FoldFailurePolicy {
    /// Abort on the first failing fold.
    #[default]
    FailFast,
    /// Run every fold, then report all failures together.
    CollectAll,
}

/// Runner behaviour.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RunnerConfig {
    /// Fit and predict folds on the rayon thread pool.
    pub parallel_folds: bool,
    pub fold_failure: FoldFailurePolicy,
    /// Name of a built-in metric (see [`crate::metrics::Metric::from_name`]).
    pub metric: Option<String>,
}

/// Split plan generation.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct CvConfig {
    pub n_splits: usize,
    pub shuffle: bool,
    pub stratified: bool,
    pub seed: Option<u64>,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            shuffle: true,
            stratified: false,
            seed: Some(42),
        }
    }
}

/// Everything a cross-validation run needs, as stored in a JSON file.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct HarnessConfig {
    pub runner: RunnerConfig,
    pub cv: CvConfig,
    pub model: ModelConfig,
}

/// Load a harness configuration from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HarnessConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: HarnessConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}
