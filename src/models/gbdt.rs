use anyhow::{anyhow, bail, Result};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::models::estimator::{param_u64, Estimator, EvalSet, FitParams, ModelKind};
use crate::prediction::Prediction;

const CLASSIFICATION_LOSSES: &[&str] = &["LogLikelyhood"];
const REGRESSION_LOSSES: &[&str] = &["SquaredError", "LAD"];

/// Fit-time override of a count hyper-parameter, held to the same rules as
/// [`GbdtModel::check_params`].
fn positive_u32(key: &str, value: u64) -> Result<u32> {
    if value == 0 {
        bail!("{} must be positive", key);
    }
    u32::try_from(value).map_err(|_| anyhow!("{} = {} does not fit in a u32", key, value))
}

/// Hyper-parameters of [`GbdtModel`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GbdtParams {
    pub learning_rate: f32,
    pub max_depth: u32,
    pub num_boost_round: u32,
    pub debug: bool,
    pub training_optimization_level: u8,
    pub loss_type: String,
}

impl Default for GbdtParams {
    fn default() -> Self {
        GbdtParams {
            learning_rate: 0.1,
            max_depth: 6,
            num_boost_round: 50,
            debug: false,
            training_optimization_level: 2,
            loss_type: "LogLikelyhood".to_string(),
        }
    }
}

impl GbdtParams {
    fn is_classifier(&self) -> bool {
        CLASSIFICATION_LOSSES.contains(&self.loss_type.as_str())
    }
}

/// Gradient Boosting Decision Tree (GBDT) model.
///
/// `LogLikelyhood` trains a binary classifier on 0/1 labels and predicts
/// positive-class probabilities; `SquaredError` and `LAD` train regressors.
/// The `gbdt` crate cannot truncate a fitted ensemble, so the validation
/// split is scored once after fitting and kept as [`GbdtModel::eval_loss`].
pub struct GbdtModel {
    model: Option<GBDT>,
    params: GbdtParams,
    eval_loss: Option<f64>,
}

impl GbdtModel {
    pub fn new(params: GbdtParams) -> Self {
        GbdtModel {
            model: None,
            params,
            eval_loss: None,
        }
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    /// Log loss (classification) or mean squared error (regression) on the
    /// evaluation split of the last fit.
    pub fn eval_loss(&self) -> Option<f64> {
        self.eval_loss
    }

    fn fitted(&self) -> Result<&GBDT> {
        self.model
            .as_ref()
            .ok_or_else(|| anyhow!("GBDT model is not fitted"))
    }

    fn to_data_vec(&self, x: ArrayView2<'_, f64>, y: Option<ArrayView1<'_, f64>>) -> Result<DataVec> {
        let mut data = DataVec::with_capacity(x.nrows());
        for (i, row) in x.rows().into_iter().enumerate() {
            let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            let label = match y {
                Some(y) => self.encode_label(y[i])?,
                None => 0.0,
            };
            data.push(Data::new_training_data(features, 1.0, label, None));
        }
        Ok(data)
    }

    /// `LogLikelyhood` expects -1/+1 labels.
    fn encode_label(&self, label: f64) -> Result<f32> {
        if !self.params.is_classifier() {
            return Ok(label as f32);
        }
        if label == 1.0 {
            Ok(1.0)
        } else if label == 0.0 {
            Ok(-1.0)
        } else {
            bail!("GBDT classifier expects 0/1 labels, got {}", label)
        }
    }

    fn raw_predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let model = self.fitted()?;
        let data = self.to_data_vec(x, None)?;
        let predictions = model.predict(&data);
        Ok(predictions.into_iter().map(f64::from).collect())
    }

    fn score_eval_set(&self, eval: EvalSet<'_>) -> Result<f64> {
        let predicted = self.raw_predict(eval.x)?;
        let n = predicted.len().max(1) as f64;
        let loss = if self.params.is_classifier() {
            predicted
                .iter()
                .zip(eval.y.iter())
                .map(|(&p, &y)| {
                    let p = p.clamp(1e-15, 1.0 - 1e-15);
                    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
                })
                .sum::<f64>()
                / n
        } else {
            predicted
                .iter()
                .zip(eval.y.iter())
                .map(|(&p, &y)| (p - y).powi(2))
                .sum::<f64>()
                / n
        };
        Ok(loss)
    }
}

impl Estimator for GbdtModel {
    fn name(&self) -> &str {
        "GBDT"
    }

    fn kind(&self) -> ModelKind {
        ModelKind::EarlyStoppingBoosted
    }

    fn check_params(&self) -> Result<()> {
        let p = &self.params;
        if p.max_depth == 0 {
            bail!("max_depth must be positive");
        }
        if p.num_boost_round == 0 {
            bail!("num_boost_round must be positive");
        }
        if !(p.learning_rate > 0.0) {
            bail!("learning_rate must be positive, got {}", p.learning_rate);
        }
        let loss = p.loss_type.as_str();
        if !CLASSIFICATION_LOSSES.contains(&loss) && !REGRESSION_LOSSES.contains(&loss) {
            bail!(
                "unsupported loss type: {}. Valid options are: LogLikelyhood, SquaredError, LAD",
                loss
            );
        }
        Ok(())
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(GbdtModel::new(self.params.clone()))
    }

    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        eval_set: Option<EvalSet<'_>>,
        params: &FitParams,
    ) -> Result<()> {
        if x.nrows() == 0 {
            bail!("cannot fit GBDT on an empty training set");
        }
        if x.nrows() != y.len() {
            bail!("{} feature rows but {} labels", x.nrows(), y.len());
        }

        let iterations = match param_u64(params, "num_boost_round")? {
            Some(n) => positive_u32("num_boost_round", n)?,
            None => self.params.num_boost_round,
        } as usize;
        let max_depth = match param_u64(params, "max_depth")? {
            Some(d) => positive_u32("max_depth", d)?,
            None => self.params.max_depth,
        };

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.params.learning_rate);
        config.set_max_depth(max_depth);
        config.set_iterations(iterations);
        config.set_debug(self.params.debug);
        config.set_training_optimization_level(self.params.training_optimization_level);
        config.set_loss(&self.params.loss_type);

        let mut gbdt = GBDT::new(&config);
        let mut train_x = self.to_data_vec(x, Some(y))?;
        gbdt.fit(&mut train_x);
        self.model = Some(gbdt);

        self.eval_loss = match eval_set {
            Some(eval) => {
                let loss = self.score_eval_set(eval)?;
                log::debug!(
                    "GBDT fitted {} rounds on {} rows, eval loss {:.6} on {} rows",
                    iterations,
                    x.nrows(),
                    loss,
                    eval.x.nrows()
                );
                Some(loss)
            }
            None => None,
        };
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let raw = self.raw_predict(x)?;
        if self.params.is_classifier() {
            Ok(raw.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
        } else {
            Ok(raw)
        }
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Prediction> {
        if !self.params.is_classifier() {
            bail!(
                "GBDT with {} loss is a regressor and has no probabilities",
                self.params.loss_type
            );
        }
        Ok(Prediction::Vector(self.raw_predict(x)?))
    }

    fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Prediction> {
        let model = self.fitted()?;
        let data = self.to_data_vec(x, None)?;
        let scores = model.decision_function(&data);
        Ok(Prediction::Vector(
            scores.into_iter().map(f64::from).collect(),
        ))
    }
}
