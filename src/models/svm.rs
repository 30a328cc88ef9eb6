use anyhow::{anyhow, bail, Result};
use linfa::dataset::Pr;
use linfa::traits::Predict;
use linfa::Dataset;
use linfa_svm::{Svm, SvmParams};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::models::estimator::{Estimator, EvalSet, FitParams, ModelKind};
use crate::prediction::Prediction;

/// Hyper-parameters of [`SvmModel`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SvmConfig {
    pub eps: f64,
    pub c: (f64, f64),
    pub kernel: String,
    pub gaussian_kernel_eps: f64,
    pub polynomial_kernel_constant: f64,
    pub polynomial_kernel_degree: f64,
}

impl Default for SvmConfig {
    fn default() -> Self {
        SvmConfig {
            eps: 0.1,
            c: (1.0, 1.0),
            kernel: "linear".to_string(),
            gaussian_kernel_eps: 0.1,
            polynomial_kernel_constant: 1.0,
            polynomial_kernel_degree: 3.0,
        }
    }
}

/// Binary support vector classifier with Platt-scaled probabilities.
pub struct SvmModel {
    model: Option<Svm<f64, Pr>>,
    params: SvmConfig,
}

impl SvmModel {
    pub fn new(params: SvmConfig) -> Self {
        SvmModel {
            model: None,
            params,
        }
    }

    fn svm_params(&self) -> Result<SvmParams<f64, Pr>> {
        let (c1, c2) = self.params.c;
        let params: SvmParams<f64, Pr> = Svm::<f64, Pr>::params()
            .eps(self.params.eps)
            .pos_neg_weights(c1, c2);

        // Chain the kernel configuration based on the kernel type
        let params = match self.params.kernel.as_str() {
            "linear" => params.linear_kernel(),
            "gauss" => params.gaussian_kernel(self.params.gaussian_kernel_eps),
            "poly" => params.polynomial_kernel(
                self.params.polynomial_kernel_constant,
                self.params.polynomial_kernel_degree,
            ),
            other => bail!(
                "Unsupported kernel type: {}. Valid options are: linear, gauss, poly",
                other
            ),
        };
        Ok(params)
    }

    fn fitted(&self) -> Result<&Svm<f64, Pr>> {
        self.model
            .as_ref()
            .ok_or_else(|| anyhow!("SVM model is not fitted"))
    }
}

impl Estimator for SvmModel {
    fn name(&self) -> &str {
        "SVM"
    }

    fn kind(&self) -> ModelKind {
        ModelKind::ProbabilisticClassifier
    }

    fn check_params(&self) -> Result<()> {
        if self.params.eps <= 0.0 {
            bail!("eps must be positive, got {}", self.params.eps);
        }
        self.svm_params().map(|_| ())
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(SvmModel::new(self.params.clone()))
    }

    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        _eval_set: Option<EvalSet<'_>>,
        _params: &FitParams,
    ) -> Result<()> {
        let y: Array1<bool> = y.mapv(|l| l == 1.0);
        let dataset = Dataset::new(x.to_owned(), y);
        let params = self.svm_params()?;
        let model = <SvmParams<f64, Pr> as linfa::traits::Fit<_, _, _>>::fit(&params, &dataset)
            .map_err(|e| anyhow!("SVM fit failed: {}", e))?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let proba = self.positive_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Prediction> {
        Ok(Prediction::Vector(self.positive_proba(x)?))
    }
}

impl SvmModel {
    fn positive_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let model = self.fitted()?;
        let records = x.to_owned();
        let predictions: Array1<Pr> = model.predict(&records);
        Ok(predictions.iter().map(|p| f64::from(**p)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn svm_probabilities_are_bounded() {
        let x = array![
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.1],
            [0.0, 0.9],
            [1.1, 0.0],
            [0.0, 1.2]
        ];
        let y = array![1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let mut model = SvmModel::new(SvmConfig::default());
        model.fit(x.view(), y.view(), None, &FitParams::new()).unwrap();
        let proba = model.predict_proba(x.view()).unwrap();
        assert_eq!(proba.nrows(), 6);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn unknown_kernel_is_rejected() {
        let model = SvmModel::new(SvmConfig {
            kernel: "sigmoid".to_string(),
            ..SvmConfig::default()
        });
        assert!(model.check_params().is_err());
    }
}
