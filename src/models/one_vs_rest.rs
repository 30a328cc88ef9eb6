use anyhow::{anyhow, bail, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::models::estimator::{Estimator, EvalSet, FitParams, ModelKind};
use crate::prediction::Prediction;
use crate::target::unique_labels;

/// One-vs-Rest wrapper turning a binary probabilistic estimator into a
/// multiclass classifier.
///
/// One copy of the base estimator is fitted per class on `y == class`.
/// Probabilities are the per-class positive probabilities normalised to sum
/// to one, columns ordered by ascending class label.
pub struct OneVsRest {
    base: Box<dyn Estimator>,
    name: String,
    classes: Vec<f64>,
    estimators: Vec<Box<dyn Estimator>>,
}

impl OneVsRest {
    pub fn new(base: Box<dyn Estimator>) -> Self {
        let name = format!("OneVsRest({})", base.name());
        OneVsRest {
            base,
            name,
            classes: Vec::new(),
            estimators: Vec::new(),
        }
    }

    /// Class labels seen during fit, in column order.
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }
}

fn positive_column(prediction: Prediction) -> Result<Array1<f64>> {
    match prediction {
        Prediction::Vector(v) => Ok(v),
        Prediction::Matrix(m) if m.ncols() == 2 => Ok(m.column(1).to_owned()),
        Prediction::Matrix(m) => bail!(
            "binary base estimator returned {} probability columns",
            m.ncols()
        ),
    }
}

fn indicator(y: ArrayView1<'_, f64>, class: f64) -> Array1<f64> {
    y.mapv(|v| if v == class { 1.0 } else { 0.0 })
}

impl Estimator for OneVsRest {
    fn name(&self) -> &str {
        &self.name
    }

    /// Boosted bases keep their kind so the fold trainer hands over the
    /// validation split.
    fn kind(&self) -> ModelKind {
        if self.base.kind().uses_eval_set() {
            ModelKind::EarlyStoppingBoosted
        } else {
            ModelKind::ProbabilisticClassifier
        }
    }

    fn check_params(&self) -> Result<()> {
        if !self.base.kind().has_probabilities() {
            bail!(
                "base estimator {} ({:?}) does not produce probabilities",
                self.base.name(),
                self.base.kind()
            );
        }
        self.base.check_params()
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(OneVsRest::new(self.base.clone_unfitted()))
    }

    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        eval_set: Option<EvalSet<'_>>,
        params: &FitParams,
    ) -> Result<()> {
        let classes = unique_labels(y);
        if classes.len() < 2 {
            bail!("one-vs-rest needs at least 2 distinct classes, got {}", classes.len());
        }

        let mut estimators = Vec::with_capacity(classes.len());
        for &class in &classes {
            let y_bin = indicator(y, class);
            let eval_y = eval_set.map(|eval| indicator(eval.y, class));
            let eval = match (eval_set, eval_y.as_ref()) {
                (Some(eval), Some(eval_y)) => Some(EvalSet {
                    x: eval.x.reborrow(),
                    y: eval_y.view(),
                }),
                _ => None,
            };

            let mut estimator = self.base.clone_unfitted();
            let eval = if self.base.kind().uses_eval_set() { eval } else { None };
            estimator.fit(x, y_bin.view(), eval, params)?;
            log::trace!("one-vs-rest fitted class {}", class);
            estimators.push(estimator);
        }

        self.classes = classes;
        self.estimators = estimators;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let proba = proba
            .as_matrix()
            .ok_or_else(|| anyhow!("one-vs-rest probabilities must be a matrix"))?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |acc, (j, &p)| if p > acc.1 { (j, p) } else { acc })
                    .0;
                self.classes[best]
            })
            .collect())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Prediction> {
        if self.estimators.is_empty() {
            bail!("{} is not fitted", self.name);
        }
        let n_classes = self.estimators.len();
        let mut proba = Array2::zeros((x.nrows(), n_classes));
        for (j, estimator) in self.estimators.iter().enumerate() {
            let column = positive_column(estimator.predict_proba(x)?)?;
            proba.column_mut(j).assign(&column);
        }
        for mut row in proba.rows_mut() {
            let total: f64 = row.sum();
            if total > 0.0 {
                row.mapv_inplace(|p| p / total);
            } else {
                row.fill(1.0 / n_classes as f64);
            }
        }
        Ok(Prediction::Matrix(proba))
    }
}
