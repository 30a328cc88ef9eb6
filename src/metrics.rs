//! Scoring functions applied to out-of-fold predictions.
//!
//! A metric receives the true labels and the prediction rows for the same
//! examples, either a vector (regression values or positive-class
//! probabilities) or a `[n, n_classes]` probability matrix. Classification
//! labels arrive as column indices; the evaluator encodes them with
//! [`encode_labels`](crate::target::encode_labels) before scoring.
use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use ndarray::Array1;

use crate::prediction::Prediction;

pub type MetricFn = dyn Fn(&Array1<f64>, &Prediction) -> Result<f64> + Send + Sync;

/// A named scoring function.
#[derive(Clone)]
pub struct Metric {
    name: String,
    func: Arc<MetricFn>,
}

impl Metric {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Array1<f64>, &Prediction) -> Result<f64> + Send + Sync + 'static,
    {
        Metric {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Look up a built-in metric: accuracy, mse, rmse, mae, auc / roc_auc,
    /// log_loss.
    pub fn from_name(name: &str) -> Option<Metric> {
        let metric = match name.to_lowercase().as_str() {
            "accuracy" => Metric::new("accuracy", accuracy),
            "mse" => Metric::new("mse", mean_squared_error),
            "rmse" => Metric::new("rmse", root_mean_squared_error),
            "mae" => Metric::new("mae", mean_absolute_error),
            "auc" | "roc_auc" => Metric::new("roc_auc", roc_auc),
            "log_loss" | "logloss" => Metric::new("log_loss", log_loss),
            _ => return None,
        };
        Some(metric)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Prediction) -> Result<f64> {
        (self.func)(y_true, y_pred)
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric").field("name", &self.name).finish()
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Prediction) -> Result<()> {
    if y_true.len() != y_pred.nrows() {
        bail!(
            "y_true has {} rows but y_pred has {}",
            y_true.len(),
            y_pred.nrows()
        );
    }
    if y_true.is_empty() {
        bail!("cannot score an empty prediction");
    }
    Ok(())
}

fn regression_values(y_pred: &Prediction) -> Result<&Array1<f64>> {
    match y_pred {
        Prediction::Vector(v) => Ok(v),
        Prediction::Matrix(m) => bail!(
            "regression metrics need one value per row, got {} columns",
            m.ncols()
        ),
    }
}

/// Predicted class label per row: threshold 0.5 for vectors, argmax column
/// index for matrices.
fn predicted_labels(y_pred: &Prediction) -> Array1<f64> {
    match y_pred {
        Prediction::Vector(v) => v.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }),
        Prediction::Matrix(m) => m
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (j, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = j;
                    }
                }
                best as f64
            })
            .collect(),
    }
}

pub fn accuracy(y_true: &Array1<f64>, y_pred: &Prediction) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let labels = predicted_labels(y_pred);
    let correct = y_true
        .iter()
        .zip(labels.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Prediction) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let values = regression_values(y_pred)?;
    let diff = y_true - values;
    Ok(diff.mapv(|d| d * d).sum() / y_true.len() as f64)
}

pub fn root_mean_squared_error(y_true: &Array1<f64>, y_pred: &Prediction) -> Result<f64> {
    Ok(mean_squared_error(y_true, y_pred)?.sqrt())
}

pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Prediction) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let values = regression_values(y_pred)?;
    let diff = y_true - values;
    Ok(diff.mapv(f64::abs).sum() / y_true.len() as f64)
}

/// Area under the ROC curve for binary labels (1 is positive).
///
/// Rank based (Mann-Whitney U); tied scores share their average rank. A
/// two-column probability matrix is scored on column 1.
pub fn roc_auc(y_true: &Array1<f64>, y_pred: &Prediction) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let scores = match y_pred {
        Prediction::Vector(v) => v.clone(),
        Prediction::Matrix(m) if m.ncols() == 2 => m.column(1).to_owned(),
        Prediction::Matrix(m) => bail!("roc_auc is binary only, got {} columns", m.ncols()),
    };

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Average of the 1-based ranks start+1 ..= end.
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }

    let n_pos = y_true.iter().filter(|&&y| y == 1.0).count() as f64;
    let n_neg = y_true.len() as f64 - n_pos;
    if n_pos == 0.0 || n_neg == 0.0 {
        bail!("roc_auc needs both positive and negative labels");
    }
    let rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&y, _)| y == 1.0)
        .map(|(_, &r)| r)
        .sum();
    Ok((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Cross-entropy of predicted probabilities, clipped to `[1e-15, 1 - 1e-15]`.
///
/// Vectors are positive-class probabilities for 0/1 labels; matrices hold
/// one column per class and labels index the column.
pub fn log_loss(y_true: &Array1<f64>, y_pred: &Prediction) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let eps = 1e-15;
    let total: f64 = match y_pred {
        Prediction::Vector(v) => y_true
            .iter()
            .zip(v.iter())
            .map(|(&y, &p)| {
                let p = p.clamp(eps, 1.0 - eps);
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .sum(),
        Prediction::Matrix(m) => {
            let mut total = 0.0;
            for (row, &y) in m.rows().into_iter().zip(y_true.iter()) {
                let class = y as usize;
                if y < 0.0 || y.fract() != 0.0 || class >= m.ncols() {
                    bail!("label {} does not index one of {} columns", y, m.ncols());
                }
                total -= row[class].clamp(eps, 1.0 - eps).ln();
            }
            total
        }
    };
    Ok(total / y_true.len() as f64)
}
