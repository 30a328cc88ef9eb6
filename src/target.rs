//! Classification of label columns into binary, multiclass or continuous
//! targets. The target type drives how predictions are shaped and which
//! estimator output is requested.
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Binary,
    Multiclass,
    Continuous,
    /// Inspect the labels and pick one of the other variants.
    Auto,
}

impl Default for TargetType {
    fn default() -> Self {
        TargetType::Auto
    }
}

impl TargetType {
    pub fn is_classification(&self) -> bool {
        matches!(self, TargetType::Binary | TargetType::Multiclass)
    }

    /// Replace `Auto` with the type detected from `y`.
    pub fn resolve(self, y: ArrayView1<'_, f64>) -> TargetType {
        match self {
            TargetType::Auto => type_of_target(y),
            other => other,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            TargetType::Binary => "binary",
            TargetType::Multiclass => "multiclass",
            TargetType::Continuous => "continuous",
            TargetType::Auto => "auto",
        };
        f.write_str(tag)
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binary" => Ok(TargetType::Binary),
            "multiclass" => Ok(TargetType::Multiclass),
            "continuous" => Ok(TargetType::Continuous),
            "auto" => Ok(TargetType::Auto),
            _ => Err(format!(
                "Unknown target type: {}. Valid options are: binary, multiclass, continuous, auto",
                s
            )),
        }
    }
}

/// Detect the type of a label column.
///
/// Any non-finite or fractional value makes the target continuous. Integral
/// labels with at most two distinct values are binary, more are multiclass.
pub fn type_of_target(y: ArrayView1<'_, f64>) -> TargetType {
    if y.iter().any(|v| !v.is_finite() || v.fract() != 0.0) {
        return TargetType::Continuous;
    }
    if unique_labels(y).len() <= 2 {
        TargetType::Binary
    } else {
        TargetType::Multiclass
    }
}

/// Number of prediction columns for a target: the distinct label count for
/// multiclass targets, 1 otherwise.
pub fn class_size(y: ArrayView1<'_, f64>, target: TargetType) -> usize {
    match target.resolve(y) {
        TargetType::Multiclass => unique_labels(y).len(),
        _ => 1,
    }
}

/// Sorted distinct label values.
pub fn unique_labels(y: ArrayView1<'_, f64>) -> Vec<f64> {
    let mut labels: Vec<f64> = y.iter().copied().filter(|v| !v.is_nan()).collect();
    labels.sort_by(|a, b| a.total_cmp(b));
    labels.dedup();
    labels
}

/// Labels rewritten as prediction column indices.
///
/// Multiclass labels become their rank among the sorted distinct labels,
/// which is the column order of per-class probability matrices. Binary
/// labels already in {0, 1} are kept; any other pair maps to 0 for the lower
/// and 1 for the higher label. Continuous targets are returned unchanged.
pub fn encode_labels(y: ArrayView1<'_, f64>, target: TargetType) -> Array1<f64> {
    let target = target.resolve(y);
    if !target.is_classification() {
        return y.to_owned();
    }
    let labels = unique_labels(y);
    if target == TargetType::Binary && labels.iter().all(|&l| l == 0.0 || l == 1.0) {
        return y.to_owned();
    }
    y.mapv(|v| match labels.binary_search_by(|l| l.total_cmp(&v)) {
        Ok(rank) => rank as f64,
        Err(_) => v,
    })
}
