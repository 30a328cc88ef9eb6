//! Cross-validation split plans.
//!
//! A [`SplitPlan`] is an ordered list of folds over the row indices of a
//! training set. The evaluator relies on the validation sets partitioning
//! the rows so that every out-of-fold row is written exactly once.
use std::collections::BTreeMap;

use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::CvConfig;
use crate::error::{Result, RunnerError};

/// One train/validation split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train_idx: Vec<usize>,
    pub val_idx: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitPlan {
    folds: Vec<Fold>,
}

impl SplitPlan {
    pub fn new(folds: Vec<Fold>) -> Self {
        SplitPlan { folds }
    }

    /// Build a plan from `(train_idx, val_idx)` pairs.
    pub fn from_pairs(pairs: Vec<(Vec<usize>, Vec<usize>)>) -> Self {
        SplitPlan {
            folds: pairs
                .into_iter()
                .map(|(train_idx, val_idx)| Fold { train_idx, val_idx })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.folds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    pub fn folds(&self) -> &[Fold] {
        &self.folds
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fold> {
        self.folds.iter()
    }

    /// Every index of every fold must address one of `n_rows` rows.
    pub fn check_bounds(&self, n_rows: usize) -> Result<()> {
        if self.folds.is_empty() {
            return Err(RunnerError::InvalidSplitPlan(
                "split plan has no folds".to_string(),
            ));
        }
        for (i, fold) in self.folds.iter().enumerate() {
            let out_of_range = fold
                .train_idx
                .iter()
                .chain(fold.val_idx.iter())
                .find(|&&idx| idx >= n_rows);
            if let Some(idx) = out_of_range {
                return Err(RunnerError::InvalidSplitPlan(format!(
                    "fold {} references row {} but the data has {} rows",
                    i, idx, n_rows
                )));
            }
        }
        Ok(())
    }

    /// Validation sets must cover every row exactly once.
    pub fn check_partition(&self, n_rows: usize) -> Result<()> {
        self.check_bounds(n_rows)?;

        let mut seen: Vec<Option<usize>> = vec![None; n_rows];
        for (i, fold) in self.folds.iter().enumerate() {
            for &idx in &fold.val_idx {
                if let Some(first) = seen[idx] {
                    return Err(RunnerError::InvalidSplitPlan(format!(
                        "row {} is validated by fold {} and fold {}",
                        idx, first, i
                    )));
                }
                seen[idx] = Some(i);
            }
        }
        if let Some(missing) = seen.iter().position(Option::is_none) {
            return Err(RunnerError::InvalidSplitPlan(format!(
                "row {} is not validated by any fold",
                missing
            )));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SplitPlan {
    type Item = &'a Fold;
    type IntoIter = std::slice::Iter<'a, Fold>;

    fn into_iter(self) -> Self::IntoIter {
        self.folds.iter()
    }
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn check_split_counts(n_samples: usize, n_splits: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(RunnerError::InvalidSplitPlan(
            "n_splits must be at least 2".to_string(),
        ));
    }
    if n_samples < n_splits {
        return Err(RunnerError::InvalidSplitPlan(format!(
            "n_samples ({}) must be >= n_splits ({})",
            n_samples, n_splits
        )));
    }
    Ok(())
}

/// Turn per-fold validation sets into a plan; each fold trains on the rest.
fn plan_from_validation_sets(val_sets: Vec<Vec<usize>>) -> SplitPlan {
    let folds = (0..val_sets.len())
        .map(|fold_idx| {
            let train_idx = val_sets
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, v)| v.iter().copied())
                .collect();
            Fold {
                train_idx,
                val_idx: val_sets[fold_idx].clone(),
            }
        })
        .collect();
    SplitPlan { folds }
}

/// K-Fold splitter: consecutive (optionally shuffled) chunks, the first
/// `n_samples % n_splits` folds one row larger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        KFold {
            n_splits,
            shuffle: false,
            seed: None,
        }
    }

    pub fn shuffled(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn split(&self, n_samples: usize) -> Result<SplitPlan> {
        check_split_counts(n_samples, self.n_splits)?;

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = rng_from(self.seed);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;
        let mut val_sets = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            val_sets.push(indices[current..current + fold_size].to_vec());
            current += fold_size;
        }

        log::trace!("KFold produced {} folds over {} rows", self.n_splits, n_samples);
        Ok(plan_from_validation_sets(val_sets))
    }
}

/// Stratified K-Fold: rows of each class are dealt round robin over the
/// folds so every fold keeps roughly the class proportions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        StratifiedKFold {
            n_splits,
            shuffle: false,
            seed: None,
        }
    }

    pub fn shuffled(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn split(&self, y: ArrayView1<'_, f64>) -> Result<SplitPlan> {
        check_split_counts(y.len(), self.n_splits)?;

        // BTreeMap keeps class order stable between runs.
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if self.shuffle {
            let mut rng = rng_from(self.seed);
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        let mut val_sets: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        let mut next_fold = 0;
        for indices in class_indices.values() {
            for &idx in indices {
                val_sets[next_fold].push(idx);
                next_fold = (next_fold + 1) % self.n_splits;
            }
        }
        for val in val_sets.iter_mut() {
            val.sort_unstable();
        }

        if let Some(empty) = val_sets.iter().position(Vec::is_empty) {
            return Err(RunnerError::InvalidSplitPlan(format!(
                "fold {} received no rows",
                empty
            )));
        }

        Ok(plan_from_validation_sets(val_sets))
    }
}

impl CvConfig {
    /// Generate the split plan this configuration describes for labels `y`.
    pub fn split(&self, y: ArrayView1<'_, f64>) -> Result<SplitPlan> {
        let seed = if self.shuffle { Some(self.seed) } else { None };
        if self.stratified {
            let splitter = StratifiedKFold::new(self.n_splits);
            match seed {
                Some(seed) => splitter.shuffled(seed).split(y),
                None => splitter.split(y),
            }
        } else {
            let splitter = KFold::new(self.n_splits);
            match seed {
                Some(seed) => splitter.shuffled(seed).split(y.len()),
                None => splitter.split(y.len()),
            }
        }
    }
}
