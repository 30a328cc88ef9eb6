use ndarray::{Array1, Array2, Axis};

use crate::config::CvConfig;
use crate::cv::SplitPlan;
use crate::error::{Result, RunnerError};
use crate::target::{class_size, TargetType};

/// Owned features and labels of one split.
pub type LabeledSet = (Array2<f64>, Array1<f64>);

/// A training table bound to its split plan, with an optional test table.
///
/// The target type is resolved when the dataset is built, so
/// [`TableDataset::type_of_target`] never returns `Auto`.
#[derive(Debug, Clone)]
pub struct TableDataset {
    train_x: Array2<f64>,
    train_y: Array1<f64>,
    test_x: Option<Array2<f64>>,
    cv: SplitPlan,
    class_size: usize,
    type_of_target: TargetType,
}

impl TableDataset {
    /// Bind `(x, y)` to `cv`. The validation sets of `cv` must partition the
    /// rows of `x`.
    pub fn new(x: Array2<f64>, y: Array1<f64>, cv: SplitPlan) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(RunnerError::ShapeMismatch(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        cv.check_partition(x.nrows())?;

        let type_of_target = TargetType::Auto.resolve(y.view());
        let class_size = class_size(y.view(), type_of_target);
        log::debug!(
            "dataset: {} rows x {} features, {} folds, target {} ({} classes)",
            x.nrows(),
            x.ncols(),
            cv.len(),
            type_of_target,
            class_size
        );
        Ok(TableDataset {
            train_x: x,
            train_y: y,
            test_x: None,
            cv,
            class_size,
            type_of_target,
        })
    }

    /// Bind `(x, y)` to the split plan generated from `config`.
    pub fn from_cv_config(x: Array2<f64>, y: Array1<f64>, config: &CvConfig) -> Result<Self> {
        let cv = config.split(y.view())?;
        Self::new(x, y, cv)
    }

    pub fn with_test(mut self, test_x: Array2<f64>) -> Result<Self> {
        if test_x.ncols() != self.train_x.ncols() {
            return Err(RunnerError::ShapeMismatch(format!(
                "test set has {} columns, training set has {}",
                test_x.ncols(),
                self.train_x.ncols()
            )));
        }
        self.test_x = Some(test_x);
        Ok(self)
    }

    /// Force a target type instead of the detected one. `Auto` re-runs
    /// detection.
    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.type_of_target = target_type.resolve(self.train_y.view());
        self.class_size = class_size(self.train_y.view(), self.type_of_target);
        self
    }

    pub fn train_x(&self) -> &Array2<f64> {
        &self.train_x
    }

    pub fn train_y(&self) -> &Array1<f64> {
        &self.train_y
    }

    pub fn test_x(&self) -> Option<&Array2<f64>> {
        self.test_x.as_ref()
    }

    pub fn cv(&self) -> &SplitPlan {
        &self.cv
    }

    pub fn class_size(&self) -> usize {
        self.class_size
    }

    pub fn type_of_target(&self) -> TargetType {
        self.type_of_target
    }

    pub fn n_rows(&self) -> usize {
        self.train_x.nrows()
    }

    /// `(train_set, val_set)` per fold, in plan order.
    pub fn iter_fold(&self) -> impl Iterator<Item = (LabeledSet, LabeledSet)> + '_ {
        self.cv.iter().map(move |fold| {
            let train = (
                self.train_x.select(Axis(0), &fold.train_idx),
                self.train_y.select(Axis(0), &fold.train_idx),
            );
            let val = (
                self.train_x.select(Axis(0), &fold.val_idx),
                self.train_y.select(Axis(0), &fold.val_idx),
            );
            (train, val)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn plan() -> SplitPlan {
        SplitPlan::from_pairs(vec![
            (vec![2, 3], vec![0, 1]),
            (vec![0, 1], vec![2, 3]),
        ])
    }

    #[test]
    fn detects_target_and_iterates_folds() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0, 1.0];
        let ds = TableDataset::new(x, y, plan()).unwrap();
        assert_eq!(ds.type_of_target(), TargetType::Multiclass);
        assert_eq!(ds.class_size(), 3);

        let folds: Vec<_> = ds.iter_fold().collect();
        assert_eq!(folds.len(), 2);
        let ((train_x, _), (val_x, val_y)) = &folds[1];
        assert_eq!(train_x, &array![[0.0], [1.0]]);
        assert_eq!(val_x, &array![[2.0], [3.0]]);
        assert_eq!(val_y, &array![2.0, 1.0]);
    }

    #[test]
    fn forced_target_type_changes_class_size() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0, 1.0];
        let ds = TableDataset::new(x, y, plan())
            .unwrap()
            .with_target_type(TargetType::Continuous);
        assert_eq!(ds.type_of_target(), TargetType::Continuous);
        assert_eq!(ds.class_size(), 1);
    }

    #[test]
    fn rejects_broken_inputs() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        assert!(TableDataset::new(x.clone(), array![0.0, 1.0], plan()).is_err());

        let overlapping = SplitPlan::from_pairs(vec![(vec![3], vec![0, 1, 2]), (vec![0], vec![2, 3])]);
        assert!(matches!(
            TableDataset::new(x.clone(), array![0.0, 1.0, 0.0, 1.0], overlapping),
            Err(RunnerError::InvalidSplitPlan(_))
        ));

        let ds = TableDataset::new(x, array![0.0, 1.0, 0.0, 1.0], plan()).unwrap();
        assert!(ds.with_test(array![[1.0, 2.0]]).is_err());
    }
}
