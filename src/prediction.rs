use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{Result, RunnerError};

/// Model output: one value per row, or one column per class.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
}

impl Prediction {
    /// Zero-filled output with `n_rows` rows; `class_size > 1` gives a matrix.
    pub fn zeros(n_rows: usize, class_size: usize) -> Self {
        if class_size > 1 {
            Prediction::Matrix(Array2::zeros((n_rows, class_size)))
        } else {
            Prediction::Vector(Array1::zeros(n_rows))
        }
    }

    pub fn nrows(&self) -> usize {
        match self {
            Prediction::Vector(v) => v.len(),
            Prediction::Matrix(m) => m.nrows(),
        }
    }

    /// Number of values per row (1 for vectors).
    pub fn ncols(&self) -> usize {
        match self {
            Prediction::Vector(_) => 1,
            Prediction::Matrix(m) => m.ncols(),
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            Prediction::Vector(v) => vec![v.len()],
            Prediction::Matrix(m) => vec![m.nrows(), m.ncols()],
        }
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Prediction::Matrix(_))
    }

    pub fn as_vector(&self) -> Option<&Array1<f64>> {
        match self {
            Prediction::Vector(v) => Some(v),
            Prediction::Matrix(_) => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Array2<f64>> {
        match self {
            Prediction::Matrix(m) => Some(m),
            Prediction::Vector(_) => None,
        }
    }

    /// Column `j` of the output; vectors only have column 0.
    pub fn column(&self, j: usize) -> Option<ArrayView1<'_, f64>> {
        match self {
            Prediction::Vector(v) if j == 0 => Some(v.view()),
            Prediction::Vector(_) => None,
            Prediction::Matrix(m) if j < m.ncols() => Some(m.column(j)),
            Prediction::Matrix(_) => None,
        }
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Prediction {
        match self {
            Prediction::Vector(v) => Prediction::Vector(v.select(Axis(0), indices)),
            Prediction::Matrix(m) => Prediction::Matrix(m.select(Axis(0), indices)),
        }
    }

    /// Write `values` row by row into the rows listed in `indices`.
    pub fn assign_rows(&mut self, indices: &[usize], values: &Prediction) -> Result<()> {
        if values.nrows() != indices.len() {
            return Err(RunnerError::ShapeMismatch(format!(
                "{} predictions for {} rows",
                values.nrows(),
                indices.len()
            )));
        }
        let n_rows = self.nrows();
        if let Some(&bad) = indices.iter().find(|&&i| i >= n_rows) {
            return Err(RunnerError::ShapeMismatch(format!(
                "row index {} out of bounds for {} rows",
                bad, n_rows
            )));
        }
        match (self, values) {
            (Prediction::Vector(dst), Prediction::Vector(src)) => {
                for (&row, &value) in indices.iter().zip(src.iter()) {
                    dst[row] = value;
                }
                Ok(())
            }
            (Prediction::Matrix(dst), Prediction::Matrix(src)) if dst.ncols() == src.ncols() => {
                for (&row, src_row) in indices.iter().zip(src.rows()) {
                    dst.row_mut(row).assign(&src_row);
                }
                Ok(())
            }
            (dst, src) => Err(RunnerError::ShapeMismatch(format!(
                "cannot write predictions of shape {:?} into output of shape {:?}",
                src.shape(),
                dst.shape()
            ))),
        }
    }

    /// `self += other / divisor`, element-wise.
    pub fn add_divided(&mut self, other: &Prediction, divisor: f64) -> Result<()> {
        match (self, other) {
            (Prediction::Vector(acc), Prediction::Vector(v)) if acc.len() == v.len() => {
                acc.zip_mut_with(v, |a, &b| *a += b / divisor);
                Ok(())
            }
            (Prediction::Matrix(acc), Prediction::Matrix(m)) if acc.dim() == m.dim() => {
                acc.zip_mut_with(m, |a, &b| *a += b / divisor);
                Ok(())
            }
            (acc, other) => Err(RunnerError::ShapeMismatch(format!(
                "cannot accumulate predictions of shape {:?} into {:?}",
                other.shape(),
                acc.shape()
            ))),
        }
    }

    /// Two-dimensional view of the output; vectors become a single column.
    pub fn to_columns(&self) -> Array2<f64> {
        match self {
            Prediction::Vector(v) => v.clone().insert_axis(Axis(1)),
            Prediction::Matrix(m) => m.clone(),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &f64> + '_> {
        match self {
            Prediction::Vector(v) => Box::new(v.iter()),
            Prediction::Matrix(m) => Box::new(m.iter()),
        }
    }
}

impl From<Array1<f64>> for Prediction {
    fn from(v: Array1<f64>) -> Self {
        Prediction::Vector(v)
    }
}

impl From<Array2<f64>> for Prediction {
    fn from(m: Array2<f64>) -> Self {
        Prediction::Matrix(m)
    }
}
