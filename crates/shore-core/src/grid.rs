use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer identifier carried by a cluster-id grid. Zero is background.
pub type ClusterId = i64;

/// Errors raised when two grids that must describe the same cells do not,
/// or when a cluster-id grid carries a value that is not an id.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("grid shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("grid data length {actual} does not match {rows} rows x {cols} columns")]
    DataLength { rows: usize, cols: usize, actual: usize },

    #[error("cluster id at ({row}, {col}) is not an integer: {value}")]
    NonIntegerId { row: usize, col: usize, value: f64 },

    #[error("cluster id at ({row}, {col}) is outside the 64-bit id range: {value}")]
    IdOutOfRange { row: usize, col: usize, value: f64 },
}

/// 2^63 as f64; ids must lie in `[-ID_LIMIT, ID_LIMIT)`.
const ID_LIMIT: f64 = 9_223_372_036_854_775_808.0;

pub type Result<T> = std::result::Result<T, GridError>;

/// A labeled 2D grid of optional values, row-major.
///
/// Rows run alongshore and columns run up the shore profile. `None` marks a
/// missing cell and is kept distinct from a measured zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTable {
    row_labels: Vec<String>,
    column_labels: Vec<String>,
    values: Vec<Option<f64>>,
}

impl GridTable {
    /// Create a grid with every cell set to `fill`.
    pub fn new(row_labels: Vec<String>, column_labels: Vec<String>, fill: Option<f64>) -> Self {
        let len = row_labels.len() * column_labels.len();
        Self {
            row_labels,
            column_labels,
            values: vec![fill; len],
        }
    }

    /// Build a grid from row-major values, checking the length against the labels.
    pub fn from_values(
        row_labels: Vec<String>,
        column_labels: Vec<String>,
        values: Vec<Option<f64>>,
    ) -> Result<Self> {
        let (rows, cols) = (row_labels.len(), column_labels.len());
        if values.len() != rows * cols {
            return Err(GridError::DataLength {
                rows,
                cols,
                actual: values.len(),
            });
        }
        Ok(Self {
            row_labels,
            column_labels,
            values,
        })
    }

    /// `rows`×`cols` grid of zeros labeled by index.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::new(
            (0..rows).map(|r| r.to_string()).collect(),
            (0..cols).map(|c| c.to_string()).collect(),
            Some(0.0),
        )
    }

    /// Same labels as `self`, every cell zero.
    pub fn zeroed_like(&self) -> Self {
        Self::new(self.row_labels.clone(), self.column_labels.clone(), Some(0.0))
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.row_labels.len()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.column_labels.len()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn column_labels(&self) -> &[String] {
        &self.column_labels
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// One row of values, in column order.
    pub fn row(&self, row: usize) -> &[Option<f64>] {
        let cols = self.cols();
        &self.values[row * cols..(row + 1) * cols]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values[row * self.cols() + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: Option<f64>) {
        let cols = self.cols();
        self.values[row * cols + col] = val;
    }

    /// Value with missing read as zero, for sums and presence checks.
    #[inline]
    pub fn get_or_zero(&self, row: usize, col: usize) -> f64 {
        self.get(row, col).unwrap_or(0.0)
    }

    /// True when both grids have the same shape and the same labels.
    pub fn same_layout(&self, other: &GridTable) -> bool {
        self.row_labels == other.row_labels && self.column_labels == other.column_labels
    }

    /// Fail unless `other` has the same shape as `self`.
    pub fn ensure_same_shape(&self, other: &GridTable) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(GridError::ShapeMismatch {
                expected_rows: self.rows(),
                expected_cols: self.cols(),
                rows: other.rows(),
                cols: other.cols(),
            });
        }
        Ok(())
    }

    /// Read the cell as a cluster id. Missing, NaN and zero cells are
    /// background and yield `None`.
    pub fn cluster_id(&self, row: usize, col: usize) -> Result<Option<ClusterId>> {
        match self.get(row, col) {
            None => Ok(None),
            Some(v) if v.is_nan() || v == 0.0 => Ok(None),
            Some(v) if !v.is_finite() || v.fract() != 0.0 => {
                Err(GridError::NonIntegerId { row, col, value: v })
            }
            Some(v) if !(-ID_LIMIT..ID_LIMIT).contains(&v) => {
                Err(GridError::IdOutOfRange { row, col, value: v })
            }
            Some(v) => Ok(Some(v as ClusterId)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("l{i}")).collect()
    }

    #[test]
    fn from_values_rejects_wrong_length() {
        let err = GridTable::from_values(labels(2), labels(3), vec![None; 5]).unwrap_err();
        assert_eq!(err, GridError::DataLength { rows: 2, cols: 3, actual: 5 });
    }

    #[test]
    fn get_set_row_major() {
        let mut g = GridTable::zeros(3, 4);
        g.set(1, 2, Some(7.5));
        g.set(2, 3, None);
        assert_eq!(g.get(1, 2), Some(7.5));
        assert_eq!(g.values()[6], Some(7.5));
        assert_eq!(g.row(1), &[Some(0.0), Some(0.0), Some(7.5), Some(0.0)]);
        assert_eq!(g.get(2, 3), None);
        assert_eq!(g.get_or_zero(2, 3), 0.0);
    }

    #[test]
    fn cluster_id_treats_zero_and_missing_as_background() {
        let mut g = GridTable::zeros(1, 4);
        g.set(0, 1, None);
        g.set(0, 2, Some(f64::NAN));
        g.set(0, 3, Some(12.0));
        assert_eq!(g.cluster_id(0, 0).unwrap(), None);
        assert_eq!(g.cluster_id(0, 1).unwrap(), None);
        assert_eq!(g.cluster_id(0, 2).unwrap(), None);
        assert_eq!(g.cluster_id(0, 3).unwrap(), Some(12));
    }

    #[test]
    fn cluster_id_rejects_fractional_values() {
        let mut g = GridTable::zeros(2, 2);
        g.set(1, 0, Some(3.5));
        assert!(matches!(
            g.cluster_id(1, 0),
            Err(GridError::NonIntegerId { row: 1, col: 0, .. })
        ));
    }

    #[test]
    fn cluster_id_rejects_values_beyond_i64() {
        let mut g = GridTable::zeros(1, 4);
        g.set(0, 0, Some(1e19));
        g.set(0, 1, Some(-1e19));
        g.set(0, 2, Some(ID_LIMIT));
        g.set(0, 3, Some(-ID_LIMIT));
        assert!(matches!(g.cluster_id(0, 0), Err(GridError::IdOutOfRange { col: 0, .. })));
        assert!(matches!(g.cluster_id(0, 1), Err(GridError::IdOutOfRange { col: 1, .. })));
        assert!(matches!(g.cluster_id(0, 2), Err(GridError::IdOutOfRange { col: 2, .. })));
        assert_eq!(g.cluster_id(0, 3).unwrap(), Some(i64::MIN));
    }

    #[test]
    fn shape_checks() {
        let a = GridTable::zeros(3, 4);
        let b = a.zeroed_like();
        assert!(a.same_layout(&b));
        assert!(a.ensure_same_shape(&b).is_ok());

        let c = GridTable::zeros(4, 3);
        assert!(!a.same_layout(&c));
        assert_eq!(
            a.ensure_same_shape(&c).unwrap_err(),
            GridError::ShapeMismatch { expected_rows: 3, expected_cols: 4, rows: 4, cols: 3 }
        );
    }
}
