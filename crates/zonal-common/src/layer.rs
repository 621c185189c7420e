//! Data layers sampled on a shared grid.

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};
use crate::GridSpec;

/// A named, dense, row-major array of values on a [`GridSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Dataset name as reported by the raster source
    pub name: String,
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
    /// Cell values, row 0 first
    pub values: Vec<f64>,
    /// No-data sentinel (its negation is treated as no-data too)
    pub fill_value: Option<f64>,
}

impl Layer {
    /// Create a layer, checking that the value count matches the shape.
    pub fn new(
        name: impl Into<String>,
        rows: usize,
        cols: usize,
        values: Vec<f64>,
        fill_value: Option<f64>,
    ) -> CommonResult<Self> {
        let name = name.into();
        if rows == 0 || cols == 0 {
            return Err(CommonError::invalid_layer(name, "layer has no cells"));
        }
        if values.len() != rows * cols {
            return Err(CommonError::invalid_layer(
                name,
                format!(
                    "expected {} values for a {}x{} layer, got {}",
                    rows * cols,
                    rows,
                    cols,
                    values.len()
                ),
            ));
        }

        Ok(Self {
            name,
            rows,
            cols,
            values,
            fill_value,
        })
    }

    /// Build a layer from nested rows.
    pub fn from_rows(
        name: impl Into<String>,
        rows: Vec<Vec<f64>>,
        fill_value: Option<f64>,
    ) -> CommonResult<Self> {
        let name = name.into();
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != cols) {
            return Err(CommonError::invalid_layer(name, "rows have differing lengths"));
        }

        let height = rows.len();
        let values = rows.into_iter().flatten().collect();
        Self::new(name, height, cols, values, fill_value)
    }

    /// Value at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics if the indices are outside the layer.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        assert!(
            row < self.rows && col < self.cols,
            "cell ({}, {}) outside {}x{} layer '{}'",
            row,
            col,
            self.rows,
            self.cols,
            self.name
        );
        self.values[row * self.cols + col]
    }

    /// Whether `value` marks a missing observation.
    ///
    /// NaN is always no-data; the fill sentinel matches with either sign.
    #[inline]
    pub fn is_no_data(&self, value: f64) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.fill_value {
            Some(fill) => value == fill || value == -fill,
            None => false,
        }
    }

    /// Value at (`row`, `col`), or `None` for no-data cells.
    #[inline]
    pub fn valid_value(&self, row: usize, col: usize) -> Option<f64> {
        let value = self.value(row, col);
        (!self.is_no_data(value)).then_some(value)
    }

    /// Whether this layer has the same shape as `grid`.
    pub fn matches_grid(&self, grid: &GridSpec) -> bool {
        self.rows == grid.rows && self.cols == grid.cols
    }

    /// Number of cells holding a valid value.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !self.is_no_data(**v)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_is_row_major() {
        let layer = Layer::new("t", 2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], None).unwrap();
        assert_eq!(layer.value(0, 2), 2.0);
        assert_eq!(layer.value(1, 0), 3.0);
    }

    #[test]
    fn test_fill_matches_either_sign() {
        let layer = Layer::new("t", 1, 3, vec![-9999.0, 9999.0, 1.0], Some(-9999.0)).unwrap();
        assert_eq!(layer.valid_value(0, 0), None);
        assert_eq!(layer.valid_value(0, 1), None);
        assert_eq!(layer.valid_value(0, 2), Some(1.0));
        assert_eq!(layer.valid_count(), 1);
    }

    #[test]
    fn test_nan_is_no_data_without_fill() {
        let layer = Layer::new("t", 1, 2, vec![f64::NAN, 2.0], None).unwrap();
        assert_eq!(layer.valid_value(0, 0), None);
        assert_eq!(layer.valid_value(0, 1), Some(2.0));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = Layer::new("t", 2, 2, vec![1.0; 3], None).unwrap_err();
        assert!(matches!(err, CommonError::InvalidLayer { .. }));
    }

    #[test]
    fn test_from_rows() {
        let layer =
            Layer::from_rows("t", vec![vec![1.0, 2.0], vec![3.0, 4.0]], Some(0.0)).unwrap();
        assert_eq!(layer.rows, 2);
        assert_eq!(layer.cols, 2);
        assert_eq!(layer.value(1, 1), 4.0);

        assert!(Layer::from_rows("ragged", vec![vec![1.0], vec![1.0, 2.0]], None).is_err());
    }
}
