//! Regular grid geometry.

use geo::{coord, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};
use crate::BoundingBox;

/// Upper-left corner assumed when a raster carries no corner coordinates.
pub const GLOBAL_UPPER_LEFT: (f64, f64) = (-180.0, 90.0);

/// Lower-right corner assumed when a raster carries no corner coordinates.
pub const GLOBAL_LOWER_RIGHT: (f64, f64) = (180.0, -90.0);

/// Specification of an axis-aligned, uniform grid.
///
/// Row 0 is the northernmost row: rows advance southward from `origin_y`
/// and columns advance eastward from `origin_x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Upper-left X coordinate
    pub origin_x: f64,
    /// Upper-left Y coordinate
    pub origin_y: f64,
    /// Cell width (positive)
    pub cell_width: f64,
    /// Cell height magnitude (positive, applied southward)
    pub cell_height: f64,
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
}

impl GridSpec {
    /// Create and validate a grid specification.
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        cell_width: f64,
        cell_height: f64,
        rows: usize,
        cols: usize,
    ) -> CommonResult<Self> {
        let grid = Self {
            origin_x,
            origin_y,
            cell_width,
            cell_height,
            rows,
            cols,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Derive a grid from its upper-left and lower-right corners.
    pub fn from_corners(
        upper_left: (f64, f64),
        lower_right: (f64, f64),
        rows: usize,
        cols: usize,
    ) -> CommonResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(CommonError::invalid_grid(format!(
                "grid must have at least one row and column, got {}x{}",
                rows, cols
            )));
        }

        let cell_width = (lower_right.0 - upper_left.0) / cols as f64;
        let cell_height = (upper_left.1 - lower_right.1) / rows as f64;

        Self::new(upper_left.0, upper_left.1, cell_width, cell_height, rows, cols)
    }

    /// Equirectangular grid covering the full globe.
    pub fn global(rows: usize, cols: usize) -> CommonResult<Self> {
        Self::from_corners(GLOBAL_UPPER_LEFT, GLOBAL_LOWER_RIGHT, rows, cols)
    }

    /// Reject degenerate grids.
    pub fn validate(&self) -> CommonResult<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(CommonError::invalid_grid(format!(
                "grid must have at least one row and column, got {}x{}",
                self.rows, self.cols
            )));
        }

        if !self.origin_x.is_finite() || !self.origin_y.is_finite() {
            return Err(CommonError::invalid_grid("origin must be finite"));
        }

        if !(self.cell_width.is_finite() && self.cell_width > 0.0) {
            return Err(CommonError::invalid_grid(format!(
                "cell width must be positive, got {}",
                self.cell_width
            )));
        }

        if !(self.cell_height.is_finite() && self.cell_height > 0.0) {
            return Err(CommonError::invalid_grid(format!(
                "cell height must be positive, got {}",
                self.cell_height
            )));
        }

        Ok(())
    }

    /// Area of a single cell. Constant because the grid is uniform.
    pub fn cell_area(&self) -> f64 {
        self.cell_width * self.cell_height
    }

    /// Rectangle covering cell (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics if the indices are outside the grid.
    pub fn cell_bounds(&self, row: usize, col: usize) -> Rect<f64> {
        assert!(
            row < self.rows && col < self.cols,
            "cell ({}, {}) outside {}x{} grid",
            row,
            col,
            self.rows,
            self.cols
        );
        self.band_bounds(row, col, col + 1)
    }

    /// Rectangle covering columns `[col_start, col_end)` of `row`.
    ///
    /// Columns may run past the last grid column; only the row is checked.
    pub fn band_bounds(&self, row: usize, col_start: usize, col_end: usize) -> Rect<f64> {
        assert!(row < self.rows, "row {} outside grid of {} rows", row, self.rows);
        Rect::new(
            coord! { x: self.col_edge(col_start), y: self.row_edge(row) },
            coord! { x: self.col_edge(col_end), y: self.row_edge(row + 1) },
        )
    }

    /// X coordinate of the western edge of column `col`.
    pub fn col_edge(&self, col: usize) -> f64 {
        self.origin_x + col as f64 * self.cell_width
    }

    /// Y coordinate of the northern edge of row `row`.
    pub fn row_edge(&self, row: usize) -> f64 {
        self.origin_y - row as f64 * self.cell_height
    }

    /// Fractional column position of `x`.
    pub fn col_position(&self, x: f64) -> f64 {
        (x - self.origin_x) / self.cell_width
    }

    /// Fractional row position of `y`, counted southward.
    pub fn row_position(&self, y: f64) -> f64 {
        (self.origin_y - y) / self.cell_height
    }

    /// Extent of the whole grid.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.origin_x,
            self.row_edge(self.rows),
            self.col_edge(self.cols),
            self.origin_y,
        )
    }
}
