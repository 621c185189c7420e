//! Candidate cell pruning.
//!
//! Instead of testing every grid cell against every feature, the feature's
//! bounding box is converted to a coarse row/column window (padded by one
//! cell on each side to absorb floating-point error at cell edges). Each row
//! of that window is then clipped against the feature once, and the clipped
//! shape's own extent narrows the columns that need exact overlap tests.

use std::borrow::Cow;
use std::ops::Range;

use geo::{Area, BooleanOps, BoundingRect, MultiPolygon, Rect};
use zonal_common::GridSpec;

/// Half-open range of grid indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    /// First index in the range
    pub start: usize,
    /// One past the last index
    pub end: usize,
}

impl IndexRange {
    /// An empty range.
    pub const EMPTY: IndexRange = IndexRange { start: 0, end: 0 };

    /// Build a range from padded fractional bounds, clamped to `[0, limit)`.
    fn clamped(low: f64, high: f64, limit: usize) -> Self {
        let start = low.max(0.0);
        let end = high.min(limit as f64);
        if end <= start {
            return Self::EMPTY;
        }
        Self {
            start: start as usize,
            end: end as usize,
        }
    }

    /// Overlap of two ranges.
    pub fn intersect(&self, other: &IndexRange) -> Self {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end <= start {
            Self::EMPTY
        } else {
            Self { start, end }
        }
    }

    /// Number of indices covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True when the range covers no index.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Indices in ascending order.
    pub fn iter(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Coarse rows and columns that may intersect a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateWindow {
    pub rows: IndexRange,
    pub cols: IndexRange,
}

impl CandidateWindow {
    /// True when the feature cannot touch the grid at all.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }
}

/// Padded column range covering `[min_x, max_x]`.
pub fn column_range(grid: &GridSpec, min_x: f64, max_x: f64) -> IndexRange {
    IndexRange::clamped(
        grid.col_position(min_x).floor() - 1.0,
        grid.col_position(max_x).ceil() + 1.0,
        grid.cols,
    )
}

/// Padded row range covering `[min_y, max_y]`.
pub fn row_range(grid: &GridSpec, min_y: f64, max_y: f64) -> IndexRange {
    IndexRange::clamped(
        grid.row_position(max_y).floor() - 1.0,
        grid.row_position(min_y).ceil() + 1.0,
        grid.rows,
    )
}

/// Coarse window for a feature bounding box.
pub fn candidate_window(grid: &GridSpec, bbox: &Rect<f64>) -> CandidateWindow {
    CandidateWindow {
        rows: row_range(grid, bbox.min().y, bbox.max().y),
        cols: column_range(grid, bbox.min().x, bbox.max().x),
    }
}

/// Cells of one row to classify, and the shape to classify them against.
#[derive(Debug)]
pub struct RowCandidates<'a> {
    /// Grid row
    pub row: usize,
    /// Columns to visit
    pub cols: IndexRange,
    /// The feature clipped to this row, or the whole feature on fallback
    pub target: Cow<'a, MultiPolygon<f64>>,
    /// Extent of `target`
    pub target_bbox: Option<Rect<f64>>,
    /// Whether the row clip came back empty
    pub fell_back: bool,
}

/// Row-by-row narrowing of candidate cells for one feature.
pub struct RowScanner<'a> {
    grid: &'a GridSpec,
    feature: &'a MultiPolygon<f64>,
    feature_bbox: Rect<f64>,
    window: CandidateWindow,
}

impl<'a> RowScanner<'a> {
    /// Prepare a scan of `feature`, whose extent is `feature_bbox`.
    pub fn new(grid: &'a GridSpec, feature: &'a MultiPolygon<f64>, feature_bbox: Rect<f64>) -> Self {
        let window = candidate_window(grid, &feature_bbox);
        Self {
            grid,
            feature,
            feature_bbox,
            window,
        }
    }

    /// The coarse window.
    pub fn window(&self) -> CandidateWindow {
        self.window
    }

    /// Rows to scan.
    pub fn rows(&self) -> Range<usize> {
        if self.window.is_empty() {
            return 0..0;
        }
        self.window.rows.iter()
    }

    /// Clip the feature to `row` and narrow its columns.
    ///
    /// The band spans columns `[cols.start, cols.end + 1)` of the window.
    pub fn scan_row(&self, row: usize) -> RowCandidates<'a> {
        let band = self
            .grid
            .band_bounds(row, self.window.cols.start, self.window.cols.end + 1);
        let band = MultiPolygon::new(vec![band.to_polygon()]);
        let clipped = band.intersection(self.feature);

        if clipped.unsigned_area() > 0.0 {
            if let Some(extent) = clipped.bounding_rect() {
                let cols = column_range(self.grid, extent.min().x, extent.max().x)
                    .intersect(&self.window.cols);
                return RowCandidates {
                    row,
                    cols,
                    target: Cow::Owned(clipped),
                    target_bbox: Some(extent),
                    fell_back: false,
                };
            }
        }

        RowCandidates {
            row,
            cols: self.window.cols,
            target: Cow::Borrowed(self.feature),
            target_bbox: Some(self.feature_bbox),
            fell_back: true,
        }
    }
}
