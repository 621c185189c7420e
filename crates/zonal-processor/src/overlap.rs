//! Cell overlap classification.

use geo::{Area, BooleanOps, MultiPolygon, Rect, Relate};

/// Relative slack allowed when an intersection area exceeds the cell area.
const AREA_TOLERANCE: f64 = 1e-9;

/// Bits of integer precision boolean operations keep across an operand's
/// extent. Vertices move by up to `extent / 2^SNAP_BITS`.
const SNAP_BITS: i32 = 29;

/// How a grid cell overlaps a target shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlap {
    /// No shared interior.
    Disjoint,
    /// The cell lies entirely inside the shape.
    Contained,
    /// Partial overlap with the given intersection area (possibly zero for
    /// boundary-only contact).
    Partial(f64),
}

impl Overlap {
    /// Overlap area for a cell of `cell_area`.
    pub fn area(&self, cell_area: f64) -> f64 {
        match self {
            Self::Disjoint => 0.0,
            Self::Contained => cell_area,
            Self::Partial(area) => *area,
        }
    }

    /// Fraction of the cell covered.
    pub fn fraction(&self, cell_area: f64) -> f64 {
        self.area(cell_area) / cell_area
    }
}

/// Classifies cells of a uniform grid against a polygonal feature.
#[derive(Debug, Clone, Copy)]
pub struct OverlapClassifier {
    cell_area: f64,
    area_slack: f64,
}

impl OverlapClassifier {
    /// Create a classifier for cells of `cell_area`.
    pub fn new(cell_area: f64) -> Self {
        Self {
            cell_area,
            area_slack: cell_area * AREA_TOLERANCE,
        }
    }

    /// Widen the area check for clips of a shape spanning `span` units.
    ///
    /// Boolean operations snap vertices to an integer grid sized from the
    /// operands' extent, so a clipped area can exceed the cell by about the
    /// cell perimeter times the snap step.
    pub fn with_snapping(self, cell_width: f64, cell_height: f64, span: f64) -> Self {
        let step = span.abs() / 2f64.powi(SNAP_BITS);
        let perimeter = 2.0 * (cell_width.abs() + cell_height.abs());
        Self {
            area_slack: self.cell_area * AREA_TOLERANCE + 2.0 * perimeter * step,
            ..self
        }
    }

    pub fn cell_area(&self) -> f64 {
        self.cell_area
    }

    /// Classify `cell` against `feature`.
    ///
    /// Containment and disjointness are decided on `feature` itself. Partial
    /// areas are measured against `clip`, the feature or a piece of it that
    /// covers the cell, whose extent is `clip_bbox`. Returns an error message
    /// when the area is not finite or falls outside `[0, cell_area]` by more
    /// than the snapping slack.
    pub fn classify<R: Relate<f64>>(
        &self,
        cell: &Rect<f64>,
        feature: &R,
        clip: &MultiPolygon<f64>,
        clip_bbox: Option<&Rect<f64>>,
    ) -> Result<Overlap, String> {
        if let Some(extent) = clip_bbox {
            if !rects_overlap(cell, extent) {
                return Ok(Overlap::Disjoint);
            }
        }

        let cell_polygon = cell.to_polygon();
        let matrix = feature.relate(&cell_polygon);
        if matrix.is_disjoint() {
            return Ok(Overlap::Disjoint);
        }
        if matrix.is_contains() {
            return Ok(Overlap::Contained);
        }

        let clipped = MultiPolygon::new(vec![cell_polygon]).intersection(clip);
        let area = clipped.unsigned_area();
        self.check_area(area).map(Overlap::Partial)
    }

    fn check_area(&self, area: f64) -> Result<f64, String> {
        let slack = self.area_slack;
        if !area.is_finite() || area < -slack || area > self.cell_area + slack {
            return Err(format!(
                "cell intersection area {} outside [0, {}]",
                area, self.cell_area
            ));
        }
        Ok(area.clamp(0.0, self.cell_area))
    }
}

/// Whether two rectangles share interior area.
fn rects_overlap(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x < b.max().x && a.max().x > b.min().x && a.min().y < b.max().y && a.max().y > b.min().y
}
