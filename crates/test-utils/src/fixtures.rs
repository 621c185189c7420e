//! Common test fixtures for zonal aggregation tests.
//!
//! Grids use the convention of the aggregation engine: row 0 is the
//! northernmost row and rows advance southward from the origin.

use geo::{coord, polygon, LineString, MultiPolygon, Polygon, Rect};
use zonal_common::{GridSpec, Layer};

/// Fill sentinel used throughout the fixtures.
pub const FILL: f64 = -9999.0;

/// A `size` x `size` grid of unit cells with its origin at (0, 0).
pub fn unit_grid(size: usize) -> GridSpec {
    GridSpec::new(0.0, 0.0, 1.0, 1.0, size, size).expect("valid unit grid")
}

/// The 4x4 reference grid with values 1..16 and fill -9999.
pub fn reference_4x4() -> (GridSpec, Layer) {
    let grid = unit_grid(4);
    let layer = crate::sequential_layer("values", 4, 4, Some(FILL));
    (grid, layer)
}

/// Axis-aligned rectangle polygon.
pub fn rect_polygon(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y }).to_polygon()
}

/// Polygon covering grid cells `[col_start, col_end) x [row_start, row_end)`.
pub fn cell_block(grid: &GridSpec, row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Polygon<f64> {
    rect_polygon(
        grid.col_edge(col_start),
        grid.row_edge(row_end),
        grid.col_edge(col_end),
        grid.row_edge(row_start),
    )
}

/// Diamond centred on (`cx`, `cy`) with the given half-diagonal.
pub fn diamond(cx: f64, cy: f64, radius: f64) -> Polygon<f64> {
    polygon![
        (x: cx, y: cy + radius),
        (x: cx + radius, y: cy),
        (x: cx, y: cy - radius),
        (x: cx - radius, y: cy),
    ]
}

/// Square with a square hole, both centred on (`cx`, `cy`).
pub fn holed_square(cx: f64, cy: f64, outer: f64, inner: f64) -> Polygon<f64> {
    let ring = |h: f64| -> LineString<f64> {
        vec![
            (cx - h, cy - h),
            (cx + h, cy - h),
            (cx + h, cy + h),
            (cx - h, cy + h),
            (cx - h, cy - h),
        ]
        .into()
    };
    Polygon::new(ring(outer), vec![ring(inner)])
}

/// Self-intersecting "bowtie" polygon spanning the given box.
pub fn bowtie(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: max_y),
        (x: max_x, y: min_y),
        (x: max_x, y: max_y),
        (x: min_x, y: min_y),
    ]
}

/// Polygon through `vertices`; the ring is closed automatically.
pub fn ring_polygon(vertices: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(LineString::from(vertices.to_vec()), vec![])
}

/// Wrap polygons into a multipolygon.
pub fn multi(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    MultiPolygon::new(polygons)
}
