//! Test data generators for synthetic gridded layers.
//!
//! These generators create predictable, verifiable value patterns so that
//! aggregated means can be checked by hand.

use zonal_common::Layer;

/// Creates a grid with values `1, 2, 3, ...` in row-major order.
///
/// # Example
///
/// ```
/// use test_utils::create_sequential_grid;
///
/// let grid = create_sequential_grid(4, 4);
/// assert_eq!(grid[0], 1.0);
/// assert_eq!(grid[15], 16.0);
/// ```
pub fn create_sequential_grid(width: usize, height: usize) -> Vec<f64> {
    (1..=width * height).map(|v| v as f64).collect()
}

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify which cells contributed to a mean by
/// checking that grid[row][col] == col * 1000 + row.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Creates a grid filled with a single constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f64) -> Vec<f64> {
    vec![value; width * height]
}

/// A `width` x `height` layer of sequential values.
pub fn sequential_layer(name: &str, width: usize, height: usize, fill: Option<f64>) -> Layer {
    Layer::new(name, height, width, create_sequential_grid(width, height), fill)
        .expect("valid sequential layer")
}

/// A layer wrapping `data`.
pub fn layer_from(name: &str, width: usize, height: usize, data: Vec<f64>, fill: Option<f64>) -> Layer {
    Layer::new(name, height, width, data, fill).expect("valid layer")
}
