//! Bounding box types and operations.

use geo::Rect;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// An axis-aligned bounding box in the shared coordinate system of the
/// grid and the features (degrees for EPSG:4326, meters for projected CRS).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse an extent string: "minx,miny,maxx,maxy"
    pub fn from_extent_string(s: &str) -> CommonResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CommonError::InvalidExtentFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| CommonError::InvalidExtentNumber(part.to_string()))?;
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        if !bbox.is_finite() || bbox.min_x >= bbox.max_x || bbox.min_y >= bbox.max_y {
            return Err(CommonError::InvalidExtentFormat(s.to_string()));
        }
        Ok(bbox)
    }

    /// Upper-left corner as (x, y).
    pub fn upper_left(&self) -> (f64, f64) {
        (self.min_x, self.max_y)
    }

    /// Lower-right corner as (x, y).
    pub fn lower_right(&self) -> (f64, f64) {
        (self.max_x, self.min_y)
    }

    /// Check if this bbox overlaps another with positive area.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// True when all four coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}
