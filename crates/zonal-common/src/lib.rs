//! Common types shared by the zonal aggregation crates and services.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod layer;

pub use bbox::BoundingBox;
pub use error::{CommonError, CommonResult};
pub use grid::{GridSpec, GLOBAL_LOWER_RIGHT, GLOBAL_UPPER_LEFT};
pub use layer::Layer;
