//! Zonal statistics job runner.
//!
//! Reads a JSON raster document and a GeoJSON FeatureCollection, attaches
//! area-weighted layer means to every feature and writes the result as
//! GeoJSON.

pub mod job;
pub mod run;

pub use job::{JobConfig, ResolvedJob};
pub use run::{run_job, JobSummary};
