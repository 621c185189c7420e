//! Areal-Weighted Raster-to-Polygon Aggregation
//!
//! This crate computes, for each polygon feature and each gridded data
//! layer, the mean of the grid cell values weighted by how much of each
//! cell the polygon covers. It handles:
//!
//! - **Partial cells**: exact polygon/cell intersection areas
//! - **No-data cells**: fill sentinels (and their negation) per layer
//! - **Many layers**: one pass over the cells serves every layer
//!
//! # Architecture
//!
//! ```text
//! RasterSource ──► load_raster ──► GridSpec + Layers
//!                                        │
//! GeoJSON ──► Features                   │
//!                │                       ▼
//!                └────► ZonalProcessor::process_all (rayon)
//!                                        │
//!                   per feature:         │
//!                   ├─► RowScanner (padded bbox window, row-band clip)
//!                   ├─► OverlapClassifier (disjoint / contained / partial)
//!                   └─► WeightedAggregator (sum, weight per layer)
//!                                        │
//!                                        ▼
//!                               AggregationReport
//!                                        │
//!                                        ▼
//!                       FeatureFieldWriter (flushed once)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use zonal_processor::{aggregate, AggregationConfig, GeoJsonWriter, write_report};
//!
//! let raster = load_raster(&JsonRasterSource::open("grid.json")?, &["Soil_Moisture"], None)?;
//! let features = open_features("counties.geojson")?;
//!
//! let report = aggregate(&raster.grid, &raster.layers, &features, AggregationConfig::default())?;
//!
//! let mut writer = GeoJsonWriter::create("out.geojson")?;
//! write_report(&mut writer, &features, &report)?;
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod fields;
pub mod overlap;
pub mod processor;
pub mod pruning;
pub mod source;
pub mod types;
pub mod vector;
pub mod writer;

// Re-export commonly used types at crate root
pub use aggregate::{Accumulator, WeightedAggregator};
pub use config::{AggregationConfig, FailurePolicy, MIN_FIELD_NAME_LEN};
pub use error::{Result, ZonalError};
pub use fields::{resolve_field_names, truncate_field_name};
pub use overlap::{Overlap, OverlapClassifier};
pub use processor::{aggregate, ZonalProcessor};
pub use pruning::{candidate_window, CandidateWindow, IndexRange, RowCandidates, RowScanner};
pub use source::{
    load_raster, select_datasets, JsonRasterSource, LoadedRaster, RasterDataset, RasterDocument,
    RasterSource,
};
pub use types::{
    AggregationReport, CellStats, Feature, FeatureFailure, FeatureId, FeatureResult, LayerValue,
};
pub use vector::{open_features, read_features, read_features_str, to_geojson};
pub use writer::{write_report, FeatureFieldWriter, GeoJsonWriter};

pub use zonal_common::{BoundingBox, GridSpec, Layer};
