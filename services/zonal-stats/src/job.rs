//! Job file configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use zonal_common::BoundingBox;
use zonal_processor::AggregationConfig;

/// A zonal statistics job as written in YAML.
///
/// ```yaml
/// raster: /data/smap_20240101.json
/// vector: /data/counties.geojson
/// output: /data/counties_smap.geojson
/// layers:
///   - Soil_Moisture_Retrieval_AM
/// extent: "-180,-90,180,90"
/// aggregation:
///   default_value: -9999
///   failure_policy: fail_fast
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub raster: Option<PathBuf>,
    pub vector: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Layer identifiers (exact names or substrings); empty selects all
    pub layers: Vec<String>,
    /// Grid extent override as `minx,miny,maxx,maxy`
    pub extent: Option<String>,
    /// Aggregation settings; environment defaults apply when absent
    pub aggregation: Option<AggregationConfig>,
}

impl JobConfig {
    /// Parse a job from YAML.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Failed to parse job file")
    }

    /// Load a job file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("Invalid job file {}", path.display()))
    }

    /// Check required paths and parse the extent.
    pub fn resolve(self) -> Result<ResolvedJob> {
        let raster = self.raster.ok_or_else(|| anyhow!("no raster input given"))?;
        let vector = self.vector.ok_or_else(|| anyhow!("no vector input given"))?;
        let output = self.output.ok_or_else(|| anyhow!("no output path given"))?;

        let extent = self
            .extent
            .as_deref()
            .map(BoundingBox::from_extent_string)
            .transpose()
            .context("Invalid extent")?;

        let config = self.aggregation.unwrap_or_else(AggregationConfig::from_env);
        config
            .validate()
            .map_err(|e| anyhow!("Invalid aggregation settings: {}", e))?;

        Ok(ResolvedJob {
            raster,
            vector,
            output,
            layers: self.layers,
            extent,
            config,
        })
    }
}

/// A job with every required input present.
#[derive(Debug, Clone)]
pub struct ResolvedJob {
    pub raster: PathBuf,
    pub vector: PathBuf,
    pub output: PathBuf,
    pub layers: Vec<String>,
    pub extent: Option<BoundingBox>,
    pub config: AggregationConfig,
}
