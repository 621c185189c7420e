//! Job execution.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use zonal_processor::{
    load_raster, read_features, write_report, GeoJsonWriter, JsonRasterSource, ZonalProcessor,
};

use crate::job::ResolvedJob;

/// Outcome of a finished job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub features: usize,
    pub processed: usize,
    pub failed: usize,
    pub zero_weight: usize,
    pub fields: Vec<String>,
    pub output: PathBuf,
}

/// Run a job to completion, stopping early once `cancel` is set.
///
/// Inputs are read asynchronously; the aggregation pass and the output
/// write run on the blocking pool.
pub async fn run_job(job: ResolvedJob, cancel: Arc<AtomicBool>) -> Result<JobSummary> {
    let raster_bytes = tokio::fs::read(&job.raster)
        .await
        .with_context(|| format!("Failed to read raster {}", job.raster.display()))?;
    let vector_bytes = tokio::fs::read(&job.vector)
        .await
        .with_context(|| format!("Failed to read vector {}", job.vector.display()))?;

    tokio::task::spawn_blocking(move || execute(job, &raster_bytes, &vector_bytes, cancel))
        .await
        .context("Aggregation task panicked")?
}

fn execute(
    job: ResolvedJob,
    raster_bytes: &[u8],
    vector_bytes: &[u8],
    cancel: Arc<AtomicBool>,
) -> Result<JobSummary> {
    let source = JsonRasterSource::from_reader(raster_bytes)
        .with_context(|| format!("Invalid raster document {}", job.raster.display()))?;
    let raster = load_raster(&source, &job.layers, job.extent)?;

    let features = read_features(vector_bytes)
        .with_context(|| format!("Invalid GeoJSON {}", job.vector.display()))?;
    info!(path = %job.vector.display(), features = features.len(), "Loaded features");

    let processor =
        ZonalProcessor::new(&raster.grid, &raster.layers, job.config)?.with_cancellation(cancel);
    let report = processor.process_all(&features)?;

    let mut writer = GeoJsonWriter::create(&job.output)?;
    write_report(&mut writer, &features, &report)
        .with_context(|| format!("Failed to write {}", job.output.display()))?;

    Ok(JobSummary {
        features: features.len(),
        processed: report.processed(),
        failed: report.failed(),
        zero_weight: report.zero_weight,
        fields: report.fields,
        output: job.output,
    })
}
