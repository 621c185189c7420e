//! Zonal statistics CLI.
//!
//! Aggregates gridded layers over GeoJSON polygons and writes the features
//! back with one area-weighted mean per layer.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use zonal_processor::FailurePolicy;
use zonal_stats::{run_job, JobConfig};

#[derive(Parser, Debug)]
#[command(name = "zonal-stats")]
#[command(about = "Area-weighted raster statistics for polygon features")]
struct Args {
    /// YAML job file
    #[arg(short, long, env = "ZONAL_JOB")]
    job: Option<PathBuf>,

    /// JSON raster document
    #[arg(short, long)]
    raster: Option<PathBuf>,

    /// GeoJSON input features
    #[arg(short, long)]
    vector: Option<PathBuf>,

    /// GeoJSON output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Layer to aggregate (exact name or substring, repeatable)
    #[arg(short, long = "layer")]
    layers: Vec<String>,

    /// Grid extent override as minx,miny,maxx,maxy
    #[arg(long, allow_hyphen_values = true)]
    extent: Option<String>,

    /// Value written when no valid cell overlaps a feature
    #[arg(long, allow_hyphen_values = true)]
    default_value: Option<f64>,

    /// Abort on the first feature that fails
    #[arg(long)]
    fail_fast: bool,

    /// Process features on a single thread
    #[arg(long)]
    sequential: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut job = match &args.job {
        Some(path) => JobConfig::load(path)?,
        None => JobConfig::default(),
    };

    // Command-line values override the job file
    if args.raster.is_some() {
        job.raster = args.raster;
    }
    if args.vector.is_some() {
        job.vector = args.vector;
    }
    if args.output.is_some() {
        job.output = args.output;
    }
    if !args.layers.is_empty() {
        job.layers = args.layers;
    }
    if args.extent.is_some() {
        job.extent = args.extent;
    }

    let mut job = job.resolve()?;
    if let Some(value) = args.default_value {
        job.config.default_value = value;
    }
    if args.fail_fast {
        job.config.failure_policy = FailurePolicy::FailFast;
    }
    if args.sequential {
        job.config.parallel = false;
    }
    job.config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid aggregation settings: {}", e))?;

    info!(
        raster = %job.raster.display(),
        vector = %job.vector.display(),
        output = %job.output.display(),
        layers = ?job.layers,
        policy = %job.config.failure_policy,
        "Starting zonal statistics job"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after features in progress");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let summary = run_job(job, cancel).await?;

    info!(
        features = summary.features,
        processed = summary.processed,
        failed = summary.failed,
        zero_weight = summary.zero_weight,
        fields = ?summary.fields,
        output = %summary.output.display(),
        "Zonal statistics job complete"
    );

    Ok(())
}
