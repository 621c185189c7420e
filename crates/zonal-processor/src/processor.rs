//! Feature-by-feature zonal aggregation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use geo::{BoundingRect, CoordsIter, MultiPolygon, PreparedGeometry, Validation};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};
use zonal_common::{BoundingBox, GridSpec, Layer};

use crate::aggregate::WeightedAggregator;
use crate::config::{AggregationConfig, FailurePolicy};
use crate::error::{Result, ZonalError};
use crate::fields::resolve_field_names;
use crate::overlap::{Overlap, OverlapClassifier};
use crate::pruning::RowScanner;
use crate::types::{AggregationReport, CellStats, Feature, FeatureFailure, FeatureResult};

/// Computes area-weighted layer means for polygon features.
///
/// The grid and layers are borrowed read-only for the whole run, so one
/// processor can serve any number of features from any number of threads.
pub struct ZonalProcessor<'a> {
    grid: &'a GridSpec,
    layers: &'a [Layer],
    fields: Vec<String>,
    config: AggregationConfig,
    classifier: OverlapClassifier,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> ZonalProcessor<'a> {
    /// Validate the inputs and resolve output field names.
    pub fn new(grid: &'a GridSpec, layers: &'a [Layer], config: AggregationConfig) -> Result<Self> {
        config.validate().map_err(ZonalError::Configuration)?;
        grid.validate()?;

        if layers.is_empty() {
            return Err(ZonalError::configuration("no layers to aggregate"));
        }

        for layer in layers {
            if !layer.matches_grid(grid) {
                return Err(ZonalError::configuration(format!(
                    "layer '{}' is {}x{} but the grid is {}x{}",
                    layer.name, layer.rows, layer.cols, grid.rows, grid.cols
                )));
            }
        }

        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        let fields = resolve_field_names(&names, config.field_name_max_len)?;

        Ok(Self {
            grid,
            layers,
            fields,
            config,
            classifier: OverlapClassifier::new(grid.cell_area()),
            cancel: None,
        })
    }

    /// Check `flag` once per feature and stop when it is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Output field names, in layer order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Aggregate every layer over a single feature.
    pub fn process_feature(&self, index: usize, feature: &Feature) -> Result<FeatureResult> {
        let polygons = self.feature_polygons(index, feature)?;
        let mut aggregator = WeightedAggregator::new(self.layers);
        let mut stats = CellStats::default();
        let cell_area = self.classifier.cell_area();

        let extent = polygons
            .bounding_rect()
            .filter(|bbox| self.grid.bbox().intersects(&BoundingBox::from(*bbox)));

        if let Some(bbox) = extent {
            let scanner = RowScanner::new(self.grid, &polygons, bbox);
            let prepared = PreparedGeometry::from(&polygons);

            // Row bands reach one padding cell past the feature on each side.
            let (cell_width, cell_height) = (self.grid.cell_width, self.grid.cell_height);
            let span = bbox.width().max(bbox.height())
                + 4.0 * cell_width.abs().max(cell_height.abs());
            let classifier = self.classifier.with_snapping(cell_width, cell_height, span);

            for row in scanner.rows() {
                let candidates = scanner.scan_row(row);
                stats.rows_scanned += 1;
                if candidates.fell_back {
                    stats.row_fallbacks += 1;
                }

                for col in candidates.cols.iter() {
                    stats.candidates += 1;

                    if !aggregator.any_valid(row, col) {
                        stats.no_data += 1;
                        continue;
                    }

                    let cell = self.grid.cell_bounds(row, col);
                    let overlap = classifier
                        .classify(
                            &cell,
                            &prepared,
                            &candidates.target,
                            candidates.target_bbox.as_ref(),
                        )
                        .map_err(|msg| {
                            ZonalError::geometry(index, format!("cell ({}, {}): {}", row, col, msg))
                        })?;

                    match overlap {
                        Overlap::Disjoint => stats.disjoint += 1,
                        Overlap::Contained => stats.contained += 1,
                        Overlap::Partial(_) => stats.partial += 1,
                    }

                    aggregator.accumulate(row, col, overlap.fraction(cell_area));
                }
            }
        }

        let values = aggregator.finish(&self.fields, self.config.default_value);
        let label = feature.label(index);

        for value in values.iter().filter(|v| !v.has_coverage()) {
            warn!(
                feature = %label,
                layer = %value.layer,
                default = value.value,
                "No valid cell overlaps feature; using default value"
            );
        }

        debug!(
            feature = %label,
            rows = stats.rows_scanned,
            row_fallbacks = stats.row_fallbacks,
            candidates = stats.candidates,
            no_data = stats.no_data,
            disjoint = stats.disjoint,
            contained = stats.contained,
            partial = stats.partial,
            "Aggregated feature"
        );

        Ok(FeatureResult {
            index,
            values,
            stats,
        })
    }

    fn feature_polygons(&self, index: usize, feature: &Feature) -> Result<MultiPolygon<f64>> {
        let polygons = feature.to_multi_polygon().ok_or_else(|| {
            let reason = if feature.geometry.is_none() {
                "feature has no geometry"
            } else {
                "geometry is not polygonal"
            };
            ZonalError::geometry(index, reason)
        })?;

        if !polygons
            .coords_iter()
            .all(|c| c.x.is_finite() && c.y.is_finite())
        {
            return Err(ZonalError::geometry(index, "geometry has non-finite coordinates"));
        }

        if self.config.validate_geometry && !polygons.is_valid() {
            return Err(ZonalError::geometry(
                index,
                "invalid polygon geometry (self-intersecting or malformed ring)",
            ));
        }

        Ok(polygons)
    }

    /// Aggregate all features, applying the configured failure policy.
    ///
    /// Results and failures are reported in input order regardless of
    /// whether features were processed in parallel.
    pub fn process_all(&self, features: &[Feature]) -> Result<AggregationReport> {
        let fail_fast = self.config.failure_policy == FailurePolicy::FailFast;

        info!(
            features = features.len(),
            layers = self.layers.len(),
            rows = self.grid.rows,
            cols = self.grid.cols,
            policy = %self.config.failure_policy,
            parallel = self.config.parallel,
            "Starting zonal aggregation"
        );

        // Lowest failing index so far. Features after it are skipped under
        // fail-fast; features before it always run, so the reported failure
        // is the first one in input order.
        let first_failure = AtomicUsize::new(usize::MAX);

        let run = |(index, feature): (usize, &Feature)| -> Option<Result<FeatureResult>> {
            if fail_fast && index > first_failure.load(Ordering::Relaxed) {
                return None;
            }
            if self.is_cancelled() {
                return Some(Err(ZonalError::Cancelled));
            }

            let outcome = self.process_feature(index, feature);
            if fail_fast && outcome.is_err() {
                first_failure.fetch_min(index, Ordering::Relaxed);
            }
            Some(outcome)
        };

        let outcomes: Vec<Option<Result<FeatureResult>>> = if self.config.parallel {
            features.par_iter().enumerate().map(run).collect()
        } else {
            features.iter().enumerate().map(run).collect()
        };

        let mut report = AggregationReport {
            fields: self.fields.clone(),
            ..Default::default()
        };

        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                None => {}
                Some(Ok(result)) => {
                    report.zero_weight += result.zero_weight_layers();
                    report.results.push(result);
                }
                Some(Err(ZonalError::Cancelled)) => {
                    warn!(processed = report.results.len(), "Zonal aggregation cancelled");
                    return Err(ZonalError::Cancelled);
                }
                Some(Err(err)) if err.is_per_feature() && !fail_fast => {
                    warn!(
                        feature = %features[index].label(index),
                        error = %err,
                        "Skipping feature"
                    );
                    report.failures.push(FeatureFailure {
                        index,
                        id: features[index].id.clone(),
                        error: err,
                    });
                }
                Some(Err(err)) => {
                    error!(
                        feature = %features[index].label(index),
                        error = %err,
                        "Aborting zonal aggregation"
                    );
                    metrics::counter!("zonal_features_failed_total").increment(1);
                    return Err(err);
                }
            }
        }

        metrics::counter!("zonal_features_processed_total").increment(report.processed() as u64);
        metrics::counter!("zonal_features_failed_total").increment(report.failed() as u64);
        metrics::counter!("zonal_zero_weight_total").increment(report.zero_weight as u64);

        info!(
            processed = report.processed(),
            failed = report.failed(),
            zero_weight = report.zero_weight,
            "Zonal aggregation complete"
        );

        Ok(report)
    }
}

/// Aggregate `layers` over `features` in one call.
pub fn aggregate(
    grid: &GridSpec,
    layers: &[Layer],
    features: &[Feature],
    config: AggregationConfig,
) -> Result<AggregationReport> {
    ZonalProcessor::new(grid, layers, config)?.process_all(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, polygon, LineString, Rect};

    fn grid_4x4() -> GridSpec {
        GridSpec::new(0.0, 0.0, 1.0, 1.0, 4, 4).unwrap()
    }

    fn layer_1_to_16() -> Layer {
        Layer::new("values", 4, 4, (1..=16).map(f64::from).collect(), Some(-9999.0)).unwrap()
    }

    fn rect_feature(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Feature {
        Feature::new(Rect::new(
            coord! { x: min_x, y: min_y },
            coord! { x: max_x, y: max_y },
        ))
    }

    #[test]
    fn test_rejects_empty_layers() {
        let grid = grid_4x4();
        let err = ZonalProcessor::new(&grid, &[], AggregationConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ZonalError::Configuration(_)));
    }

    #[test]
    fn test_rejects_mismatched_layer() {
        let grid = grid_4x4();
        let layers = vec![Layer::new("small", 2, 2, vec![1.0; 4], None).unwrap()];
        assert!(ZonalProcessor::new(&grid, &layers, AggregationConfig::default()).is_err());
    }

    #[test]
    fn test_single_cell_interior() {
        let grid = grid_4x4();
        let layers = vec![layer_1_to_16()];
        let processor = ZonalProcessor::new(&grid, &layers, AggregationConfig::default()).unwrap();

        // Inside cell (row 1, col 2), value 7.
        let result = processor
            .process_feature(0, &rect_feature(2.2, -1.8, 2.6, -1.1))
            .unwrap();
        assert!((result.values[0].value - 7.0).abs() < 1e-12);
        assert_eq!(result.stats.partial, 1);
    }

    #[test]
    fn test_non_polygon_is_geometry_error() {
        let grid = grid_4x4();
        let layers = vec![layer_1_to_16()];
        let processor = ZonalProcessor::new(&grid, &layers, AggregationConfig::default()).unwrap();

        let line: LineString<f64> = vec![(0.0, 0.0), (1.0, -1.0)].into();
        let err = processor.process_feature(4, &Feature::new(line)).unwrap_err();
        assert!(matches!(err, ZonalError::Geometry { feature: 4, .. }));
    }

    #[test]
    fn test_self_intersecting_polygon_rejected() {
        let grid = grid_4x4();
        let layers = vec![layer_1_to_16()];
        let processor = ZonalProcessor::new(&grid, &layers, AggregationConfig::default()).unwrap();

        let bowtie = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: -2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: -2.0),
        ];
        let err = processor.process_feature(0, &Feature::new(bowtie)).unwrap_err();
        assert!(err.is_per_feature());
    }

    #[test]
    fn test_cancellation() {
        let grid = grid_4x4();
        let layers = vec![layer_1_to_16()];
        let flag = Arc::new(AtomicBool::new(true));
        let processor = ZonalProcessor::new(&grid, &layers, AggregationConfig::default())
            .unwrap()
            .with_cancellation(flag);

        let features = vec![rect_feature(0.0, -1.0, 1.0, 0.0)];
        assert!(matches!(
            processor.process_all(&features),
            Err(ZonalError::Cancelled)
        ));
    }
}
