//! End-to-end tests for areal-weighted aggregation.

use geo::{Area, Geometry};
use test_utils::{
    assert_approx_eq, bowtie, cell_block, create_constant_grid, create_test_grid, diamond,
    holed_square, layer_from, multi, rect_polygon, reference_4x4, ring_polygon, sequential_layer,
    unit_grid, FILL,
};
use zonal_processor::{
    aggregate, AggregationConfig, FailurePolicy, Feature, FeatureId, GridSpec, Layer,
    ZonalError, ZonalProcessor,
};

fn config() -> AggregationConfig {
    AggregationConfig::default()
}

fn sequential_config() -> AggregationConfig {
    AggregationConfig {
        parallel: false,
        ..AggregationConfig::default()
    }
}

// ============================================================================
// Reference values
// ============================================================================

#[test]
fn test_reference_example() {
    let (grid, layer) = reference_4x4();
    // Cell (0,0) fully and the left half of cell (0,2).
    let feature = Feature::new(multi(vec![
        rect_polygon(0.0, -1.0, 1.0, 0.0),
        rect_polygon(2.0, -1.0, 2.5, 0.0),
    ]));

    let report = aggregate(&grid, &[layer], &[feature], config()).unwrap();
    let value = &report.results[0].values[0];

    assert_approx_eq!(value.value, (1.0 * 1.0 + 3.0 * 0.5) / 1.5, 1e-12);
    assert_approx_eq!(value.weight, 1.5, 1e-12);
}

#[test]
fn test_feature_inside_single_cell() {
    let (grid, layer) = reference_4x4();
    let feature = Feature::new(diamond(3.5, -2.5, 0.3));

    let report = aggregate(&grid, &[layer], &[feature], config()).unwrap();
    // Cell (2, 3) holds 2 * 4 + 3 + 1.
    assert_approx_eq!(report.results[0].values[0].value, 12.0, 1e-12);
}

#[test]
fn test_whole_cells_give_arithmetic_mean() {
    let (grid, layer) = reference_4x4();
    let feature = Feature::new(cell_block(&grid, 1, 3, 1, 3));

    let report = aggregate(&grid, &[layer], &[feature], config()).unwrap();
    let value = &report.results[0].values[0];

    assert_approx_eq!(value.value, (6.0 + 7.0 + 10.0 + 11.0) / 4.0, 1e-12);
    assert_approx_eq!(value.weight, 4.0, 1e-12);
    assert_eq!(report.results[0].stats.contained, 4);
}

#[test]
fn test_feature_larger_than_grid() {
    let (grid, layer) = reference_4x4();
    let feature = Feature::new(rect_polygon(-10.0, -10.0, 10.0, 10.0));

    let report = aggregate(&grid, &[layer], &[feature], config()).unwrap();
    let value = &report.results[0].values[0];

    assert_approx_eq!(value.value, 8.5, 1e-12);
    assert_approx_eq!(value.weight, 16.0, 1e-12);
}

#[test]
fn test_polygon_with_hole() {
    let (grid, layer) = reference_4x4();
    let feature = Feature::new(holed_square(2.0, -2.0, 2.0, 1.0));

    let report = aggregate(&grid, &[layer], &[feature], config()).unwrap();
    let value = &report.results[0].values[0];

    // Border ring of the grid: 136 total minus the four centre cells.
    assert_approx_eq!(value.value, (136.0 - 34.0) / 12.0, 1e-12);
    assert_approx_eq!(value.weight, 12.0, 1e-12);
}

// ============================================================================
// No-data and coverage
// ============================================================================

#[test]
fn test_feature_outside_grid_gets_default() {
    let (grid, layer) = reference_4x4();
    let other = sequential_layer("other", 4, 4, None);
    let feature = Feature::new(rect_polygon(10.0, -2.0, 11.0, -1.0));

    let mut cfg = config();
    cfg.default_value = -1.0;
    let report = aggregate(&grid, &[layer, other], &[feature], cfg).unwrap();

    for value in &report.results[0].values {
        assert_eq!(value.weight, 0.0);
        assert_eq!(value.value, -1.0);
    }
    assert_eq!(report.zero_weight, 2);
    assert_eq!(report.results[0].stats.candidates, 0);
}

#[test]
fn test_fill_layer_has_zero_weight_only_for_itself() {
    let grid = unit_grid(4);
    let layers = vec![
        sequential_layer("values", 4, 4, Some(FILL)),
        layer_from("empty", 4, 4, vec![FILL; 16], Some(FILL)),
    ];
    let feature = Feature::new(cell_block(&grid, 0, 2, 0, 2));

    let report = aggregate(&grid, &layers, &[feature], config()).unwrap();
    let values = &report.results[0].values;

    assert_approx_eq!(values[0].value, (1.0 + 2.0 + 5.0 + 6.0) / 4.0, 1e-12);
    assert_eq!(values[1].weight, 0.0);
    assert_eq!(values[1].value, 0.0);
    assert_eq!(report.zero_weight, 1);
}

#[test]
fn test_negated_fill_and_nan_are_skipped() {
    let grid = unit_grid(2);
    let layer = layer_from("v", 2, 2, vec![4.0, -FILL, f64::NAN, 8.0], Some(FILL));
    let feature = Feature::new(cell_block(&grid, 0, 2, 0, 2));

    let report = aggregate(&grid, &[layer], &[feature], config()).unwrap();
    let result = &report.results[0];

    assert_approx_eq!(result.values[0].value, 6.0, 1e-12);
    assert_approx_eq!(result.values[0].weight, 2.0, 1e-12);
    assert_eq!(result.stats.no_data, 2);
}

#[test]
fn test_weight_bounded_by_feature_area() {
    let grid = GridSpec::new(0.0, 0.0, 0.5, 0.5, 20, 20).unwrap();
    let layer = layer_from("v", 20, 20, create_test_grid(20, 20), None);
    let shape = diamond(4.3, -5.1, 2.7);
    let bound = shape.unsigned_area() / grid.cell_area();

    let report = aggregate(&grid, &[layer], &[Feature::new(shape)], config()).unwrap();
    let weight = report.results[0].values[0].weight;

    assert!(weight <= bound + 1e-9);
    // Fully inside the grid with no fill cells, so the bound is reached.
    assert_approx_eq!(weight, bound, 1e-9);
}

// ============================================================================
// Global grids
// ============================================================================

fn ones_layer(grid: &GridSpec) -> Layer {
    layer_from(
        "ones",
        grid.cols,
        grid.rows,
        create_constant_grid(grid.cols, grid.rows, 1.0),
        Some(FILL),
    )
}

/// Weight within a relative `tolerance` of `bound` and not above it.
fn assert_weight_near_bound(weight: f64, bound: f64, tolerance: f64) {
    assert!(
        weight <= bound * (1.0 + tolerance),
        "weight {} exceeds bound {}",
        weight,
        bound
    );
    assert_approx_eq!(weight, bound, bound * tolerance);
}

#[test]
fn test_tall_feature_on_tenth_degree_grid() {
    let grid = GridSpec::global(1800, 3600).unwrap();
    let layer = ones_layer(&grid);
    let shape = ring_polygon(&[
        (-170.12, 70.99),
        (-165.87, 71.43),
        (-161.02, -54.81),
        (-165.44, -55.56),
    ]);
    let bound = shape.unsigned_area() / grid.cell_area();

    let report = aggregate(&grid, &[layer], &[Feature::new(shape)], config()).unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let result = &report.results[0];
    assert_approx_eq!(result.values[0].value, 1.0, 1e-9);
    assert_weight_near_bound(result.values[0].weight, bound, 1e-6);
    assert!(result.stats.contained > 10 * result.stats.partial);
}

#[test]
fn test_conus_feature_on_quarter_degree_grid() {
    let grid = GridSpec::global(720, 1440).unwrap();
    let layer = ones_layer(&grid);
    let shape = ring_polygon(&[
        (-124.73, 48.38),
        (-117.12, 32.53),
        (-80.03, 25.12),
        (-67.95, 47.46),
    ]);
    let bound = shape.unsigned_area() / grid.cell_area();

    let report = aggregate(&grid, &[layer], &[Feature::new(shape)], config()).unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let result = &report.results[0];
    assert_approx_eq!(result.values[0].value, 1.0, 1e-9);
    assert_weight_near_bound(result.values[0].weight, bound, 1e-6);
    assert!(result.stats.contained > 10 * result.stats.partial);
}

#[test]
fn test_row_fallback_with_overlap_on_tenth_degree_grid() {
    let grid = GridSpec::global(1800, 3600).unwrap();
    let layer = ones_layer(&grid);

    // A needle far thinner than the boolean-op snap step hangs from the
    // bottom edge into the next row south, so that row's band clip comes
    // back empty while the feature still overlaps it.
    let needle = -98.95;
    let shape = ring_polygon(&[
        (-100.37, 30.03),
        (needle, 30.03),
        (needle + 5e-13, 29.97),
        (needle + 1e-12, 30.03),
        (-97.61, 30.03),
        (-98.24, 33.87),
        (-100.91, 32.66),
    ]);
    let bound = shape.unsigned_area() / grid.cell_area();

    let report = aggregate(&grid, &[layer], &[Feature::new(shape)], config()).unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let result = &report.results[0];
    // Row 600 holds only the needle; rows 560 and 601 are window padding.
    assert!(result.stats.row_fallbacks >= 3);
    assert_approx_eq!(result.values[0].value, 1.0, 1e-9);
    assert_weight_near_bound(result.values[0].weight, bound, 1e-6);
}

// ============================================================================
// Determinism
// ============================================================================

fn scattered_features() -> Vec<Feature> {
    (0..40)
        .map(|i| {
            let cx = 1.0 + (i % 8) as f64 * 2.3;
            let cy = -1.0 - (i / 8) as f64 * 3.1;
            Feature::new(diamond(cx, cy, 0.4 + (i % 5) as f64 * 0.35))
                .with_id(FeatureId::Text(format!("f{}", i)))
        })
        .collect()
}

#[test]
fn test_parallel_matches_sequential() {
    let grid = unit_grid(20);
    let layers = vec![
        layer_from("a", 20, 20, create_test_grid(20, 20), None),
        sequential_layer("b", 20, 20, Some(FILL)),
    ];
    let features = scattered_features();

    let parallel = aggregate(&grid, &layers, &features, config()).unwrap();
    let sequential = aggregate(&grid, &layers, &features, sequential_config()).unwrap();

    assert_eq!(parallel.results.len(), features.len());
    for (p, s) in parallel.results.iter().zip(&sequential.results) {
        assert_eq!(p.index, s.index);
        assert_eq!(p.values, s.values);
    }
}

#[test]
fn test_reruns_are_identical() {
    let grid = unit_grid(20);
    let layers = vec![layer_from("a", 20, 20, create_test_grid(20, 20), None)];
    let features = scattered_features();
    let processor = ZonalProcessor::new(&grid, &layers, config()).unwrap();

    let first = processor.process_all(&features).unwrap();
    let second = processor.process_all(&features).unwrap();
    for (a, b) in first.results.iter().zip(&second.results) {
        assert_eq!(a, b);
    }
}

// ============================================================================
// Failure policy
// ============================================================================

fn features_with_bad_middle() -> Vec<Feature> {
    vec![
        Feature::new(rect_polygon(0.0, -1.0, 1.0, 0.0)),
        Feature::new(bowtie(0.0, -2.0, 2.0, 0.0)),
        Feature::new(rect_polygon(1.0, -2.0, 2.0, -1.0)),
    ]
}

#[test]
fn test_skip_feature_records_failure() {
    let (grid, layer) = reference_4x4();
    let features = features_with_bad_middle();

    let report = aggregate(&grid, &[layer], &features, config()).unwrap();

    assert_eq!(report.processed(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert!(report.result_for(1).is_none());
    assert_approx_eq!(report.result_for(2).unwrap().values[0].value, 6.0, 1e-12);
}

#[test]
fn test_fail_fast_returns_first_failure() {
    let (grid, layer) = reference_4x4();
    let mut features = features_with_bad_middle();
    features.push(Feature {
        id: None,
        geometry: None,
        properties: Default::default(),
    });

    for parallel in [true, false] {
        let cfg = AggregationConfig {
            failure_policy: FailurePolicy::FailFast,
            parallel,
            ..AggregationConfig::default()
        };
        let err = aggregate(&grid, &[layer.clone()], &features, cfg).unwrap_err();
        assert!(matches!(err, ZonalError::Geometry { feature: 1, .. }));
    }
}

#[test]
fn test_missing_and_non_areal_geometry_are_skipped() {
    let (grid, layer) = reference_4x4();
    let features = vec![
        Feature {
            id: Some(FeatureId::Text("empty".to_string())),
            geometry: None,
            properties: Default::default(),
        },
        Feature::new(Geometry::Point(geo::Point::new(0.5, -0.5))),
    ];

    let report = aggregate(&grid, &[layer], &features, config()).unwrap();
    assert_eq!(report.failed(), 2);
    assert_eq!(
        report.failures[0].id,
        Some(FeatureId::Text("empty".to_string()))
    );
}

// ============================================================================
// Setup errors
// ============================================================================

#[test]
fn test_field_names_are_truncated_and_unique() {
    let grid = unit_grid(2);
    let layers: Vec<Layer> = ["Soil_Moisture_Retrieval_AM", "Soil_Moisture_Retrieval_PM"]
        .iter()
        .map(|name| sequential_layer(name, 2, 2, None))
        .collect();

    let processor = ZonalProcessor::new(&grid, &layers, config()).unwrap();
    assert_eq!(processor.fields(), ["Soil_Moist", "Soil_Moi_1"]);
}

#[test]
fn test_invalid_config_rejected() {
    let (grid, layer) = reference_4x4();
    let cfg = AggregationConfig {
        field_name_max_len: 0,
        ..AggregationConfig::default()
    };
    let layers = [layer];
    assert!(matches!(
        ZonalProcessor::new(&grid, &layers, cfg),
        Err(ZonalError::Configuration(_))
    ));
}
