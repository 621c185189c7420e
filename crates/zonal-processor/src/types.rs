//! Core types for zonal aggregation.

use geo::{Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ZonalError;

/// Identifier carried by an input feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Text(String),
    Number(serde_json::Number),
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A vector feature: polygonal geometry plus its attribute record.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Optional feature identifier
    pub id: Option<FeatureId>,
    /// Geometry in the grid's coordinate system (may be missing)
    pub geometry: Option<Geometry<f64>>,
    /// Attribute record
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a feature with no attributes.
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: None,
            geometry: Some(geometry.into()),
            properties: Map::new(),
        }
    }

    /// Set the feature identifier.
    pub fn with_id(mut self, id: FeatureId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set an attribute.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The polygonal part of the geometry as a multipolygon.
    ///
    /// Returns `None` when the geometry is missing or not areal.
    pub fn to_multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        match self.geometry.as_ref()? {
            Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
            Geometry::MultiPolygon(mp) => Some(mp.clone()),
            Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
            Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
            _ => None,
        }
    }

    /// Label used in logs: the id when present, otherwise the index.
    pub fn label(&self, index: usize) -> String {
        match &self.id {
            Some(id) => id.to_string(),
            None => format!("#{}", index),
        }
    }
}

/// Final aggregate for one (feature, layer) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerValue {
    /// Source layer name
    pub layer: String,
    /// Output field name
    pub field: String,
    /// Area-weighted mean, or the configured default when `weight` is zero
    pub value: f64,
    /// Sum of overlap fractions of the valid cells that contributed
    pub weight: f64,
}

impl LayerValue {
    /// Whether any valid cell overlapped the feature.
    pub fn has_coverage(&self) -> bool {
        self.weight > 0.0
    }
}

/// Cell classification counters for one feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CellStats {
    /// Rows visited by the row scan
    pub rows_scanned: usize,
    /// Rows whose band intersection was empty and fell back to the feature
    pub row_fallbacks: usize,
    /// Candidate cells visited by the column scan
    pub candidates: usize,
    /// Cells skipped because every layer was no-data
    pub no_data: usize,
    /// Cells with no overlap
    pub disjoint: usize,
    /// Cells fully inside the feature
    pub contained: usize,
    /// Cells partially overlapping the feature
    pub partial: usize,
}

/// Aggregation output for one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureResult {
    /// Position of the feature in the input
    pub index: usize,
    /// One value per layer, in layer order
    pub values: Vec<LayerValue>,
    /// Cell classification counters
    pub stats: CellStats,
}

impl FeatureResult {
    /// Value for the given output field.
    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.iter().find(|v| v.field == field).map(|v| v.value)
    }

    /// Number of layers with zero weight.
    pub fn zero_weight_layers(&self) -> usize {
        self.values.iter().filter(|v| !v.has_coverage()).count()
    }
}

/// A feature that could not be aggregated.
#[derive(Debug)]
pub struct FeatureFailure {
    /// Position of the feature in the input
    pub index: usize,
    /// Feature id, if any
    pub id: Option<FeatureId>,
    /// Cause
    pub error: ZonalError,
}

/// Outcome of a full aggregation pass.
#[derive(Debug, Default)]
pub struct AggregationReport {
    /// Output field names, in layer order
    pub fields: Vec<String>,
    /// Successful features, in input order
    pub results: Vec<FeatureResult>,
    /// Skipped features, in input order
    pub failures: Vec<FeatureFailure>,
    /// Number of (feature, layer) pairs that received the default value
    pub zero_weight: usize,
}

impl AggregationReport {
    /// Result for the feature at `index`, if it succeeded.
    pub fn result_for(&self, index: usize) -> Option<&FeatureResult> {
        self.results
            .binary_search_by_key(&index, |r| r.index)
            .ok()
            .map(|pos| &self.results[pos])
    }

    /// Number of features processed successfully.
    pub fn processed(&self) -> usize {
        self.results.len()
    }

    /// Number of features skipped.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when no feature was skipped.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, LineString, Rect};

    #[test]
    fn test_rect_feature_is_areal() {
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 });
        let feature = Feature::new(rect);
        assert_eq!(feature.to_multi_polygon().map(|mp| mp.0.len()), Some(1));
    }

    #[test]
    fn test_line_feature_is_not_areal() {
        let line: LineString<f64> = vec![(0.0, 0.0), (1.0, 1.0)].into();
        let feature = Feature::new(line);
        assert!(feature.to_multi_polygon().is_none());
    }

    #[test]
    fn test_feature_label() {
        let feature = Feature::new(Rect::new(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 1.0 },
        ));
        assert_eq!(feature.label(3), "#3");
        let feature = feature.with_id(FeatureId::Text("tract-7".to_string()));
        assert_eq!(feature.label(3), "tract-7");
    }

    #[test]
    fn test_report_lookup() {
        let report = AggregationReport {
            fields: vec!["a".to_string()],
            results: vec![
                FeatureResult {
                    index: 0,
                    values: vec![],
                    stats: CellStats::default(),
                },
                FeatureResult {
                    index: 2,
                    values: vec![],
                    stats: CellStats::default(),
                },
            ],
            failures: vec![],
            zero_weight: 0,
        };

        assert!(report.result_for(0).is_some());
        assert!(report.result_for(1).is_none());
        assert!(report.result_for(2).is_some());
        assert!(report.is_complete());
    }
}
