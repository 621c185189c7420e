//! Output of aggregated values.
//!
//! Values are attached to features through [`FeatureFieldWriter`]. Writers
//! collect every feature first and persist them in a single `flush`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geojson::FeatureCollection;
use serde_json::Value;
use tracing::info;

use crate::error::{Result, ZonalError};
use crate::types::{AggregationReport, Feature, LayerValue};
use crate::vector::to_geojson;

/// Sink for features with aggregated field values.
pub trait FeatureFieldWriter {
    /// Declare the output fields, once, before any values are set.
    fn define_fields(&mut self, fields: &[String]) -> Result<()>;

    /// Record `feature` with `values` attached. An empty slice writes the
    /// feature unchanged.
    fn set_values(&mut self, feature: &Feature, values: &[LayerValue]) -> Result<()>;

    /// Persist everything recorded so far. Called exactly once.
    fn flush(&mut self) -> Result<()>;
}

/// Writes a GeoJSON FeatureCollection.
pub struct GeoJsonWriter<W: Write> {
    sink: W,
    fields: Option<Vec<String>>,
    features: Vec<geojson::Feature>,
    flushed: bool,
}

impl<W: Write> GeoJsonWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            fields: None,
            features: Vec::new(),
            flushed: false,
        }
    }

    /// Number of features recorded.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Give back the underlying sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl GeoJsonWriter<BufWriter<File>> {
    /// Create (or truncate) a GeoJSON file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| ZonalError::write(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FeatureFieldWriter for GeoJsonWriter<W> {
    fn define_fields(&mut self, fields: &[String]) -> Result<()> {
        if self.fields.is_some() {
            return Err(ZonalError::write("fields already defined"));
        }
        self.fields = Some(fields.to_vec());
        Ok(())
    }

    fn set_values(&mut self, feature: &Feature, values: &[LayerValue]) -> Result<()> {
        if self.flushed {
            return Err(ZonalError::write("writer already flushed"));
        }
        let fields = self
            .fields
            .as_ref()
            .ok_or_else(|| ZonalError::write("fields must be defined before values"))?;

        let mut out = to_geojson(feature);
        let properties = out.properties.get_or_insert_with(Default::default);
        for value in values {
            if !fields.contains(&value.field) {
                return Err(ZonalError::write(format!(
                    "field '{}' was not defined",
                    value.field
                )));
            }
            properties.insert(value.field.clone(), Value::from(value.value));
        }

        self.features.push(out);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.flushed {
            return Err(ZonalError::write("writer already flushed"));
        }
        self.flushed = true;

        let collection = FeatureCollection {
            bbox: None,
            features: std::mem::take(&mut self.features),
            foreign_members: None,
        };
        let count = collection.features.len();

        serde_json::to_writer(&mut self.sink, &collection)
            .map_err(|e| ZonalError::write(e.to_string()))?;
        self.sink
            .flush()
            .map_err(|e| ZonalError::write(e.to_string()))?;

        info!(features = count, "Wrote GeoJSON features");
        Ok(())
    }
}

/// Write every feature with its aggregated values, then flush.
///
/// Features that failed aggregation are written unchanged.
pub fn write_report<W: FeatureFieldWriter + ?Sized>(
    writer: &mut W,
    features: &[Feature],
    report: &AggregationReport,
) -> Result<()> {
    writer.define_fields(&report.fields)?;
    for (index, feature) in features.iter().enumerate() {
        let values = report
            .result_for(index)
            .map(|r| r.values.as_slice())
            .unwrap_or(&[]);
        writer.set_values(feature, values)?;
    }
    writer.flush()
}
