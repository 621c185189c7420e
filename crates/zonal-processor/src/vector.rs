//! GeoJSON feature input and conversion.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use geo::Geometry;
use geojson::feature::Id;
use geojson::GeoJson;
use tracing::debug;

use crate::error::{Result, ZonalError};
use crate::types::{Feature, FeatureId};

/// Parse features from a GeoJSON string.
pub fn read_features_str(json: &str) -> Result<Vec<Feature>> {
    collect_features(json.parse::<GeoJson>()?)
}

/// Parse features from a GeoJSON reader.
pub fn read_features<R: Read>(reader: R) -> Result<Vec<Feature>> {
    collect_features(GeoJson::from_reader(reader)?)
}

/// Open and parse a GeoJSON file.
pub fn open_features(path: impl AsRef<Path>) -> Result<Vec<Feature>> {
    let path = path.as_ref();
    let file =
        File::open(path).map_err(|e| ZonalError::source(format!("{}: {}", path.display(), e)))?;
    let features = read_features(BufReader::new(file))?;
    debug!(path = %path.display(), features = features.len(), "Read vector features");
    Ok(features)
}

fn collect_features(geojson: GeoJson) -> Result<Vec<Feature>> {
    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(ZonalError::source(
                "expected a GeoJSON Feature or FeatureCollection, got a bare Geometry",
            ))
        }
    };

    features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| from_geojson(index, feature))
        .collect()
}

fn from_geojson(index: usize, feature: geojson::Feature) -> Result<Feature> {
    let geometry = feature
        .geometry
        .map(|g| {
            Geometry::<f64>::try_from(g)
                .map_err(|e| ZonalError::source(format!("feature {}: {}", index, e)))
        })
        .transpose()?;

    let id = feature.id.map(|id| match id {
        Id::String(s) => FeatureId::Text(s),
        Id::Number(n) => FeatureId::Number(n),
    });

    Ok(Feature {
        id,
        geometry,
        properties: feature.properties.unwrap_or_default(),
    })
}

/// Convert a feature back to GeoJSON.
pub fn to_geojson(feature: &Feature) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: feature
            .geometry
            .as_ref()
            .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
        id: feature.id.as_ref().map(|id| match id {
            FeatureId::Text(s) => Id::String(s.clone()),
            FeatureId::Number(n) => Id::Number(n.clone()),
        }),
        properties: Some(feature.properties.clone()),
        foreign_members: None,
    }
}
