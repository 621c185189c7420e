//! Raster inputs.
//!
//! Format-specific readers (HDF, GeoTIFF, ...) live outside this crate and
//! plug in through [`RasterSource`]. A small JSON exchange document is
//! supported directly by [`JsonRasterSource`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zonal_common::{BoundingBox, GridSpec, Layer, GLOBAL_LOWER_RIGHT, GLOBAL_UPPER_LEFT};

use crate::error::{Result, ZonalError};

/// A dense dataset read from a raster source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterDataset {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    /// Row-major values, row 0 northernmost
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_value: Option<f64>,
}

impl RasterDataset {
    fn into_layer(self) -> Result<Layer> {
        Ok(Layer::new(
            self.name,
            self.rows,
            self.cols,
            self.values,
            self.fill_value,
        )?)
    }
}

/// A source of named gridded datasets.
pub trait RasterSource {
    /// Names of every dataset in the source, in source order.
    fn dataset_names(&self) -> Vec<String>;

    /// Read one dataset by exact name.
    fn read_dataset(&self, name: &str) -> Result<RasterDataset>;

    /// Upper-left and lower-right corner coordinates, if the source knows them.
    fn corner_coords(&self) -> Option<((f64, f64), (f64, f64))> {
        None
    }
}

/// Match requested layer identifiers against dataset names.
///
/// An identifier selects the dataset with exactly that name, or failing
/// that every dataset whose name contains it. Selections follow request
/// order and no dataset is selected twice. An empty request selects every
/// dataset.
pub fn select_datasets<S: AsRef<str>>(available: &[String], requested: &[S]) -> Vec<String> {
    if requested.is_empty() {
        return available.to_vec();
    }

    let mut selected: Vec<String> = Vec::new();

    for request in requested {
        let request = request.as_ref();
        let matches: Vec<&String> = match available.iter().find(|name| *name == request) {
            Some(exact) => vec![exact],
            None => available
                .iter()
                .filter(|name| name.contains(request))
                .collect(),
        };

        if matches.is_empty() {
            warn!(layer = %request, "Requested layer matches no dataset");
            continue;
        }

        for name in matches {
            if !selected.contains(name) {
                selected.push(name.clone());
            }
        }
    }

    selected
}

/// Grid and layers ready for aggregation.
#[derive(Debug, Clone)]
pub struct LoadedRaster {
    pub grid: GridSpec,
    pub layers: Vec<Layer>,
}

/// Read the requested layers from `source` and derive their grid.
///
/// The grid corners come from `extent` when given, otherwise from the
/// source, otherwise the whole globe is assumed.
pub fn load_raster<S: AsRef<str>>(
    source: &dyn RasterSource,
    requested: &[S],
    extent: Option<BoundingBox>,
) -> Result<LoadedRaster> {
    let available = source.dataset_names();
    let names = select_datasets(&available, requested);
    if names.is_empty() {
        return Err(ZonalError::configuration(format!(
            "no dataset matches the requested layers ({} available)",
            available.len()
        )));
    }

    let mut layers = Vec::with_capacity(names.len());
    for name in &names {
        let layer = source.read_dataset(name)?.into_layer()?;
        debug!(
            layer = %layer.name,
            rows = layer.rows,
            cols = layer.cols,
            fill_value = ?layer.fill_value,
            "Read dataset"
        );
        layers.push(layer);
    }

    let (rows, cols) = (layers[0].rows, layers[0].cols);
    if let Some(other) = layers.iter().find(|l| l.rows != rows || l.cols != cols) {
        return Err(ZonalError::configuration(format!(
            "layer '{}' is {}x{} but '{}' is {}x{}",
            other.name, other.rows, other.cols, layers[0].name, rows, cols
        )));
    }

    let (upper_left, lower_right) = match (extent, source.corner_coords()) {
        (Some(bbox), _) => (bbox.upper_left(), bbox.lower_right()),
        (None, Some(corners)) => corners,
        (None, None) => {
            info!("Raster has no corner coordinates; assuming a global grid");
            (GLOBAL_UPPER_LEFT, GLOBAL_LOWER_RIGHT)
        }
    };
    let grid = GridSpec::from_corners(upper_left, lower_right, rows, cols)?;

    info!(
        layers = layers.len(),
        rows,
        cols,
        cell_width = grid.cell_width,
        cell_height = grid.cell_height,
        "Loaded raster"
    );

    Ok(LoadedRaster { grid, layers })
}

/// JSON raster exchange document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RasterDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_left: Option<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_right: Option<(f64, f64)>,
    pub datasets: Vec<RasterDataset>,
}

/// [`RasterSource`] backed by a [`RasterDocument`].
#[derive(Debug, Clone)]
pub struct JsonRasterSource {
    document: RasterDocument,
}

impl JsonRasterSource {
    pub fn new(document: RasterDocument) -> Self {
        Self { document }
    }

    /// Parse a document from a JSON string.
    pub fn from_str(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Parse a document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::new(serde_json::from_reader(reader)?))
    }

    /// Open and parse a document file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| ZonalError::source(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }
}

impl RasterSource for JsonRasterSource {
    fn dataset_names(&self) -> Vec<String> {
        self.document
            .datasets
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    fn read_dataset(&self, name: &str) -> Result<RasterDataset> {
        self.document
            .datasets
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| ZonalError::source(format!("dataset '{}' not found", name)))
    }

    fn corner_coords(&self) -> Option<((f64, f64), (f64, f64))> {
        self.document.upper_left.zip(self.document.lower_right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_exact_before_substring() {
        let available = names(&["sm", "sm_am", "sm_pm"]);
        assert_eq!(select_datasets(&available, &["sm"]), names(&["sm"]));
        assert_eq!(
            select_datasets(&available, &["sm_"]),
            names(&["sm_am", "sm_pm"])
        );
    }

    #[test]
    fn test_select_in_request_order_without_duplicates() {
        let available = names(&["temp", "precip", "precip_qa"]);
        let selected = select_datasets(&available, &["precip", "temp", "precip", "qa"]);
        assert_eq!(selected, names(&["precip", "temp", "precip_qa"]));
    }

    #[test]
    fn test_empty_request_selects_all() {
        let available = names(&["a", "b"]);
        let none: [&str; 0] = [];
        assert_eq!(select_datasets(&available, &none), available);
    }

    #[test]
    fn test_missing_corners_default_to_globe() {
        let source = JsonRasterSource::from_str(
            r#"{"datasets": [{"name": "v", "rows": 2, "cols": 4, "values": [1,2,3,4,5,6,7,8]}]}"#,
        )
        .unwrap();
        let raster = load_raster(&source, &["v"], None).unwrap();
        assert_eq!(raster.grid.origin_x, -180.0);
        assert_eq!(raster.grid.origin_y, 90.0);
        assert_eq!(raster.grid.cell_width, 90.0);
        assert_eq!(raster.grid.cell_height, 90.0);
    }

    #[test]
    fn test_no_match_is_configuration_error() {
        let source = JsonRasterSource::from_str(
            r#"{"datasets": [{"name": "v", "rows": 1, "cols": 1, "values": [1]}]}"#,
        )
        .unwrap();
        let err = load_raster(&source, &["missing"], None).unwrap_err();
        assert!(matches!(err, ZonalError::Configuration(_)));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let source = JsonRasterSource::from_str(
            r#"{"datasets": [
                {"name": "a", "rows": 1, "cols": 2, "values": [1, 2]},
                {"name": "b", "rows": 2, "cols": 1, "values": [1, 2]}
            ]}"#,
        )
        .unwrap();
        assert!(load_raster(&source, &["a", "b"], None).is_err());
    }
}
