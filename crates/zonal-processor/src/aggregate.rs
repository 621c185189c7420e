//! Per-layer area-weighted accumulation.

use zonal_common::Layer;

use crate::types::LayerValue;

/// Neumaier-compensated running sum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    #[inline]
    fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    #[inline]
    fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Running `(weighted_sum, weight)` for one (feature, layer) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    weighted_sum: CompensatedSum,
    weight: CompensatedSum,
}

impl Accumulator {
    /// Add a cell value covering `fraction` of a cell.
    #[inline]
    pub fn add(&mut self, value: f64, fraction: f64) {
        self.weighted_sum.add(value * fraction);
        self.weight.add(fraction);
    }

    pub fn weighted_sum(&self) -> f64 {
        self.weighted_sum.total()
    }

    pub fn weight(&self) -> f64 {
        self.weight.total()
    }

    /// Weighted mean, or `default` when nothing was accumulated.
    pub fn finalize(&self, default: f64) -> f64 {
        let weight = self.weight();
        if weight > 0.0 {
            self.weighted_sum() / weight
        } else {
            default
        }
    }
}

/// Accumulators for every layer of one feature.
///
/// No-data filtering happens per layer, so a cell may count towards one
/// layer's weight and not another's.
pub struct WeightedAggregator<'a> {
    layers: &'a [Layer],
    accumulators: Vec<Accumulator>,
}

impl<'a> WeightedAggregator<'a> {
    /// Fresh accumulators for `layers`.
    pub fn new(layers: &'a [Layer]) -> Self {
        Self {
            layers,
            accumulators: vec![Accumulator::default(); layers.len()],
        }
    }

    /// Whether any layer holds a valid value at the cell.
    pub fn any_valid(&self, row: usize, col: usize) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.valid_value(row, col).is_some())
    }

    /// Add the cell at (`row`, `col`) covering `fraction` to every layer
    /// that has a valid value there.
    pub fn accumulate(&mut self, row: usize, col: usize, fraction: f64) {
        if fraction <= 0.0 {
            return;
        }
        for (layer, acc) in self.layers.iter().zip(self.accumulators.iter_mut()) {
            if let Some(value) = layer.valid_value(row, col) {
                acc.add(value, fraction);
            }
        }
    }

    /// Final values, one per layer, named by `fields`.
    pub fn finish(self, fields: &[String], default: f64) -> Vec<LayerValue> {
        self.layers
            .iter()
            .zip(fields)
            .zip(self.accumulators)
            .map(|((layer, field), acc)| LayerValue {
                layer: layer.name.clone(),
                field: field.clone(),
                value: acc.finalize(default),
                weight: acc.weight(),
            })
            .collect()
    }
}
