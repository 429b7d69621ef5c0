//! Histogram accumulators and the final normalization step.

use ndarray::{Array1, Array2};

/// Weight below which a bin is considered empty and receives the fill
/// value instead of a quotient.
pub(crate) const EMPTY_BIN_EPSILON: f64 = 1e-10;

/// Weighted-sum and weight accumulators over a flat bin index space.
///
/// 1D histograms use the bin index directly; 2D histograms use row-major
/// `i * bins1 + j`. Parallel workers each own one accumulator and the
/// shards are merged in a deterministic order.
#[derive(Debug, Clone)]
pub(crate) struct Accumulator {
    data: Vec<f64>,
    count: Vec<f64>,
}

impl Accumulator {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
            count: vec![0.0; len],
        }
    }

    /// Add a fractional pixel contribution to one bin.
    pub fn deposit(&mut self, bin: usize, weight: f64, intensity: f64) {
        self.count[bin] += weight;
        self.data[bin] += intensity * weight;
    }

    /// Fold another shard into this one, elementwise.
    pub fn merge(&mut self, other: &Accumulator) {
        debug_assert_eq!(self.data.len(), other.data.len());
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
        for (a, b) in self.count.iter_mut().zip(&other.count) {
            *a += b;
        }
    }

    /// Normalized intensity per bin: `data / count` where the bin holds
    /// weight, the fill value where it is empty.
    pub fn normalized(&self, fill: f64) -> Vec<f64> {
        self.data
            .iter()
            .zip(&self.count)
            .map(|(&d, &c)| if c > EMPTY_BIN_EPSILON { d / c } else { fill })
            .collect()
    }

    pub fn into_arrays_1d(self) -> (Array1<f64>, Array1<f64>) {
        (Array1::from(self.data), Array1::from(self.count))
    }

    pub fn into_arrays_2d(self, bins0: usize, bins1: usize) -> (Array2<f64>, Array2<f64>) {
        let data = Array2::from_shape_vec((bins0, bins1), self.data)
            .expect("accumulator length matches bin grid");
        let count = Array2::from_shape_vec((bins0, bins1), self.count)
            .expect("accumulator length matches bin grid");
        (data, count)
    }
}
