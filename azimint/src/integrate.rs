//! Public integration entry points: validation, axis construction, the
//! pixel loop drivers and the final normalization.
//!
//! The serial entry points process pixels in ascending index order, which
//! is the reference accumulation order. The parallel variants partition
//! the pixel range into fixed-size chunks, rebin each chunk into a
//! private accumulator on the rayon pool, and merge the shards in chunk
//! order on the calling thread. The merge order is deterministic, so
//! repeated parallel runs agree bit for bit; against the serial reference
//! they may differ by a few ulps per bin because partial sums are
//! regrouped.

use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView3, ArrayView4};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::accumulate::Accumulator;
use crate::axis::BinAxis;
use crate::corrections::CorrectionPipeline;
use crate::error::IntegrationError;
use crate::split1d::split_range_1d;
use crate::split2d::{split_range_2d, InsideGrid};

/// Pixels per parallel work unit.
const CHUNK_PIXELS: usize = 4096;

/// Optional inputs of one integration call.
///
/// Every field defaults to absent; the presence of a correction array is
/// what enables the corresponding correction step. All arrays must have
/// one entry per pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrationConfig<'a> {
    /// Radial output range. Derived from the data when absent.
    pub pos0_range: Option<(f64, f64)>,
    /// Azimuthal range: an acceptance window in 1D, the output axis in 2D.
    pub pos1_range: Option<(f64, f64)>,
    /// Sentinel intensity. Matching pixels are skipped and empty bins
    /// receive this value.
    pub dummy: Option<f64>,
    /// Tolerance for the sentinel match; absent behaves as exact match.
    pub delta_dummy: Option<f64>,
    /// Nonzero entries mark pixels to skip.
    pub mask: Option<ArrayView1<'a, i8>>,
    /// Dark signal, subtracted from the raw intensity.
    pub dark: Option<ArrayView1<'a, f64>>,
    /// Flat-field divisor.
    pub flat: Option<ArrayView1<'a, f64>>,
    /// Polarization divisor.
    pub polarization: Option<ArrayView1<'a, f64>>,
    /// Solid-angle divisor.
    pub solid_angle: Option<ArrayView1<'a, f64>>,
}

/// Result of a 1D azimuthal integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integrated1d {
    /// Radial coordinate of each bin center.
    pub radial: Array1<f64>,
    /// Normalized intensity per bin; empty bins hold the dummy value.
    pub intensity: Array1<f64>,
    /// Weighted intensity sum per bin.
    pub sum_data: Array1<f64>,
    /// Overlap weight sum per bin.
    pub sum_count: Array1<f64>,
}

/// Result of a 2D (radial, azimuthal) integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integrated2d {
    /// Normalized intensity per cell; empty cells hold the dummy value.
    pub intensity: Array2<f64>,
    /// Radial coordinate of each bin center.
    pub radial: Array1<f64>,
    /// Azimuthal coordinate of each bin center.
    pub azimuthal: Array1<f64>,
    /// Weighted intensity sum per cell.
    pub sum_data: Array2<f64>,
    /// Overlap weight sum per cell.
    pub sum_count: Array2<f64>,
}

/// Reshape an (H, W, 4, 2) per-image corner array into the flat
/// (N, 4, 2) layout the entry points take.
///
/// The input must be in standard row-major layout; sliced or transposed
/// views are rejected like any other shape mismatch.
pub fn corners_from_image(
    pos: ArrayView4<'_, f64>,
) -> Result<ArrayView3<'_, f64>, IntegrationError> {
    let shape = pos.shape().to_vec();
    if shape[2] != 4 || shape[3] != 2 {
        return Err(IntegrationError::CornerShape { shape });
    }
    let n = shape[0] * shape[1];
    pos.into_shape_with_order((n, 4, 2))
        .map_err(|_| IntegrationError::CornerShape { shape })
}

/// Histogram detector intensities over the radial coordinate, splitting
/// every pixel across the bins it overlaps.
///
/// # Arguments
/// * `pos` - per-pixel corner coordinates, shape (N, 4, 2)
/// * `weights` - per-pixel raw intensities, length N
/// * `bins` - number of radial bins, nonzero
/// * `config` - optional ranges, sentinel and correction arrays
pub fn integrate_1d(
    pos: ArrayView3<'_, f64>,
    weights: ArrayView1<'_, f64>,
    bins: usize,
    config: &IntegrationConfig<'_>,
) -> Result<Integrated1d, IntegrationError> {
    if bins == 0 {
        return Err(IntegrationError::EmptyBins);
    }
    let n = validate(&pos, &weights, config)?;
    let axis = radial_axis(&pos, bins, config);
    let pipeline = CorrectionPipeline::new(config);
    let window = config.pos1_range.map(sorted);

    let mut accum = Accumulator::new(bins);
    let outside = split_range_1d(&pos, &weights, &pipeline, &axis, window, 0..n, &mut accum);
    report_outside(outside, n);
    Ok(finalize_1d(&axis, accum, config))
}

/// Parallel variant of [`integrate_1d`]; see the module docs for the
/// determinism guarantees.
pub fn integrate_1d_parallel(
    pos: ArrayView3<'_, f64>,
    weights: ArrayView1<'_, f64>,
    bins: usize,
    config: &IntegrationConfig<'_>,
) -> Result<Integrated1d, IntegrationError> {
    if bins == 0 {
        return Err(IntegrationError::EmptyBins);
    }
    let n = validate(&pos, &weights, config)?;
    let axis = radial_axis(&pos, bins, config);
    let pipeline = CorrectionPipeline::new(config);
    let window = config.pos1_range.map(sorted);

    let shards: Vec<(Accumulator, usize)> = chunk_ranges(n)
        .into_par_iter()
        .map(|range| {
            let mut accum = Accumulator::new(bins);
            let outside =
                split_range_1d(&pos, &weights, &pipeline, &axis, window, range, &mut accum);
            (accum, outside)
        })
        .collect();

    let mut accum = Accumulator::new(bins);
    let mut outside = 0;
    for (shard, shard_outside) in &shards {
        accum.merge(shard);
        outside += shard_outside;
    }
    report_outside(outside, n);
    Ok(finalize_1d(&axis, accum, config))
}

/// Histogram detector intensities over the (radial, azimuthal) grid,
/// splitting every pixel across the cells it overlaps.
///
/// # Arguments
/// * `pos` - per-pixel corner coordinates, shape (N, 4, 2)
/// * `weights` - per-pixel raw intensities, length N
/// * `bins` - (radial, azimuthal) bin counts, both nonzero
/// * `config` - optional ranges, sentinel and correction arrays
pub fn integrate_2d(
    pos: ArrayView3<'_, f64>,
    weights: ArrayView1<'_, f64>,
    bins: (usize, usize),
    config: &IntegrationConfig<'_>,
) -> Result<Integrated2d, IntegrationError> {
    let (bins0, bins1) = bins;
    if bins0 == 0 || bins1 == 0 {
        return Err(IntegrationError::EmptyBins);
    }
    let n = validate(&pos, &weights, config)?;
    let (axis0, axis1) = grid_axes(&pos, bins0, bins1, config);
    let pipeline = CorrectionPipeline::new(config);

    let mut accum = Accumulator::new(bins0 * bins1);
    let mut scratch = InsideGrid::new();
    let outside = split_range_2d(
        &pos,
        &weights,
        &pipeline,
        &axis0,
        &axis1,
        0..n,
        &mut accum,
        &mut scratch,
    );
    report_outside(outside, n);
    Ok(finalize_2d(&axis0, &axis1, accum, config))
}

/// Parallel variant of [`integrate_2d`]; see the module docs for the
/// determinism guarantees.
pub fn integrate_2d_parallel(
    pos: ArrayView3<'_, f64>,
    weights: ArrayView1<'_, f64>,
    bins: (usize, usize),
    config: &IntegrationConfig<'_>,
) -> Result<Integrated2d, IntegrationError> {
    let (bins0, bins1) = bins;
    if bins0 == 0 || bins1 == 0 {
        return Err(IntegrationError::EmptyBins);
    }
    let n = validate(&pos, &weights, config)?;
    let (axis0, axis1) = grid_axes(&pos, bins0, bins1, config);
    let pipeline = CorrectionPipeline::new(config);

    let shards: Vec<(Accumulator, usize)> = chunk_ranges(n)
        .into_par_iter()
        .map(|range| {
            let mut accum = Accumulator::new(bins0 * bins1);
            let mut scratch = InsideGrid::new();
            let outside = split_range_2d(
                &pos,
                &weights,
                &pipeline,
                &axis0,
                &axis1,
                range,
                &mut accum,
                &mut scratch,
            );
            (accum, outside)
        })
        .collect();

    let mut accum = Accumulator::new(bins0 * bins1);
    let mut outside = 0;
    for (shard, shard_outside) in &shards {
        accum.merge(shard);
        outside += shard_outside;
    }
    report_outside(outside, n);
    Ok(finalize_2d(&axis0, &axis1, accum, config))
}

fn validate(
    pos: &ArrayView3<'_, f64>,
    weights: &ArrayView1<'_, f64>,
    config: &IntegrationConfig<'_>,
) -> Result<usize, IntegrationError> {
    let shape = pos.shape();
    if shape[1] != 4 || shape[2] != 2 {
        return Err(IntegrationError::CornerShape {
            shape: shape.to_vec(),
        });
    }
    let n = shape[0];
    check_len("weights", weights.len(), n)?;
    if let Some(mask) = &config.mask {
        check_len("mask", mask.len(), n)?;
    }
    if let Some(dark) = &config.dark {
        check_len("dark", dark.len(), n)?;
    }
    if let Some(flat) = &config.flat {
        check_len("flat", flat.len(), n)?;
    }
    if let Some(polarization) = &config.polarization {
        check_len("polarization", polarization.len(), n)?;
    }
    if let Some(solid_angle) = &config.solid_angle {
        check_len("solid_angle", solid_angle.len(), n)?;
    }
    Ok(n)
}

fn check_len(name: &'static str, got: usize, expected: usize) -> Result<(), IntegrationError> {
    if got != expected {
        return Err(IntegrationError::ArrayLength {
            name,
            got,
            expected,
        });
    }
    Ok(())
}

fn sorted(range: (f64, f64)) -> (f64, f64) {
    (range.0.min(range.1), range.0.max(range.1))
}

fn radial_axis(pos: &ArrayView3<'_, f64>, bins: usize, config: &IntegrationConfig<'_>) -> BinAxis {
    match config.pos0_range {
        Some((a, b)) => BinAxis::new(bins, a, b),
        None => BinAxis::from_data(bins, pos.slice(s![.., .., 0]).iter().copied()),
    }
}

fn grid_axes(
    pos: &ArrayView3<'_, f64>,
    bins0: usize,
    bins1: usize,
    config: &IntegrationConfig<'_>,
) -> (BinAxis, BinAxis) {
    let axis0 = radial_axis(pos, bins0, config);
    let axis1 = match config.pos1_range {
        Some((a, b)) => BinAxis::new(bins1, a, b),
        None => BinAxis::from_data(bins1, pos.slice(s![.., .., 1]).iter().copied()),
    };
    (axis0, axis1)
}

fn chunk_ranges(n: usize) -> Vec<std::ops::Range<usize>> {
    (0..n)
        .step_by(CHUNK_PIXELS)
        .map(|start| start..(start + CHUNK_PIXELS).min(n))
        .collect()
}

fn report_outside(outside: usize, n: usize) {
    if outside > 0 {
        debug!("{outside} of {n} pixels fell outside the output range");
    }
}

fn finalize_1d(axis: &BinAxis, accum: Accumulator, config: &IntegrationConfig<'_>) -> Integrated1d {
    let fill = config.dummy.unwrap_or(0.0);
    let intensity = Array1::from(accum.normalized(fill));
    let (sum_data, sum_count) = accum.into_arrays_1d();
    Integrated1d {
        radial: axis.centers(),
        intensity,
        sum_data,
        sum_count,
    }
}

fn finalize_2d(
    axis0: &BinAxis,
    axis1: &BinAxis,
    accum: Accumulator,
    config: &IntegrationConfig<'_>,
) -> Integrated2d {
    let fill = config.dummy.unwrap_or(0.0);
    let bins0 = axis0.bins();
    let bins1 = axis1.bins();
    let intensity = Array2::from_shape_vec((bins0, bins1), accum.normalized(fill))
        .expect("normalized length matches bin grid");
    let (sum_data, sum_count) = accum.into_arrays_2d(bins0, bins1);
    Integrated2d {
        intensity,
        radial: axis0.centers(),
        azimuthal: axis1.centers(),
        sum_data,
        sum_count,
    }
}
