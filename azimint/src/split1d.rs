//! 1D pixel splitter: distributes each pixel quadrilateral over radial
//! bins in proportion to overlap area.
//!
//! The overlap of a quadrilateral with one bin column is obtained without
//! constructing the clipped polygon: the four corner abscissae are clamped
//! to the column span and the signed [`line_integrate`] contributions of
//! the four directed edges are summed. By Green's theorem the magnitude of
//! that sum is the area of the quadrilateral restricted to the column.
//! Dividing by the full quadrilateral area yields the fraction of the
//! pixel deposited into the bin.

use std::ops::Range;

use ndarray::{ArrayView1, ArrayView3};

use crate::accumulate::Accumulator;
use crate::axis::BinAxis;
use crate::corrections::CorrectionPipeline;
use crate::geometry::{line_integrate, quad_area, Edge, Point};

/// Distribute `|partial area| / pixel area` over the columns spanned by a
/// quadrilateral strip.
///
/// `main` holds the four corner coordinates along the split axis in bin
/// units, `cross` the transverse coordinates (any consistent unit).
/// `bin_lo`/`bin_hi` are the floors of the extreme `main` values. The
/// deposit callback receives each spanned bin index, including indices
/// outside the valid range; the caller filters.
///
/// Corners are translated so the lowest spanned bin becomes column zero,
/// which keeps the clamped abscissae small regardless of where on the
/// axis the pixel falls.
pub(crate) fn split_strip(
    main: [f64; 4],
    cross: [f64; 4],
    bin_lo: isize,
    bin_hi: isize,
    inv_area: f64,
    deposit: &mut impl FnMut(isize, f64),
) {
    let shift = bin_lo as f64;
    let m = [
        main[0] - shift,
        main[1] - shift,
        main[2] - shift,
        main[3] - shift,
    ];
    let a = Point::new(m[0], cross[0]);
    let b = Point::new(m[1], cross[1]);
    let c = Point::new(m[2], cross[2]);
    let d = Point::new(m[3], cross[3]);
    let ab = Edge::through(a, b);
    let bc = Edge::through(b, c);
    let cd = Edge::through(c, d);
    let da = Edge::through(d, a);

    for u in 0..=(bin_hi - bin_lo) {
        let lo = u as f64;
        let hi = lo + 1.0;
        let a_lim = m[0].clamp(lo, hi);
        let b_lim = m[1].clamp(lo, hi);
        let c_lim = m[2].clamp(lo, hi);
        let d_lim = m[3].clamp(lo, hi);
        let partial = line_integrate(a_lim, b_lim, ab)
            + line_integrate(b_lim, c_lim, bc)
            + line_integrate(c_lim, d_lim, cd)
            + line_integrate(d_lim, a_lim, da);
        deposit(bin_lo + u, partial.abs() * inv_area);
    }
}

/// Rebin the pixels of `range` into the radial histogram.
///
/// Returns the number of pixels discarded for falling outside the output
/// range (including the optional azimuthal acceptance window).
pub(crate) fn split_range_1d(
    pos: &ArrayView3<f64>,
    weights: &ArrayView1<f64>,
    pipeline: &CorrectionPipeline,
    axis: &BinAxis,
    pos1_window: Option<(f64, f64)>,
    range: Range<usize>,
    accum: &mut Accumulator,
) -> usize {
    let bins = axis.bins();
    let mut outside = 0usize;

    for idx in range {
        let Some(intensity) = pipeline.corrected(idx, weights[idx]) else {
            continue;
        };

        let a0 = axis.fractional(pos[[idx, 0, 0]]);
        let b0 = axis.fractional(pos[[idx, 1, 0]]);
        let c0 = axis.fractional(pos[[idx, 2, 0]]);
        let d0 = axis.fractional(pos[[idx, 3, 0]]);
        let a1 = pos[[idx, 0, 1]];
        let b1 = pos[[idx, 1, 1]];
        let c1 = pos[[idx, 2, 1]];
        let d1 = pos[[idx, 3, 1]];
        if !(a0.is_finite() && b0.is_finite() && c0.is_finite() && d0.is_finite())
            || !(a1.is_finite() && b1.is_finite() && c1.is_finite() && d1.is_finite())
        {
            continue;
        }

        let min0 = a0.min(b0).min(c0).min(d0);
        let max0 = a0.max(b0).max(c0).max(d0);
        if max0 < 0.0 || min0 >= bins as f64 {
            outside += 1;
            continue;
        }
        if let Some((lo1, hi1)) = pos1_window {
            let min1 = a1.min(b1).min(c1).min(d1);
            let max1 = a1.max(b1).max(c1).max(d1);
            if max1 < lo1 || min1 > hi1 {
                outside += 1;
                continue;
            }
        }

        let bin0_min = min0.floor() as isize;
        let bin0_max = max0.floor() as isize;

        if bin0_min == bin0_max {
            // Whole pixel inside one bin.
            accum.deposit(bin0_min as usize, 1.0, intensity);
            continue;
        }

        let area = quad_area(
            Point::new(a0, a1),
            Point::new(b0, b1),
            Point::new(c0, c1),
            Point::new(d0, d1),
        );
        if area == 0.0 {
            continue;
        }
        let inv_area = 1.0 / area;

        split_strip(
            [a0, b0, c0, d0],
            [a1, b1, c1, d1],
            bin0_min,
            bin0_max,
            inv_area,
            &mut |bin, weight| {
                if bin >= 0 && (bin as usize) < bins {
                    accum.deposit(bin as usize, weight, intensity);
                }
            },
        );
    }

    outside
}
