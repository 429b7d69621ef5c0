//! 2D pixel splitter: distributes each pixel quadrilateral over a
//! (radial, azimuthal) bin grid in proportion to overlap area.
//!
//! Most detector pixels land in a single output cell or span a single row
//! or column, so those cases take fast paths (unit deposit, or the same
//! strip integration the 1D splitter uses). The general case classifies
//! the lattice points of the pixel's bounding box as inside/outside the
//! quadrilateral: cells with all four surrounding lattice points inside
//! are fully covered and deposit one cell area worth of weight, cells
//! with a mixed classification are clipped against the unit cell with
//! four Sutherland-Hodgman passes.
//!
//! Azimuthal coordinates pass through the ±π wrap transform before bin
//! conversion, so a pixel straddling the cut stays contiguous in bin
//! space; bins pushed past the axis end by the shift are clipped.

use std::ops::Range;

use ndarray::{ArrayView1, ArrayView3};

use crate::accumulate::Accumulator;
use crate::axis::{crosses_pi_cut, unwrap_azimuth, BinAxis};
use crate::corrections::CorrectionPipeline;
use crate::geometry::{cell_overlap_area, quad_area, side_of_line, ClipPolygon, Point};
use crate::split1d::split_strip;

/// Inside/outside flags for the lattice points of one pixel's bounding
/// box. Reused across pixels; grows to the largest box seen.
#[derive(Debug, Default)]
pub(crate) struct InsideGrid {
    flags: Vec<u8>,
    cols: usize,
}

impl InsideGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear and resize for a bounding box of `span0 x span1` cells,
    /// which has `(span0 + 1) x (span1 + 1)` lattice points.
    fn reset(&mut self, span0: usize, span1: usize) {
        self.cols = span1 + 1;
        self.flags.clear();
        self.flags.resize((span0 + 1) * self.cols, 0);
    }

    fn set(&mut self, i: usize, j: usize, value: u8) {
        self.flags[i * self.cols + j] = value;
    }

    fn get(&self, i: usize, j: usize) -> u8 {
        self.flags[i * self.cols + j]
    }
}

/// Rebin the pixels of `range` into the 2D histogram.
///
/// Returns the number of pixels discarded for falling outside the output
/// ranges.
pub(crate) fn split_range_2d(
    pos: &ArrayView3<f64>,
    weights: &ArrayView1<f64>,
    pipeline: &CorrectionPipeline,
    axis0: &BinAxis,
    axis1: &BinAxis,
    range: Range<usize>,
    accum: &mut Accumulator,
    scratch: &mut InsideGrid,
) -> usize {
    let bins0 = axis0.bins();
    let bins1 = axis1.bins();
    let mut outside = 0usize;

    for idx in range {
        let Some(intensity) = pipeline.corrected(idx, weights[idx]) else {
            continue;
        };

        let p1_raw = [
            pos[[idx, 0, 1]],
            pos[[idx, 1, 1]],
            pos[[idx, 2, 1]],
            pos[[idx, 3, 1]],
        ];
        let wrap = crosses_pi_cut(p1_raw[0], p1_raw[1], p1_raw[2], p1_raw[3]);
        let azimuth = |v: f64| {
            if wrap {
                axis1.fractional(unwrap_azimuth(v))
            } else {
                axis1.fractional(v)
            }
        };

        let a = Point::new(axis0.fractional(pos[[idx, 0, 0]]), azimuth(p1_raw[0]));
        let b = Point::new(axis0.fractional(pos[[idx, 1, 0]]), azimuth(p1_raw[1]));
        let c = Point::new(axis0.fractional(pos[[idx, 2, 0]]), azimuth(p1_raw[2]));
        let d = Point::new(axis0.fractional(pos[[idx, 3, 0]]), azimuth(p1_raw[3]));
        if !(a.x.is_finite() && b.x.is_finite() && c.x.is_finite() && d.x.is_finite())
            || !(a.y.is_finite() && b.y.is_finite() && c.y.is_finite() && d.y.is_finite())
        {
            continue;
        }

        let min0 = a.x.min(b.x).min(c.x).min(d.x);
        let max0 = a.x.max(b.x).max(c.x).max(d.x);
        let min1 = a.y.min(b.y).min(c.y).min(d.y);
        let max1 = a.y.max(b.y).max(c.y).max(d.y);
        if max0 < 0.0 || min0 >= bins0 as f64 || max1 < 0.0 || min1 >= bins1 as f64 {
            outside += 1;
            continue;
        }

        let bin0_min = min0.floor() as isize;
        let bin0_max = max0.floor() as isize;
        let bin1_min = min1.floor() as isize;
        let bin1_max = max1.floor() as isize;

        if bin0_min == bin0_max && bin1_min == bin1_max {
            // Whole pixel inside one cell. The unchecked index is safe
            // only because the discard above rejected bounding boxes with
            // min0 >= bins0 or min1 >= bins1, and equal floors with a
            // non-negative max put both indices at 0 or above.
            debug_assert!(
                bin0_min >= 0
                    && (bin0_min as usize) < bins0
                    && bin1_min >= 0
                    && (bin1_min as usize) < bins1,
                "single-cell pixel escaped the range discard: ({bin0_min}, {bin1_min})"
            );
            let cell = bin0_min as usize * bins1 + bin1_min as usize;
            accum.deposit(cell, 1.0, intensity);
            continue;
        }

        let area = quad_area(a, b, c, d);
        if area == 0.0 {
            continue;
        }
        let inv_area = 1.0 / area;

        if bin0_min == bin0_max {
            // Single radial column: strip integration along the azimuth,
            // with the edges expressed as pos0 = slope * pos1 + intercept.
            let i = bin0_min as usize;
            split_strip(
                [a.y, b.y, c.y, d.y],
                [a.x, b.x, c.x, d.x],
                bin1_min,
                bin1_max,
                inv_area,
                &mut |j, weight| {
                    if j >= 0 && (j as usize) < bins1 {
                        accum.deposit(i * bins1 + j as usize, weight, intensity);
                    }
                },
            );
            continue;
        }

        if bin1_min == bin1_max {
            // Single azimuthal row: strip integration along the radius.
            let j = bin1_min as usize;
            split_strip(
                [a.x, b.x, c.x, d.x],
                [a.y, b.y, c.y, d.y],
                bin0_min,
                bin0_max,
                inv_area,
                &mut |i, weight| {
                    if i >= 0 && (i as usize) < bins0 {
                        accum.deposit(i as usize * bins1 + j, weight, intensity);
                    }
                },
            );
            continue;
        }

        // General case: classify lattice points, then visit every cell of
        // the bounding box.
        let shift0 = bin0_min as f64;
        let shift1 = bin1_min as f64;
        let ta = Point::new(a.x - shift0, a.y - shift1);
        let tb = Point::new(b.x - shift0, b.y - shift1);
        let tc = Point::new(c.x - shift0, c.y - shift1);
        let td = Point::new(d.x - shift0, d.y - shift1);
        let span0 = (bin0_max - bin0_min) as usize + 1;
        let span1 = (bin1_max - bin1_min) as usize + 1;

        scratch.reset(span0, span1);
        for i in 1..span0 {
            for j in 1..span1 {
                let q = Point::new(i as f64, j as f64);
                let sides = side_of_line(ta, tb, q)
                    + side_of_line(tb, tc, q)
                    + side_of_line(tc, td, q)
                    + side_of_line(td, ta, q);
                scratch.set(i, j, (sides.unsigned_abs() / 4) as u8);
            }
        }

        let quad = ClipPolygon::quad(ta, tb, tc, td);
        for ci in 0..span0 {
            let g0 = bin0_min + ci as isize;
            if g0 < 0 || g0 as usize >= bins0 {
                continue;
            }
            for cj in 0..span1 {
                let g1 = bin1_min + cj as isize;
                if g1 < 0 || g1 as usize >= bins1 {
                    continue;
                }
                let corners = scratch.get(ci, cj)
                    + scratch.get(ci, cj + 1)
                    + scratch.get(ci + 1, cj)
                    + scratch.get(ci + 1, cj + 1);
                let cell = g0 as usize * bins1 + g1 as usize;
                if corners == 4 {
                    // Cell fully covered; cells have unit area in bin
                    // coordinates.
                    accum.deposit(cell, inv_area, intensity);
                } else if corners > 0 {
                    let overlap = cell_overlap_area(&quad, ci as f64, cj as f64);
                    accum.deposit(cell, overlap * inv_area, intensity);
                }
            }
        }
    }

    outside
}
