//! Binning axes and the azimuthal wrap-around transform.
//!
//! A [`BinAxis`] maps a real angular coordinate to a fractional bin index
//! over a uniform half-open range. The upper bound is always expanded by
//! one float32 ulp so that the maximum input value maps strictly below the
//! last bin edge and is counted in the last bin rather than falling off
//! the axis.
//!
//! The azimuthal coordinate is periodic with period 2π. A pixel whose
//! corners straddle the ±π cut would be torn across both ends of the axis
//! if its corners were converted naively; [`crosses_pi_cut`] detects such
//! pixels and [`unwrap_azimuth`] shifts their negative corners by +2π so
//! the quadrilateral stays contiguous in bin space. The shifted bins may
//! exceed the valid range; the splitters clip against it.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// One float32 ulp, the relative slack added to derived upper bounds.
const EPS32: f64 = f32::EPSILON as f64;

/// A uniform binning axis over a half-open coordinate range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinAxis {
    lo: f64,
    hi: f64,
    delta: f64,
    bins: usize,
}

impl BinAxis {
    /// Axis over an explicit range. The bounds may be given in either
    /// order; the upper bound is expanded by one float32 ulp.
    ///
    /// `bins` must be nonzero; the entry points validate this before
    /// constructing an axis.
    pub fn new(bins: usize, bound_a: f64, bound_b: f64) -> Self {
        let lo = bound_a.min(bound_b);
        let hi = expand_upper(bound_a.max(bound_b));
        Self {
            lo,
            hi,
            delta: (hi - lo) / bins as f64,
            bins,
        }
    }

    /// Axis spanning the finite values produced by `values`.
    ///
    /// Non-finite entries are ignored; when nothing remains the axis falls
    /// back to the unit range so that empty inputs still produce a
    /// well-formed (empty) histogram.
    pub fn from_data(bins: usize, values: impl Iterator<Item = f64>) -> Self {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for v in values {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        if lo > hi {
            lo = 0.0;
            hi = 1.0;
        }
        Self::new(bins, lo, hi)
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Width of one bin.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Fractional bin index of a coordinate.
    pub fn fractional(&self, x: f64) -> f64 {
        (x - self.lo) / self.delta
    }

    /// Center coordinate of every bin.
    pub fn centers(&self) -> ndarray::Array1<f64> {
        ndarray::Array1::from_shape_fn(self.bins, |k| self.lo + (k as f64 + 0.5) * self.delta)
    }
}

/// Expanded upper bound: one float32 ulp above `hi`, away from the range.
fn expand_upper(hi: f64) -> f64 {
    if hi == 0.0 {
        EPS32
    } else {
        hi + hi.abs() * EPS32
    }
}

/// True when a quadrilateral's azimuthal corners straddle the ±π cut.
///
/// The predicate is the disjunction of the six ways of placing two of the
/// four corners above +π/2 with the remaining two below −π/2. Pixels with
/// all four corners in the same half never trigger it, so ordinary pixels
/// far from the cut are converted unshifted.
pub fn crosses_pi_cut(a: f64, b: f64, c: f64, d: f64) -> bool {
    let up = |v: f64| v > FRAC_PI_2;
    let down = |v: f64| v < -FRAC_PI_2;
    (up(a) && up(b) && down(c) && down(d))
        || (up(a) && up(c) && down(b) && down(d))
        || (up(a) && up(d) && down(b) && down(c))
        || (up(b) && up(c) && down(a) && down(d))
        || (up(b) && up(d) && down(a) && down(c))
        || (up(c) && up(d) && down(a) && down(b))
}

/// Shift a negative azimuth by one period so a cut-straddling pixel stays
/// contiguous in bin space.
pub fn unwrap_azimuth(v: f64) -> f64 {
    if v < 0.0 {
        v + 2.0 * PI
    } else {
        v
    }
}
