//! Azimuthal integration core for X-ray powder diffraction.
//!
//! Given a 2D detector image and a per-pixel mapping of each pixel's
//! quadrilateral footprint into two angular coordinates (radial `pos0`,
//! azimuthal `pos1`), this crate histograms intensity as a function of
//! `pos0` or of `(pos0, pos1)`, splitting every pixel across the output
//! bins it overlaps in proportion to the geometric overlap area. Per-pixel
//! corrections (mask, sentinel values, dark, flat-field, polarization,
//! solid angle) are applied before accumulation.
//!
//! Pixel corner positions are produced by an external geometry layer and
//! consumed here as an (N, 4, 2) array; the crate neither computes
//! geometry nor interprets physical units.
//!
//! # Example
//!
//! ```
//! use azimint::{integrate_1d, IntegrationConfig};
//! use ndarray::{Array1, Array3};
//!
//! // One pixel, a 0.1 x 0.1 quadrilateral around pos0 = 1.25.
//! let mut pos = Array3::zeros((1, 4, 2));
//! for (c, (x, y)) in [(1.2, 0.0), (1.3, 0.0), (1.3, 0.1), (1.2, 0.1)]
//!     .iter()
//!     .enumerate()
//! {
//!     pos[[0, c, 0]] = *x;
//!     pos[[0, c, 1]] = *y;
//! }
//! let weights = Array1::from(vec![7.0]);
//! let config = IntegrationConfig {
//!     pos0_range: Some((0.0, 10.0)),
//!     ..Default::default()
//! };
//!
//! let result = integrate_1d(pos.view(), weights.view(), 10, &config).unwrap();
//! assert_eq!(result.sum_count[1], 1.0);
//! assert_eq!(result.intensity[1], 7.0);
//! ```

mod accumulate;
mod corrections;
mod split1d;
mod split2d;

pub mod axis;
pub mod error;
pub mod geometry;
pub mod integrate;

pub use axis::BinAxis;
pub use error::IntegrationError;
pub use integrate::{
    corners_from_image, integrate_1d, integrate_1d_parallel, integrate_2d, integrate_2d_parallel,
    Integrated1d, Integrated2d, IntegrationConfig,
};
