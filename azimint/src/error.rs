//! Error types for the integration entry points.

use thiserror::Error;

/// Errors raised by input validation, before any accumulation happens.
///
/// Per-pixel anomalies (degenerate quadrilaterals, non-finite coordinates,
/// out-of-range pixels) never raise; they are skipped inside the kernel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    /// The pixel corner array is not of shape (N, 4, 2).
    #[error("corner array has shape {shape:?}, expected (N, 4, 2)")]
    CornerShape {
        /// Shape that was actually supplied.
        shape: Vec<usize>,
    },

    /// A per-pixel array does not have one entry per pixel.
    #[error("{name} array has length {got}, expected {expected} (one entry per pixel)")]
    ArrayLength {
        /// Which input the mismatch was found in.
        name: &'static str,
        /// Supplied length.
        got: usize,
        /// Number of pixels in the corner array.
        expected: usize,
    },

    /// A histogram was requested with zero bins.
    #[error("histogram must have at least one bin")]
    EmptyBins,
}
