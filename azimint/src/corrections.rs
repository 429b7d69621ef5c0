//! Per-pixel validity checks and intensity corrections.
//!
//! Before a pixel is rebinned its raw intensity passes through a short
//! pipeline: masked pixels and sentinel ("dummy") values are dropped, a
//! dark signal is subtracted, and the result is divided by the flat-field,
//! polarization and solid-angle factors that were supplied. Every step is
//! optional and enabled exactly by the presence of its input array.

use ndarray::ArrayView1;

use crate::integrate::IntegrationConfig;

/// The correction steps of one invocation, resolved from the configuration.
///
/// Holds borrowed views; building one is free and done once per call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CorrectionPipeline<'a> {
    mask: Option<ArrayView1<'a, i8>>,
    dummy: Option<f64>,
    delta_dummy: f64,
    dark: Option<ArrayView1<'a, f64>>,
    flat: Option<ArrayView1<'a, f64>>,
    polarization: Option<ArrayView1<'a, f64>>,
    solid_angle: Option<ArrayView1<'a, f64>>,
}

impl<'a> CorrectionPipeline<'a> {
    pub fn new(config: &IntegrationConfig<'a>) -> Self {
        Self {
            mask: config.mask,
            dummy: config.dummy,
            delta_dummy: config.delta_dummy.unwrap_or(0.0),
            dark: config.dark,
            flat: config.flat,
            polarization: config.polarization,
            solid_angle: config.solid_angle,
        }
    }

    /// Corrected intensity of pixel `idx`, or `None` when the pixel is
    /// masked out or matches the dummy sentinel.
    ///
    /// Corrections apply in a fixed order: dark subtraction first, then
    /// division by flat-field, polarization and solid angle. Negative
    /// corrected intensities are valid and kept.
    pub fn corrected(&self, idx: usize, raw: f64) -> Option<f64> {
        if let Some(mask) = &self.mask {
            if mask[idx] != 0 {
                return None;
            }
        }
        if let Some(dummy) = self.dummy {
            let is_dummy = if self.delta_dummy > 0.0 {
                (raw - dummy).abs() <= self.delta_dummy
            } else {
                raw == dummy
            };
            if is_dummy {
                return None;
            }
        }
        let mut value = raw;
        if let Some(dark) = &self.dark {
            value -= dark[idx];
        }
        if let Some(flat) = &self.flat {
            value /= flat[idx];
        }
        if let Some(polarization) = &self.polarization {
            value /= polarization[idx];
        }
        if let Some(solid_angle) = &self.solid_angle {
            value /= solid_angle[idx];
        }
        Some(value)
    }
}
