use crate::{
    constants::{LASER_PAD_HORIZONTAL, LASER_PAD_VERTICAL},
    error::{MaskError, Result},
};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Direction in which spectra are dispersed on the detector.
///
/// Slits are always long along the axis perpendicular to the dispersion, so the
/// dispersion direction decides which detector axis is "length" and which is "width".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Dispersion {
    #[default]
    Horizontal,
    Vertical,
}

impl Dispersion {
    pub fn laser_pad(self) -> f64 {
        match self {
            Dispersion::Vertical => LASER_PAD_VERTICAL,
            Dispersion::Horizontal => LASER_PAD_HORIZONTAL,
        }
    }

    /// Splits a detector (x, y) pair into (spatial, spectral) components
    pub fn split(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Dispersion::Horizontal => (y, x),
            Dispersion::Vertical => (x, y),
        }
    }
}

/// Supported spectrographs
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum Instrument {
    #[default]
    #[serde(rename = "GMOS-N")]
    #[strum(serialize = "GMOS-N")]
    GmosNorth,
    #[serde(rename = "GMOS-S")]
    #[strum(serialize = "GMOS-S")]
    GmosSouth,
    #[serde(rename = "F2")]
    #[strum(serialize = "F2")]
    Flamingos2,
}

impl Instrument {
    /// Nominal pixel scale written to the catalog header.
    ///
    /// The measured pixel scale of the pre-image is mapped onto the detector/binning
    /// combination it belongs to. Anything that does not match is rejected.
    pub fn nominal_pixel_scale(self, pixel_scale: f64) -> Result<f64> {
        // (lower bound, lower bound inclusive, upper bound, nominal scale)
        let table: &[(f64, bool, f64, f64)] = match self {
            Instrument::Flamingos2 => return Ok(0.1792),
            Instrument::GmosNorth => &[
                (0.071, false, 0.075, 0.0727), // EEV 1x1
                (0.075, true, 0.085, 0.0807),  // Hamamatsu 1x1
                (0.142, false, 0.150, 0.1454), // EEV 2x2
                (0.150, true, 0.170, 0.1614),  // Hamamatsu 2x2
            ],
            Instrument::GmosSouth => &[
                (0.071, false, 0.075, 0.0730),
                (0.075, true, 0.085, 0.0800),
                (0.142, false, 0.150, 0.1460),
                (0.150, true, 0.170, 0.1600),
            ],
        };

        table
            .iter()
            .find(|(lo, inclusive, hi, _)| {
                let above = if *inclusive {
                    pixel_scale >= *lo
                } else {
                    pixel_scale > *lo
                };
                above && pixel_scale < *hi
            })
            .map(|(_, _, _, nominal)| *nominal)
            .ok_or_else(|| {
                MaskError::Instrument(format!(
                    "pixel scale {} does not match any {} configuration",
                    pixel_scale, self
                ))
            })
    }
}
