use crate::{
    bands::BandDefinition,
    constants::DEFAULT_MIN_PIXEL_SEPARATION,
    error::{MaskError, Result},
    instrument::{Dispersion, Instrument},
    placement::PlacementParams,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumString};

/// Whether placed slits are grown into the free sky afterwards
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SlitMode {
    #[default]
    #[serde(alias = "N")]
    #[strum(to_string = "normal", serialize = "N")]
    Normal,
    #[serde(alias = "M")]
    #[strum(to_string = "max", serialize = "M")]
    Max,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub instrument: InstrumentConfig,
    pub placement: PlacementConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub catalog: Option<PathBuf>,
    pub fov: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub name: Instrument,
    /// Pre-image pixel scale (arcsec/pixel)
    pub pixel_scale: f64,
    pub dispersion: Dispersion,
    /// Reference pixel of the field-of-view coordinates
    pub crpix1: f64,
    pub crpix2: f64,
    pub min_pixel_separation: f64,
    pub det_img: String,
    pub det_spec: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            name: Instrument::GmosNorth,
            pixel_scale: 0.0807,
            dispersion: Dispersion::Horizontal,
            crpix1: 0.0,
            crpix2: 0.0,
            min_pixel_separation: DEFAULT_MIN_PIXEL_SEPARATION,
            det_img: String::new(),
            det_spec: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub num_masks: usize,
    pub slit_mode: SlitMode,
    /// Fraction of the slit length a slit may be shifted by
    pub wiggle_factor: f64,
    /// Rescue removed slits on every mask, not just the first one
    pub wiggle_all_masks: bool,
    pub pack_spectra: bool,
    /// Nod-and-shuffle setup, empty when not shuffling
    pub band_config: String,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            num_masks: 1,
            slit_mode: SlitMode::Normal,
            wiggle_factor: 0.0,
            wiggle_all_masks: false,
            pack_spectra: true,
            band_config: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Mask catalogs are written as `<root><n>.cat`
    pub root: String,
    pub ra_imag: String,
    pub dec_imag: String,
    pub summary_json: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: "mask".to_string(),
            ra_imag: String::new(),
            dec_imag: String::new(),
            summary_json: None,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MaskError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            MaskError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let scale = self.instrument.pixel_scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(MaskError::Config(format!(
                "pixel_scale must be positive, got {}",
                scale
            )));
        }
        self.instrument.name.nominal_pixel_scale(scale)?;

        let separation = self.instrument.min_pixel_separation;
        if !separation.is_finite() || separation < 0.0 {
            return Err(MaskError::Config(format!(
                "min_pixel_separation must not be negative, got {}",
                separation
            )));
        }

        if self.placement.num_masks == 0 {
            return Err(MaskError::Config(
                "num_masks must be at least 1".to_string(),
            ));
        }

        let wiggle = self.placement.wiggle_factor;
        if !wiggle.is_finite() || wiggle < 0.0 {
            return Err(MaskError::Config(format!(
                "wiggle_factor must not be negative, got {}",
                wiggle
            )));
        }

        if self.output.root.trim().is_empty() {
            return Err(MaskError::Config("output root must not be empty".to_string()));
        }

        self.bands()?;
        Ok(())
    }

    pub fn bands(&self) -> Result<Option<BandDefinition>> {
        BandDefinition::parse(&self.placement.band_config, self.instrument.pixel_scale)
    }

    pub fn placement_params(&self, bands: Option<&BandDefinition>) -> PlacementParams {
        PlacementParams::new(
            self.instrument.pixel_scale,
            self.instrument.min_pixel_separation,
            bands.map_or(0.0, BandDefinition::microshuffle_px),
            self.instrument.dispersion,
        )
    }

    /// File name of the n-th mask catalog, counting from one
    pub fn mask_path(&self, number: usize) -> PathBuf {
        PathBuf::from(format!("{}{}.cat", self.output.root, number))
    }
}
