/// Minimum clearance between adjacent slit edges (pixels)
pub const LASER_PAD_VERTICAL: f64 = 2.685;
pub const LASER_PAD_HORIZONTAL: f64 = 2.7;

/// Default minimum separation of two spectra (pixels)
pub const DEFAULT_MIN_PIXEL_SEPARATION: f64 = 4.0;

/// Acquisition boxes are square (arcsec)
pub const ACQUISITION_BOX_ARCSEC: f64 = 2.0;

/// Fewer placed acquisition objects than this triggers a warning
pub const MIN_ACQUISITION_SLITS: usize = 2;

/// Max-sky growth per iteration and hard iteration cap
pub const EXPANSION_STEP_PX: f64 = 1.0;
pub const MAX_EXPANSION_ITERATIONS: usize = 10_000;

/// Extra gap left by a wiggle on top of the required clearance (pixels)
pub const WIGGLE_MARGIN_PX: f64 = 0.01;

/// Input catalog rows carry exactly this many columns
pub const INPUT_FIELD_COUNT: usize = 16;

/// Keywords in the field-of-view file
pub const FOV_DIM_CORNER: &str = "DIM_CORNER";
pub const FOV_CORNER: &str = "FOV_CORNER";
pub const DETECTOR_CORNER_COUNT: usize = 4;
pub const MIN_FOV_VERTICES: usize = 3;
