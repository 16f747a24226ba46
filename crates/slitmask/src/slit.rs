use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

pub type SlitId = i64;

/// Selection tier of a catalog object. Acquisition objects come first,
/// science tiers follow in order of decreasing importance.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Priority {
    #[strum(serialize = "0")]
    Acquisition,
    #[strum(serialize = "1")]
    First,
    #[strum(serialize = "2")]
    Second,
    #[strum(serialize = "3")]
    Third,
}

impl Priority {
    pub const SCIENCE: [Priority; 3] = [Priority::First, Priority::Second, Priority::Third];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Priority::Acquisition),
            '1' => Some(Priority::First),
            '2' => Some(Priority::Second),
            '3' => Some(Priority::Third),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Priority::Acquisition => '0',
            Priority::First => '1',
            Priority::Second => '2',
            Priority::Third => '3',
        }
    }
}

/// Catalog values of an object as read from the input, before any placement.
///
/// Positions are detector pixels, offsets and sizes are arcsec. Sizes already carry
/// the acquisition and micro-shuffle overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub ra: f64,
    pub dec: f64,
    pub ccd_l: f64,
    pub ccd_w: f64,
    pub offset_l: f64,
    pub offset_w: f64,
    pub length: f64,
    pub width: f64,
    pub angle: f64,
    pub magnitude: f64,
    pub slit_type: char,
    pub redshift: f64,
}

/// A candidate slit with its detector footprint.
///
/// "Length" runs perpendicular to the dispersion, "width" along it. All
/// coordinates below are pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slit {
    pub id: SlitId,
    pub priority: Priority,
    pub slit_start: f64,
    pub slit_end: f64,
    pub slit_top: f64,
    pub slit_bottom: f64,
    pub ccd_l: f64,
    pub ccd_w: f64,
    pub slit_length: f64,
    pub slit_width: f64,
    /// Offset of the slit centre from the object along the length axis
    pub spec_pos_l: f64,
    pub spec_start: f64,
    pub spec_end: f64,
    pub wiggle_room: f64,
    pub wiggle_used: bool,
    pub catalog: CatalogEntry,
}

impl Slit {
    /// Builds the pixel footprint of a catalog entry.
    ///
    /// Non-acquisition, untilted slits receive `wiggle_factor * length` of wiggle
    /// budget. Everything else starts with its budget already spent.
    pub fn from_catalog(
        id: SlitId,
        priority: Priority,
        catalog: CatalogEntry,
        spectrum: (f64, f64),
        pixel_scale: f64,
        wiggle_factor: f64,
    ) -> Self {
        let length = catalog.length / pixel_scale;
        let width = catalog.width / pixel_scale;
        let ccd_l = catalog.ccd_l + catalog.offset_l / pixel_scale;
        let ccd_w = catalog.ccd_w + catalog.offset_w / pixel_scale;

        let wiggles =
            priority != Priority::Acquisition && catalog.angle == 0.0 && wiggle_factor > 0.0;
        let wiggle_room = if wiggles { wiggle_factor * length } else { 0.0 };

        Slit {
            id,
            priority,
            slit_start: ccd_l - length / 2.0,
            slit_end: ccd_l + length / 2.0,
            slit_top: ccd_w + width / 2.0,
            slit_bottom: ccd_w - width / 2.0,
            ccd_l,
            ccd_w,
            slit_length: length,
            slit_width: width,
            spec_pos_l: catalog.offset_l / pixel_scale,
            spec_start: spectrum.0,
            spec_end: spectrum.1,
            wiggle_room,
            wiggle_used: !wiggles,
            catalog,
        }
    }

    pub fn is_acquisition(&self) -> bool {
        self.priority == Priority::Acquisition
    }

    pub fn is_tilted(&self) -> bool {
        self.catalog.angle != 0.0
    }

    /// Wiggle budget still available to this slit
    pub fn available_wiggle(&self) -> f64 {
        if self.wiggle_used { 0.0 } else { self.wiggle_room }
    }

    /// Moves the slit rigidly along the length axis
    pub fn shift_length(&mut self, delta: f64) {
        self.ccd_l += delta;
        self.slit_start += delta;
        self.slit_end += delta;
    }

    /// Length-axis position used to rank slits by centrality
    pub fn spectrum_center(&self) -> f64 {
        self.ccd_l + self.spec_pos_l
    }

    pub fn current_length(&self) -> f64 {
        self.slit_end - self.slit_start
    }
}
