use crate::{
    constants::WIGGLE_MARGIN_PX,
    instrument::Dispersion,
    slit::{Slit, SlitId},
};

/// Geometric parameters shared by every conflict test on one mask design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams {
    pub pixel_scale: f64,
    /// Minimum separation of two spectra, stored in arcsec
    pub min_separation: f64,
    /// Micro-shuffle slack added along the slit length (pixels), zero otherwise
    pub microshuffle_px: f64,
    pub dispersion: Dispersion,
}

impl PlacementParams {
    pub fn new(
        pixel_scale: f64,
        min_pixel_separation: f64,
        microshuffle_px: f64,
        dispersion: Dispersion,
    ) -> Self {
        Self {
            pixel_scale,
            min_separation: min_pixel_separation * pixel_scale,
            microshuffle_px,
            dispersion,
        }
    }

    pub fn min_separation_px(&self) -> f64 {
        self.min_separation / self.pixel_scale
    }

    pub fn laser_pad(&self) -> f64 {
        self.dispersion.laser_pad()
    }

    /// Padding applied along the length axis
    pub fn length_padding(&self) -> f64 {
        self.microshuffle_px + self.min_separation_px()
    }

    /// Edge-to-edge gap a wiggle aims for
    pub fn wiggle_clearance(&self) -> f64 {
        self.length_padding().max(self.laser_pad()) + WIGGLE_MARGIN_PX
    }
}

/// Whether `two` may not share a mask with `one`.
///
/// Acquisition boxes never conflict with each other. When the padded slits overlap
/// along their length, only overlapping spectra count. Otherwise the slit edges must
/// still keep the laser pad if the slits sit side by side.
pub fn conflicts(one: &Slit, two: &Slit, params: &PlacementParams) -> bool {
    if one.is_acquisition() && two.is_acquisition() {
        return false;
    }

    let pad = params.length_padding();
    let length_overlap = (two.slit_end >= one.slit_start - pad
        && two.slit_end <= one.slit_end + pad)
        || (two.slit_start >= one.slit_start - pad && two.slit_start <= one.slit_end + pad)
        || (two.slit_start <= one.slit_start + pad && two.slit_end >= one.slit_end - pad);

    if length_overlap {
        return spectra_overlap(one, two, params.min_separation_px());
    }

    laser_pad_violated(one, two, params.laser_pad())
}

fn spectra_overlap(one: &Slit, two: &Slit, sep: f64) -> bool {
    let (a1, a2) = (one.spec_start, one.spec_end);
    let (b1, b2) = (two.spec_start, two.spec_end);

    (b1 <= a2 + sep && b1 >= a1 - sep)
        || (b2 >= a1 - sep && b2 <= a2 + sep)
        || (b1 <= a1 + sep && b2 >= a2 - sep)
        || (b1 >= a1 + sep && b2 <= a2 - sep)
}

fn laser_pad_violated(one: &Slit, two: &Slit, pad: f64) -> bool {
    let edges_close = (two.slit_end < one.slit_start && one.slit_start - pad < two.slit_end)
        || (two.slit_start > one.slit_end && one.slit_end + pad > two.slit_start);
    let widths_overlap = (two.slit_top < one.slit_top + pad
        || two.slit_bottom < one.slit_top + pad)
        && (two.slit_top > one.slit_bottom - pad || two.slit_bottom > one.slit_bottom - pad);

    edges_close && widths_overlap
}

/// Tests the predicate in both argument orders
pub fn pair_conflicts(one: &Slit, two: &Slit, params: &PlacementParams) -> bool {
    conflicts(one, two, params) || conflicts(two, one, params)
}

/// Whether `test` conflicts with any of `others`, skipping itself and `except`
pub fn check_conflicts<'a>(
    test: &Slit,
    except: Option<SlitId>,
    others: impl IntoIterator<Item = &'a Slit>,
    params: &PlacementParams,
) -> bool {
    others
        .into_iter()
        .filter(|other| other.id != test.id && Some(other.id) != except)
        .any(|other| pair_conflicts(test, other, params))
}
