use super::whitespace_records;
use crate::{
    bands::{BandDefinition, ShuffleMode},
    constants::{ACQUISITION_BOX_ARCSEC, INPUT_FIELD_COUNT},
    error::{MaskError, Result},
    instrument::Dispersion,
    slit::{CatalogEntry, Priority, Slit, SlitId},
};
use log::{debug, info, warn};
use std::{collections::BTreeMap, fs::File, io::Read, path::Path};

/// Settings needed to turn catalog rows into slit footprints
#[derive(Debug, Clone, Copy)]
pub struct CatalogOptions<'a> {
    pub pixel_scale: f64,
    pub dispersion: Dispersion,
    pub wiggle_factor: f64,
    /// When false every spectrum spans the whole detector
    pub pack_spectra: bool,
    pub total_spectral_width: f64,
    pub bands: Option<&'a BandDefinition>,
}

/// Reads candidate objects from a catalog file
///
/// # Errors
/// Returns error if the file cannot be opened or read. Malformed rows are skipped.
pub fn read_catalog<P: AsRef<Path>>(
    path: P,
    opt: &CatalogOptions,
) -> Result<BTreeMap<SlitId, Slit>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| MaskError::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    read_catalog_from_reader(file, opt)
}

/// Reads whitespace separated rows of 16 columns:
/// `id ra dec pos pos offset offset size size angle mag priority type z spec_begin spec_end`.
/// The three position pairs are (width, length) for horizontal dispersion and
/// (length, width) for vertical dispersion.
pub fn read_catalog_from_reader<R: Read>(
    mut reader: R,
    opt: &CatalogOptions,
) -> Result<BTreeMap<SlitId, Slit>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let mut slits = BTreeMap::new();
    for (i, fields) in whitespace_records(&bytes)?.iter().enumerate() {
        let Some(slit) = parse_record(fields, i + 1, opt) else {
            continue;
        };
        if slits.contains_key(&slit.id) {
            warn!("Duplicate object id {} ignored", slit.id);
            continue;
        }
        slits.insert(slit.id, slit);
    }

    info!("Loaded {} candidate objects", slits.len());
    Ok(slits)
}

fn parse_record(fields: &[String], row: usize, opt: &CatalogOptions) -> Option<Slit> {
    if fields.len() != INPUT_FIELD_COUNT {
        debug!(
            "Row {}: expected {} columns, found {}",
            row,
            INPUT_FIELD_COUNT,
            fields.len()
        );
        return None;
    }

    let number = |idx: usize| -> Option<f64> {
        let value = fields[idx].parse::<f64>().ok();
        if value.is_none() {
            debug!("Row {}: column {} is not a number: '{}'", row, idx + 1, fields[idx]);
        }
        value
    };

    let id = match fields[0].parse::<SlitId>() {
        Ok(id) => id,
        Err(_) => {
            debug!("Row {}: invalid object id '{}'", row, fields[0]);
            return None;
        }
    };
    let Some(priority) = fields[11].chars().next().and_then(Priority::from_char) else {
        debug!("Row {}: unknown priority '{}'", row, fields[11]);
        return None;
    };
    let slit_type = fields[12].chars().next().unwrap_or('R');

    let (ccd, offset, size) = match opt.dispersion {
        // (length, width) ordering of each pair
        Dispersion::Horizontal => ((4, 3), (6, 5), (8, 7)),
        Dispersion::Vertical => ((3, 4), (5, 6), (7, 8)),
    };

    let mut entry = CatalogEntry {
        ra: number(1)?,
        dec: number(2)?,
        ccd_l: number(ccd.0)?,
        ccd_w: number(ccd.1)?,
        offset_l: number(offset.0)?,
        offset_w: number(offset.1)?,
        length: number(size.0)?,
        width: number(size.1)?,
        angle: number(9)?,
        magnitude: number(10)?,
        slit_type,
        redshift: number(13)?,
    };
    let mut spectrum = (number(14)?, number(15)?);

    if priority == Priority::Acquisition {
        entry.length = ACQUISITION_BOX_ARCSEC;
        entry.width = ACQUISITION_BOX_ARCSEC;
    } else if let Some(bands) = opt.bands.filter(|b| b.is_micro_shuffle()) {
        entry.length = bands.slit_length;
    }

    if !opt.pack_spectra {
        spectrum = (1.0, opt.total_spectral_width);
    }

    let slit = Slit::from_catalog(
        id,
        priority,
        entry,
        spectrum,
        opt.pixel_scale,
        opt.wiggle_factor,
    );

    let outside_bands = opt.bands.is_some_and(|bands| {
        bands.mode == ShuffleMode::BandShuffle && !bands.contains(slit.slit_start, slit.slit_end)
    });
    if outside_bands {
        debug!("Object {} lies outside every shuffle band", id);
        return None;
    }

    Some(slit)
}
