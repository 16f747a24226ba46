use crate::{
    bands::BandDefinition,
    error::{MaskError, Result},
    instrument::{Dispersion, Instrument},
    slit::Slit,
};
use csv::{QuoteStyle, WriterBuilder};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

const COLUMNS: [&str; 18] = [
    "ID",
    "RA",
    "DEC",
    "x_ccd",
    "y_ccd",
    "slitpos_x",
    "slitpos_y",
    "slitsize_x",
    "slitsize_y",
    "slittilt",
    "MAG",
    "priority",
    "slittype",
    "redshift",
    "specleft",
    "specright",
    "specbottom",
    "spectop",
];

const COLUMN_RULES: [&str; 18] = [
    "------",
    "---------",
    "---------",
    "---------",
    "---------",
    "------",
    "------",
    "---------",
    "---------",
    "--------",
    "---",
    "--------",
    "--------",
    "--------",
    "--------",
    "---------",
    "----------",
    "-------",
];

const SYMBOLS: &str = "{x_ccd y_ccd priority} {diamond magenta {} {} {} {$priority == \"0\"}} {20 {}}:\
{x_ccd y_ccd priority} {circle red {} {} {} {$priority == \"1\"}} {15 {}}:\
{x_ccd y_ccd priority} {square green {} {} {} {$priority == \"2\"}} {15 {}}:\
{x_ccd y_ccd priority} {triangle turquoise {} {} {} {$priority == \"3\"}} {15 {}}:\
{x_ccd y_ccd priority} {cross yellow {} {} {} {$priority == \"X\"}} {15 {}}";

/// Mask-wide values written into the catalog header
#[derive(Debug, Clone, Copy)]
pub struct CatalogHeader<'a> {
    pub instrument: Instrument,
    pub dispersion: Dispersion,
    pub nominal_pixel_scale: f64,
    pub det_img: &'a str,
    pub det_spec: &'a str,
    pub ra_imag: &'a str,
    pub dec_imag: &'a str,
    pub bands: Option<&'a BandDefinition>,
}

/// Output columns of one placed slit.
///
/// Catalog positions are echoed unchanged. The length offset and length are
/// recomputed from the current slit edges so that wiggles and expansion show up.
pub fn record_fields(slit: &Slit, dispersion: Dispersion, pixel_scale: f64) -> Vec<String> {
    let c = &slit.catalog;
    let offset_l = ((slit.slit_start + slit.slit_end) / 2.0 - c.ccd_l) * pixel_scale;
    let length = slit.current_length() * pixel_scale;
    let value = |v: f64| format!("{:8.6}", v);

    let (ccd, offset, size) = match dispersion {
        Dispersion::Horizontal => ((c.ccd_w, c.ccd_l), (c.offset_w, offset_l), (c.width, length)),
        Dispersion::Vertical => ((c.ccd_l, c.ccd_w), (offset_l, c.offset_w), (length, c.width)),
    };
    let (spec, edges) = (
        [value(slit.spec_start), value(slit.spec_end)],
        [value(slit.slit_start), value(slit.slit_end)],
    );
    let tail = match dispersion {
        Dispersion::Horizontal => [spec, edges],
        Dispersion::Vertical => [edges, spec],
    };

    let mut fields = vec![
        format!("{:6}", slit.id),
        format!("{:10.5}", c.ra),
        format!("{:10.5}", c.dec),
        value(ccd.0),
        value(ccd.1),
        value(offset.0),
        value(offset.1),
        value(size.0),
        value(size.1),
        value(c.angle),
        value(c.magnitude),
        slit.priority.as_char().to_string(),
        c.slit_type.to_string(),
        value(c.redshift),
    ];
    fields.extend(tail.into_iter().flatten());
    fields
}

pub fn format_record(slit: &Slit, dispersion: Dispersion, pixel_scale: f64) -> String {
    record_fields(slit, dispersion, pixel_scale).join("\t")
}

fn write_keyword<W: Write>(out: &mut W, name: &str, value: &str, comment: &str) -> Result<()> {
    writeln!(out, "#fits {:<8}= {} / {}", name, value, comment)?;
    Ok(())
}

/// Writes a complete mask catalog: server config block, FITS keywords, column
/// header and one row per slit.
pub fn write_catalog<W: Write>(
    mut out: W,
    location: &Path,
    header: &CatalogHeader,
    slits: &[&Slit],
    pixel_scale: f64,
) -> Result<()> {
    let long_name = location.display().to_string();
    let short_name = location
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| long_name.clone());

    writeln!(out, "QueryResult\n")?;
    writeln!(out, "# Config entry for original catalog server:")?;
    writeln!(out, "serv_type: local")?;
    writeln!(out, "long_name: {}", long_name)?;
    writeln!(out, "short_name: {}", short_name)?;
    writeln!(out, "url: {}", long_name)?;
    writeln!(out, "symbol: {}", SYMBOLS)?;
    writeln!(out, "# Fits keywords")?;

    write_keyword(
        &mut out,
        "INSTRUME",
        &header.instrument.to_string(),
        "Mask defined for this instrument",
    )?;
    write_keyword(
        &mut out,
        "DISPDIR",
        &header.dispersion.to_string(),
        "Dispersion direction",
    )?;
    write_keyword(
        &mut out,
        "PIXSCALE",
        &format!("{:.6}", header.nominal_pixel_scale),
        "Nominal pixel scale for IRAF (odf2mdf)",
    )?;
    write_keyword(&mut out, "DET_IMG", header.det_img, "Detector ID for pre-image")?;
    write_keyword(
        &mut out,
        "DET_SPEC",
        header.det_spec,
        "Detector ID for the spectrograph",
    )?;
    write_keyword(
        &mut out,
        "RA_IMAG",
        header.ra_imag,
        "Right ascension of pointing center",
    )?;
    write_keyword(
        &mut out,
        "DEC_IMAG",
        header.dec_imag,
        "Declination of pointing center",
    )?;
    if let Some(bands) = header.bands {
        for (name, value, comment) in bands.header_keywords() {
            write_keyword(&mut out, name, &value, comment)?;
        }
    }

    let tilted = slits.iter().any(|slit| slit.is_tilted());
    write_keyword(
        &mut out,
        "TILTSLIT",
        if tilted { "1" } else { "0" },
        "Non-zero if tilted slits are present",
    )?;
    writeln!(out, "# End fits keywords")?;
    writeln!(out, "# End config entry\n")?;

    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .has_headers(false)
        .from_writer(&mut out);
    wtr.write_record(COLUMNS)?;
    wtr.write_record(COLUMN_RULES)?;
    for slit in slits {
        wtr.write_record(record_fields(slit, header.dispersion, pixel_scale))?;
    }
    wtr.flush()?;
    drop(wtr);

    out.flush()?;
    Ok(())
}

/// Creates `path` and writes the mask catalog into it
pub fn write_mask_catalog<P: AsRef<Path>>(
    path: P,
    header: &CatalogHeader,
    slits: &[&Slit],
    pixel_scale: f64,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| MaskError::CreateFile {
        path: path.to_path_buf(),
        source,
    })?;
    write_catalog(BufWriter::new(file), path, header, slits, pixel_scale)
}

/// Writes one catalog per mask. Every file is created before any is written, so a
/// path that cannot be created leaves no catalogs behind.
pub fn write_mask_catalogs<P: AsRef<Path>>(
    masks: &[(P, Vec<&Slit>)],
    header: &CatalogHeader,
    pixel_scale: f64,
) -> Result<()> {
    let mut files: Vec<(&Path, File)> = Vec::with_capacity(masks.len());
    for (path, _) in masks {
        let path = path.as_ref();
        match File::create(path) {
            Ok(file) => files.push((path, file)),
            Err(source) => {
                for (created, file) in files.drain(..) {
                    drop(file);
                    let _ = fs::remove_file(created);
                }
                return Err(MaskError::CreateFile {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }

    for ((path, file), (_, slits)) in files.into_iter().zip(masks) {
        write_catalog(BufWriter::new(file), path, header, slits, pixel_scale)?;
    }
    Ok(())
}
