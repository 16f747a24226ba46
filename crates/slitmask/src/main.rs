use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use slitmask::{
    CatalogHeader, CatalogOptions, Config, Dispersion, FieldOfView, Instrument, MaskDesign,
    MaskSession, MaskSummary, Slit, SlitMode, read_catalog, save_summary_json, write_mask_catalogs,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Select and pack slits onto multi-object spectrograph masks", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Object catalog with one candidate per row
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Field-of-view file with DIM_CORNER and FOV_CORNER lines
    #[arg(short = 'f', long = "fov")]
    fov: Option<PathBuf>,

    /// Output root, masks are written as <root><n>.cat
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Instrument (GMOS-N, GMOS-S, F2)
    #[arg(long)]
    instrument: Option<Instrument>,

    /// Pre-image pixel scale [arcsec/pixel]
    #[arg(short = 'p', long)]
    pixel_scale: Option<f64>,

    /// Number of masks to design
    #[arg(short = 'n', long)]
    masks: Option<usize>,

    /// Slit mode: normal (N) or max (M) to grow slits into free sky
    #[arg(short = 'm', long)]
    mode: Option<SlitMode>,

    /// Dispersion direction (horizontal, vertical)
    #[arg(short = 'd', long)]
    dispersion: Option<Dispersion>,

    #[arg(long)]
    det_img: Option<String>,

    #[arg(long)]
    det_spec: Option<String>,

    #[arg(long)]
    ra_imag: Option<String>,

    #[arg(long)]
    dec_imag: Option<String>,

    #[arg(long)]
    crpix1: Option<f64>,

    #[arg(long)]
    crpix2: Option<f64>,

    /// Minimum separation of spectra [pixels]
    #[arg(long)]
    min_pixel_separation: Option<f64>,

    /// Fraction of the slit length a slit may be shifted by
    #[arg(short = 'w', long)]
    wiggle: Option<f64>,

    /// Rescue removed slits on every mask, not just the first one
    #[arg(long)]
    wiggle_all_masks: bool,

    /// Let every spectrum span the whole detector
    #[arg(long)]
    no_pack_spectra: bool,

    /// Nod-and-shuffle band configuration
    #[arg(short = 'b', long)]
    bands: Option<String>,

    /// Write a JSON placement summary to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.input {
            config.input.catalog = Some(path);
        }
        if let Some(path) = self.fov {
            config.input.fov = Some(path);
        }
        if let Some(root) = self.output {
            config.output.root = root;
        }
        if let Some(instrument) = self.instrument {
            config.instrument.name = instrument;
        }
        if let Some(scale) = self.pixel_scale {
            config.instrument.pixel_scale = scale;
        }
        if let Some(masks) = self.masks {
            config.placement.num_masks = masks;
        }
        if let Some(mode) = self.mode {
            config.placement.slit_mode = mode;
        }
        if let Some(dispersion) = self.dispersion {
            config.instrument.dispersion = dispersion;
        }
        if let Some(value) = self.det_img {
            config.instrument.det_img = value;
        }
        if let Some(value) = self.det_spec {
            config.instrument.det_spec = value;
        }
        if let Some(value) = self.ra_imag {
            config.output.ra_imag = value;
        }
        if let Some(value) = self.dec_imag {
            config.output.dec_imag = value;
        }
        if let Some(value) = self.crpix1 {
            config.instrument.crpix1 = value;
        }
        if let Some(value) = self.crpix2 {
            config.instrument.crpix2 = value;
        }
        if let Some(value) = self.min_pixel_separation {
            config.instrument.min_pixel_separation = value;
        }
        if let Some(value) = self.wiggle {
            config.placement.wiggle_factor = value;
        }
        if self.wiggle_all_masks {
            config.placement.wiggle_all_masks = true;
        }
        if self.no_pack_spectra {
            config.placement.pack_spectra = false;
        }
        if let Some(value) = self.bands {
            config.placement.band_config = value;
        }
        if let Some(path) = self.summary_json {
            config.output.summary_json = Some(path);
        }
    }
}

fn main() -> Result<()> {
    // Defaults to RUST_LOG if set, otherwise INFO
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let catalog_path = config
        .input
        .catalog
        .clone()
        .context("No object catalog given (--input or [input] catalog)")?;
    let fov_path = config
        .input
        .fov
        .clone()
        .context("No field-of-view file given (--fov or [input] fov)")?;

    let instrument = &config.instrument;
    let nominal_pixel_scale = instrument.name.nominal_pixel_scale(instrument.pixel_scale)?;
    let bands = config.bands()?;
    let fov = FieldOfView::load_from_file(
        &fov_path,
        instrument.pixel_scale,
        (instrument.crpix1, instrument.crpix2),
        instrument.dispersion,
    )?;

    let options = CatalogOptions {
        pixel_scale: instrument.pixel_scale,
        dispersion: instrument.dispersion,
        wiggle_factor: config.placement.wiggle_factor,
        pack_spectra: config.placement.pack_spectra,
        total_spectral_width: fov.total_spectral_width,
        bands: bands.as_ref(),
    };
    let slits = read_catalog(&catalog_path, &options)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;

    info!(
        "Designing up to {} {} masks ({} dispersion, {} mode)",
        config.placement.num_masks,
        instrument.name,
        instrument.dispersion,
        config.placement.slit_mode
    );

    let header = CatalogHeader {
        instrument: instrument.name,
        dispersion: instrument.dispersion,
        nominal_pixel_scale,
        det_img: &instrument.det_img,
        det_spec: &instrument.det_spec,
        ra_imag: &config.output.ra_imag,
        dec_imag: &config.output.dec_imag,
        bands: bands.as_ref(),
    };

    let design = MaskDesign::from_config(&config, fov, bands.clone());
    let mut session = MaskSession::new(design, slits);
    let results = session.run();

    let outputs: Vec<(PathBuf, Vec<&Slit>)> = results
        .iter()
        .map(|result| {
            (
                config.mask_path(result.summary.mask),
                result.slits.iter().collect(),
            )
        })
        .collect();
    write_mask_catalogs(&outputs, &header, instrument.pixel_scale)
        .context("Failed to write mask catalogs")?;
    for (path, _) in &outputs {
        info!("Mask catalog saved to: {}", path.display());
    }

    let summaries: Vec<MaskSummary> = results.iter().map(|r| r.summary.clone()).collect();
    if summaries.len() < config.placement.num_masks {
        info!(
            "All objects placed after {} of {} masks",
            summaries.len(),
            config.placement.num_masks
        );
    }

    if let Some(path) = &config.output.summary_json {
        save_summary_json(
            path,
            instrument.name,
            &summaries,
            session.remaining().len(),
        )?;
    }

    Ok(())
}
