pub mod bands;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod fov;
pub mod instrument;
pub mod placement;
pub mod report;
pub mod session;
pub mod slit;

pub use bands::{BandDefinition, ShuffleMode};
pub use catalog::{
    CatalogHeader, CatalogOptions, read_catalog, write_mask_catalog, write_mask_catalogs,
};
pub use config::{Config, SlitMode};
pub use error::{MaskError, Result};
pub use fov::FieldOfView;
pub use instrument::{Dispersion, Instrument};
pub use placement::{ConflictGraph, MaskLayout, PlacementParams, conflicts};
pub use report::save_summary_json;
pub use session::{MaskDesign, MaskResult, MaskSession, MaskSummary};
pub use slit::{CatalogEntry, Priority, Slit, SlitId};
