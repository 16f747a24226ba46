use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MaskError>;

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to open {path}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid field of view in {path}: {message}")]
    FieldOfView { path: PathBuf, message: String },

    #[error("Invalid band definition: {0}")]
    BandDefinition(String),

    #[error("Unsupported instrument configuration: {0}")]
    Instrument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for MaskError {
    fn from(err: toml::de::Error) -> Self {
        MaskError::Config(format!("TOML parse error: {}", err))
    }
}
