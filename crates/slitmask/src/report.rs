use crate::{
    error::{MaskError, Result},
    instrument::Instrument,
    session::MaskSummary,
};
use std::path::Path;

/// Writes per-mask placement statistics as pretty-printed JSON
pub fn save_summary_json<P: AsRef<Path>>(
    path: P,
    instrument: Instrument,
    summaries: &[MaskSummary],
    unplaced: usize,
) -> Result<()> {
    let path = path.as_ref();
    let json_data = serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "instrument": instrument,
        "masks": summaries,
        "unplaced": unplaced,
    });

    std::fs::write(path, serde_json::to_string_pretty(&json_data)?).map_err(|source| {
        MaskError::CreateFile {
            path: path.to_path_buf(),
            source,
        }
    })?;
    log::info!("Placement summary saved to: {}", path.display());
    Ok(())
}
