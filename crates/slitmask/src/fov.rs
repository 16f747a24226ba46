use crate::{
    catalog::whitespace_records,
    constants::{DETECTOR_CORNER_COUNT, FOV_CORNER, FOV_DIM_CORNER, MIN_FOV_VERTICES},
    error::{MaskError, Result},
    instrument::Dispersion,
};
use serde::Serialize;
use std::{fs, path::Path};

/// Illuminated area of the detector, described by a closed polygon in pixels.
///
/// Vertex coordinates are kept split into their spatial and spectral components so
/// that nothing downstream needs to know the dispersion direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOfView {
    pub dispersion: Dispersion,
    spatial: Vec<f64>,
    spectral: Vec<f64>,
    pub spatial_min: f64,
    pub spatial_max: f64,
    pub spectral_min: f64,
    pub spectral_max: f64,
    pub spatial_center: f64,
    pub spectral_center: f64,
    /// Mean detector extent along the dispersion
    pub total_spectral_width: f64,
}

impl FieldOfView {
    /// Builds the field from pixel vertices (in boundary order) and the four detector corners
    pub fn from_vertices(
        vertices: &[(f64, f64)],
        detector: &[(f64, f64)],
        dispersion: Dispersion,
    ) -> std::result::Result<Self, String> {
        if detector.len() != DETECTOR_CORNER_COUNT {
            return Err(format!(
                "found {} detector corners, expected {}",
                detector.len(),
                DETECTOR_CORNER_COUNT
            ));
        }
        if vertices.len() < MIN_FOV_VERTICES {
            return Err(format!(
                "found {} field-of-view vertices, need at least {}",
                vertices.len(),
                MIN_FOV_VERTICES
            ));
        }

        let (spatial, spectral): (Vec<f64>, Vec<f64>) = vertices
            .iter()
            .map(|&(x, y)| dispersion.split(x, y))
            .unzip();

        let total_spectral_width = match dispersion {
            Dispersion::Horizontal => {
                (detector[3].0 + detector[2].0 - detector[1].0 - detector[0].0) / 2.0
            }
            Dispersion::Vertical => {
                (detector[1].1 + detector[2].1 - detector[0].1 - detector[3].1) / 2.0
            }
        };

        let (spatial_min, spatial_max) = extent(&spatial);
        let (spectral_min, spectral_max) = extent(&spectral);

        Ok(Self {
            dispersion,
            spatial,
            spectral,
            spatial_min,
            spatial_max,
            spectral_min,
            spectral_max,
            spatial_center: (spatial_min + spatial_max) / 2.0,
            spectral_center: (spectral_min + spectral_max) / 2.0,
            total_spectral_width,
        })
    }

    /// Reads `DIM_CORNER` and `FOV_CORNER` lines (arcsec) and converts them to pixels
    pub fn parse(
        text: &str,
        pixel_scale: f64,
        crpix: (f64, f64),
        dispersion: Dispersion,
    ) -> std::result::Result<Self, String> {
        let records = whitespace_records(text.as_bytes()).map_err(|e| e.to_string())?;

        let mut detector = Vec::new();
        let mut vertices = Vec::new();
        for record in &records {
            let target = match record[0].as_str() {
                FOV_DIM_CORNER => &mut detector,
                FOV_CORNER => &mut vertices,
                _ => continue,
            };
            let (Some(x), Some(y)) = (record.get(1), record.get(2)) else {
                return Err(format!("{} line with missing coordinates", record[0]));
            };
            let x: f64 = x.parse().map_err(|_| format!("invalid coordinate '{}'", x))?;
            let y: f64 = y.parse().map_err(|_| format!("invalid coordinate '{}'", y))?;
            target.push((x / pixel_scale + crpix.0, y / pixel_scale + crpix.1));
        }

        Self::from_vertices(&vertices, &detector, dispersion)
    }

    pub fn load_from_file(
        path: &Path,
        pixel_scale: f64,
        crpix: (f64, f64),
        dispersion: Dispersion,
    ) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| MaskError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, pixel_scale, crpix, dispersion).map_err(|message| {
            MaskError::FieldOfView {
                path: path.to_path_buf(),
                message,
            }
        })
    }

    /// Spatial coordinates where a line at `spectral_pos` crosses the polygon boundary.
    /// Edges parallel to the line or not spanning it are skipped.
    pub fn intercepts(&self, spectral_pos: f64) -> Vec<f64> {
        let n = self.spatial.len();
        (0..n)
            .filter_map(|k1| {
                let k2 = (k1 + 1) % n;
                let (s1, s2) = (self.spectral[k1], self.spectral[k2]);
                let denominator = s1 - s2;
                if denominator == 0.0 {
                    return None;
                }
                if (spectral_pos < s1 && spectral_pos < s2) || (spectral_pos > s1 && spectral_pos > s2)
                {
                    return None;
                }
                let slope = (self.spatial[k1] - self.spatial[k2]) / denominator;
                Some(slope * (spectral_pos - s1) + self.spatial[k1])
            })
            .collect()
    }

    /// Nearest boundary crossings below and above a slit centre.
    /// Falls back to the illuminated extent when a side has no crossing.
    pub fn slit_bounds(&self, spectral_pos: f64, spatial_pos: f64) -> (f64, f64) {
        let intercepts = self.intercepts(spectral_pos);
        let lower = intercepts
            .iter()
            .copied()
            .filter(|c| *c < spatial_pos)
            .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.max(c))));
        let upper = intercepts
            .iter()
            .copied()
            .filter(|c| *c > spatial_pos)
            .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.min(c))));
        (
            lower.unwrap_or(self.spatial_min),
            upper.unwrap_or(self.spatial_max),
        )
    }
}

fn extent(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const DETECTOR: [(f64, f64); 4] = [(0.0, 0.0), (0.0, 100.0), (200.0, 100.0), (200.0, 0.0)];

    fn octagon(dispersion: Dispersion) -> FieldOfView {
        let vertices = [
            (20.0, 0.0),
            (0.0, 20.0),
            (0.0, 80.0),
            (20.0, 100.0),
            (180.0, 100.0),
            (200.0, 80.0),
            (200.0, 20.0),
            (180.0, 0.0),
        ];
        FieldOfView::from_vertices(&vertices, &DETECTOR, dispersion).unwrap()
    }

    #[test]
    fn test_extent_and_centres() {
        let fov = octagon(Dispersion::Horizontal);
        assert_eq!((fov.spatial_min, fov.spatial_max), (0.0, 100.0));
        assert_eq!((fov.spectral_min, fov.spectral_max), (0.0, 200.0));
        assert_eq!(fov.spatial_center, 50.0);
        assert_eq!(fov.total_spectral_width, 200.0);

        let vertical = octagon(Dispersion::Vertical);
        assert_eq!(vertical.spatial_center, 100.0);
        assert_eq!(vertical.total_spectral_width, 100.0);
    }

    #[test]
    fn test_bounds_in_the_middle() {
        let fov = octagon(Dispersion::Horizontal);
        assert_eq!(fov.slit_bounds(100.0, 40.0), (0.0, 100.0));
    }

    #[test]
    fn test_bounds_follow_chamfered_corner() {
        let fov = octagon(Dispersion::Horizontal);
        let (lo, hi) = fov.slit_bounds(10.0, 50.0);
        assert!((lo - 10.0).abs() < 1e-9);
        assert!((hi - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_fall_back_to_extent() {
        let fov = octagon(Dispersion::Horizontal);
        // Far outside the polygon nothing is crossed
        assert_eq!(fov.slit_bounds(500.0, 50.0), (0.0, 100.0));
    }

    #[test]
    fn test_rejects_bad_corner_counts() {
        let vertices = [(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)];
        assert!(FieldOfView::from_vertices(&vertices, &DETECTOR[..3], Dispersion::Horizontal).is_err());
        assert!(FieldOfView::from_vertices(&vertices[..2], &DETECTOR, Dispersion::Horizontal).is_err());
    }

    #[test]
    fn test_load_from_file_converts_arcsec() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fov.dat");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "# detector").unwrap();
        writeln!(file, "DIM_CORNER -10.0 -5.0").unwrap();
        writeln!(file, "DIM_CORNER\t-10.0  5.0").unwrap();
        writeln!(file, "DIM_CORNER 10.0 5.0").unwrap();
        writeln!(file, "DIM_CORNER 10.0 -5.0").unwrap();
        writeln!(file, "FOV_CORNER -9.0 -4.0").unwrap();
        writeln!(file, "FOV_CORNER -9.0 4.0").unwrap();
        writeln!(file, "FOV_CORNER 9.0 4.0").unwrap();
        writeln!(file, "FOV_CORNER 9.0 -4.0").unwrap();
        drop(file);

        let fov = FieldOfView::load_from_file(&path, 0.1, (100.0, 50.0), Dispersion::Horizontal)
            .unwrap();
        assert!((fov.spatial_min - 10.0).abs() < 1e-9);
        assert!((fov.spatial_max - 90.0).abs() < 1e-9);
        assert!((fov.spectral_min - 10.0).abs() < 1e-9);
        assert!((fov.total_spectral_width - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_from_file_missing_corners() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fov.dat");
        fs::write(&path, "FOV_CORNER 0 0\nFOV_CORNER 1 1\nFOV_CORNER 2 0\n").unwrap();
        let err = FieldOfView::load_from_file(&path, 1.0, (0.0, 0.0), Dispersion::Horizontal)
            .unwrap_err();
        assert!(matches!(err, MaskError::FieldOfView { .. }));

        let missing = temp_dir.path().join("missing.dat");
        assert!(matches!(
            FieldOfView::load_from_file(&missing, 1.0, (0.0, 0.0), Dispersion::Horizontal),
            Err(MaskError::OpenFile { .. })
        ));
    }
}
