use crate::error::{MaskError, Result};
use serde::Serialize;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
pub enum ShuffleMode {
    #[strum(serialize = "microShuffle")]
    MicroShuffle,
    #[strum(serialize = "bandShuffle")]
    BandShuffle,
}

/// Nod-and-shuffle setup of a mask.
///
/// Band positions and sizes are binned pixels along the slit length axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandDefinition {
    pub mode: ShuffleMode,
    pub binning: f64,
    /// Band height (band shuffle)
    pub band_size: f64,
    /// Slit length forced on science slits (micro-shuffle, arcsec)
    pub slit_length: f64,
    /// Shuffle distance as configured (unbinned pixels)
    pub shuffle_unbinned_px: f64,
    /// Shuffle distance in arcsec and converted to pixels
    pub shuffle_arcsec: f64,
    pub shuffle_px: f64,
    pub bands: Vec<f64>,
    pub y_offset: i64,
}

impl BandDefinition {
    /// Parses the underscore separated band configuration.
    ///
    /// Layout: `binning_mode_size_shufflePix_shuffleArcsec[_band...]_yOffset_nBands`.
    /// Braces are ignored and an empty string means no shuffling.
    pub fn parse(config: &str, pixel_scale: f64) -> Result<Option<Self>> {
        let cleaned: String = config
            .chars()
            .filter(|c| *c != '{' && *c != '}')
            .map(|c| if c == '_' { ' ' } else { c })
            .collect();
        let words: Vec<&str> = cleaned.split_whitespace().collect();
        if words.is_empty() {
            return Ok(None);
        }
        if words.len() < 5 {
            return Err(MaskError::BandDefinition(format!(
                "expected at least 5 fields, found {} in '{}'",
                words.len(),
                config
            )));
        }

        let binning = number(words[0])?;
        if binning <= 0.0 {
            return Err(MaskError::BandDefinition(format!(
                "binning must be positive, got {}",
                binning
            )));
        }
        let mode = words[1]
            .parse::<ShuffleMode>()
            .unwrap_or(ShuffleMode::BandShuffle);
        let size = number(words[2])?;
        let shuffle_unbinned_px = number(words[3])?;
        let shuffle_arcsec = number(words[4])?;

        let mut bands = Vec::new();
        let mut y_offset = 0;
        if mode == ShuffleMode::BandShuffle {
            let count = words[words.len() - 1]
                .parse::<usize>()
                .map_err(|_| MaskError::BandDefinition(format!("invalid band count in '{}'", config)))?;
            // Five leading fields, the bands, then y offset and count
            if count.checked_add(7).is_none_or(|need| words.len() < need) {
                return Err(MaskError::BandDefinition(format!(
                    "{} bands announced but only {} fields given",
                    count,
                    words.len()
                )));
            }
            for word in &words[5..5 + count] {
                bands.push(number(word)? / binning);
            }
            y_offset = words[words.len() - 2]
                .parse::<f64>()
                .map_err(|_| MaskError::BandDefinition(format!("invalid y offset in '{}'", config)))?
                as i64;
        }

        Ok(Some(Self {
            mode,
            binning,
            band_size: size / binning,
            slit_length: size,
            shuffle_unbinned_px,
            shuffle_arcsec,
            shuffle_px: shuffle_arcsec / pixel_scale,
            bands,
            y_offset,
        }))
    }

    pub fn is_micro_shuffle(&self) -> bool {
        self.mode == ShuffleMode::MicroShuffle
    }

    /// Extra slack between slits along their length
    pub fn microshuffle_px(&self) -> f64 {
        if self.is_micro_shuffle() {
            self.shuffle_px
        } else {
            0.0
        }
    }

    /// Whether a slit lies strictly inside one of the bands
    pub fn contains(&self, start: f64, end: f64) -> bool {
        self.bands
            .iter()
            .any(|band| start > *band && end < band + self.band_size)
    }

    /// The band a slit occupies, borders included
    pub fn band_for(&self, start: f64, end: f64) -> Option<(f64, f64)> {
        self.bands
            .iter()
            .map(|band| (*band, band + self.band_size))
            .find(|(lo, hi)| start >= *lo && end <= *hi)
    }

    /// Catalog header keywords describing the shuffle setup, as (name, value, comment)
    pub fn header_keywords(&self) -> Vec<(&'static str, String, &'static str)> {
        let mut keywords = vec![
            (
                "SHUFMODE",
                self.mode.to_string(),
                "Microshuffling or bandshuffling",
            ),
            (
                "SHUFSIZE",
                (self.shuffle_unbinned_px as i64).to_string(),
                "Shuffle distance [unbinned pixel]",
            ),
            ("BINNING", (self.binning as i64).to_string(), "Binning"),
        ];
        match self.mode {
            ShuffleMode::MicroShuffle => keywords.push((
                "SLITLEN",
                format!("{:.2}", self.slit_length),
                "Slit length for microshuffling [arcsec]",
            )),
            ShuffleMode::BandShuffle => keywords.push((
                "BANDSIZE",
                ((self.band_size * self.binning).round() as i64).to_string(),
                "Height of the science band [unbinned pixel]",
            )),
        }
        keywords.push((
            "YOFFSET",
            self.y_offset.to_string(),
            "Band offset [unbinned pixel]",
        ));
        keywords
    }
}

fn number(word: &str) -> Result<f64> {
    word.parse::<f64>()
        .map_err(|_| MaskError::BandDefinition(format!("'{}' is not a number", word)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_means_no_shuffling() {
        assert!(BandDefinition::parse("", 0.08).unwrap().is_none());
        assert!(BandDefinition::parse("{}", 0.08).unwrap().is_none());
    }

    #[test]
    fn test_parse_micro_shuffle() {
        let bands = BandDefinition::parse("{2_microShuffle_3.5_100_8.0_0_0}", 0.08)
            .unwrap()
            .unwrap();
        assert!(bands.is_micro_shuffle());
        assert_eq!(bands.slit_length, 3.5);
        assert!((bands.microshuffle_px() - 100.0).abs() < 1e-9);
        assert!(bands.bands.is_empty());
        assert_eq!(bands.y_offset, 0);
    }

    #[test]
    fn test_parse_band_shuffle() {
        let bands = BandDefinition::parse("2_bandShuffle_200_400_32.0_100_700_12_2", 0.16)
            .unwrap()
            .unwrap();
        assert_eq!(bands.mode, ShuffleMode::BandShuffle);
        assert_eq!(bands.band_size, 100.0);
        assert_eq!(bands.bands, vec![50.0, 350.0]);
        assert_eq!(bands.y_offset, 12);
        assert_eq!(bands.microshuffle_px(), 0.0);
        assert!((bands.shuffle_px - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_band_containment_is_strict() {
        let bands = BandDefinition::parse("1_bandShuffle_100_100_8_0_300_0_2", 0.08)
            .unwrap()
            .unwrap();
        assert!(bands.contains(10.0, 90.0));
        assert!(!bands.contains(0.0, 90.0));
        assert!(!bands.contains(10.0, 100.0));
        assert!(bands.contains(310.0, 320.0));
        assert!(!bands.contains(150.0, 160.0));

        assert_eq!(bands.band_for(0.0, 100.0), Some((0.0, 100.0)));
        assert_eq!(bands.band_for(150.0, 160.0), None);
    }

    #[test]
    fn test_rejects_short_config() {
        assert!(BandDefinition::parse("2_bandShuffle_200", 0.08).is_err());
        assert!(BandDefinition::parse("2_bandShuffle_200_400_32_100_4", 0.08).is_err());
        assert!(BandDefinition::parse("0_microShuffle_3_100_8", 0.08).is_err());
    }

    #[test]
    fn test_huge_band_count_is_rejected() {
        let err = BandDefinition::parse("1_bandShuffle_100_100_8_0_18446744073709551615", 1.0)
            .unwrap_err();
        assert!(matches!(err, MaskError::BandDefinition(_)));
    }

    #[test]
    fn test_unknown_mode_falls_back_to_band_shuffle() {
        let bands = BandDefinition::parse("1_nodShuffle_100_100_8_0_0_1", 1.0)
            .unwrap()
            .unwrap();
        assert_eq!(bands.mode, ShuffleMode::BandShuffle);
        assert_eq!(bands.bands, vec![0.0]);
    }

    #[test]
    fn test_header_keywords() {
        let bands = BandDefinition::parse("2_bandShuffle_200_400_32.0_100_12_1", 0.16)
            .unwrap()
            .unwrap();
        let keywords = bands.header_keywords();
        let names: Vec<&str> = keywords.iter().map(|k| k.0).collect();
        assert_eq!(names, vec!["SHUFMODE", "SHUFSIZE", "BINNING", "BANDSIZE", "YOFFSET"]);
        assert_eq!(keywords[0].1, "bandShuffle");
        assert_eq!(keywords[1].1, "400");
        assert_eq!(keywords[3].1, "200");
        assert_eq!(keywords[4].1, "12");
    }
}
