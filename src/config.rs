//! Inference settings, optionally loaded from a YAML file.
//!
//! ```yaml
//! max_categorical_cardinality: 25
//! include_missing: false
//! include_text_columns: false
//! bounds_padding:
//!   range_fraction: 0.05
//! missing_markers: ["", "NA", "null"]
//! ```

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, table::DEFAULT_MISSING_MARKERS};

pub const DEFAULT_MAX_CATEGORICAL_CARDINALITY: usize = 25;
pub const DEFAULT_HISTOGRAM_BINS: u32 = 10;

/// How numeric bounds are presented once a `bins` suggestion is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPadding {
    /// Report the true minimum and maximum.
    #[default]
    None,
    /// Widen both ends by this fraction of the observed range.
    RangeFraction(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    pub max_categorical_cardinality: usize,
    pub include_missing: bool,
    pub include_text_columns: bool,
    pub bounds_padding: BoundsPadding,
    pub histogram_bins: u32,
    pub missing_markers: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_categorical_cardinality: DEFAULT_MAX_CATEGORICAL_CARDINALITY,
            include_missing: false,
            include_text_columns: false,
            bounds_padding: BoundsPadding::None,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            missing_markers: DEFAULT_MISSING_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }
}

impl InferenceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: InferenceConfig = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "histogram_bins must be at least 1".to_string(),
            ));
        }
        if let BoundsPadding::RangeFraction(fraction) = self.bounds_padding
            && !(fraction.is_finite() && fraction >= 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "bounds padding fraction must be a non-negative number, got {fraction}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_documented_values() {
        let config = InferenceConfig::default();
        assert_eq!(config.max_categorical_cardinality, 25);
        assert!(!config.include_missing);
        assert!(!config.include_text_columns);
        assert_eq!(config.bounds_padding, BoundsPadding::None);
        assert_eq!(config.histogram_bins, 10);
        assert!(config.missing_markers.iter().any(|m| m == "NA"));
    }

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "max_categorical_cardinality: 4").unwrap();
        writeln!(file, "include_text_columns: true").unwrap();
        writeln!(file, "bounds_padding:").unwrap();
        writeln!(file, "  range_fraction: 0.05").unwrap();

        let config = InferenceConfig::load(file.path()).expect("load config");
        assert_eq!(config.max_categorical_cardinality, 4);
        assert!(config.include_text_columns);
        assert!(!config.include_missing);
        assert_eq!(config.bounds_padding, BoundsPadding::RangeFraction(0.05));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "max_values: 4").unwrap();
        let err = InferenceConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn negative_padding_is_invalid() {
        let config = InferenceConfig {
            bounds_padding: BoundsPadding::RangeFraction(-0.1),
            ..InferenceConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
