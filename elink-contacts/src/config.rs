use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use elink_ranges::TxType;
use elink_signal::{ClusteringConfig, SupportFilter};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// How contact anchors are derived from reported midpoints.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ContactsConfig {
    /// Anchors span `[mid - flank, mid + flank]`.
    pub flank: u32,
}

impl Default for ContactsConfig {
    fn default() -> Self {
        ContactsConfig { flank: 1000 }
    }
}

/// Replicate support required before signal reaches each caller.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SupportConfig {
    #[serde(default = "SupportFilter::observed")]
    pub bidirectional: SupportFilter,
    #[serde(default = "SupportFilter::strict")]
    pub tss: SupportFilter,
}

impl Default for SupportConfig {
    fn default() -> Self {
        SupportConfig {
            bidirectional: SupportFilter::observed(),
            tss: SupportFilter::strict(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnnotationConfig {
    pub tss_window: u32,
    pub proximal_window: u32,
    /// Enhancer candidates with one of these types are discarded.
    pub excluded: Vec<TxType>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        AnnotationConfig {
            tss_window: 100,
            proximal_window: 1000,
            excluded: TxType::default_enhancer_exclusions(),
        }
    }
}

/// Per-cell-type expression threshold on the TPM assay.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExpressionConfig {
    pub min_tpm: f64,
    pub min_samples: usize,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        ExpressionConfig {
            min_tpm: 1.0,
            min_samples: 2,
        }
    }
}

impl ExpressionConfig {
    pub fn filter(&self) -> SupportFilter {
        SupportFilter::new(self.min_tpm, self.min_samples)
    }
}

///
/// Every tunable of the pipeline. Missing sections and fields take their
/// defaults, so an empty file is a valid configuration.
///
/// ```toml
/// [contacts]
/// flank = 1000
///
/// [clustering]
/// merge_dist = 20
/// pooled_cutoff = 3.0
/// window = 199
/// balance_threshold = 0.9
///
/// [annotation]
/// excluded = ["promoter", "fiveUTR", "threeUTR", "exon"]
///
/// [expression]
/// min_tpm = 1.0
/// min_samples = 2
/// ```
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub contacts: ContactsConfig,
    pub support: SupportConfig,
    pub clustering: ClusteringConfig,
    pub annotation: AnnotationConfig,
    pub expression: ExpressionConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.clustering
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.expression.min_tpm < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "expression.min_tpm must not be negative, got {}",
                self.expression.min_tpm
            )));
        }
        Ok(())
    }
}

impl TryFrom<&Path> for PipelineConfig {
    type Error = ConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let toml_str = read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use std::path::PathBuf;

    #[rstest]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.contacts.flank, 1000);
        assert_eq!(config.clustering.merge_dist, 20);
        assert_eq!(config.clustering.window, 199);
        assert_eq!(config.expression.filter(), SupportFilter::strict());
        assert_eq!(config.support.bidirectional, SupportFilter::observed());
        assert_eq!(config.annotation.excluded.len(), 4);
    }

    #[rstest]
    fn test_try_from_toml() {
        let path = PathBuf::from("tests/data/pipeline.toml");
        let config = PipelineConfig::try_from(path.as_path()).unwrap();
        assert_eq!(config.contacts.flank, 500);
        assert_eq!(config.clustering.balance_threshold, 0.8);
        // untouched fields keep their defaults
        assert_eq!(config.clustering.pooled_cutoff, 3.0);
        assert_eq!(config.annotation.excluded, vec![TxType::Promoter, TxType::Exon]);
    }

    #[rstest]
    fn test_partial_sections() {
        let config: PipelineConfig = toml::from_str("[support.tss]\nmin_samples = 3\n").unwrap();
        assert_eq!(config.support.tss.min_samples, 3);
        assert_eq!(config.support.tss.min_value, 1.0);
        assert_eq!(config.support.bidirectional, SupportFilter::observed());
    }

    #[rstest]
    fn test_missing_file_is_io_error() {
        let path = PathBuf::from("tests/data/missing.toml");
        assert!(matches!(
            PipelineConfig::try_from(path.as_path()),
            Err(ConfigError::Io(_))
        ));
    }
}
