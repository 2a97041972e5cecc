use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thermex_parser::SourceFormat;

use crate::error::{PipelineError, Result};

pub const CONFIG_ENV_VAR: &str = "THERMEX_CONFIG";

/// File naming conventions shared by every stage of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThermexConfig {
    /// Per-directory ledger of processed file names.
    pub ledger_file: String,
    /// Certificate polynomial. Relative paths resolve against the parent of
    /// the directory being processed.
    pub certificate_file: PathBuf,
    /// Appended to a calibration sample's base name for its persisted fit.
    pub standard_suffix: String,
    /// Substring that marks a file as the calibration reference sample.
    pub calibration_marker: String,
    /// Raw expansion column corrected by the pipeline.
    pub measurement_column: String,
    pub delimited_suffix: String,
    pub workbook_suffix: String,
}

impl Default for ThermexConfig {
    fn default() -> Self {
        Self {
            ledger_file: "th_exp_data.dat".to_string(),
            certificate_file: PathBuf::from("cert_poly.json"),
            standard_suffix: "_stan_poly.json".to_string(),
            calibration_marker: "sapph".to_string(),
            measurement_column: "dL/Lo".to_string(),
            delimited_suffix: "c".to_string(),
            workbook_suffix: "x".to_string(),
        }
    }
}

impl ThermexConfig {
    pub fn from_toml_str(path: &Path, content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|source| PipelineError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
        Self::from_toml_str(path, &content)
    }

    /// Loads the file named by `THERMEX_CONFIG`, or the defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn certificate_path(&self, directory: &Path) -> PathBuf {
        if self.certificate_file.is_absolute() {
            self.certificate_file.clone()
        } else {
            directory.join("..").join(&self.certificate_file)
        }
    }

    pub fn output_suffix(&self, format: SourceFormat) -> &str {
        match format {
            SourceFormat::Delimited => &self.delimited_suffix,
            SourceFormat::Workbook => &self.workbook_suffix,
        }
    }

    pub fn is_calibration_sample(&self, file_name: &str) -> bool {
        file_name.contains(&self.calibration_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ThermexConfig::from_toml_str(
            Path::new("thermex.toml"),
            "calibration_marker = \"sapphire\"\nledger_file = \"ledger.dat\"\n",
        )
        .unwrap();
        assert_eq!(config.calibration_marker, "sapphire");
        assert_eq!(config.ledger_file, "ledger.dat");
        assert_eq!(config.standard_suffix, "_stan_poly.json");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ThermexConfig::from_toml_str(Path::new("thermex.toml"), "degree = 3\n")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }

    #[test]
    fn certificate_resolves_against_parent() {
        let config = ThermexConfig::default();
        assert_eq!(
            config.certificate_path(Path::new("data/run1")),
            PathBuf::from("data/run1/../cert_poly.json")
        );
    }
}
