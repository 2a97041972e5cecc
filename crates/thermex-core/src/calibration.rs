use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thermex_parser::parse_tabular_file;
use tracing::{info, warn};

use crate::config::ThermexConfig;
use crate::correction::CorrectionEngine;
use crate::error::{PipelineError, Result};
use crate::ledger::list_files;
use crate::polynomial::{Polynomial, FIT_DEGREE};

/// Persistence for the two reference polynomials of a directory.
pub trait CalibrationRepository {
    /// The shared instrument certificate. Read-only to the pipeline.
    fn load_certificate(&self) -> Result<Polynomial>;

    /// The standard polynomial persisted by an earlier run.
    fn load_standard(&self) -> Result<Polynomial>;

    /// Persists `polynomial` as the directory's only standard, keyed by the
    /// calibration sample's base name.
    fn replace_standard(&self, sample_base: &str, polynomial: &Polynomial) -> Result<PathBuf>;
}

/// JSON files next to (standard) and one level above (certificate) the
/// processed directory.
#[derive(Debug, Clone)]
pub struct FsCalibrationStore {
    directory: PathBuf,
    certificate_path: PathBuf,
    standard_suffix: String,
}

impl FsCalibrationStore {
    pub fn new(directory: impl Into<PathBuf>, config: &ThermexConfig) -> Self {
        let directory = directory.into();
        Self {
            certificate_path: config.certificate_path(&directory),
            directory,
            standard_suffix: config.standard_suffix.clone(),
        }
    }

    pub fn standard_path(&self, sample_base: &str) -> PathBuf {
        self.directory
            .join(format!("{sample_base}{}", self.standard_suffix))
    }

    fn persisted_standards(&self) -> Result<Vec<PathBuf>> {
        Ok(list_files(&self.directory)?
            .into_iter()
            .filter(|name| name.ends_with(&self.standard_suffix))
            .map(|name| self.directory.join(name))
            .collect())
    }
}

impl CalibrationRepository for FsCalibrationStore {
    fn load_certificate(&self) -> Result<Polynomial> {
        read_polynomial(&self.certificate_path)
    }

    fn load_standard(&self) -> Result<Polynomial> {
        let mut candidates = self.persisted_standards()?;
        if candidates.len() > 1 {
            warn!(
                directory = %self.directory.display(),
                count = candidates.len(),
                "multiple persisted standard polynomials, using the newest"
            );
            candidates.sort_by_key(|path| {
                fs::metadata(path)
                    .and_then(|meta| meta.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH)
            });
        }

        match candidates.pop() {
            Some(path) => read_polynomial(&path),
            None => Err(PipelineError::MissingCalibration {
                path: self.directory.join(format!("*{}", self.standard_suffix)),
                reason: "no calibration sample in this run and no persisted standard polynomial"
                    .to_string(),
            }),
        }
    }

    fn replace_standard(&self, sample_base: &str, polynomial: &Polynomial) -> Result<PathBuf> {
        let path = self.standard_path(sample_base);
        let json = serde_json::to_string_pretty(polynomial).map_err(|source| {
            PipelineError::Json {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|err| PipelineError::io(&path, err))?;

        for stale in self.persisted_standards()? {
            if stale != path {
                fs::remove_file(&stale).map_err(|err| PipelineError::io(&stale, err))?;
                info!(path = %stale.display(), "removed superseded standard polynomial");
            }
        }

        info!(path = %path.display(), "persisted standard polynomial");
        Ok(path)
    }
}

fn read_polynomial(path: &Path) -> Result<Polynomial> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::MissingCalibration {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }
        Err(err) => return Err(PipelineError::io(path, err)),
    };
    serde_json::from_str(&content).map_err(|err| PipelineError::MalformedInput {
        file: path.display().to_string(),
        reason: format!("not a serialized polynomial: {err}"),
    })
}

/// The calibration sample named in `delta`, if any. When several are
/// present the last one wins.
pub fn calibration_sample<'a>(delta: &'a [String], config: &ThermexConfig) -> Option<&'a str> {
    let samples: Vec<&str> = delta
        .iter()
        .map(String::as_str)
        .filter(|name| config.is_calibration_sample(name))
        .collect();
    if samples.len() > 1 {
        warn!(
            samples = ?samples,
            "multiple calibration samples in one run, using the last"
        );
    }
    samples.last().copied()
}

/// Loads the persisted standard, or fits and persists a new one when the
/// delta contains a calibration sample.
pub fn resolve_standard<R: CalibrationRepository>(
    repository: &R,
    directory: &Path,
    delta: &[String],
    config: &ThermexConfig,
) -> Result<Polynomial> {
    let Some(sample) = calibration_sample(delta, config) else {
        return repository.load_standard();
    };

    let path = directory.join(sample);
    let record = parse_tabular_file(&path).map_err(|source| PipelineError::Parse {
        file: sample.to_string(),
        source,
    })?;

    let engine = CorrectionEngine::from_config(config);
    let (temperature, measurement) = engine.calibration_pairs(&record);
    let polynomial =
        Polynomial::fit(&temperature, &measurement, FIT_DEGREE).map_err(|source| {
            PipelineError::Fit {
                file: sample.to_string(),
                source,
            }
        })?;

    let base = base_name(sample);
    repository.replace_standard(base, &polynomial)?;
    info!(sample, rows = record.len(), "fitted standard polynomial");
    Ok(polynomial)
}

/// File name without its final extension.
pub fn base_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}
