use std::path::{Path, PathBuf};

use thermex_parser::{parse_tabular_file, RawRecord};
use tracing::{debug, info};

use crate::archive::{remove_outputs, write_outputs, ArchivedFiles};
use crate::calibration::{
    base_name, calibration_sample, resolve_standard, CalibrationRepository, FsCalibrationStore,
};
use crate::config::ThermexConfig;
use crate::correction::{CorrectedRecord, CorrectionEngine};
use crate::error::{PipelineError, Result};
use crate::ledger::Ledger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    ComputingDelta,
    NoNewFiles,
    LoadingCalibration,
    ProcessingFiles,
    UpdatingLedger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    pub source: String,
    pub outputs: ArchivedFiles,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub directory: PathBuf,
    pub calibration_sample: Option<String>,
    pub processed: Vec<ProcessedFile>,
    /// Every name appended to the ledger by this run.
    pub ledger_entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    UpToDate,
    Processed(RunSummary),
}

struct StagedFile {
    source: String,
    record: RawRecord,
    corrected: CorrectedRecord,
}

/// One processing run over a single directory.
///
/// Every new file is parsed and corrected before anything is written. Any
/// failure aborts the run with the ledger untouched.
pub struct Pipeline<R = FsCalibrationStore> {
    directory: PathBuf,
    config: ThermexConfig,
    calibration: R,
    ledger: Ledger,
    engine: CorrectionEngine,
}

impl Pipeline<FsCalibrationStore> {
    pub fn new(directory: impl Into<PathBuf>, config: ThermexConfig) -> Self {
        let directory = directory.into();
        let calibration = FsCalibrationStore::new(&directory, &config);
        Self::with_calibration(directory, config, calibration)
    }
}

impl<R: CalibrationRepository> Pipeline<R> {
    pub fn with_calibration(
        directory: impl Into<PathBuf>,
        config: ThermexConfig,
        calibration: R,
    ) -> Self {
        let directory = directory.into();
        Self {
            ledger: Ledger::new(&directory, config.ledger_file.clone()),
            engine: CorrectionEngine::from_config(&config),
            directory,
            config,
            calibration,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn run(&self) -> Result<RunOutcome> {
        self.enter(Stage::ComputingDelta);
        let delta = self.ledger.compute_delta()?;
        if delta.is_empty() {
            self.enter(Stage::NoNewFiles);
            info!(directory = %self.directory.display(), "folder is up to date");
            self.enter(Stage::Idle);
            return Ok(RunOutcome::UpToDate);
        }
        info!(new_files = delta.len(), "found new files");

        self.enter(Stage::LoadingCalibration);
        let certificate = self.calibration.load_certificate()?;
        let standard = resolve_standard(&self.calibration, &self.directory, &delta, &self.config)?;
        let sample = calibration_sample(&delta, &self.config).map(str::to_string);

        self.enter(Stage::ProcessingFiles);
        let mut staged = Vec::new();
        for name in &delta {
            if self.config.is_calibration_sample(name) {
                continue;
            }
            let record = parse_tabular_file(&self.directory.join(name)).map_err(|source| {
                PipelineError::Parse {
                    file: name.clone(),
                    source,
                }
            })?;
            let corrected = self
                .engine
                .correct_and_fit(&record, &certificate, &standard)
                .map_err(|source| PipelineError::Correction {
                    file: name.clone(),
                    source,
                })?;
            debug!(file = %name, rows = record.len(), "staged file");
            staged.push(StagedFile {
                source: name.clone(),
                record,
                corrected,
            });
        }

        let processed = self.write_all(&staged)?;

        self.enter(Stage::UpdatingLedger);
        let mut ledger_entries = delta;
        for file in &processed {
            ledger_entries.extend(file.outputs.names().iter().map(|n| n.to_string()));
        }
        if let Err(err) = self.ledger.append(&ledger_entries) {
            self.discard(&processed);
            return Err(err);
        }

        info!(
            directory = %self.directory.display(),
            processed = processed.len(),
            "run complete"
        );
        self.enter(Stage::Idle);
        Ok(RunOutcome::Processed(RunSummary {
            directory: self.directory.clone(),
            calibration_sample: sample,
            processed,
            ledger_entries,
        }))
    }

    /// Writes every staged file, removing this run's outputs again if any
    /// write fails.
    fn write_all(&self, staged: &[StagedFile]) -> Result<Vec<ProcessedFile>> {
        let mut processed: Vec<ProcessedFile> = Vec::with_capacity(staged.len());
        for file in staged {
            let written = write_outputs(
                &self.directory,
                base_name(&file.source),
                file.record.format,
                &file.record.metadata,
                &file.corrected,
                &self.config,
            );
            match written {
                Ok(outputs) => processed.push(ProcessedFile {
                    source: file.source.clone(),
                    outputs,
                    rows: file.corrected.len(),
                }),
                Err(err) => {
                    self.discard(&processed);
                    return Err(err);
                }
            }
        }
        Ok(processed)
    }

    /// Removes the outputs of an aborted run so the next run does not see
    /// them as new inputs.
    fn discard(&self, processed: &[ProcessedFile]) {
        for done in processed {
            remove_outputs(&self.directory, &done.outputs.names());
        }
    }

    fn enter(&self, stage: Stage) {
        debug!(directory = %self.directory.display(), ?stage, "pipeline stage");
    }
}

pub fn process_directory(directory: &Path, config: &ThermexConfig) -> Result<RunOutcome> {
    Pipeline::new(directory, config.clone()).run()
}
