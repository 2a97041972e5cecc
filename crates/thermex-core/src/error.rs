// crates/thermex-core/src/error.rs

use std::path::PathBuf;

use thermex_parser::ParserError;
use thiserror::Error;

use crate::correction::CorrectionError;
use crate::polynomial::FitError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: ParserError,
    },

    #[error("{file}: malformed input: {reason}")]
    MalformedInput { file: String, reason: String },

    #[error("missing calibration {}: {reason}", path.display())]
    MissingCalibration { path: PathBuf, reason: String },

    #[error("{file}: {source}")]
    Correction {
        file: String,
        #[source]
        source: CorrectionError,
    },

    #[error("{file}: calibration fit failed: {source}")]
    Fit {
        file: String,
        #[source]
        source: FitError,
    },

    #[error("file I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("invalid directory pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("directory walk failed: {0}")]
    Glob(#[from] glob::GlobError),
}

/// Coarse classification used for exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingCalibration,
    MalformedInput,
    UnsupportedFormat,
    InsufficientData,
    Other,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Other => 1,
            ErrorKind::MissingCalibration => 2,
            ErrorKind::MalformedInput => 3,
            ErrorKind::UnsupportedFormat => 4,
            ErrorKind::InsufficientData => 5,
        }
    }
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Parse { source, .. } => match source {
                ParserError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
                ParserError::Io { .. } => ErrorKind::Other,
                ParserError::MalformedInput { .. }
                | ParserError::Csv { .. }
                | ParserError::Workbook { .. } => ErrorKind::MalformedInput,
            },
            PipelineError::MalformedInput { .. } => ErrorKind::MalformedInput,
            PipelineError::MissingCalibration { .. } => ErrorKind::MissingCalibration,
            PipelineError::Correction { source, .. } => source.kind(),
            PipelineError::Fit { source, .. } => {
                if source.is_underdetermined() {
                    ErrorKind::InsufficientData
                } else {
                    ErrorKind::MalformedInput
                }
            }
            PipelineError::Io { .. }
            | PipelineError::Json { .. }
            | PipelineError::Config { .. }
            | PipelineError::Polars(_)
            | PipelineError::Pattern(_)
            | PipelineError::Glob(_) => ErrorKind::Other,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_parser_input_maps_to_exit_code_four() {
        let err = PipelineError::Parse {
            file: "notes.txt".to_string(),
            source: ParserError::UnsupportedFormat {
                path: PathBuf::from("notes.txt"),
            },
        };
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(err.exit_code(), 4);
    }
}
