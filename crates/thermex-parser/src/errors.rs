use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("unsupported file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("{parser} line {line_index} malformed: {message}")]
    MalformedInput {
        parser: &'static str,
        line_index: usize,
        message: String,
    },

    #[error("{parser} CSV error: {source}")]
    Csv {
        parser: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{parser} workbook error: {source}")]
    Workbook {
        parser: &'static str,
        #[source]
        source: calamine::XlsxError,
    },

    #[error("{parser} could not read {}: {source}", path.display())]
    Io {
        parser: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParserError {
    pub(crate) fn malformed(
        parser: &'static str,
        line_index: usize,
        message: impl Into<String>,
    ) -> Self {
        ParserError::MalformedInput {
            parser,
            line_index,
            message: message.into(),
        }
    }
}
