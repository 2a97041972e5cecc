use std::path::Path;

use encoding_rs::ISO_8859_15;

use crate::errors::ParserError;
use crate::model::{Cell, SourceFormat, SourceRow};
use crate::registry::TabularReader;

/// Reader for the comma-delimited instrument export.
///
/// The instrument writes ISO-8859-15 (degree and micro signs in the column
/// names) and leaves a stray NUL byte on the blank line before the header.
pub struct DelimitedReader;

impl Default for DelimitedReader {
    fn default() -> Self {
        Self
    }
}

impl DelimitedReader {
    const NAME: &'static str = "DELIMITED";

    pub fn decode(bytes: &[u8]) -> String {
        let (text, _, _) = ISO_8859_15.decode(bytes);
        text.replace('\0', "")
    }

    pub fn rows_from_str(content: &str) -> Result<Vec<SourceRow>, ParserError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            let line = record
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(idx + 1);
            rows.push(SourceRow::new(line, record.iter().map(Cell::from_text)));
        }
        Ok(rows)
    }
}

impl TabularReader for DelimitedReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Delimited
    }

    fn read_rows(&self, path: &Path) -> Result<Vec<SourceRow>, ParserError> {
        let bytes = std::fs::read(path).map_err(|err| ParserError::Io {
            parser: Self::NAME,
            path: path.to_path_buf(),
            source: err,
        })?;
        Self::rows_from_str(&Self::decode(&bytes))
    }
}
