use std::path::Path;

use crate::errors::ParserError;
use crate::formats::{assemble_record, DelimitedReader, WorkbookReader};
use crate::model::{RawRecord, SourceFormat, SourceRow};

pub trait TabularReader {
    fn name(&self) -> &'static str;
    fn format(&self) -> SourceFormat;
    fn read_rows(&self, path: &Path) -> Result<Vec<SourceRow>, ParserError>;

    fn parse(&self, path: &Path) -> Result<RawRecord, ParserError> {
        let rows = self.read_rows(path)?;
        assemble_record(self.name(), self.format(), rows)
    }
}

pub fn reader_for(format: SourceFormat) -> &'static dyn TabularReader {
    static DELIMITED: DelimitedReader = DelimitedReader;
    static WORKBOOK: WorkbookReader = WorkbookReader;
    match format {
        SourceFormat::Delimited => &DELIMITED,
        SourceFormat::Workbook => &WORKBOOK,
    }
}

pub fn parse_tabular_file(path: &Path) -> Result<RawRecord, ParserError> {
    let format = SourceFormat::from_path(path).ok_or_else(|| ParserError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    reader_for(format).parse(path)
}

pub fn is_supported_file_name(name: &str) -> bool {
    SourceFormat::from_path(Path::new(name)).is_some()
}
