use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};

use crate::errors::ParserError;
use crate::model::{Cell, SourceFormat, SourceRow};
use crate::registry::TabularReader;

/// Reader for the spreadsheet export. Only the first worksheet is read.
pub struct WorkbookReader;

impl Default for WorkbookReader {
    fn default() -> Self {
        Self
    }
}

impl WorkbookReader {
    const NAME: &'static str = "WORKBOOK";

    pub fn cell_from_data(data: &Data) -> Cell {
        match data {
            Data::Empty => Cell::Absent,
            Data::Int(value) => Cell::Number(*value as f64),
            Data::Float(value) => Cell::Number(*value),
            Data::String(text) => Cell::from_text(text),
            other => Cell::from_text(&other.to_string()),
        }
    }
}

impl TabularReader for WorkbookReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Workbook
    }

    fn read_rows(&self, path: &Path) -> Result<Vec<SourceRow>, ParserError> {
        let mut workbook: Xlsx<_> = open_workbook(path).map_err(|err| ParserError::Workbook {
            parser: Self::NAME,
            source: err,
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ParserError::malformed(Self::NAME, 0, "workbook has no worksheets"))?
            .map_err(|err| ParserError::Workbook {
                parser: Self::NAME,
                source: err,
            })?;

        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let rows = range
            .rows()
            .enumerate()
            .map(|(idx, cells)| {
                SourceRow::new(
                    first_row + idx + 1,
                    cells.iter().map(Self::cell_from_data),
                )
            })
            .collect();
        Ok(rows)
    }
}
