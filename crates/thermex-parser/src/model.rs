use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Number of leading data columns kept from an export. Anything after the
/// third column is instrument-computed and discarded.
pub const RETAINED_COLUMNS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFormat {
    /// Comma-delimited text export, ISO-8859-15 encoded.
    Delimited,
    /// Spreadsheet workbook export.
    Workbook,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Delimited => "delimited",
            SourceFormat::Workbook => "workbook",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Delimited => "csv",
            SourceFormat::Workbook => "xlsx",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Delimited),
            "xlsx" => Some(SourceFormat::Workbook),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single raw cell as read from either source format.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Absent,
}

impl Cell {
    pub fn from_text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Cell::Absent
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric value of the cell; text cells are parsed as floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => text.trim().parse::<f64>().ok(),
            Cell::Absent => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Absent => Ok(()),
        }
    }
}

/// One physical row from a source file.
///
/// Cells keep their column positions; only trailing absent cells are
/// dropped, so a fully blank row has no cells.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub line: usize,
    pub cells: Vec<Cell>,
}

impl SourceRow {
    pub fn new(line: usize, cells: impl IntoIterator<Item = Cell>) -> Self {
        let mut cells: Vec<Cell> = cells.into_iter().collect();
        while cells.last().is_some_and(Cell::is_absent) {
            cells.pop();
        }
        Self { line, cells }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells that hold a value, in column order.
    pub fn present(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|cell| !cell.is_absent())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    Absent,
}

impl MetadataValue {
    pub fn from_cell(cell: Option<&Cell>) -> Self {
        match cell {
            Some(Cell::Text(text)) => MetadataValue::Text(text.trim().to_string()),
            Some(Cell::Number(value)) => MetadataValue::Number(*value),
            Some(Cell::Absent) | None => MetadataValue::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, MetadataValue::Absent)
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Text(text) => f.write_str(text),
            MetadataValue::Number(value) => write!(f, "{value}"),
            MetadataValue::Absent => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: MetadataValue,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: MetadataValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// `key value`, or the bare key when the value is absent.
    pub fn to_line(&self) -> String {
        if self.value.is_absent() {
            self.key.clone()
        } else {
            format!("{} {}", self.key, self.value)
        }
    }
}

/// Sectioned contents of one instrument export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub format: SourceFormat,
    pub metadata: Vec<MetadataEntry>,
    pub columns: [String; RETAINED_COLUMNS],
    pub rows: Vec<[f64; RETAINED_COLUMNS]>,
}

impl RawRecord {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }

    /// The first retained column is always the sample temperature.
    pub fn temperature(&self) -> Vec<f64> {
        self.column(0)
    }
}
