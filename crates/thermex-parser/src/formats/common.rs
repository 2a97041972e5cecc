use crate::errors::ParserError;
use crate::model::{
    Cell, MetadataEntry, MetadataValue, RawRecord, SourceFormat, SourceRow, RETAINED_COLUMNS,
};

const HEADER_MARKER: &str = "##";
const METADATA_MARKER: char = '#';

enum RowKind {
    Blank,
    Header,
    Other,
}

fn classify(row: &SourceRow) -> RowKind {
    match row.present().next() {
        None => RowKind::Blank,
        Some(Cell::Text(text)) if text.starts_with(HEADER_MARKER) => RowKind::Header,
        Some(_) => RowKind::Other,
    }
}

/// Builds a [`RawRecord`] from the rows of one export in a single pass.
///
/// Rows before the `##` header are metadata, rows after it are data. A numeric
/// row before the header means the header is missing.
pub(crate) fn assemble_record(
    parser: &'static str,
    format: SourceFormat,
    rows: Vec<SourceRow>,
) -> Result<RawRecord, ParserError> {
    let mut metadata = Vec::new();
    let mut columns: Option<[String; RETAINED_COLUMNS]> = None;
    let mut data = Vec::new();

    for row in rows {
        match (classify(&row), columns.is_some()) {
            (RowKind::Blank, _) => {}
            (RowKind::Header, false) => {
                columns = Some(parse_header(parser, &row)?);
            }
            (RowKind::Header, true) => {
                return Err(ParserError::malformed(
                    parser,
                    row.line,
                    "second header row found after data section began",
                ));
            }
            (RowKind::Other, false) => {
                metadata.push(parse_metadata(parser, &row)?);
            }
            (RowKind::Other, true) => {
                data.push(parse_data_row(parser, &row)?);
            }
        }
    }

    let columns = columns.ok_or_else(|| {
        ParserError::malformed(parser, 0, "no '##' header row found before end of file")
    })?;

    Ok(RawRecord {
        format,
        metadata,
        columns,
        rows: data,
    })
}

fn parse_header(
    parser: &'static str,
    row: &SourceRow,
) -> Result<[String; RETAINED_COLUMNS], ParserError> {
    let mut names = row.present().map(|cell| match cell {
        Cell::Text(text) => text.trim_start_matches(HEADER_MARKER).trim().to_string(),
        other => other.to_string(),
    });

    let mut columns: [String; RETAINED_COLUMNS] = Default::default();
    for (idx, slot) in columns.iter_mut().enumerate() {
        *slot = names.next().ok_or_else(|| {
            ParserError::malformed(
                parser,
                row.line,
                format!("header has {idx} columns, expected at least {RETAINED_COLUMNS}"),
            )
        })?;
    }

    Ok(columns)
}

fn parse_metadata(parser: &'static str, row: &SourceRow) -> Result<MetadataEntry, ParserError> {
    let mut present = row.present();
    let key = match present.next() {
        None => {
            return Err(ParserError::malformed(parser, row.line, "empty metadata row"));
        }
        Some(Cell::Text(text)) if text.starts_with(METADATA_MARKER) => {
            text[METADATA_MARKER.len_utf8()..].trim().to_string()
        }
        Some(cell) if cell.as_f64().is_some() => {
            return Err(ParserError::malformed(
                parser,
                row.line,
                "data row found before '##' header row",
            ));
        }
        Some(cell) => cell.to_string(),
    };

    Ok(MetadataEntry::new(key, MetadataValue::from_cell(present.next())))
}

/// Reads the first three fields by position; a blank field is an error, not
/// a shift of the remaining fields.
fn parse_data_row(
    parser: &'static str,
    row: &SourceRow,
) -> Result<[f64; RETAINED_COLUMNS], ParserError> {
    if row.cells.len() < RETAINED_COLUMNS {
        return Err(ParserError::malformed(
            parser,
            row.line,
            format!(
                "expected at least {RETAINED_COLUMNS} numeric fields, found {}",
                row.cells.len()
            ),
        ));
    }

    let mut values = [0.0; RETAINED_COLUMNS];
    for (idx, (slot, cell)) in values.iter_mut().zip(&row.cells).enumerate() {
        if cell.is_absent() {
            return Err(ParserError::malformed(
                parser,
                row.line,
                format!("field {idx} is empty"),
            ));
        }
        *slot = cell.as_f64().ok_or_else(|| {
            ParserError::malformed(
                parser,
                row.line,
                format!("field {idx} value '{cell}' is not numeric"),
            )
        })?;
    }

    Ok(values)
}
