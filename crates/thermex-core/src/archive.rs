use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::{CsvWriter, SerWriter};
use thermex_parser::{MetadataEntry, SourceFormat};
use tracing::{info, warn};

use crate::config::ThermexConfig;
use crate::correction::CorrectedRecord;
use crate::error::{PipelineError, Result};

/// Names of the two outputs written for one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedFiles {
    pub metadata_file: String,
    pub data_file: String,
}

impl ArchivedFiles {
    /// `<base><suffix>.txt` and `<base><suffix>.csv`, where the suffix names
    /// the source format.
    pub fn for_source(base_name: &str, format: SourceFormat, config: &ThermexConfig) -> Self {
        let stem = format!("{base_name}{}", config.output_suffix(format));
        Self {
            metadata_file: format!("{stem}.txt"),
            data_file: format!("{stem}.csv"),
        }
    }

    pub fn names(&self) -> [&str; 2] {
        [&self.metadata_file, &self.data_file]
    }
}

pub fn metadata_sidecar_text(metadata: &[MetadataEntry]) -> String {
    metadata
        .iter()
        .map(MetadataEntry::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits a sidecar line back into key and value.
///
/// Instrument keys end in a colon, so the key runs to the first `": "`
/// when there is one; otherwise the first space separates key and value.
pub fn parse_sidecar_line(line: &str) -> (String, Option<String>) {
    if let Some(idx) = line.find(": ") {
        let (key, value) = line.split_at(idx + 1);
        return (key.to_string(), Some(value[1..].to_string()));
    }
    if line.ends_with(':') {
        return (line.to_string(), None);
    }
    match line.split_once(' ') {
        Some((key, value)) => (key.to_string(), Some(value.to_string())),
        None => (line.to_string(), None),
    }
}

pub fn read_metadata_sidecar(path: &Path) -> Result<Vec<(String, Option<String>)>> {
    let content = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
    Ok(content
        .lines()
        .filter(|line| !line.is_empty())
        .map(parse_sidecar_line)
        .collect())
}

/// Writes the metadata sidecar and the corrected data file for one input.
pub fn write_outputs(
    directory: &Path,
    base_name: &str,
    format: SourceFormat,
    metadata: &[MetadataEntry],
    corrected: &CorrectedRecord,
    config: &ThermexConfig,
) -> Result<ArchivedFiles> {
    let files = ArchivedFiles::for_source(base_name, format, config);

    let metadata_path = directory.join(&files.metadata_file);
    fs::write(&metadata_path, metadata_sidecar_text(metadata))
        .map_err(|err| PipelineError::io(&metadata_path, err))?;

    let data_path = directory.join(&files.data_file);
    if let Err(err) = write_data_file(&data_path, corrected) {
        remove_outputs(directory, &[files.metadata_file.as_str()]);
        return Err(err);
    }

    info!(
        metadata = %files.metadata_file,
        data = %files.data_file,
        rows = corrected.len(),
        "archived corrected record"
    );
    Ok(files)
}

fn write_data_file(path: &Path, corrected: &CorrectedRecord) -> Result<()> {
    let mut df = corrected.to_dataframe()?;
    let mut file = File::create(path).map_err(|err| PipelineError::io(path, err))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

/// Best-effort removal of outputs from an aborted run.
pub fn remove_outputs(directory: &Path, names: &[&str]) {
    for name in names {
        let path: PathBuf = directory.join(name);
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), "failed to remove partial output: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermex_parser::MetadataValue;

    #[test]
    fn output_names_carry_format_suffix() {
        let config = ThermexConfig::default();
        let csv = ArchivedFiles::for_source("AL100A-1", SourceFormat::Delimited, &config);
        let xlsx = ArchivedFiles::for_source("AL100A-1", SourceFormat::Workbook, &config);

        assert_eq!(csv.metadata_file, "AL100A-1c.txt");
        assert_eq!(csv.data_file, "AL100A-1c.csv");
        assert_eq!(xlsx.metadata_file, "AL100A-1x.txt");
        assert_eq!(xlsx.data_file, "AL100A-1x.csv");
    }

    #[test]
    fn sidecar_lines_round_trip() {
        let metadata = vec![
            MetadataEntry::new("SAMPLE:", MetadataValue::Text("Alumina 100 run A".into())),
            MetadataEntry::new("SAMPLE LENGTH /mm:", MetadataValue::Number(25.012)),
            MetadataEntry::new("OPERATOR:", MetadataValue::Absent),
            MetadataEntry::new("REMARK", MetadataValue::Text("reheated".into())),
        ];

        let text = metadata_sidecar_text(&metadata);
        assert_eq!(
            text,
            "SAMPLE: Alumina 100 run A\nSAMPLE LENGTH /mm: 25.012\nOPERATOR:\nREMARK reheated"
        );

        let parsed: Vec<_> = text.lines().map(parse_sidecar_line).collect();
        assert_eq!(
            parsed[0],
            ("SAMPLE:".to_string(), Some("Alumina 100 run A".to_string()))
        );
        assert_eq!(
            parsed[1],
            ("SAMPLE LENGTH /mm:".to_string(), Some("25.012".to_string()))
        );
        assert_eq!(parsed[2], ("OPERATOR:".to_string(), None));
        assert_eq!(
            parsed[3],
            ("REMARK".to_string(), Some("reheated".to_string()))
        );
    }
}
