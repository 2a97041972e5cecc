use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::ledger::list_files;

/// Orientations in presentation order; anything else sorts after these.
pub const PREFERRED_ORIENTATIONS: [&str; 3] = ["100", "010", "001"];

/// Pieces of a corrected data file name such as `AL100A-1c.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesName {
    pub sample: String,
    pub orientation: String,
    pub run: String,
    /// Last character before the extension: the source format suffix.
    pub filetype: char,
}

/// Parses `<letters><digits><run>[-...]<filetype>.csv`.
pub fn parse_series_name(file_name: &str) -> Option<SeriesName> {
    let stem = file_name.strip_suffix(".csv")?;
    let filetype = stem.chars().last()?;

    let mut head = stem.split(['.', '-']).next()?;
    if head.len() == stem.len() {
        head = &stem[..stem.len() - filetype.len_utf8()];
    }
    let letters = head
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(head.len());
    let sample = &head[..letters];
    let rest = &head[letters..];
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if sample.is_empty() || digits == 0 {
        return None;
    }

    Some(SeriesName {
        sample: sample.to_string(),
        orientation: rest[..digits].to_string(),
        run: rest[digits..].to_string(),
        filetype,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub sample: String,
    pub orientation: String,
    pub run: String,
    pub file: String,
}

fn orientation_rank(orientation: &str) -> usize {
    PREFERRED_ORIENTATIONS
        .iter()
        .position(|preferred| *preferred == orientation)
        .unwrap_or(PREFERRED_ORIENTATIONS.len())
}

fn compare_orientations(a: &str, b: &str) -> Ordering {
    orientation_rank(a)
        .cmp(&orientation_rank(b))
        .then_with(|| a.cmp(b))
}

/// One file per (sample, orientation, run), preferring the smallest filetype
/// character so delimited exports win over workbook exports.
pub fn catalog_from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<CatalogEntry> {
    let mut chosen: BTreeMap<(String, String, String), (char, &str)> = BTreeMap::new();
    for name in names {
        let Some(series) = parse_series_name(name) else {
            debug!(file = name, "skipping file with unrecognised series name");
            continue;
        };
        let key = (series.sample, series.orientation, series.run);
        let candidate = (series.filetype, name);
        chosen
            .entry(key)
            .and_modify(|current| {
                if candidate < *current {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut entries: Vec<CatalogEntry> = chosen
        .into_iter()
        .map(|((sample, orientation, run), (_, file))| CatalogEntry {
            sample,
            orientation,
            run,
            file: file.to_string(),
        })
        .collect();
    entries.sort_by(|a, b| {
        a.sample
            .cmp(&b.sample)
            .then_with(|| compare_orientations(&a.orientation, &b.orientation))
            .then_with(|| a.run.cmp(&b.run))
    });
    entries
}

/// Catalog of the corrected data files sitting directly in `root`.
pub fn build_catalog(root: &Path) -> Result<Vec<CatalogEntry>> {
    let names: Vec<String> = list_files(root)?
        .into_iter()
        .filter(|name| name.ends_with(".csv"))
        .collect();
    Ok(catalog_from_names(names.iter().map(String::as_str)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sample_orientation_run_and_filetype() {
        let series = parse_series_name("AL100A-1c.csv").unwrap();
        assert_eq!(series.sample, "AL");
        assert_eq!(series.orientation, "100");
        assert_eq!(series.run, "A");
        assert_eq!(series.filetype, 'c');

        let bare = parse_series_name("QTZ001x.csv").unwrap();
        assert_eq!(bare.orientation, "001");
        assert_eq!(bare.run, "");
        assert_eq!(bare.filetype, 'x');

        let bare_run = parse_series_name("QTZ001Bc.csv").unwrap();
        assert_eq!(bare_run.run, "B");
        assert_eq!(bare_run.filetype, 'c');

        assert!(parse_series_name("100A-1c.csv").is_none());
        assert!(parse_series_name("notes-1c.csv").is_none());
        assert!(parse_series_name("AL100A-1c.txt").is_none());
    }

    #[test]
    fn unhyphenated_exports_of_one_run_collapse_to_delimited() {
        let entries = catalog_from_names(["QTZ001x.csv", "QTZ001c.csv"]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].run, "");
        assert_eq!(entries[0].file, "QTZ001c.csv");
    }

    #[test]
    fn delimited_export_preferred_and_orientations_ordered() {
        let names = [
            "AL001A-1c.csv",
            "AL100A-1x.csv",
            "AL100A-1c.csv",
            "AL110B-1x.csv",
            "AL010A-1x.csv",
            "11.csv",
            "BN100A-1c.csv",
        ];
        let entries = catalog_from_names(names);

        let files: Vec<&str> = entries.iter().map(|e| e.file.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "AL100A-1c.csv",
                "AL010A-1x.csv",
                "AL001A-1c.csv",
                "AL110B-1x.csv",
                "BN100A-1c.csv",
            ]
        );
    }
}
