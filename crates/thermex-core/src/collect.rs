use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use glob::{glob, Pattern};
use tracing::{debug, info};

use crate::config::ThermexConfig;
use crate::error::{PipelineError, Result};
use crate::ledger::list_files;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSummary {
    pub snapshot: PathBuf,
    /// Leaf directory → corrected data files found in it.
    pub listing: BTreeMap<String, Vec<String>>,
    /// Files copied up into the root by this invocation.
    pub copied: Vec<String>,
}

impl CollectSummary {
    pub fn listed(&self) -> usize {
        self.listing.values().map(Vec::len).sum()
    }
}

/// `<ordinal>.dat`, where the ordinal counts days with 0001-01-01 as day 1.
pub fn snapshot_name(date: NaiveDate) -> String {
    format!("{}.dat", date.num_days_from_ce())
}

/// Gathers corrected data files from every leaf directory under `root` into
/// `root` itself and records what was found in a dated snapshot.
pub fn collect_outputs(
    root: &Path,
    config: &ThermexConfig,
    today: NaiveDate,
) -> Result<CollectSummary> {
    let mut listing = BTreeMap::new();
    for leaf in leaf_directories(root)? {
        let files: Vec<String> = list_files(&leaf)?
            .into_iter()
            .filter(|name| is_collectable(name, config))
            .collect();
        debug!(directory = %leaf.display(), files = files.len(), "scanned leaf directory");
        listing.insert(leaf.display().to_string(), files);
    }

    let snapshot = root.join(snapshot_name(today));
    let json = serde_json::to_string(&listing).map_err(|source| PipelineError::Json {
        path: snapshot.clone(),
        source,
    })?;
    fs::write(&snapshot, json).map_err(|err| PipelineError::io(&snapshot, err))?;

    let mut copied = Vec::new();
    for (leaf, files) in &listing {
        for name in files {
            let target = root.join(name);
            if target.exists() {
                continue;
            }
            let source = Path::new(leaf).join(name);
            fs::copy(&source, &target).map_err(|err| PipelineError::io(&source, err))?;
            copied.push(name.clone());
        }
    }

    info!(
        root = %root.display(),
        snapshot = %snapshot.display(),
        copied = copied.len(),
        "collected corrected data files"
    );
    Ok(CollectSummary {
        snapshot,
        listing,
        copied,
    })
}

fn is_collectable(name: &str, config: &ThermexConfig) -> bool {
    let delimited = format!("{}.csv", config.delimited_suffix);
    let workbook = format!("{}.csv", config.workbook_suffix);
    (name.ends_with(&delimited) || name.ends_with(&workbook)) && !config.is_calibration_sample(name)
}

/// `root` and every directory below it that has no subdirectories.
fn leaf_directories(root: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*", Pattern::escape(&root.to_string_lossy()));
    let mut directories = vec![root.to_path_buf()];
    for entry in glob(&pattern)? {
        let path = entry?;
        if path.is_dir() {
            directories.push(path);
        }
    }

    let mut leaves = Vec::new();
    for dir in directories {
        if !has_subdirectory(&dir)? {
            leaves.push(dir);
        }
    }
    leaves.sort();
    Ok(leaves)
}

fn has_subdirectory(dir: &Path) -> Result<bool> {
    let entries = fs::read_dir(dir).map_err(|err| PipelineError::io(dir, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::io(dir, err))?;
        if entry.path().is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ordinal_matches_proleptic_gregorian_day_number() {
        let day_one = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
        assert_eq!(snapshot_name(day_one), "1.dat");
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(snapshot_name(date), "737425.dat");
    }

    #[test]
    fn collects_from_leaves_only_and_skips_existing() {
        let root = tempdir().unwrap();
        let run1 = root.path().join("run1");
        let nested = root.path().join("batch").join("run2");
        fs::create_dir(&run1).unwrap();
        fs::create_dir_all(&nested).unwrap();

        fs::write(run1.join("AL100A-1c.csv"), "a").unwrap();
        fs::write(run1.join("AL100A-1c.txt"), "meta").unwrap();
        fs::write(run1.join("sapph-1c.csv"), "s").unwrap();
        fs::write(run1.join("AL100A-1.csv"), "raw").unwrap();
        fs::write(nested.join("AL010B-1x.csv"), "b").unwrap();
        fs::write(root.path().join("batch").join("skipped-1c.csv"), "x").unwrap();
        fs::write(root.path().join("AL010B-1x.csv"), "already here").unwrap();

        let today = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let summary = collect_outputs(root.path(), &ThermexConfig::default(), today).unwrap();

        assert_eq!(summary.listing.len(), 2);
        assert_eq!(summary.listed(), 2);
        assert_eq!(summary.copied, vec!["AL100A-1c.csv".to_string()]);
        assert_eq!(
            fs::read_to_string(root.path().join("AL100A-1c.csv")).unwrap(),
            "a"
        );
        assert_eq!(
            fs::read_to_string(root.path().join("AL010B-1x.csv")).unwrap(),
            "already here"
        );

        let snapshot: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&fs::read_to_string(&summary.snapshot).unwrap()).unwrap();
        assert_eq!(snapshot, summary.listing);
        assert!(summary.snapshot.ends_with("737425.dat"));
    }
}
