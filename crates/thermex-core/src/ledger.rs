use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use thermex_parser::is_supported_file_name;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Append-only record of the file names already archived in one directory.
///
/// Names are compared verbatim: a listed file is never reprocessed, even if
/// its contents change later.
#[derive(Debug, Clone)]
pub struct Ledger {
    directory: PathBuf,
    file_name: String,
}

impl Ledger {
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    pub fn load(&self) -> Result<BTreeSet<String>> {
        let path = self.path();
        let content = fs::read_to_string(&path).map_err(|err| PipelineError::io(&path, err))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Supported files in the directory that the ledger does not list yet,
    /// sorted by name. Creates the ledger, seeded with its own name, on first
    /// use.
    pub fn compute_delta(&self) -> Result<Vec<String>> {
        let known = if self.exists() {
            self.load()?
        } else {
            self.create()?;
            BTreeSet::new()
        };

        let delta: Vec<String> = list_files(&self.directory)?
            .into_iter()
            .filter(|name| is_supported_file_name(name))
            .filter(|name| !known.contains(name))
            .collect();

        debug!(
            directory = %self.directory.display(),
            new_files = delta.len(),
            "computed ledger delta"
        );
        Ok(delta)
    }

    pub fn append(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let path = self.path();
        let needs_newline = match fs::read(&path) {
            Ok(bytes) => bytes.last().is_some_and(|b| *b != b'\n'),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => return Err(PipelineError::io(&path, err)),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| PipelineError::io(&path, err))?;

        let mut text = String::new();
        if needs_newline {
            text.push('\n');
        }
        for name in names {
            text.push_str(name);
            text.push('\n');
        }
        file.write_all(text.as_bytes())
            .map_err(|err| PipelineError::io(&path, err))?;

        info!(ledger = %path.display(), entries = names.len(), "ledger updated");
        Ok(())
    }

    fn create(&self) -> Result<()> {
        let path = self.path();
        fs::write(&path, format!("{}\n", self.file_name))
            .map_err(|err| PipelineError::io(&path, err))?;
        info!(ledger = %path.display(), "created ledger");
        Ok(())
    }
}

/// Names of the regular files directly inside `directory`, sorted.
pub(crate) fn list_files(directory: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(directory).map_err(|err| PipelineError::io(directory, err))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::io(directory, err))?;
        let is_file = entry
            .file_type()
            .map_err(|err| PipelineError::io(entry.path(), err))?
            .is_file();
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn first_run_seeds_ledger_and_returns_all_supported_files() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.xlsx");
        touch(dir.path(), "a.csv");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("sub.csv")).unwrap();

        let ledger = Ledger::new(dir.path(), "th_exp_data.dat");
        let delta = ledger.compute_delta().unwrap();

        assert_eq!(delta, vec!["a.csv".to_string(), "b.xlsx".to_string()]);
        assert_eq!(
            fs::read_to_string(ledger.path()).unwrap(),
            "th_exp_data.dat\n"
        );
    }

    #[test]
    fn appended_names_drop_out_of_the_delta() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.csv");
        touch(dir.path(), "b.csv");

        let ledger = Ledger::new(dir.path(), "th_exp_data.dat");
        let delta = ledger.compute_delta().unwrap();
        ledger.append(&delta).unwrap();

        assert!(ledger.compute_delta().unwrap().is_empty());

        touch(dir.path(), "c.xlsx");
        assert_eq!(ledger.compute_delta().unwrap(), vec!["c.xlsx".to_string()]);
    }

    #[test]
    fn append_repairs_missing_trailing_newline() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(dir.path(), "th_exp_data.dat");
        fs::write(ledger.path(), "th_exp_data.dat\nold.csv").unwrap();

        ledger.append(&["new.csv".to_string()]).unwrap();

        let names = ledger.load().unwrap();
        assert!(names.contains("old.csv"));
        assert!(names.contains("new.csv"));
        assert_eq!(
            fs::read_to_string(ledger.path()).unwrap(),
            "th_exp_data.dat\nold.csv\nnew.csv\n"
        );
    }

    #[test]
    fn existing_ledger_is_not_rewritten_by_delta() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(dir.path(), "th_exp_data.dat");
        fs::write(ledger.path(), "th_exp_data.dat\na.csv\n").unwrap();
        touch(dir.path(), "a.csv");

        assert!(ledger.compute_delta().unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(ledger.path()).unwrap(),
            "th_exp_data.dat\na.csv\n"
        );
    }
}
