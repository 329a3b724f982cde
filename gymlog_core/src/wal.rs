//! Append-only JSON Lines files with file locking.
//!
//! Used for the exercise catalog and session headers. Writers take an exclusive lock
//! for the duration of a check-and-append; readers take a shared lock.

use crate::Result;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// A JSONL file holding records of one type
pub struct JsonlFile {
    path: PathBuf,
}

impl JsonlFile {
    /// Create a handle for the given path; the file is created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append `record` unless an existing record satisfies `exists`.
    ///
    /// The check and the append happen under one exclusive lock. Returns whether the
    /// record was written.
    pub fn append_unless<T, F>(&self, record: &T, exists: F) -> Result<bool>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let existing: Vec<T> = read_records(&file, &self.path)?;
        if existing.iter().any(exists) {
            file.unlock()?;
            return Ok(false);
        }

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.sync_all()?;
        file.unlock()?;

        tracing::debug!("Appended record to {:?}", self.path);
        Ok(true)
    }

    /// Read every record. Missing files read as empty; unparseable lines are skipped.
    pub fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let records = read_records(&file, &self.path);
        file.unlock()?;

        let records = records?;
        tracing::debug!("Read {} records from {:?}", records.len(), self.path);
        Ok(records)
    }
}

fn read_records<T: DeserializeOwned>(file: &File, path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable record at {:?}:{}: {}",
                    path,
                    line_num + 1,
                    e
                );
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        id: u32,
        name: String,
    }

    fn record(id: u32) -> Record {
        Record {
            id,
            name: format!("record {}", id),
        }
    }

    #[test]
    fn test_append_and_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = JsonlFile::new(temp_dir.path().join("nested/records.jsonl"));

        for id in 0..3 {
            assert!(file.append_unless(&record(id), |_: &Record| false).unwrap());
        }

        let records: Vec<Record> = file.read_all().unwrap();
        assert_eq!(records, vec![record(0), record(1), record(2)]);
    }

    #[test]
    fn test_append_unless_skips_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = JsonlFile::new(temp_dir.path().join("records.jsonl"));

        assert!(file.append_unless(&record(1), |r: &Record| r.id == 1).unwrap());
        assert!(!file.append_unless(&record(1), |r: &Record| r.id == 1).unwrap());

        let records: Vec<Record> = file.read_all().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = JsonlFile::new(temp_dir.path().join("nonexistent.jsonl"));
        let records: Vec<Record> = file.read_all().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_corrupt_lines_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("records.jsonl");
        std::fs::write(&path, "{ invalid json }\n{\"id\":7,\"name\":\"ok\"}\n").unwrap();

        let records: Vec<Record> = JsonlFile::new(&path).read_all().unwrap();
        assert_eq!(
            records,
            vec![Record {
                id: 7,
                name: "ok".into()
            }]
        );
    }
}
