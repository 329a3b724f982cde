//! CSV file of flattened training log rows.
//!
//! Each finished session is appended in one locked write, then fsynced. Appending a
//! session whose id already has rows is a no-op, so a retried finalization never
//! duplicates history.

use crate::history::TrainingLogRow;
use crate::Result;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the rows of one session. Returns the number of rows written.
    pub fn append_session(&self, rows: &[TrainingLogRow]) -> Result<usize> {
        let Some(session_id) = rows.first().map(|r| r.session_id) else {
            return Ok(0);
        };

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let already_stored = read_rows(&file, &self.path)?
            .iter()
            .any(|r| r.session_id == session_id);
        if already_stored {
            file.unlock()?;
            tracing::debug!("Session {} already in {:?}, skipping", session_id, self.path);
            return Ok(0);
        }

        // Header only when the file is new
        let needs_headers = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_headers)
            .from_writer(&file);

        for row in rows {
            writer.serialize(row)?;
        }

        writer.flush()?;
        drop(writer);
        file.sync_all()?;
        file.unlock()?;

        tracing::info!("Wrote {} log rows for session {}", rows.len(), session_id);
        Ok(rows.len())
    }

    /// Read every row. Missing files read as empty; malformed rows are skipped.
    pub fn read_rows(&self) -> Result<Vec<TrainingLogRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let rows = read_rows(&file, &self.path);
        file.unlock()?;
        rows
    }
}

fn read_rows(file: &File, path: &Path) -> Result<Vec<TrainingLogRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.deserialize::<TrainingLogRow>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::warn!("Failed to deserialize log row in {:?}: {}", path, e);
                // Continue processing other rows
            }
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{self, tests::session_on};
    use crate::Exercise;
    use chrono::Utc;

    #[test]
    fn test_append_creates_file_with_header() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(temp_dir.path().join("training_logs.csv"));
        let bench = Exercise::new("Bench", "chest", "barbell");
        let session = session_on("u1", Utc::now(), &[(&bench, &[(40.0, 12), (45.0, 8)])]);

        let written = log.append_session(&history::flatten(&session)).unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.starts_with("id,user_id,session_id"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_rows_roundtrip_and_append() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(temp_dir.path().join("training_logs.csv"));
        let bench = Exercise::new("Bench", "chest", "barbell");

        let first = session_on("u1", Utc::now(), &[(&bench, &[(40.0, 12)])]);
        let second = session_on("u1", Utc::now(), &[(&bench, &[(42.5, 10)])]);
        let first_rows = history::flatten(&first);

        log.append_session(&first_rows).unwrap();
        log.append_session(&history::flatten(&second)).unwrap();

        let rows = log.read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], first_rows[0]);
    }

    #[test]
    fn test_notes_with_separators_survive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(temp_dir.path().join("training_logs.csv"));
        let bench = Exercise::new("Bench", "chest", "barbell");
        let session = session_on("u1", Utc::now(), &[(&bench, &[(40.0, 12)])]);

        let mut rows = history::flatten(&session);
        rows[0].notes = "slow, paused\n\"tough\"".into();
        log.append_session(&rows).unwrap();

        assert_eq!(log.read_rows().unwrap()[0].notes, "slow, paused\n\"tough\"");
    }

    #[test]
    fn test_duplicate_session_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(temp_dir.path().join("training_logs.csv"));
        let bench = Exercise::new("Bench", "chest", "barbell");
        let session = session_on("u1", Utc::now(), &[(&bench, &[(40.0, 12)])]);
        let rows = history::flatten(&session);

        assert_eq!(log.append_session(&rows).unwrap(), 1);
        assert_eq!(log.append_session(&rows).unwrap(), 0);
        assert_eq!(log.read_rows().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(temp_dir.path().join("nonexistent.csv"));
        assert!(log.read_rows().unwrap().is_empty());
    }
}
