//! In-progress session persistence with file locking.
//!
//! One JSON document per user under the cache directory. Saves go through a temp file
//! and an atomic rename so a reader never observes a half-written session.

use crate::cache::SessionCache;
use crate::{Error, Result, TrainingSession};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Session cache storing `<dir>/<user>.json`
pub struct FileSessionCache {
    dir: PathBuf,
}

impl FileSessionCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for `user_id`. Bytes outside `[A-Za-z0-9_-]` are
    /// percent-encoded so any user id maps to a single safe file name.
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        let mut name = String::with_capacity(user_id.len() + 5);
        for byte in user_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{:02X}", byte));
            }
        }
        name.push_str(".json");
        self.dir.join(name)
    }
}

impl SessionCache for FileSessionCache {
    fn save_session(&self, session: &TrainingSession) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(session.user_id());

        // Temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(session)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved session {} to {:?}", session.id(), path);
        Ok(())
    }

    /// A corrupt entry is reported as an error rather than treated as absent, so a
    /// damaged session is never silently replaced by a new one.
    fn get_session(&self, user_id: &str) -> Result<Option<TrainingSession>> {
        let path = self.path_for(user_id);

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let session = serde_json::from_str::<TrainingSession>(&contents).map_err(|e| {
            tracing::warn!("Corrupt session entry {:?}: {}", path, e);
            Error::Storage(format!("corrupt session entry for user {}: {}", user_id, e))
        })?;

        Ok(Some(session))
    }

    fn delete_session(&self, user_id: &str) -> Result<()> {
        let path = self.path_for(user_id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed session entry {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::session_on;
    use crate::{ErrorKind, Exercise};
    use chrono::Utc;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = FileSessionCache::new(temp_dir.path().join("sessions"));
        let bench = Exercise::new("Bench", "chest", "barbell");
        let session = session_on("u1", Utc::now(), &[(&bench, &[(40.0, 12), (0.0, 0)])]);

        cache.save_session(&session).unwrap();

        let loaded = cache.get_session("u1").unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(loaded.active_exercise().unwrap().active_set().unwrap().is_pending());
    }

    #[test]
    fn test_missing_entry_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = FileSessionCache::new(temp_dir.path());
        assert!(cache.get_session("nobody").unwrap().is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = FileSessionCache::new(temp_dir.path());
        let session = TrainingSession::new("u1", Utc::now(), "", vec![]);

        cache.save_session(&session).unwrap();
        cache.delete_session("u1").unwrap();
        cache.delete_session("u1").unwrap();
        assert!(cache.get_session("u1").unwrap().is_none());
    }

    #[test]
    fn test_corrupted_entry_returns_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = FileSessionCache::new(temp_dir.path());
        std::fs::write(cache.path_for("u1"), "{ invalid json }").unwrap();

        let err = cache.get_session("u1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
    }

    #[test]
    fn test_user_ids_are_sanitized() {
        let cache = FileSessionCache::new("/cache");
        assert_eq!(cache.path_for("user_42-a"), PathBuf::from("/cache/user_42-a.json"));
        assert_eq!(cache.path_for("../x"), PathBuf::from("/cache/%2E%2E%2Fx.json"));
        assert_ne!(cache.path_for("a/b"), cache.path_for("a_b"));
    }

    #[test]
    fn test_atomic_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = FileSessionCache::new(temp_dir.path());
        let session = TrainingSession::new("u1", Utc::now(), "", vec![]);
        cache.save_session(&session).unwrap();
        cache.save_session(&session).unwrap();

        // Verify only the entry remains, no stray temp files
        let names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("u1.json")]);
    }
}
