//! File-backed durable store.
//!
//! Layout under the data directory:
//! - `exercises.jsonl`: exercise catalog
//! - `sessions.jsonl`: session headers
//! - `training_logs.csv`: one row per performed set

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::csv_log::CsvLog;
use crate::history;
use crate::store::{SessionRecord, TrainingStore};
use crate::wal::JsonlFile;
use crate::{Error, Exercise, ExerciseProgression, Result, TrainingSession};

pub struct FileTrainingStore {
    data_dir: PathBuf,
    exercises: JsonlFile,
    sessions: JsonlFile,
    logs: CsvLog,
}

impl FileTrainingStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            exercises: JsonlFile::new(data_dir.join("exercises.jsonl")),
            sessions: JsonlFile::new(data_dir.join("sessions.jsonl")),
            logs: CsvLog::new(data_dir.join("training_logs.csv")),
            data_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn catalog(&self) -> Result<Vec<Exercise>> {
        self.exercises.read_all()
    }

    /// All stored session headers
    pub fn session_records(&self) -> Result<Vec<SessionRecord>> {
        self.sessions.read_all()
    }
}

impl TrainingStore for FileTrainingStore {
    /// Name uniqueness is re-checked under the file lock, so concurrent creators of the
    /// same name cannot both succeed.
    fn insert_exercise(&self, exercise: &Exercise) -> Result<()> {
        let written = self
            .exercises
            .append_unless(exercise, |e: &Exercise| e.name() == exercise.name())?;
        if !written {
            return Err(Error::ExerciseAlreadyExists(exercise.name().to_string()));
        }
        Ok(())
    }

    fn exercise_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        Ok(self.catalog()?.into_iter().find(|e| e.name() == name))
    }

    fn exercise_by_id(&self, id: Uuid) -> Result<Option<Exercise>> {
        Ok(self.catalog()?.into_iter().find(|e| e.id() == id))
    }

    fn exercises_by_muscle_group(&self, muscle_group: &str) -> Result<Vec<Exercise>> {
        Ok(self
            .catalog()?
            .into_iter()
            .filter(|e| e.muscle_group() == muscle_group)
            .collect())
    }

    fn insert_training_session(&self, session: &TrainingSession) -> Result<()> {
        let record = SessionRecord::from(session);
        self.sessions
            .append_unless(&record, |r: &SessionRecord| r.id == record.id)?;
        Ok(())
    }

    fn insert_training_logs(&self, session: &TrainingSession) -> Result<()> {
        self.logs.append_session(&history::flatten(session))?;
        Ok(())
    }

    fn training_sessions(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TrainingSession>> {
        let records = self.session_records()?;
        let rows = self.logs.read_rows()?;
        Ok(history::sessions_between(&records, &rows, user_id, from, to))
    }

    fn exercise_progression(
        &self,
        user_id: &str,
        exercise_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExerciseProgression>> {
        let rows = self.logs.read_rows()?;
        Ok(history::progression(&rows, user_id, exercise_id, from, to))
    }

    fn last_sets_for_exercise(
        &self,
        user_id: &str,
        exercise_id: Uuid,
        limit_days: usize,
    ) -> Result<Vec<ExerciseProgression>> {
        let rows = self.logs.read_rows()?;
        Ok(history::last_sets(&rows, user_id, exercise_id, limit_days))
    }
}
