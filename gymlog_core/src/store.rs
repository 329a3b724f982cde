//! Durable storage interface for the exercise catalog and finished sessions.

use chrono::{DateTime, Utc};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::history::{self, TrainingLogRow};
use crate::{Error, Exercise, ExerciseProgression, Result, TrainingSession};

/// Durable store for the catalog and completed training history
///
/// Lookups return `Ok(None)` when nothing matches so absence is never confused with a
/// backend failure.
pub trait TrainingStore: Send + Sync {
    fn insert_exercise(&self, exercise: &Exercise) -> Result<()>;
    fn exercise_by_name(&self, name: &str) -> Result<Option<Exercise>>;
    fn exercise_by_id(&self, id: Uuid) -> Result<Option<Exercise>>;
    fn exercises_by_muscle_group(&self, muscle_group: &str) -> Result<Vec<Exercise>>;

    /// Record the session header. Inserting an id that is already stored is a no-op.
    fn insert_training_session(&self, session: &TrainingSession) -> Result<()>;

    /// Record one flattened row per set. Inserting rows for an already stored session
    /// is a no-op.
    fn insert_training_logs(&self, session: &TrainingSession) -> Result<()>;

    fn training_sessions(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TrainingSession>>;

    fn exercise_progression(
        &self,
        user_id: &str,
        exercise_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExerciseProgression>>;

    fn last_sets_for_exercise(
        &self,
        user_id: &str,
        exercise_id: Uuid,
        limit_days: usize,
    ) -> Result<Vec<ExerciseProgression>>;
}

/// Session header as persisted. Volume and counts are derived from log rows, never stored.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<&TrainingSession> for SessionRecord {
    fn from(session: &TrainingSession) -> Self {
        SessionRecord {
            id: session.id(),
            user_id: session.user_id().to_string(),
            date: session.date(),
            notes: session.notes().to_string(),
            created_at: session.created_at(),
        }
    }
}

#[derive(Default)]
struct MemoryTables {
    exercises: Vec<Exercise>,
    sessions: Vec<SessionRecord>,
    logs: Vec<TrainingLogRow>,
}

/// In-process store, used by tests and single-process embeddings
#[derive(Default)]
pub struct MemoryTrainingStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryTrainingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryTables>> {
        self.tables
            .read()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryTables>> {
        self.tables
            .write()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    /// Number of stored session headers
    pub fn session_count(&self) -> Result<usize> {
        Ok(self.read()?.sessions.len())
    }

    /// Number of stored log rows
    pub fn log_count(&self) -> Result<usize> {
        Ok(self.read()?.logs.len())
    }
}

impl TrainingStore for MemoryTrainingStore {
    fn insert_exercise(&self, exercise: &Exercise) -> Result<()> {
        let mut tables = self.write()?;
        if tables.exercises.iter().any(|e| e.name() == exercise.name()) {
            return Err(Error::ExerciseAlreadyExists(exercise.name().to_string()));
        }
        tables.exercises.push(exercise.clone());
        Ok(())
    }

    fn exercise_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        Ok(self.read()?.exercises.iter().find(|e| e.name() == name).cloned())
    }

    fn exercise_by_id(&self, id: Uuid) -> Result<Option<Exercise>> {
        Ok(self.read()?.exercises.iter().find(|e| e.id() == id).cloned())
    }

    fn exercises_by_muscle_group(&self, muscle_group: &str) -> Result<Vec<Exercise>> {
        Ok(self
            .read()?
            .exercises
            .iter()
            .filter(|e| e.muscle_group() == muscle_group)
            .cloned()
            .collect())
    }

    fn insert_training_session(&self, session: &TrainingSession) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.sessions.iter().any(|s| s.id == session.id()) {
            tables.sessions.push(SessionRecord::from(session));
        }
        Ok(())
    }

    fn insert_training_logs(&self, session: &TrainingSession) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.logs.iter().any(|r| r.session_id == session.id()) {
            tables.logs.extend(history::flatten(session));
        }
        Ok(())
    }

    fn training_sessions(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TrainingSession>> {
        let tables = self.read()?;
        Ok(history::sessions_between(
            &tables.sessions,
            &tables.logs,
            user_id,
            from,
            to,
        ))
    }

    fn exercise_progression(
        &self,
        user_id: &str,
        exercise_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExerciseProgression>> {
        Ok(history::progression(
            &self.read()?.logs,
            user_id,
            exercise_id,
            from,
            to,
        ))
    }

    fn last_sets_for_exercise(
        &self,
        user_id: &str,
        exercise_id: Uuid,
        limit_days: usize,
    ) -> Result<Vec<ExerciseProgression>> {
        Ok(history::last_sets(
            &self.read()?.logs,
            user_id,
            exercise_id,
            limit_days,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::session_on;

    #[test]
    fn test_catalog_lookups() {
        let store = MemoryTrainingStore::new();
        let bench = Exercise::new("Bench", "chest", "barbell");
        store.insert_exercise(&bench).unwrap();

        assert_eq!(store.exercise_by_name("Bench").unwrap(), Some(bench.clone()));
        assert_eq!(store.exercise_by_id(bench.id()).unwrap(), Some(bench));
        assert!(store.exercise_by_name("Squat").unwrap().is_none());
        assert_eq!(store.exercises_by_muscle_group("chest").unwrap().len(), 1);
        assert!(store.exercises_by_muscle_group("legs").unwrap().is_empty());
    }

    #[test]
    fn test_repeated_inserts_are_noops() {
        let store = MemoryTrainingStore::new();
        let bench = Exercise::new("Bench", "chest", "barbell");
        let session = session_on("u1", Utc::now(), &[(&bench, &[(40.0, 10), (40.0, 8)])]);

        for _ in 0..2 {
            store.insert_training_session(&session).unwrap();
            store.insert_training_logs(&session).unwrap();
        }

        assert_eq!(store.session_count().unwrap(), 1);
        assert_eq!(store.log_count().unwrap(), 2);
    }
}
