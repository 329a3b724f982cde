//! Workout session lifecycle and history queries.
//!
//! The service itself holds no per-user state. In-progress sessions live in the
//! [`SessionCache`]; the catalog and finished sessions live in the [`TrainingStore`].
//!
//! ## Lifecycle
//!
//! 1. `start_training` creates an empty session in the cache
//! 2. `add_exercise_to_session` appends an occurrence with a pending set #1
//! 3. `add_or_update_set` fills the pending set, or appends the next one
//! 4. `end_session` writes the session durably, then drops it from the cache
//!
//! `clear_session` abandons the session without a durable write. Mutations only ever
//! touch the active (last) exercise and its active (last) set.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::SessionCache;
use crate::config::HistoryConfig;
use crate::store::TrainingStore;
use crate::{
    parser, Difficulty, Error, Exercise, ExerciseProgression, Result, SessionExercise, Set,
    SetSpec, TrainingSession,
};

/// Orchestrates session mutations against the cache and durable store
pub struct WorkoutService {
    store: Arc<dyn TrainingStore>,
    cache: Arc<dyn SessionCache>,
    history: HistoryConfig,
    muscle_groups: Vec<String>,
}

impl WorkoutService {
    pub fn new(store: Arc<dyn TrainingStore>, cache: Arc<dyn SessionCache>) -> Self {
        Self {
            store,
            cache,
            history: HistoryConfig::default(),
            muscle_groups: Vec::new(),
        }
    }

    /// Override the default history windows
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    /// Restrict `create_exercise` to these muscle groups. Empty means unrestricted.
    pub fn with_muscle_groups(mut self, muscle_groups: Vec<String>) -> Self {
        self.muscle_groups = muscle_groups;
        self
    }

    pub fn store(&self) -> &Arc<dyn TrainingStore> {
        &self.store
    }

    fn require_session(&self, user_id: &str) -> Result<TrainingSession> {
        self.cache
            .get_session(user_id)?
            .ok_or(Error::SessionNotFound)
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Begin a new empty session dated now
    pub fn start_training(&self, user_id: &str) -> Result<TrainingSession> {
        if self.cache.get_session(user_id)?.is_some() {
            tracing::warn!("User {} tried to start a second session", user_id);
            return Err(Error::SessionAlreadyStarted);
        }

        let session = TrainingSession::new(user_id, Utc::now(), "", Vec::new());
        self.cache.save_session(&session)?;

        tracing::info!("Started session {} for user {}", session.id(), user_id);
        Ok(session)
    }

    /// The in-progress session, if any
    pub fn current_session(&self, user_id: &str) -> Result<Option<TrainingSession>> {
        self.cache.get_session(user_id)
    }

    /// Append an occurrence of a catalog exercise with one pending set
    pub fn add_exercise_to_session(
        &self,
        user_id: &str,
        exercise_id: Uuid,
    ) -> Result<SessionExercise> {
        let mut session = self.require_session(user_id)?;
        let exercise = self
            .store
            .exercise_by_id(exercise_id)?
            .ok_or(Error::ExerciseNotFound)?;

        let occurrence = SessionExercise::new(
            exercise,
            session.next_exercise_number(),
            vec![Set::pending(user_id, exercise_id)],
        );
        session.push_exercise(occurrence.clone());
        self.cache.save_session(&session)?;

        tracing::info!(
            "Added exercise '{}' as #{} to session {}",
            occurrence.exercise.name(),
            occurrence.number(),
            session.id()
        );
        Ok(occurrence)
    }

    /// Record performed values on the active exercise.
    ///
    /// A pending active set (weight or reps still zero) is filled in place; otherwise
    /// a new set numbered one past the active set is appended. Returns the written set.
    pub fn add_or_update_set(
        &self,
        user_id: &str,
        weight: f32,
        reps: u8,
        notes: &str,
    ) -> Result<Set> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidInput(format!("invalid weight {}", weight)));
        }

        let mut session = self.require_session(user_id)?;
        let exercise = session
            .active_exercise_mut()
            .ok_or(Error::ExerciseNotFound)?;
        let active = exercise.active_set_mut().ok_or(Error::SetNotFound)?;

        let written = if active.is_pending() {
            active.fill(weight, reps, notes.to_string());
            active.clone()
        } else {
            let set = Set::new(SetSpec {
                user_id: active.user_id().to_string(),
                exercise_id: active.exercise_id(),
                number: active.number() + 1,
                weight,
                reps,
                difficulty: Difficulty::classify(notes),
                notes: notes.to_string(),
            });
            exercise.push_set(set.clone());
            set
        };

        self.cache.save_session(&session)?;

        tracing::debug!(
            "Recorded set #{} ({} x {}) in session {}",
            written.number(),
            written.weight(),
            written.reps(),
            session.id()
        );
        Ok(written)
    }

    /// Remove the most recent occurrence of `exercise_id` from the session
    pub fn delete_exercise(&self, user_id: &str, exercise_id: Uuid) -> Result<()> {
        let mut session = self.require_session(user_id)?;
        let removed = session.remove_last_occurrence(exercise_id)?;
        self.cache.save_session(&session)?;

        tracing::info!(
            "Removed exercise '{}' (#{}) from session {}",
            removed.exercise.name(),
            removed.number(),
            session.id()
        );
        Ok(())
    }

    /// Persist the session and its log rows, then drop it from the cache.
    ///
    /// The cache entry is only removed after both durable writes succeed. Durable
    /// inserts are idempotent per session id, so calling this again after a failure
    /// never duplicates history.
    pub fn end_session(&self, user_id: &str) -> Result<TrainingSession> {
        let session = self.require_session(user_id)?;

        self.store.insert_training_session(&session).map_err(|e| {
            tracing::warn!("Failed to store session {}: {}", session.id(), e);
            e
        })?;
        self.store.insert_training_logs(&session).map_err(|e| {
            tracing::warn!("Failed to store logs for session {}: {}", session.id(), e);
            e
        })?;
        self.cache.delete_session(user_id)?;

        tracing::info!(
            "Finished session {}: {} exercises, {} sets, volume {:.2}",
            session.id(),
            session.exercise_count(),
            session.set_count(),
            session.total_volume()
        );
        Ok(session)
    }

    /// Abandon the in-progress session without writing it.
    ///
    /// An entry the cache cannot read is discarded too, so a damaged session never
    /// blocks the user from starting over.
    pub fn clear_session(&self, user_id: &str) -> Result<()> {
        match self.cache.get_session(user_id) {
            Ok(Some(session)) => {
                tracing::info!("Clearing session {} for user {}", session.id(), user_id)
            }
            Ok(None) => return Err(Error::SessionNotFound),
            Err(e) => tracing::warn!("Discarding unreadable session of user {}: {}", user_id, e),
        }

        self.cache.delete_session(user_id)
    }

    // ------------------------------------------------------------------
    // Bulk import
    // ------------------------------------------------------------------

    /// Parse a whole workout and store it directly as a finished session
    pub fn parse_training(&self, user_id: &str, text: &str) -> Result<TrainingSession> {
        if user_id.trim().is_empty() {
            return Err(Error::InvalidInput("empty user id".into()));
        }
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("empty training text".into()));
        }

        let parsed = parser::parse_training(text, Utc::now())?;

        let mut exercises = Vec::with_capacity(parsed.exercises.len());
        for (index, entry) in parsed.exercises.into_iter().enumerate() {
            let exercise = self.lookup_exercise(&entry.name)?;
            let sets = entry
                .sets
                .into_iter()
                .enumerate()
                .map(|(set_index, set)| {
                    Set::new(SetSpec {
                        user_id: user_id.to_string(),
                        exercise_id: exercise.id(),
                        number: set_index as u32 + 1,
                        weight: set.weight,
                        reps: set.reps,
                        difficulty: set.difficulty,
                        notes: set.notes,
                    })
                })
                .collect();
            exercises.push(SessionExercise::new(exercise, index as u32 + 1, sets));
        }

        let session = TrainingSession::new(user_id, parsed.date, "", exercises);
        self.store.insert_training_session(&session)?;
        self.store.insert_training_logs(&session)?;

        tracing::info!(
            "Imported session {} for user {}: {} exercises, {} sets",
            session.id(),
            user_id,
            session.exercise_count(),
            session.set_count()
        );
        Ok(session)
    }

    fn lookup_exercise(&self, name: &str) -> Result<Exercise> {
        let found = self
            .store
            .exercise_by_name(name)
            .and_then(|found| found.ok_or(Error::ExerciseNotFound));
        found.map_err(|source| Error::ExerciseLookup {
            name: name.to_string(),
            source: Box::new(source),
        })
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    pub fn create_exercise(
        &self,
        name: &str,
        muscle_group: &str,
        equipment: &str,
    ) -> Result<Exercise> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("empty exercise name".into()));
        }
        if !self.muscle_groups.is_empty() && !self.muscle_groups.iter().any(|g| g == muscle_group) {
            return Err(Error::InvalidInput(format!(
                "unknown muscle group '{}', available: {}",
                muscle_group,
                self.muscle_groups.join(", ")
            )));
        }
        if self.store.exercise_by_name(name)?.is_some() {
            return Err(Error::ExerciseAlreadyExists(name.to_string()));
        }

        let exercise = Exercise::new(name, muscle_group, equipment.trim());
        self.store.insert_exercise(&exercise)?;

        tracing::info!("Created exercise '{}' in group '{}'", name, muscle_group);
        Ok(exercise)
    }

    /// Catalog exercises of one muscle group, ordered by name
    pub fn exercises_by_muscle_group(&self, muscle_group: &str) -> Result<Vec<Exercise>> {
        let mut exercises = self.store.exercises_by_muscle_group(muscle_group)?;
        exercises.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(exercises)
    }

    pub fn exercise_by_name(&self, name: &str) -> Result<Exercise> {
        self.store
            .exercise_by_name(name)?
            .ok_or(Error::ExerciseNotFound)
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Finished sessions in `[from, to]`; missing bounds default to the configured
    /// window ending now
    pub fn training_sessions(
        &self,
        user_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TrainingSession>> {
        let now = Utc::now();
        let from = from.unwrap_or(now - Duration::days(self.history.default_window_days));
        let to = to.unwrap_or(now);
        if from > to {
            return Err(Error::InvalidInput(format!(
                "range start {} is after end {}",
                from.date_naive(),
                to.date_naive()
            )));
        }

        self.store.training_sessions(user_id, from, to)
    }

    /// Per-date maximum weight and reps over the progression lookback
    pub fn exercise_progression(
        &self,
        user_id: &str,
        exercise_id: Uuid,
    ) -> Result<Vec<ExerciseProgression>> {
        let now = Utc::now();
        let from = now - Duration::days(self.history.progression_lookback_days);
        self.store.exercise_progression(user_id, exercise_id, from, now)
    }

    pub fn last_sets_for_exercise(
        &self,
        user_id: &str,
        exercise_id: Uuid,
        limit_days: usize,
    ) -> Result<Vec<ExerciseProgression>> {
        self.store.last_sets_for_exercise(user_id, exercise_id, limit_days)
    }
}
