//! Core domain types for the workout log.
//!
//! This module defines the entities the rest of the crate passes around:
//! - Catalog exercises
//! - Sets and exercise occurrences within a session
//! - The training session aggregate
//! - Progression points returned by aggregation queries
//!
//! Every entity has two constructors: `new` for fresh creation (assigns a new id and
//! creation timestamp) and `restore` for rehydration from storage (identity supplied
//! by the caller).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Difficulty, Error, Result};

// ============================================================================
// Catalog
// ============================================================================

/// A catalog exercise (e.g. "Bench Press", chest, barbell)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    id: Uuid,
    name: String,
    muscle_group: String,
    equipment: String,
    created_at: DateTime<Utc>,
}

impl Exercise {
    pub fn new(
        name: impl Into<String>,
        muscle_group: impl Into<String>,
        equipment: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            muscle_group: muscle_group.into(),
            equipment: equipment.into(),
            created_at: Utc::now(),
        }
    }

    pub fn restore(
        id: Uuid,
        name: impl Into<String>,
        muscle_group: impl Into<String>,
        equipment: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            muscle_group: muscle_group.into(),
            equipment: equipment.into(),
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn muscle_group(&self) -> &str {
        &self.muscle_group
    }

    pub fn equipment(&self) -> &str {
        &self.equipment
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ============================================================================
// Sets
// ============================================================================

/// Field values shared by [`Set::new`] and [`Set::restore`]
#[derive(Clone, Debug)]
pub struct SetSpec {
    pub user_id: String,
    pub exercise_id: Uuid,
    pub number: u32,
    pub weight: f32,
    pub reps: u8,
    pub difficulty: Difficulty,
    pub notes: String,
}

/// One performed set inside an exercise occurrence
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Set {
    id: Uuid,
    user_id: String,
    exercise_id: Uuid,
    number: u32,
    weight: f32,
    reps: u8,
    difficulty: Difficulty,
    notes: String,
    created_at: DateTime<Utc>,
}

impl Set {
    pub fn new(spec: SetSpec) -> Self {
        Self::restore(Uuid::new_v4(), Utc::now(), spec)
    }

    pub fn restore(id: Uuid, created_at: DateTime<Utc>, spec: SetSpec) -> Self {
        Self {
            id,
            user_id: spec.user_id,
            exercise_id: spec.exercise_id,
            number: spec.number,
            weight: spec.weight,
            reps: spec.reps,
            difficulty: spec.difficulty,
            notes: spec.notes,
            created_at,
        }
    }

    /// A set allocated together with its exercise, before any values were entered
    pub fn pending(user_id: impl Into<String>, exercise_id: Uuid) -> Self {
        Self::new(SetSpec {
            user_id: user_id.into(),
            exercise_id,
            number: 1,
            weight: 0.0,
            reps: 0,
            difficulty: Difficulty::Unspecified,
            notes: String::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn exercise_id(&self) -> Uuid {
        self.exercise_id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn reps(&self) -> u8 {
        self.reps
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Weight or reps still hold the zero sentinel
    pub fn is_pending(&self) -> bool {
        self.weight == 0.0 || self.reps == 0
    }

    pub fn volume(&self) -> f64 {
        f64::from(self.weight) * f64::from(self.reps)
    }

    /// Overwrite the performed values. Only reachable through the active set of a session.
    pub(crate) fn fill(&mut self, weight: f32, reps: u8, notes: String) {
        self.weight = weight;
        self.reps = reps;
        self.difficulty = Difficulty::classify(&notes);
        self.notes = notes;
    }
}

// ============================================================================
// Exercise occurrences
// ============================================================================

/// One occurrence of a catalog exercise within a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionExercise {
    id: Uuid,
    number: u32,
    pub exercise: Exercise,
    sets: Vec<Set>,
}

impl SessionExercise {
    pub fn new(exercise: Exercise, number: u32, sets: Vec<Set>) -> Self {
        Self::restore(Uuid::new_v4(), exercise, number, sets)
    }

    pub fn restore(id: Uuid, exercise: Exercise, number: u32, sets: Vec<Set>) -> Self {
        Self {
            id,
            number,
            exercise,
            sets,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 1-based occurrence number within the session
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn sets(&self) -> &[Set] {
        &self.sets
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn active_set(&self) -> Option<&Set> {
        self.sets.last()
    }

    pub(crate) fn active_set_mut(&mut self) -> Option<&mut Set> {
        self.sets.last_mut()
    }

    pub fn push_set(&mut self, set: Set) {
        self.sets.push(set);
    }

    pub fn total_volume(&self) -> f64 {
        self.sets.iter().map(Set::volume).sum()
    }
}

// ============================================================================
// Training session aggregate
// ============================================================================

/// A workout: ordered exercise occurrences owned by one user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrainingSession {
    id: Uuid,
    user_id: String,
    date: DateTime<Utc>,
    notes: String,
    exercises: Vec<SessionExercise>,
    created_at: DateTime<Utc>,
}

impl TrainingSession {
    pub fn new(
        user_id: impl Into<String>,
        date: DateTime<Utc>,
        notes: impl Into<String>,
        exercises: Vec<SessionExercise>,
    ) -> Self {
        Self::restore(Uuid::new_v4(), user_id, date, notes, exercises, Utc::now())
    }

    pub fn restore(
        id: Uuid,
        user_id: impl Into<String>,
        date: DateTime<Utc>,
        notes: impl Into<String>,
        exercises: Vec<SessionExercise>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            date,
            notes: notes.into(),
            exercises,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn exercises(&self) -> &[SessionExercise] {
        &self.exercises
    }

    pub fn exercise_count(&self) -> usize {
        self.exercises.len()
    }

    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(SessionExercise::set_count).sum()
    }

    /// Σ weight × reps over every set, recomputed on each call
    pub fn total_volume(&self) -> f64 {
        self.exercises.iter().map(SessionExercise::total_volume).sum()
    }

    pub fn active_exercise(&self) -> Option<&SessionExercise> {
        self.exercises.last()
    }

    pub(crate) fn active_exercise_mut(&mut self) -> Option<&mut SessionExercise> {
        self.exercises.last_mut()
    }

    /// Occurrence number the next appended exercise will receive
    pub fn next_exercise_number(&self) -> u32 {
        self.exercises.len() as u32 + 1
    }

    pub fn push_exercise(&mut self, exercise: SessionExercise) {
        self.exercises.push(exercise);
    }

    /// Remove the most recent occurrence of `exercise_id`, leaving earlier ones in place.
    ///
    /// The remaining occurrences are renumbered `1..=n` so numbers stay dense.
    pub fn remove_last_occurrence(&mut self, exercise_id: Uuid) -> Result<SessionExercise> {
        let index = self
            .exercises
            .iter()
            .rposition(|e| e.exercise.id() == exercise_id)
            .ok_or(Error::ExerciseNotFound)?;
        let removed = self.exercises.remove(index);

        for (position, occurrence) in self.exercises.iter_mut().enumerate().skip(index) {
            occurrence.number = position as u32 + 1;
        }
        Ok(removed)
    }
}

// ============================================================================
// Aggregation results
// ============================================================================

/// One data point of an exercise's history: a date and the weight/reps recorded for it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseProgression {
    pub exercise_name: String,
    pub session_date: NaiveDate,
    pub weight: f32,
    pub reps: u8,
}
