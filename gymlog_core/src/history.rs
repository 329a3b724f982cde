//! Flattened training log rows and the queries computed over them.
//!
//! A finished session is stored as one row per set. Everything historical (session
//! listings, progression series, recent-set summaries) is rebuilt from those rows, so
//! every store implementation shares the functions in this module.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use crate::store::SessionRecord;
use crate::{
    Difficulty, Exercise, ExerciseProgression, SessionExercise, Set, SetSpec, TrainingSession,
};

/// One performed set, denormalized with its session and exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrainingLogRow {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: Uuid,
    pub session_date: DateTime<Utc>,
    pub occurrence_id: Uuid,
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub muscle_group: String,
    pub equipment: String,
    pub exercise_number: u32,
    pub set_number: u32,
    pub weight: f32,
    pub reps: u8,
    pub difficulty: Difficulty,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl TrainingLogRow {
    fn new(session: &TrainingSession, occurrence: &SessionExercise, set: &Set) -> Self {
        Self {
            id: set.id(),
            user_id: set.user_id().to_string(),
            session_id: session.id(),
            session_date: session.date(),
            occurrence_id: occurrence.id(),
            exercise_id: occurrence.exercise.id(),
            exercise_name: occurrence.exercise.name().to_string(),
            muscle_group: occurrence.exercise.muscle_group().to_string(),
            equipment: occurrence.exercise.equipment().to_string(),
            exercise_number: occurrence.number(),
            set_number: set.number(),
            weight: set.weight(),
            reps: set.reps(),
            difficulty: set.difficulty(),
            notes: set.notes().to_string(),
            created_at: set.created_at(),
        }
    }

    fn to_set(&self) -> Set {
        Set::restore(
            self.id,
            self.created_at,
            SetSpec {
                user_id: self.user_id.clone(),
                exercise_id: self.exercise_id,
                number: self.set_number,
                weight: self.weight,
                reps: self.reps,
                difficulty: self.difficulty,
                notes: self.notes.clone(),
            },
        )
    }

    fn to_exercise(&self) -> Exercise {
        Exercise::restore(
            self.exercise_id,
            self.exercise_name.clone(),
            self.muscle_group.clone(),
            self.equipment.clone(),
            self.created_at,
        )
    }

    fn day(&self) -> NaiveDate {
        self.session_date.date_naive()
    }

    fn is_for(&self, user_id: &str, exercise_id: Uuid) -> bool {
        self.user_id == user_id && self.exercise_id == exercise_id
    }
}

/// Flatten a session into one row per set, in session order
pub fn flatten(session: &TrainingSession) -> Vec<TrainingLogRow> {
    session
        .exercises()
        .iter()
        .flat_map(|occurrence| {
            occurrence
                .sets()
                .iter()
                .map(move |set| TrainingLogRow::new(session, occurrence, set))
        })
        .collect()
}

/// Rebuild sessions from rows alone: grouped by session id, then by occurrence, sets
/// ordered by number. Notes live in the session header, so they come back empty.
/// Sessions are returned oldest first.
pub fn reconstruct_sessions<I>(rows: I) -> Vec<TrainingSession>
where
    I: IntoIterator<Item = TrainingLogRow>,
{
    let mut sessions: Vec<TrainingSession> = group_by_session(rows)
        .into_values()
        .filter_map(|rows| {
            let first = rows.first()?.clone();
            let created_at = rows
                .iter()
                .map(|r| r.created_at)
                .min()
                .unwrap_or(first.created_at);
            Some(TrainingSession::restore(
                first.session_id,
                first.user_id,
                first.session_date,
                "",
                rebuild_occurrences(rows),
                created_at,
            ))
        })
        .collect();

    sort_sessions(&mut sessions);
    sessions
}

fn group_by_session<I>(rows: I) -> HashMap<Uuid, Vec<TrainingLogRow>>
where
    I: IntoIterator<Item = TrainingLogRow>,
{
    let mut by_session: HashMap<Uuid, Vec<TrainingLogRow>> = HashMap::new();
    for row in rows {
        by_session.entry(row.session_id).or_default().push(row);
    }
    by_session
}

/// Rows are grouped by occurrence id. Occurrences are ordered by number, sets by number.
fn rebuild_occurrences(rows: Vec<TrainingLogRow>) -> Vec<SessionExercise> {
    let mut by_occurrence: HashMap<Uuid, Vec<TrainingLogRow>> = HashMap::new();
    for row in rows {
        by_occurrence.entry(row.occurrence_id).or_default().push(row);
    }

    let mut occurrences: Vec<SessionExercise> = by_occurrence
        .into_values()
        .filter_map(|mut rows| {
            rows.sort_by_key(|r| r.set_number);
            let first = rows.first()?;
            Some(SessionExercise::restore(
                first.occurrence_id,
                first.to_exercise(),
                first.exercise_number,
                rows.iter().map(TrainingLogRow::to_set).collect(),
            ))
        })
        .collect();

    occurrences.sort_by(|a, b| a.number().cmp(&b.number()).then(a.id().cmp(&b.id())));
    occurrences
}

fn sort_sessions(sessions: &mut [TrainingSession]) {
    sessions.sort_by(|a, b| a.date().cmp(&b.date()).then(a.id().cmp(&b.id())));
}

/// Sessions of `user_id` whose date falls within `[from, to]`.
///
/// Stored headers supply notes and make sessions without sets visible. Rows whose
/// header is missing still produce a session.
pub fn sessions_between(
    records: &[SessionRecord],
    rows: &[TrainingLogRow],
    user_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<TrainingSession> {
    let in_window =
        |user: &str, date: DateTime<Utc>| user == user_id && date >= from && date <= to;

    let mut by_session = group_by_session(
        rows.iter()
            .filter(|r| in_window(r.user_id.as_str(), r.session_date))
            .cloned(),
    );

    let mut sessions: Vec<TrainingSession> = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();
    for record in records.iter().filter(|r| in_window(r.user_id.as_str(), r.date)) {
        if !seen.insert(record.id) {
            continue;
        }
        let rows = by_session.remove(&record.id).unwrap_or_default();
        sessions.push(TrainingSession::restore(
            record.id,
            record.user_id.clone(),
            record.date,
            record.notes.clone(),
            rebuild_occurrences(rows),
            record.created_at,
        ));
    }

    sessions.extend(reconstruct_sessions(by_session.into_values().flatten()));
    sort_sessions(&mut sessions);
    sessions
}

/// One point per distinct session date within `[from, to]`.
///
/// Weight and reps are maximized independently, so a point may pair the heaviest
/// weight of the day with the reps of a different, lighter set.
pub fn progression(
    rows: &[TrainingLogRow],
    user_id: &str,
    exercise_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<ExerciseProgression> {
    let mut points: BTreeMap<NaiveDate, ExerciseProgression> = BTreeMap::new();

    for row in rows
        .iter()
        .filter(|r| r.is_for(user_id, exercise_id))
        .filter(|r| r.session_date >= from && r.session_date <= to)
    {
        points
            .entry(row.day())
            .and_modify(|p| {
                p.weight = p.weight.max(row.weight);
                p.reps = p.reps.max(row.reps);
            })
            .or_insert_with(|| ExerciseProgression {
                exercise_name: row.exercise_name.clone(),
                session_date: row.day(),
                weight: row.weight,
                reps: row.reps,
            });
    }

    points.into_values().collect()
}

/// Every set on the `limit_days` most recent distinct session dates, oldest date first
pub fn last_sets(
    rows: &[TrainingLogRow],
    user_id: &str,
    exercise_id: Uuid,
    limit_days: usize,
) -> Vec<ExerciseProgression> {
    let matching: Vec<&TrainingLogRow> = rows
        .iter()
        .filter(|r| r.is_for(user_id, exercise_id))
        .collect();

    let days: BTreeSet<NaiveDate> = matching.iter().map(|r| r.day()).collect();
    let recent: BTreeSet<NaiveDate> = days.into_iter().rev().take(limit_days).collect();

    let mut selected: Vec<&TrainingLogRow> = matching
        .into_iter()
        .filter(|r| recent.contains(&r.day()))
        .collect();
    selected.sort_by(|a, b| {
        a.session_date
            .cmp(&b.session_date)
            .then(a.session_id.cmp(&b.session_id))
            .then(a.exercise_number.cmp(&b.exercise_number))
            .then(a.set_number.cmp(&b.set_number))
    });

    selected
        .into_iter()
        .map(|r| ExerciseProgression {
            exercise_name: r.exercise_name.clone(),
            session_date: r.day(),
            weight: r.weight,
            reps: r.reps,
        })
        .collect()
}
