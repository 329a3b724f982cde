//! Plain-text rendering of sessions and history for chat replies.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::{ExerciseProgression, TrainingSession};

/// Render sessions in the same line format the importer accepts:
///
/// ```text
/// 2024-02-15
/// 1. Bench - 40.0,12 (easy); 42.5,10
/// ```
pub fn format_training_logs(sessions: &[TrainingSession]) -> String {
    let mut out = String::new();

    for session in sessions {
        let _ = writeln!(out, "{}", session.date().format("%Y-%m-%d"));

        for occurrence in session.exercises() {
            let sets: Vec<String> = occurrence
                .sets()
                .iter()
                .map(|set| {
                    let mut text = format!("{:.1},{}", set.weight(), set.reps());
                    if !set.notes().is_empty() {
                        let _ = write!(text, " ({})", set.notes());
                    }
                    text
                })
                .collect();

            let _ = writeln!(
                out,
                "{}. {} - {}",
                occurrence.number(),
                occurrence.exercise.name(),
                sets.join("; ")
            );
        }
        out.push('\n');
    }

    out
}

/// Group recent sets by date, oldest first. Empty input renders as an empty string.
pub fn format_last_sets(points: &[ExerciseProgression]) -> String {
    let mut by_date: BTreeMap<_, Vec<&ExerciseProgression>> = BTreeMap::new();
    for point in points {
        by_date.entry(point.session_date).or_default().push(point);
    }

    let mut out = String::new();
    for (date, sets) in by_date {
        let line: Vec<String> = sets
            .iter()
            .map(|p| format!("{:.1} kg x {}", p.weight, p.reps))
            .collect();
        let _ = writeln!(out, "{}\n{}\n", date.format("%Y-%m-%d"), line.join("; "));
    }

    out
}

pub fn format_summary(session: &TrainingSession) -> String {
    format!(
        "Training finished!\n• Exercises: {}\n• Sets: {}\n• Total volume (kg): {:.2}",
        session.exercise_count(),
        session.set_count(),
        session.total_volume()
    )
}

/// One "date: weight x reps" line per progression point
pub fn format_progression(points: &[ExerciseProgression]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };

    let mut out = format!("{}\n", first.exercise_name);
    for point in points {
        let _ = writeln!(
            out,
            "{}: {:.1} kg x {}",
            point.session_date.format("%Y-%m-%d"),
            point.weight,
            point.reps
        );
    }
    out
}
