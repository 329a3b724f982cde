//! Starter exercise catalog.
//!
//! A fresh data directory has no exercises, so nothing can be picked or imported.
//! `seed_catalog` inserts a small set of common lifts, skipping names already present.

use crate::service::WorkoutService;
use crate::{Error, Result};
use once_cell::sync::Lazy;

/// A catalog entry before it is assigned an id
#[derive(Clone, Debug, PartialEq)]
pub struct StarterExercise {
    pub name: &'static str,
    pub muscle_group: &'static str,
    pub equipment: &'static str,
}

/// Built once; the groups match the default `bot.muscle_groups`
static STARTER_CATALOG: Lazy<Vec<StarterExercise>> = Lazy::new(build_starter_catalog);

pub fn starter_catalog() -> &'static [StarterExercise] {
    &STARTER_CATALOG
}

fn build_starter_catalog() -> Vec<StarterExercise> {
    let entry = |name, muscle_group, equipment| StarterExercise {
        name,
        muscle_group,
        equipment,
    };

    vec![
        // Back
        entry("Deadlift", "back", "barbell"),
        entry("Pull-up", "back", "bodyweight"),
        entry("Barbell Row", "back", "barbell"),
        entry("Lat Pulldown", "back", "cable"),
        // Chest
        entry("Bench Press", "chest", "barbell"),
        entry("Incline Dumbbell Press", "chest", "dumbbell"),
        entry("Push-up", "chest", "bodyweight"),
        entry("Butterfly", "chest", "machine"),
        // Legs
        entry("Squat", "legs", "barbell"),
        entry("Romanian Deadlift", "legs", "barbell"),
        entry("Leg Press", "legs", "machine"),
        entry("Lunge", "legs", "dumbbell"),
        // Arms
        entry("Biceps Curl", "arms", "dumbbell"),
        entry("Triceps Pushdown", "arms", "cable"),
        entry("Dip", "arms", "bodyweight"),
    ]
}

/// Insert every starter exercise not yet in the catalog. Returns how many were added.
pub fn seed_catalog(service: &WorkoutService) -> Result<usize> {
    let mut added = 0;

    for starter in starter_catalog() {
        match service.create_exercise(starter.name, starter.muscle_group, starter.equipment) {
            Ok(_) => added += 1,
            Err(Error::ExerciseAlreadyExists(_)) => {
                tracing::debug!("Starter exercise '{}' already present", starter.name);
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!("Seeded {} starter exercises", added);
    Ok(added)
}
