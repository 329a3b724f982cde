//! Per-user conversation markers.
//!
//! A marker records which kind of free-text message the user is expected to send next.
//! It is unrelated to session storage: losing a marker only means the next message is
//! treated as unexpected.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// What the next plain-text message from a user should contain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// `<weight>,<reps>` for the active exercise
    AwaitingSetInput,
    /// `<name> <muscle group> <equipment>` for a new catalog entry
    AwaitingExerciseInput,
    /// A whole workout in training log format
    AwaitingTrainingInput,
    /// An optional `YYYY-MM-DD YYYY-MM-DD` range
    AwaitingGetTrainingsInput,
    /// Muscle group and exercise pickers are being used to choose a progression series
    AwaitingExerciseProgression,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::AwaitingSetInput => "awaiting_set_input",
            ConversationState::AwaitingExerciseInput => "awaiting_exercise_input",
            ConversationState::AwaitingTrainingInput => "awaiting_training_input",
            ConversationState::AwaitingGetTrainingsInput => "awaiting_get_trainings_input",
            ConversationState::AwaitingExerciseProgression => "awaiting_exercise_progression",
        }
    }
}

/// Storage for conversation markers, keyed by user id
pub trait StateStore: Send + Sync {
    fn get(&self, user_id: &str) -> Option<ConversationState>;
    fn set(&self, user_id: &str, state: ConversationState);
    fn clear(&self, user_id: &str);
}

/// Sharded in-memory marker map; different users never contend on the same shard lock
#[derive(Default)]
pub struct MemoryStateStore {
    states: DashMap<String, ConversationState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, user_id: &str) -> Option<ConversationState> {
        self.states.get(user_id).map(|entry| *entry.value())
    }

    fn set(&self, user_id: &str, state: ConversationState) {
        tracing::debug!("User {} now {}", user_id, state.as_str());
        self.states.insert(user_id.to_string(), state);
    }

    fn clear(&self, user_id: &str) {
        self.states.remove(user_id);
    }
}
