//! Conversation routing.
//!
//! Maps an inbound command, free-text message or button tap to a handler and returns a
//! transport-neutral [`Reply`]. Commands match by exact name, free text is dispatched
//! on the user's [`ConversationState`] marker, and callbacks go through an ordered
//! prefix table. Anything unmatched gets the same "unknown input" reply.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::BotConfig;
use crate::conversation::{ConversationState, StateStore};
use crate::formatter;
use crate::parser::parse_set_input;
use crate::service::WorkoutService;
use crate::{Error, ErrorKind, ExerciseProgression, Result};

// Commands
pub const START_COMMAND: &str = "start";
pub const HELP_COMMAND: &str = "help";
pub const START_TRAINING_COMMAND: &str = "start_training";
pub const UPLOAD_TRAINING_COMMAND: &str = "upload_training";
pub const GET_TRAININGS_COMMAND: &str = "get_trainings";
pub const GET_EXERCISE_PROGRESSION_COMMAND: &str = "get_exercise_progression";
pub const CREATE_EXERCISE_COMMAND: &str = "create_exercise";
pub const CLEAR_TRAINING_COMMAND: &str = "clear_training";

// Callback prefixes
pub const MUSCLE_PREFIX: &str = "muscle:";
pub const EXERCISE_PREFIX: &str = "exercise:";
pub const FINISH_TRAINING_PREFIX: &str = "finish_training:";
pub const START_NEW_EXERCISE_PREFIX: &str = "start_new_exercise:";
pub const START_PROGRESSION_PREFIX: &str = "start_progression:";
pub const BACK_TO_MUSCLE_GROUPS_PREFIX: &str = "back_to_muscle_groups:";

const NEXT_DIRECTION: &str = "next";
const PREV_DIRECTION: &str = "prev";

const START_TEXT: &str =
    "I keep your training diary. Use /help to see the available commands.";
const AUTHOR_TEXT: &str = "\nPS: built by";
const HELP_TEXT: &str = "Commands:\n\
/start - greeting\n\
/help - this help\n\
/start_training - start a new training\n\
/upload_training - upload a whole training at once\n\
/get_trainings - show training history\n\
/get_exercise_progression - show weight progression for an exercise\n\
/create_exercise - add an exercise to the catalog\n\
/clear_training - discard the current training";
const UNKNOWN_TEXT: &str = "Unknown command. Use /help to see the available commands.";
const START_TRAINING_TEXT: &str = "New training started! Pick a muscle group:";
const MUSCLE_GROUP_SELECT_TEXT: &str = "Pick a muscle group for the next exercise:";
const PROGRESSION_SELECT_TEXT: &str =
    "Progression covers the last year of trainings.\nPick a muscle group:";
const EXERCISE_TEXT: &str =
    "Exercise added.\nEnter weight and reps separated by a comma (e.g. 50.5,12):";
const LAST_SETS_TEXT: &str = "Your last sets:";
const SET_TEXT: &str = "Set saved! Enter the next set or choose an action:";
const CREATE_EXERCISE_TEXT: &str =
    "Enter the exercise name, muscle group and equipment separated by spaces:\n\n\
Format: <name> <muscle group> <equipment>";
const GET_TRAININGS_TEXT: &str =
    "Enter a date range as YYYY-MM-DD YYYY-MM-DD (e.g. 2024-12-31 2025-01-22).\n\
Without dates the last 14 days are shown.";
const UPLOAD_TRAINING_TEXT: &str = "Send the whole training in this format:\n\
<year-month-day> (optional)\n\
<n>. <exercise name> - <weight>,<reps> (note); <weight>,<reps> (note)\n\n\
Example:\n\
2025-01-31\n\
1. Butterfly - 82,7 (hard); 72,8 (hard); 54.5,12 (hard)\n\
2. Dumbbell Press - 25,10 (medium); 25,10 (medium)";
const CLEAR_TRAINING_DONE_TEXT: &str = "Current training discarded.";
const NO_TRAININGS_TEXT: &str = "No trainings yet. Every journey starts with a first step!";
const NO_EXERCISES_TEXT: &str = "No exercises in this muscle group yet. Add one with /create_exercise.";
const START_NEW_EXERCISE_LABEL: &str = "Start a new exercise";
const FINISH_TRAINING_LABEL: &str = "Finish training";
const BACK_TO_EXERCISES_LABEL: &str = "Back to exercises";
const BACK_TO_MUSCLE_GROUPS_LABEL: &str = "Back to muscle groups";
const NEXT_PAGE_LABEL: &str = "Next >>";
const PREV_PAGE_LABEL: &str = "<< Back";

const ERR_NO_TRAINING: &str = "No active training.";
const ERR_INVALID_SET_FORMAT: &str =
    "Invalid format. Enter weight and reps separated by a comma (e.g. 50.5,12).";
const ERR_INVALID_EXERCISE_ID: &str = "Invalid exercise id.";
const ERR_LOAD_TRAININGS: &str = "Failed to load trainings.";
const ERR_LOAD_EXERCISES: &str = "Failed to load exercises.";

/// An event delivered by the transport
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// A `/command`; `name` may be given with or without the leading slash
    Command { user_id: String, name: String },
    Text { user_id: String, text: String },
    /// Opaque button data previously handed out in a [`Reply`]
    Callback { user_id: String, data: String },
}

impl Inbound {
    pub fn user_id(&self) -> &str {
        match self {
            Inbound::Command { user_id, .. }
            | Inbound::Text { user_id, .. }
            | Inbound::Callback { user_id, .. } => user_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// What to show the user. Rendering (markup, charts, message splitting) is up to the
/// transport.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reply {
    pub text: String,
    /// Rows of buttons
    pub buttons: Vec<Vec<Button>>,
    /// Replace the message the tapped button belongs to instead of sending a new one
    pub edit: bool,
    /// Series for chart rendering, when the reply answers a progression request
    pub progression: Option<Vec<ExerciseProgression>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = buttons;
        self
    }

    fn edited(mut self) -> Self {
        self.edit = true;
        self
    }
}

type CommandHandler = fn(&Router, &str) -> Reply;
type TextHandler = fn(&Router, &str, &str) -> Reply;
type CallbackHandler = fn(&Router, &str, &str) -> Reply;

const COMMANDS: &[(&str, CommandHandler)] = &[
    (START_COMMAND, Router::on_start),
    (HELP_COMMAND, Router::on_help),
    (START_TRAINING_COMMAND, Router::on_start_training),
    (UPLOAD_TRAINING_COMMAND, Router::on_start_upload),
    (GET_TRAININGS_COMMAND, Router::on_start_get_trainings),
    (GET_EXERCISE_PROGRESSION_COMMAND, Router::on_start_progression),
    (CREATE_EXERCISE_COMMAND, Router::on_start_create_exercise),
    (CLEAR_TRAINING_COMMAND, Router::on_clear_training),
];

const TEXT_HANDLERS: &[(ConversationState, TextHandler)] = &[
    (ConversationState::AwaitingSetInput, Router::on_set_input),
    (ConversationState::AwaitingExerciseInput, Router::on_exercise_input),
    (ConversationState::AwaitingTrainingInput, Router::on_training_input),
    (ConversationState::AwaitingGetTrainingsInput, Router::on_get_trainings_input),
];

/// Checked in order; the first matching prefix wins
const CALLBACKS: &[(&str, CallbackHandler)] = &[
    (MUSCLE_PREFIX, Router::on_muscle_group),
    (EXERCISE_PREFIX, Router::on_exercise),
    (FINISH_TRAINING_PREFIX, Router::on_finish_training),
    (START_NEW_EXERCISE_PREFIX, Router::on_start_new_exercise),
    (START_PROGRESSION_PREFIX, Router::on_progression),
    (BACK_TO_MUSCLE_GROUPS_PREFIX, Router::on_back_to_muscle_groups),
];

pub struct Router {
    service: Arc<WorkoutService>,
    states: Arc<dyn StateStore>,
    config: BotConfig,
}

impl Router {
    pub fn new(service: Arc<WorkoutService>, states: Arc<dyn StateStore>, config: BotConfig) -> Self {
        Self {
            service,
            states,
            config,
        }
    }

    pub fn handle(&self, inbound: &Inbound) -> Reply {
        match inbound {
            Inbound::Command { user_id, name } => {
                let name = name.trim().trim_start_matches('/');
                match COMMANDS.iter().find(|(command, _)| *command == name) {
                    Some((_, handler)) => handler(self, user_id),
                    None => self.unknown(user_id, name),
                }
            }
            Inbound::Text { user_id, text } => {
                let handler = self.states.get(user_id).and_then(|state| {
                    TEXT_HANDLERS
                        .iter()
                        .find(|(expected, _)| *expected == state)
                        .map(|(_, handler)| *handler)
                });
                match handler {
                    Some(handler) => handler(self, user_id, text),
                    None => self.unknown(user_id, "text message"),
                }
            }
            Inbound::Callback { user_id, data } => {
                match CALLBACKS.iter().find(|(prefix, _)| data.starts_with(prefix)) {
                    Some((prefix, handler)) => handler(self, user_id, &data[prefix.len()..]),
                    None => self.unknown(user_id, data),
                }
            }
        }
    }

    fn unknown(&self, user_id: &str, what: &str) -> Reply {
        tracing::debug!("Unmatched input from user {}: {}", user_id, what);
        Reply::text(UNKNOWN_TEXT)
    }

    fn muscle_group_buttons(&self) -> Vec<Vec<Button>> {
        self.config
            .muscle_groups
            .iter()
            .map(|group| vec![Button::new(group.clone(), format!("{}{}", MUSCLE_PREFIX, group))])
            .collect()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn on_start(&self, _user_id: &str) -> Reply {
        match &self.config.author_name {
            Some(author) if !author.trim().is_empty() => {
                Reply::text(format!("{}{} {}", START_TEXT, AUTHOR_TEXT, author))
            }
            _ => Reply::text(START_TEXT),
        }
    }

    fn on_help(&self, _user_id: &str) -> Reply {
        Reply::text(HELP_TEXT)
    }

    fn on_start_training(&self, user_id: &str) -> Reply {
        match self.service.start_training(user_id) {
            Ok(_) => Reply::text(START_TRAINING_TEXT).with_buttons(self.muscle_group_buttons()),
            Err(e) => Reply::text(format!("Could not start training: {}", e)),
        }
    }

    fn on_start_upload(&self, user_id: &str) -> Reply {
        self.states.set(user_id, ConversationState::AwaitingTrainingInput);
        Reply::text(UPLOAD_TRAINING_TEXT)
    }

    fn on_start_get_trainings(&self, user_id: &str) -> Reply {
        self.states.set(user_id, ConversationState::AwaitingGetTrainingsInput);
        Reply::text(GET_TRAININGS_TEXT)
    }

    fn on_start_progression(&self, user_id: &str) -> Reply {
        self.states.set(user_id, ConversationState::AwaitingExerciseProgression);
        Reply::text(PROGRESSION_SELECT_TEXT).with_buttons(self.muscle_group_buttons())
    }

    fn on_start_create_exercise(&self, user_id: &str) -> Reply {
        self.states.set(user_id, ConversationState::AwaitingExerciseInput);
        Reply::text(CREATE_EXERCISE_TEXT)
    }

    fn on_clear_training(&self, user_id: &str) -> Reply {
        self.states.clear(user_id);
        match self.service.clear_session(user_id) {
            Ok(()) => Reply::text(CLEAR_TRAINING_DONE_TEXT),
            Err(e) if e.kind() == ErrorKind::NotFound => Reply::text(ERR_NO_TRAINING),
            Err(e) => {
                tracing::warn!("Failed to clear training for user {}: {}", user_id, e);
                Reply::text("Failed to discard the training.")
            }
        }
    }

    // ------------------------------------------------------------------
    // Free-text input
    // ------------------------------------------------------------------

    /// The marker is kept so further sets can follow
    fn on_set_input(&self, user_id: &str, text: &str) -> Reply {
        let set = match parse_set_input(text) {
            Ok(set) => set,
            Err(e) => {
                tracing::debug!("Rejected set input from user {}: {}", user_id, e);
                return Reply::text(ERR_INVALID_SET_FORMAT);
            }
        };

        if let Err(e) = self
            .service
            .add_or_update_set(user_id, set.weight, set.reps, &set.notes)
        {
            return Reply::text(format!("Error: {}", e));
        }

        Reply::text(SET_TEXT).with_buttons(vec![
            vec![Button::new(START_NEW_EXERCISE_LABEL, START_NEW_EXERCISE_PREFIX)],
            vec![Button::new(FINISH_TRAINING_LABEL, FINISH_TRAINING_PREFIX)],
        ])
    }

    fn on_exercise_input(&self, user_id: &str, text: &str) -> Reply {
        self.states.clear(user_id);

        let mut args = text.trim().splitn(3, char::is_whitespace);
        let (Some(name), Some(group), Some(equipment)) = (args.next(), args.next(), args.next())
        else {
            return Reply::text(format!("Error: {}", CREATE_EXERCISE_TEXT));
        };
        let equipment = equipment.trim();
        if equipment.is_empty() {
            return Reply::text(format!("Error: {}", CREATE_EXERCISE_TEXT));
        }

        if !self.config.muscle_groups.iter().any(|g| g == group) {
            return Reply::text(format!(
                "Error: unknown muscle group!\nAvailable: {}",
                self.config.muscle_groups.join(", ")
            ));
        }

        match self.service.create_exercise(name, group, equipment) {
            Ok(exercise) => Reply::text(format!(
                "Exercise \"{}\" added to group \"{}\"",
                exercise.name(),
                exercise.muscle_group()
            )),
            Err(Error::ExerciseAlreadyExists(name)) => {
                Reply::text(format!("Error: exercise \"{}\" already exists!", name))
            }
            Err(e) if e.kind() == ErrorKind::InvalidInput => Reply::text(format!("Error: {}", e)),
            Err(e) => {
                tracing::warn!("Failed to create exercise '{}': {}", name, e);
                Reply::text("Failed to create the exercise.")
            }
        }
    }

    fn on_training_input(&self, user_id: &str, text: &str) -> Reply {
        self.states.clear(user_id);

        match self.service.parse_training(user_id, text) {
            Ok(session) => Reply::text(formatter::format_summary(&session)),
            Err(e) => {
                tracing::warn!("Training upload from user {} failed: {}", user_id, e);
                Reply::text(format!("Failed to upload training: {}", e))
            }
        }
    }

    /// Unparseable dates fall back to the default window
    fn on_get_trainings_input(&self, user_id: &str, text: &str) -> Reply {
        self.states.clear(user_id);

        let mut args = text.split_whitespace();
        let from = args.next().and_then(parse_day).map(start_of_day);
        let to = args.next().and_then(parse_day).map(end_of_day);

        let sessions = match self.service.training_sessions(user_id, from, to) {
            Ok(sessions) => sessions,
            Err(e) if e.kind() == ErrorKind::InvalidInput => {
                return Reply::text(format!("Error: {}", e))
            }
            Err(e) => {
                tracing::warn!("Failed to load trainings for user {}: {}", user_id, e);
                return Reply::text(ERR_LOAD_TRAININGS);
            }
        };

        if sessions.is_empty() {
            return Reply::text(NO_TRAININGS_TEXT);
        }
        Reply::text(formatter::format_training_logs(&sessions))
    }

    // ------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------

    /// Paged exercise picker for one muscle group
    fn on_muscle_group(&self, user_id: &str, data: &str) -> Reply {
        let request = match MusclePage::parse(data) {
            Ok(request) => request,
            Err(e) => return Reply::text(format!("Error: {}", e)),
        };

        if let Some(exercise_id) = request.cancel_exercise {
            if let Err(e) = self.service.delete_exercise(user_id, exercise_id) {
                return Reply::text(format!("Error: {}", e));
            }
            // The set-input flow ended with the exercise it was feeding
            if self.states.get(user_id) == Some(ConversationState::AwaitingSetInput) {
                self.states.clear(user_id);
            }
        }

        let exercises = match self.service.exercises_by_muscle_group(&request.group) {
            Ok(exercises) => exercises,
            Err(e) => {
                tracing::warn!("Failed to list group '{}': {}", request.group, e);
                return Reply::text(ERR_LOAD_EXERCISES);
            }
        };
        if exercises.is_empty() {
            return Reply::text(NO_EXERCISES_TEXT);
        }

        let (page, total_pages) = match paginate(&exercises, request.page, self.config.page_size) {
            Ok(paged) => paged,
            Err(e) => return Reply::text(format!("Error: {}", e)),
        };

        let data_prefix = match self.states.get(user_id) {
            Some(ConversationState::AwaitingExerciseProgression) => START_PROGRESSION_PREFIX.to_string(),
            _ => format!("{}{}:", EXERCISE_PREFIX, request.group),
        };

        let mut buttons: Vec<Vec<Button>> = page
            .iter()
            .map(|e| vec![Button::new(e.name(), format!("{}{}", data_prefix, e.id()))])
            .collect();

        let mut navigation = Vec::new();
        if request.page > 0 {
            navigation.push(Button::new(
                PREV_PAGE_LABEL,
                format!("{}{}:{}:{}", MUSCLE_PREFIX, request.group, PREV_DIRECTION, request.page - 1),
            ));
        }
        if request.page + 1 < total_pages {
            navigation.push(Button::new(
                NEXT_PAGE_LABEL,
                format!("{}{}:{}:{}", MUSCLE_PREFIX, request.group, NEXT_DIRECTION, request.page + 1),
            ));
        }
        if !navigation.is_empty() {
            buttons.push(navigation);
        }
        buttons.push(vec![Button::new(BACK_TO_MUSCLE_GROUPS_LABEL, BACK_TO_MUSCLE_GROUPS_PREFIX)]);

        Reply::text(format!("Selected: {}\nNow pick an exercise:", request.group))
            .with_buttons(buttons)
            .edited()
    }

    /// `<group>:<exercise id>`: add the exercise and wait for sets
    fn on_exercise(&self, user_id: &str, data: &str) -> Reply {
        let Some((group, id)) = data.split_once(':') else {
            return Reply::text(format!("Error: invalid callback data '{}'", data));
        };
        let Ok(exercise_id) = Uuid::parse_str(id) else {
            return Reply::text(ERR_INVALID_EXERCISE_ID);
        };

        if let Err(e) = self.service.add_exercise_to_session(user_id, exercise_id) {
            return Reply::text(format!("Failed to add exercise: {}", e));
        }

        let mut text = EXERCISE_TEXT.to_string();
        match self
            .service
            .last_sets_for_exercise(user_id, exercise_id, self.config.last_sets_days)
        {
            Ok(points) if !points.is_empty() => {
                text = format!(
                    "{}\n\n{}\n{}",
                    text,
                    LAST_SETS_TEXT,
                    formatter::format_last_sets(&points)
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to load last sets for {}: {}", exercise_id, e),
        }

        // Going back undoes the exercise that was just added
        let back = Button::new(
            BACK_TO_EXERCISES_LABEL,
            format!("{}{}:{}:0:{}", MUSCLE_PREFIX, group, NEXT_DIRECTION, exercise_id),
        );

        self.states.set(user_id, ConversationState::AwaitingSetInput);
        Reply::text(text).with_buttons(vec![vec![back]]).edited()
    }

    fn on_finish_training(&self, user_id: &str, _data: &str) -> Reply {
        self.states.clear(user_id);

        match self.service.end_session(user_id) {
            Ok(session) => Reply::text(formatter::format_summary(&session)).edited(),
            Err(e) => Reply::text(format!("Error: {}", e)),
        }
    }

    fn on_start_new_exercise(&self, user_id: &str, _data: &str) -> Reply {
        self.states.clear(user_id);
        Reply::text(MUSCLE_GROUP_SELECT_TEXT).with_buttons(self.muscle_group_buttons())
    }

    fn on_back_to_muscle_groups(&self, _user_id: &str, _data: &str) -> Reply {
        Reply::text(MUSCLE_GROUP_SELECT_TEXT)
            .with_buttons(self.muscle_group_buttons())
            .edited()
    }

    fn on_progression(&self, user_id: &str, data: &str) -> Reply {
        self.states.clear(user_id);

        let Ok(exercise_id) = Uuid::parse_str(data) else {
            return Reply::text(ERR_INVALID_EXERCISE_ID);
        };

        match self.service.exercise_progression(user_id, exercise_id) {
            Ok(points) if points.is_empty() => Reply::text(NO_TRAININGS_TEXT),
            Ok(points) => Reply {
                text: formatter::format_progression(&points),
                progression: Some(points),
                ..Reply::default()
            },
            Err(e) => {
                tracing::warn!("Failed to load progression for {}: {}", exercise_id, e);
                Reply::text(ERR_LOAD_TRAININGS)
            }
        }
    }
}

/// Parsed `muscle:` callback payload: `<group>[:<dir>:<page>[:<cancel id>]]`
#[derive(Debug, PartialEq)]
struct MusclePage {
    group: String,
    page: usize,
    cancel_exercise: Option<Uuid>,
}

impl MusclePage {
    fn parse(data: &str) -> Result<Self> {
        let parts: Vec<&str> = data.split(':').collect();
        let invalid = || Error::InvalidInput("invalid callback format".into());

        let group = parts.first().copied().unwrap_or_default();
        if group.is_empty() {
            return Err(invalid());
        }

        let (page, cancel_exercise) = match parts.as_slice() {
            [_] => (0, None),
            [_, direction, page, rest @ ..] if rest.len() <= 1 => {
                if *direction != NEXT_DIRECTION && *direction != PREV_DIRECTION {
                    return Err(invalid());
                }
                let page = page
                    .parse::<usize>()
                    .map_err(|_| Error::InvalidInput("invalid page number".into()))?;
                let cancel = rest
                    .first()
                    .map(|id| {
                        Uuid::parse_str(id)
                            .map_err(|_| Error::InvalidInput("invalid exercise id".into()))
                    })
                    .transpose()?;
                (page, cancel)
            }
            _ => return Err(invalid()),
        };

        Ok(Self {
            group: group.to_string(),
            page,
            cancel_exercise,
        })
    }
}

/// One page of `items` plus the total page count
fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Result<(&[T], usize)> {
    if page_size == 0 {
        return Err(Error::InvalidInput("invalid page size".into()));
    }

    let total_pages = items.len().div_ceil(page_size);
    if page >= total_pages {
        return Err(Error::InvalidInput("page number exceeds total pages".into()));
    }

    let start = page * page_size;
    let end = (start + page_size).min(items.len());
    Ok((&items[start..end], total_pages))
}

fn parse_day(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemorySessionCache;
    use crate::conversation::MemoryStateStore;
    use crate::store::MemoryTrainingStore;
    use crate::Exercise;

    struct Harness {
        router: Router,
        service: Arc<WorkoutService>,
        states: Arc<MemoryStateStore>,
        bench: Exercise,
    }

    fn harness() -> Harness {
        let service = Arc::new(WorkoutService::new(
            Arc::new(MemoryTrainingStore::new()),
            Arc::new(MemorySessionCache::new()),
        ));
        let bench = service.create_exercise("Bench", "chest", "barbell").unwrap();
        let states = Arc::new(MemoryStateStore::new());
        let router = Router::new(service.clone(), states.clone(), BotConfig::default());
        Harness {
            router,
            service,
            states,
            bench,
        }
    }

    fn command(name: &str) -> Inbound {
        Inbound::Command {
            user_id: "u1".into(),
            name: name.into(),
        }
    }

    fn text(text: &str) -> Inbound {
        Inbound::Text {
            user_id: "u1".into(),
            text: text.into(),
        }
    }

    fn callback(data: &str) -> Inbound {
        Inbound::Callback {
            user_id: "u1".into(),
            data: data.into(),
        }
    }

    fn button_data(reply: &Reply) -> Vec<String> {
        reply.buttons.iter().flatten().map(|b| b.data.clone()).collect()
    }

    #[test]
    fn test_unknown_inputs() {
        let h = harness();
        assert_eq!(h.router.handle(&command("/nope")).text, UNKNOWN_TEXT);
        assert_eq!(h.router.handle(&text("hello")).text, UNKNOWN_TEXT);
        assert_eq!(h.router.handle(&callback("bogus:1")).text, UNKNOWN_TEXT);
    }

    #[test]
    fn test_greeting_credits_author() {
        let h = harness();
        assert_eq!(h.router.handle(&command("start")).text, START_TEXT);

        let config = BotConfig {
            author_name: Some("Jawaad".into()),
            ..BotConfig::default()
        };
        let router = Router::new(h.service.clone(), h.states.clone(), config);
        assert!(router.handle(&command("/start")).text.ends_with("Jawaad"));
    }

    #[test]
    fn test_interactive_training_flow() {
        let h = harness();

        let reply = h.router.handle(&command("/start_training"));
        assert_eq!(reply.text, START_TRAINING_TEXT);
        assert!(button_data(&reply).contains(&"muscle:chest".to_string()));

        let reply = h.router.handle(&callback("muscle:chest"));
        assert!(reply.edit);
        let pick = format!("exercise:chest:{}", h.bench.id());
        assert!(button_data(&reply).contains(&pick));

        let reply = h.router.handle(&callback(&pick));
        assert_eq!(reply.text, EXERCISE_TEXT);
        assert_eq!(h.states.get("u1"), Some(ConversationState::AwaitingSetInput));

        let reply = h.router.handle(&text("40,12"));
        assert_eq!(reply.text, SET_TEXT);
        h.router.handle(&text("45,10\nлегко"));
        assert_eq!(h.states.get("u1"), Some(ConversationState::AwaitingSetInput));

        let reply = h.router.handle(&text("forty,ten"));
        assert_eq!(reply.text, ERR_INVALID_SET_FORMAT);

        let reply = h.router.handle(&callback(FINISH_TRAINING_PREFIX));
        assert!(reply.text.contains("Sets: 2"));
        assert_eq!(h.states.get("u1"), None);
        assert!(h.service.current_session("u1").unwrap().is_none());

        // Last sets are shown the next time the exercise is picked
        h.router.handle(&command("start_training"));
        let reply = h.router.handle(&callback(&pick));
        assert!(reply.text.contains(LAST_SETS_TEXT));
        assert!(reply.text.contains("45.0 kg x 10"));
    }

    #[test]
    fn test_back_to_exercises_undoes_pick() {
        let h = harness();
        h.router.handle(&command("start_training"));
        let reply = h.router.handle(&callback(&format!("exercise:chest:{}", h.bench.id())));

        let back = button_data(&reply).remove(0);
        assert_eq!(back, format!("muscle:chest:next:0:{}", h.bench.id()));

        h.router.handle(&callback(&back));
        let session = h.service.current_session("u1").unwrap().unwrap();
        assert_eq!(session.exercise_count(), 0);
    }

    #[test]
    fn test_back_to_exercises_stops_set_input() {
        let h = harness();
        let fly = h.service.create_exercise("Fly", "chest", "machine").unwrap();
        h.router.handle(&command("start_training"));
        h.router.handle(&callback(&format!("exercise:chest:{}", h.bench.id())));
        h.router.handle(&text("40,10"));

        h.router.handle(&callback(START_NEW_EXERCISE_PREFIX));
        let reply = h.router.handle(&callback(&format!("exercise:chest:{}", fly.id())));
        let back = button_data(&reply).remove(0);
        h.router.handle(&callback(&back));
        assert_eq!(h.states.get("u1"), None);

        let reply = h.router.handle(&text("99,1"));
        assert_ne!(reply.text, SET_TEXT);

        let session = h.service.current_session("u1").unwrap().unwrap();
        assert_eq!(session.exercise_count(), 1);
        let sets: Vec<(f32, u8)> = session.exercises()[0]
            .sets()
            .iter()
            .map(|s| (s.weight(), s.reps()))
            .collect();
        assert_eq!(sets, vec![(40.0, 10)]);
    }

    #[test]
    fn test_pagination() {
        let h = harness();
        for i in 0..6 {
            h.service
                .create_exercise(&format!("Press {}", i), "chest", "dumbbell")
                .unwrap();
        }

        let first = h.router.handle(&callback("muscle:chest"));
        // 5 exercises, navigation row, back row
        assert_eq!(first.buttons.len(), 7);
        assert_eq!(first.buttons[5][0].data, "muscle:chest:next:1");

        let second = h.router.handle(&callback("muscle:chest:next:1"));
        assert_eq!(second.buttons.len(), 4);
        assert_eq!(second.buttons[2][0].data, "muscle:chest:prev:0");

        let beyond = h.router.handle(&callback("muscle:chest:next:5"));
        assert!(beyond.text.starts_with("Error"));
        let bad = h.router.handle(&callback("muscle:chest:sideways:1"));
        assert!(bad.text.starts_with("Error"));
    }

    #[test]
    fn test_upload_flow_clears_state_on_error() {
        let h = harness();
        h.router.handle(&command("upload_training"));
        assert_eq!(h.states.get("u1"), Some(ConversationState::AwaitingTrainingInput));

        let reply = h.router.handle(&text("1. Bench 40,12"));
        assert!(reply.text.starts_with("Failed to upload training"));
        assert_eq!(h.states.get("u1"), None);

        h.router.handle(&command("upload_training"));
        let reply = h.router.handle(&text("2024-02-15\n1. Bench - 40,12 (easy); 40,12"));
        assert!(reply.text.contains("Exercises: 1"));
        assert!(reply.text.contains("Sets: 2"));
    }

    #[test]
    fn test_get_trainings_flow() {
        let h = harness();
        h.service
            .parse_training("u1", "2024-02-15\n1. Bench - 40,12 (easy)")
            .unwrap();

        h.router.handle(&command("get_trainings"));
        let reply = h.router.handle(&text("2024-02-01 2024-02-15"));
        assert_eq!(reply.text, "2024-02-15\n1. Bench - 40.0,12 (easy)\n\n");
        assert_eq!(h.states.get("u1"), None);

        h.router.handle(&command("get_trainings"));
        let reply = h.router.handle(&text("2023-01-01 2023-02-01"));
        assert_eq!(reply.text, NO_TRAININGS_TEXT);
    }

    #[test]
    fn test_create_exercise_flow() {
        let h = harness();
        h.router.handle(&command("create_exercise"));
        let reply = h.router.handle(&text("Row back cable machine"));
        assert_eq!(reply.text, "Exercise \"Row\" added to group \"back\"");
        assert_eq!(h.states.get("u1"), None);

        h.router.handle(&command("create_exercise"));
        let reply = h.router.handle(&text("Row back cable"));
        assert!(reply.text.contains("already exists"));

        h.router.handle(&command("create_exercise"));
        let reply = h.router.handle(&text("Curl shoulders dumbbell"));
        assert!(reply.text.contains("unknown muscle group"));

        h.router.handle(&command("create_exercise"));
        let reply = h.router.handle(&text("Curl"));
        assert!(reply.text.starts_with("Error"));
    }

    #[test]
    fn test_progression_flow() {
        let h = harness();
        let day = (Utc::now() - chrono::Duration::days(2)).format("%Y-%m-%d").to_string();
        h.service
            .parse_training("u1", &format!("{}\n1. Bench - 40,12; 50,8", day))
            .unwrap();

        h.router.handle(&command("get_exercise_progression"));
        let reply = h.router.handle(&callback("muscle:chest"));
        let pick = format!("start_progression:{}", h.bench.id());
        assert!(button_data(&reply).contains(&pick));

        let reply = h.router.handle(&callback(&pick));
        let points = reply.progression.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!((points[0].weight, points[0].reps), (50.0, 12));
        assert_eq!(h.states.get("u1"), None);

        let reply = h.router.handle(&callback("start_progression:not-a-uuid"));
        assert_eq!(reply.text, ERR_INVALID_EXERCISE_ID);
    }

    #[test]
    fn test_clear_training() {
        let h = harness();
        assert_eq!(h.router.handle(&command("clear_training")).text, ERR_NO_TRAINING);

        h.router.handle(&command("start_training"));
        assert_eq!(
            h.router.handle(&command("clear_training")).text,
            CLEAR_TRAINING_DONE_TEXT
        );
        assert!(h.service.current_session("u1").unwrap().is_none());
    }

    #[test]
    fn test_muscle_page_parse() {
        let id = Uuid::new_v4();
        assert_eq!(
            MusclePage::parse(&format!("legs:next:2:{}", id)).unwrap(),
            MusclePage {
                group: "legs".into(),
                page: 2,
                cancel_exercise: Some(id),
            }
        );
        assert_eq!(MusclePage::parse("legs").unwrap().page, 0);
        assert!(MusclePage::parse("").is_err());
        assert!(MusclePage::parse("legs:next").is_err());
        assert!(MusclePage::parse("legs:next:x").is_err());
        assert!(MusclePage::parse("legs:next:0:not-a-uuid").is_err());
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (0..11).collect();
        let (page, total) = paginate(&items, 2, 5).unwrap();
        assert_eq!(page, &[10]);
        assert_eq!(total, 3);
        assert!(paginate(&items, 3, 5).is_err());
        assert!(paginate(&items, 0, 0).is_err());
    }
}
