//! Error types for the gymlog_core library.

use std::io;

use crate::parser::ParseError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Semantic classification of an [`Error`], used by transports to pick user-facing text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    AlreadyExists,
    AlreadyInProgress,
    StorageFailure,
}

/// Core error type for gymlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Training log text could not be parsed
    #[error("failed to parse training: {0}")]
    Parse(#[from] ParseError),

    /// Malformed input that is not training log text (event data, callback payloads)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("exercise not found")]
    ExerciseNotFound,

    #[error("set not found")]
    SetNotFound,

    /// A named exercise from an import could not be resolved against the catalog
    #[error("failed to get exercise '{name}': {source}")]
    ExerciseLookup {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("exercise '{0}' already exists")]
    ExerciseAlreadyExists(String),

    #[error("training is already started")]
    SessionAlreadyStarted,

    /// Backend failure not further classified by the core
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Classify this error for the transport layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) | Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::SessionNotFound | Error::ExerciseNotFound | Error::SetNotFound => {
                ErrorKind::NotFound
            }
            Error::ExerciseLookup { source, .. } => source.kind(),
            Error::ExerciseAlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::SessionAlreadyStarted => ErrorKind::AlreadyInProgress,
            Error::Io(_)
            | Error::Json(_)
            | Error::Csv(_)
            | Error::Toml(_)
            | Error::Config(_)
            | Error::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}
