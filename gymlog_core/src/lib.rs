#![forbid(unsafe_code)]

//! Core domain model and business logic for the gymlog workout diary.
//!
//! This crate provides:
//! - Domain types (exercises, sets, sessions, progression points)
//! - The training log parser
//! - The session lifecycle service
//! - Conversation routing for chat front-ends
//! - Persistence (in-memory and file-backed stores)

pub mod types;
pub mod error;
pub mod difficulty;
pub mod parser;
pub mod config;
pub mod logging;
pub mod history;
pub mod store;
pub mod cache;
pub mod wal;
pub mod csv_log;
pub mod file_store;
pub mod state;
pub mod service;
pub mod catalog;
pub mod conversation;
pub mod formatter;
pub mod router;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use types::*;
pub use difficulty::Difficulty;
pub use config::Config;
pub use store::{MemoryTrainingStore, TrainingStore};
pub use cache::{MemorySessionCache, SessionCache};
pub use file_store::FileTrainingStore;
pub use state::FileSessionCache;
pub use service::WorkoutService;
pub use catalog::seed_catalog;
pub use conversation::{ConversationState, MemoryStateStore, StateStore};
pub use router::{Button, Inbound, Reply, Router};
