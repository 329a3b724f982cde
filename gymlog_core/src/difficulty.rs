//! Difficulty classification derived from free-text set notes.

use serde::{Deserialize, Serialize};
use std::fmt;

const EASY_KEYWORDS: &[&str] = &["легко", "easy"];
const MEDIUM_KEYWORDS: &[&str] = &["средне", "нормально", "medium"];
const HARD_KEYWORDS: &[&str] = &["тяжело", "hard"];

/// How hard a set felt, as inferred from its note
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[default]
    Unspecified,
}

impl Difficulty {
    /// Classify a note by keyword substring match.
    ///
    /// Keyword sets are checked easy, then medium, then hard; the first set with a
    /// match wins even if the note mentions several.
    pub fn classify(notes: &str) -> Self {
        let notes = notes.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| notes.contains(k));

        if matches(EASY_KEYWORDS) {
            Difficulty::Easy
        } else if matches(MEDIUM_KEYWORDS) {
            Difficulty::Medium
        } else if matches(HARD_KEYWORDS) {
            Difficulty::Hard
        } else {
            Difficulty::Unspecified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unspecified => "-",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
