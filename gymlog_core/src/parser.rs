//! Training-log text parser.
//!
//! Accepted format, one exercise per line with an optional leading date:
//!
//! ```text
//! 2024-02-15
//! 1. Bench Press - 40,12 (easy); 42.5,10; 45,8 (тяжело)
//! 2. Pull-up - 10; 8
//! ```
//!
//! A set is `<weight>,<reps>` or just `<reps>` (bodyweight, weight recorded as 1),
//! optionally followed by a parenthesized note. The parser never consults the
//! exercise catalog; names are returned as written.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::num::{ParseFloatError, ParseIntError};

use crate::Difficulty;

/// Weight recorded for sets given as reps only
pub const BODYWEIGHT_WEIGHT: f32 = 1.0;

const EXERCISE_SEPARATOR: &str = " - ";

static DATE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern is valid"));

static ORDINAL_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.(.*)$").expect("ordinal pattern is valid"));

/// Parse failure. Line numbers are 1-based positions in the original text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("no exercises to process")]
    Empty,

    #[error("line {line}: invalid date '{value}'")]
    InvalidDate { line: usize, value: String },

    #[error("line {line}: expected '<n>. <name> - <sets>'")]
    MissingSeparator { line: usize },

    #[error("line {line}: missing '<n>.' label before exercise name")]
    MissingOrdinal { line: usize },

    #[error("line {line}: empty exercise name")]
    EmptyName { line: usize },

    #[error("line {line}: malformed note in set '{set}'")]
    MalformedNote { line: usize, set: String },

    #[error("line {line}: expected '<weight>,<reps>' or '<reps>', got '{set}'")]
    FieldCount { line: usize, set: String },

    #[error("line {line}: invalid weight '{value}': {source}")]
    InvalidWeight {
        line: usize,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("line {line}: weight must be a non-negative number, got '{value}'")]
    NegativeWeight { line: usize, value: String },

    #[error("line {line}: invalid reps '{value}': {source}")]
    InvalidReps {
        line: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSet {
    pub weight: f32,
    pub reps: u8,
    pub difficulty: Difficulty,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedExercise {
    pub name: String,
    pub sets: Vec<ParsedSet>,
}

/// Result of parsing a whole workout message
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedTraining {
    pub date: DateTime<Utc>,
    pub exercises: Vec<ParsedExercise>,
}

/// Parse a multi-line workout. `now` is used as the date when the text has no date line.
///
/// Any malformed line aborts the whole parse.
pub fn parse_training(text: &str, now: DateTime<Utc>) -> Result<ParsedTraining, ParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .peekable();

    let mut date = now;
    if let Some(&(line_no, first)) = lines.peek() {
        if DATE_LINE.is_match(first) {
            let day = NaiveDate::parse_from_str(first, "%Y-%m-%d").map_err(|_| {
                ParseError::InvalidDate {
                    line: line_no,
                    value: first.to_string(),
                }
            })?;
            date = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
            lines.next();
        }
    }

    let exercises = lines
        .map(|(line_no, line)| parse_exercise_line(line_no, line))
        .collect::<Result<Vec<_>, _>>()?;

    if exercises.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(ParsedTraining { date, exercises })
}

/// Parse the interactive set message: `<weight>,<reps>` on the first line, an optional
/// inline `(note)`, and any further lines taken as notes.
pub fn parse_set_input(text: &str) -> Result<ParsedSet, ParseError> {
    let text = text.trim();
    let (first, rest) = match text.split_once('\n') {
        Some((first, rest)) => (first, rest.trim()),
        None => (text, ""),
    };

    let mut set = parse_set(1, first.trim())?;
    if !rest.is_empty() {
        set.notes = if set.notes.is_empty() {
            rest.to_string()
        } else {
            format!("{} {}", set.notes, rest)
        };
        set.difficulty = Difficulty::classify(&set.notes);
    }

    Ok(set)
}

fn parse_exercise_line(line_no: usize, line: &str) -> Result<ParsedExercise, ParseError> {
    let (head, sets_data) = line
        .split_once(EXERCISE_SEPARATOR)
        .ok_or(ParseError::MissingSeparator { line: line_no })?;

    let name = ORDINAL_HEAD
        .captures(head.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .ok_or(ParseError::MissingOrdinal { line: line_no })?;

    if name.is_empty() {
        return Err(ParseError::EmptyName { line: line_no });
    }

    let sets = sets_data
        .split(';')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| parse_set(line_no, token))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedExercise {
        name: name.to_string(),
        sets,
    })
}

fn parse_set(line_no: usize, token: &str) -> Result<ParsedSet, ParseError> {
    let (body, notes) = split_note(line_no, token)?;

    let fields: Vec<&str> = body.split(',').collect();
    let (weight, reps) = match fields.as_slice() {
        [reps] => (BODYWEIGHT_WEIGHT, parse_reps(line_no, reps)?),
        [weight, reps] => (parse_weight(line_no, weight)?, parse_reps(line_no, reps)?),
        _ => {
            return Err(ParseError::FieldCount {
                line: line_no,
                set: token.to_string(),
            })
        }
    };

    Ok(ParsedSet {
        weight,
        reps,
        difficulty: Difficulty::classify(&notes),
        notes,
    })
}

/// Split `"<body>(<note>)"` into body and note. Tokens without parentheses have no note.
fn split_note(line_no: usize, token: &str) -> Result<(String, String), ParseError> {
    let malformed = || ParseError::MalformedNote {
        line: line_no,
        set: token.to_string(),
    };

    match (token.find('('), token.find(')')) {
        (None, None) => Ok((token.trim().to_string(), String::new())),
        (Some(start), Some(end)) if end > start => {
            if !token[end + 1..].trim().is_empty() {
                return Err(malformed());
            }
            let note = token[start + 1..end].trim().to_string();
            let body = token[..start].trim().to_string();
            Ok((body, note))
        }
        _ => Err(malformed()),
    }
}

fn parse_weight(line_no: usize, value: &str) -> Result<f32, ParseError> {
    let value = value.trim();
    let weight: f32 = value.parse().map_err(|source| ParseError::InvalidWeight {
        line: line_no,
        value: value.to_string(),
        source,
    })?;

    if !weight.is_finite() || weight < 0.0 {
        return Err(ParseError::NegativeWeight {
            line: line_no,
            value: value.to_string(),
        });
    }

    Ok(weight)
}

fn parse_reps(line_no: usize, value: &str) -> Result<u8, ParseError> {
    let value = value.trim();
    value.parse().map_err(|source| ParseError::InvalidReps {
        line: line_no,
        value: value.to_string(),
        source,
    })
}
