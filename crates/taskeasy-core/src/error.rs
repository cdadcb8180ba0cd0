//! Error kinds surfaced by the task core.
//!
//! None of these are fatal to a session: validation errors abort a single
//! submit, persistence errors leave the in-memory collection authoritative,
//! and malformed stored state falls back to the seed collection.

use std::path::PathBuf;

use thiserror::Error;

/// Rejection of a form submission.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a task title")]
    EmptyTitle,
}

/// Failure talking to the key-value store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Stored text that does not describe a valid task collection.
#[derive(Debug, Error)]
pub enum MalformedStoredState {
    #[error("stored tasks are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("task {id} has unknown category {category:?}")]
    UnknownCategory { id: String, category: String },

    #[error("task {id} has an empty title")]
    EmptyTitle { id: String },

    #[error("task id {0} appears more than once")]
    DuplicateId(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);
