//! Error types for loading, running and exporting a session

use std::path::PathBuf;

use percept_core::StandardPhase;
use thiserror::Error;

/// Corrupt or incomplete experiment materials. Always fatal, always raised
/// before the first trial is shown.
#[derive(Error, Debug)]
pub enum MaterialsError {
    #[error("{set}: expected {expected} entries but found {found}")]
    ConfigurationMismatch {
        set: String,
        expected: usize,
        found: usize,
    },

    #[error("Missing stimulus: {}", .0.display())]
    MissingStimulus(PathBuf),

    #[error("{}:{line}: expected 0 or 1, found {token:?}", .path.display())]
    InvalidAnswer {
        path: PathBuf,
        line: usize,
        token: String,
    },

    #[error("Condition sheet {}: {source}", .path.display())]
    Conditions {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid experiment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid page plan: {0}")]
    PagePlan(String),

    #[error("Response window must be longer than zero")]
    ZeroResponseWindow,

    #[error("Key bindings must use three distinct keys")]
    AmbiguousKeys,

    #[error("No materials configured for {0}")]
    MissingBlock(StandardPhase),
}

/// A single stimulus, page or screen could not be shown.
#[derive(Error, Debug)]
pub enum PresentationError {
    #[error("Playback failed for {}: {reason}", .path.display())]
    Playback { path: PathBuf, reason: String },

    #[error("Display failed: {0}")]
    Display(String),
}

/// Results could not be persisted. Logged, never fatal.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error for {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Summary encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures that abort a session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Materials(#[from] MaterialsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Participant identifier must not be empty")]
    EmptyParticipant,

    #[error("No trial set loaded for {0}")]
    MissingTrialSet(StandardPhase),

    #[error("{phase}: tallied {tallied} outcomes for {declared} trials")]
    TallyMismatch {
        phase: StandardPhase,
        tallied: usize,
        declared: usize,
    },
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
