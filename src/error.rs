//! Unified error types for the solver.
//!
//! Malformed input is rejected before it reaches any pipeline component.
//! A program search that finds nothing is not an error: it surfaces as
//! `None` and the integrator decides what to do with it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for solver operations.
#[derive(Error, Debug)]
pub enum SolverError {
    /// A grid is empty or non-rectangular.
    #[error("malformed grid: {reason}")]
    MalformedGrid { reason: String },

    /// A task is structurally unusable (no training pairs, no test input).
    #[error("invalid task: {message}")]
    InvalidTask { message: String },

    /// The integrator had to return a discrete solution that does not exist.
    #[error("no solution found: pattern requires a discrete program but none fits every training pair")]
    NoSolutionFound,

    /// An expert or gate failed to produce a grid.
    #[error("expert '{name}' failed: {message}")]
    Expert { name: String, message: String },

    /// Configuration loading or validation errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// I/O errors while reading task files or writing config.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },
}

/// A specialized Result type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;

impl SolverError {
    /// Create a malformed grid error.
    pub fn malformed_grid(reason: impl Into<String>) -> Self {
        Self::MalformedGrid {
            reason: reason.into(),
        }
    }

    /// Create an invalid task error.
    pub fn invalid_task(message: impl Into<String>) -> Self {
        Self::InvalidTask {
            message: message.into(),
        }
    }

    /// Create an expert error.
    pub fn expert(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Expert {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Whether this error was caused by the input data rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedGrid { .. } | Self::InvalidTask { .. } | Self::Serde { .. }
        )
    }
}

impl From<io::Error> for SolverError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SolverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Exit codes for the `arc-solver` binary.
pub mod exit_codes {
    /// Every task produced a prediction (and matched, when the answer was known).
    pub const SOLVED: i32 = 0;

    /// An input, config or I/O error stopped the run.
    pub const ERROR: i32 = 1;

    /// At least one task was unsolved or its prediction did not match.
    pub const UNSOLVED: i32 = 2;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
