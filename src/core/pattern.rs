//! Coarse pattern classification of a task.
//!
//! The label only gates the integrator; it is never executed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::grid::Cell;
use crate::core::task::Task;
use crate::error::{Result, SolverError};

/// Kind of relationship recognized between input and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Multiplication,
    Unknown,
}

/// A pattern label with an optional scalar factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "type")]
    pub kind: PatternKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<Cell>,
}

impl Pattern {
    pub fn multiplication(factor: Cell) -> Self {
        Self {
            kind: PatternKind::Multiplication,
            factor: Some(factor),
        }
    }

    pub fn unknown() -> Self {
        Self {
            kind: PatternKind::Unknown,
            factor: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.kind == PatternKind::Unknown
    }
}

/// Classifies a task from its first training pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternRecognizer;

impl PatternRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Label the task from `train[0]`.
    ///
    /// Every output cell is compared against the *first* input cell times
    /// two, not the positionally matching input cell.
    pub fn recognize(&self, task: &Task) -> Result<Pattern> {
        let pair = task
            .train
            .first()
            .ok_or_else(|| SolverError::invalid_task("task has no training pairs"))?;

        let target = pair.input.first_cell().wrapping_mul(2);
        let pattern = if pair.output.cells().all(|cell| cell == target) {
            Pattern::multiplication(2)
        } else {
            Pattern::unknown()
        };

        debug!(kind = ?pattern.kind, factor = ?pattern.factor, "recognized pattern");
        Ok(pattern)
    }
}
