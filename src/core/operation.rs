//! Operation catalog.
//!
//! The catalog is closed: an [`Operation`] is one of four variants and is
//! applied by exhaustive match. A [`Program`] is a non-empty sequence of
//! operations applied left to right.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::grid::{Cell, Grid};
use crate::error::SolverError;

/// A single grid transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    /// Reverse the cells within every row.
    RowReversal,
    /// Reverse the order of the rows.
    ColumnReversal,
    /// Add a scalar to every cell.
    Addition { value: Cell },
    /// Multiply every cell by a scalar.
    Multiplication { value: Cell },
}

impl Operation {
    /// Apply this operation. Arithmetic wraps on overflow.
    pub fn apply(&self, grid: &Grid) -> Grid {
        match *self {
            Operation::RowReversal => grid.reverse_each_row(),
            Operation::ColumnReversal => grid.reverse_row_order(),
            Operation::Addition { value } => grid.map_cells(|c| c.wrapping_add(value)),
            Operation::Multiplication { value } => grid.map_cells(|c| c.wrapping_mul(value)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::RowReversal => write!(f, "row_reversal"),
            Operation::ColumnReversal => write!(f, "column_reversal"),
            Operation::Addition { value } => write!(f, "addition({})", value),
            Operation::Multiplication { value } => write!(f, "multiplication({})", value),
        }
    }
}

/// Ordered, non-empty sequence of operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Operation>", into = "Vec<Operation>")]
pub struct Program(Vec<Operation>);

impl Program {
    /// A program consisting of one operation.
    pub fn single(operation: Operation) -> Self {
        Self(vec![operation])
    }

    /// Build a program from a sequence. Returns `None` for an empty sequence.
    pub fn from_operations(operations: Vec<Operation>) -> Option<Self> {
        if operations.is_empty() {
            None
        } else {
            Some(Self(operations))
        }
    }

    /// The operations, in application order.
    pub fn operations(&self) -> &[Operation] {
        &self.0
    }

    /// Apply every operation in order, each feeding the next.
    pub fn apply(&self, grid: &Grid) -> Grid {
        self.0
            .iter()
            .fold(grid.clone(), |acc, op| op.apply(&acc))
    }
}

impl TryFrom<Vec<Operation>> for Program {
    type Error = SolverError;

    fn try_from(operations: Vec<Operation>) -> Result<Self, Self::Error> {
        Self::from_operations(operations)
            .ok_or_else(|| SolverError::serde("program must contain at least one operation"))
    }
}

impl From<Program> for Vec<Operation> {
    fn from(program: Program) -> Self {
        program.0
    }
}

impl From<Operation> for Program {
    fn from(operation: Operation) -> Self {
        Self::single(operation)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|op| op.to_string()).collect();
        write!(f, "{}", parts.join(" -> "))
    }
}
