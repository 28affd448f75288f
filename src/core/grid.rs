//! Grid value type.
//!
//! A grid is a non-empty rectangular matrix of integer color codes. The
//! invariant is checked once at construction (and on deserialization), so
//! every grid that reaches the pipeline is well-formed. All transforms
//! return a new grid.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// A single cell value (color code).
pub type Cell = i64;

/// Largest side length [`Grid::scale`] will produce. ARC grids are at most
/// 30x30, so this admits a 30x scale of the largest puzzle.
pub const MAX_SCALED_SIDE: usize = 900;

/// Non-empty rectangular matrix of cells, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

/// Clockwise rotation amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// 90 degrees clockwise.
    Quarter,
    /// 180 degrees.
    Half,
    /// 270 degrees clockwise.
    ThreeQuarter,
}

/// Mirror axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Mirror left-right: every row is reversed.
    Horizontal,
    /// Mirror top-bottom: the row order is reversed.
    Vertical,
}

impl Grid {
    /// Build a grid, rejecting empty and ragged input.
    pub fn new(rows: Vec<Vec<Cell>>) -> Result<Self> {
        let width = match rows.first() {
            None => return Err(SolverError::malformed_grid("grid has no rows")),
            Some(first) => first.len(),
        };
        if width == 0 {
            return Err(SolverError::malformed_grid("grid has no columns"));
        }
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(SolverError::malformed_grid(format!(
                "row {} has {} cells, expected {}",
                index,
                row.len(),
                width
            )));
        }
        Ok(Self { rows })
    }

    /// Build a grid whose shape is already known to be valid.
    fn from_valid(rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(!rows.is_empty() && !rows[0].is_empty());
        Self { rows }
    }

    /// The rows of the grid.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    /// `(height, width)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.height() * self.width()
    }

    /// Iterate cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.rows.iter().flat_map(|row| row.iter().copied())
    }

    /// The top-left cell. Always present because grids are non-empty.
    pub fn first_cell(&self) -> Cell {
        self.rows[0][0]
    }

    /// Apply `f` to every cell.
    pub fn map_cells(&self, f: impl Fn(Cell) -> Cell) -> Self {
        Self::from_valid(
            self.rows
                .iter()
                .map(|row| row.iter().map(|&c| f(c)).collect())
                .collect(),
        )
    }

    /// Reverse the cells within every row.
    pub fn reverse_each_row(&self) -> Self {
        Self::from_valid(
            self.rows
                .iter()
                .map(|row| row.iter().rev().copied().collect())
                .collect(),
        )
    }

    /// Reverse the order of the rows, leaving each row intact.
    pub fn reverse_row_order(&self) -> Self {
        Self::from_valid(self.rows.iter().rev().cloned().collect())
    }

    /// Swap rows and columns.
    pub fn transpose(&self) -> Self {
        let (height, width) = self.dims();
        Self::from_valid(
            (0..width)
                .map(|j| (0..height).map(|i| self.rows[i][j]).collect())
                .collect(),
        )
    }

    /// Rotate clockwise.
    pub fn rotate(&self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::Quarter => self.transpose().reverse_each_row(),
            Rotation::Half => self.reverse_row_order().reverse_each_row(),
            Rotation::ThreeQuarter => self.transpose().reverse_row_order(),
        }
    }

    /// Mirror along an axis.
    pub fn reflect(&self, axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => self.reverse_each_row(),
            Axis::Vertical => self.reverse_row_order(),
        }
    }

    /// Blow every cell up into a `factor` x `factor` block.
    ///
    /// Neither side of the result may exceed [`MAX_SCALED_SIDE`].
    pub fn scale(&self, factor: usize) -> Result<Self> {
        if factor == 0 {
            return Err(SolverError::malformed_grid("scale factor must be at least 1"));
        }
        let (height, width) = self.dims();
        let fits = |side: usize| {
            side.checked_mul(factor)
                .is_some_and(|scaled| scaled <= MAX_SCALED_SIDE)
        };
        if !fits(height) || !fits(width) {
            return Err(SolverError::malformed_grid(format!(
                "scaling a {}x{} grid by {} exceeds {} cells per side",
                height, width, factor, MAX_SCALED_SIDE
            )));
        }

        let rows = self
            .rows
            .iter()
            .flat_map(|row| {
                let scaled: Vec<Cell> = row
                    .iter()
                    .flat_map(|&c| std::iter::repeat_n(c, factor))
                    .collect();
                std::iter::repeat_n(scaled, factor)
            })
            .collect();
        Ok(Self::from_valid(rows))
    }

    /// Shift content by `dx` columns and `dy` rows. Cells shifted off the
    /// grid are dropped and vacated cells become 0.
    pub fn translate(&self, dx: isize, dy: isize) -> Self {
        let (height, width) = self.dims();
        let mut rows = vec![vec![0; width]; height];
        for (i, row) in self.rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                // An offset that overflows lands off the grid.
                let (Some(ni), Some(nj)) = (shift(i, dy), shift(j, dx)) else {
                    continue;
                };
                if ni < height && nj < width {
                    rows[ni][nj] = value;
                }
            }
        }
        Self::from_valid(rows)
    }
}

/// `index + offset` as an index, or `None` when it is negative or overflows.
fn shift(index: usize, offset: isize) -> Option<usize> {
    isize::try_from(index)
        .ok()?
        .checked_add(offset)
        .and_then(|moved| usize::try_from(moved).ok())
}

impl TryFrom<Vec<Vec<Cell>>> for Grid {
    type Error = SolverError;

    fn try_from(rows: Vec<Vec<Cell>>) -> Result<Self> {
        Self::new(rows)
    }
}

impl From<Grid> for Vec<Vec<Cell>> {
    fn from(grid: Grid) -> Self {
        grid.rows
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let line: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            write!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn grid(rows: &[&[Cell]]) -> Grid {
    Grid::new(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
}
