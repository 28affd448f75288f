//! Exact-match program search.
//!
//! Every training pair is identified independently against a fixed
//! priority list; the search succeeds only when all pairs agree on the same
//! program. There is no scoring and no voting.

use tracing::debug;

use crate::core::grid::{Cell, Grid};
use crate::core::operation::{Operation, Program};
use crate::core::task::{Task, TrainingPair};

/// Searches the operation catalog for a program consistent with every
/// training pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramSearcher;

impl ProgramSearcher {
    pub fn new() -> Self {
        Self
    }

    /// Find the single program shared by all training pairs.
    ///
    /// Returns `None` when any pair is unidentifiable or when pairs disagree.
    pub fn search(&self, task: &Task) -> Option<Program> {
        let mut shared: Option<Program> = None;

        for (index, pair) in task.train.iter().enumerate() {
            let identified = self.identify(pair);
            debug!(
                pair = index,
                program = identified.as_ref().map(|p| p.to_string()).as_deref(),
                "identified training pair"
            );

            let program = identified?;
            match &shared {
                None => shared = Some(program),
                Some(existing) if *existing == program => {}
                Some(existing) => {
                    debug!(
                        pair = index,
                        expected = %existing,
                        found = %program,
                        "training pairs disagree"
                    );
                    return None;
                }
            }
        }

        shared
    }

    /// Apply a program, treating `None` as the identity.
    pub fn apply(&self, grid: &Grid, program: Option<&Program>) -> Grid {
        match program {
            None => grid.clone(),
            Some(program) => program.apply(grid),
        }
    }

    /// Identify the first catalog entry that maps `pair.input` to `pair.output`.
    ///
    /// Priority: row reversal, column reversal, +1, x2, then x2 followed by +1.
    pub fn identify(&self, pair: &TrainingPair) -> Option<Program> {
        let (input, output) = (&pair.input, &pair.output);

        if input.reverse_each_row() == *output {
            return Some(Operation::RowReversal.into());
        }
        if input.reverse_row_order() == *output {
            return Some(Operation::ColumnReversal.into());
        }
        if let Some(op) = identify_arithmetic(input, output) {
            return Some(op.into());
        }
        identify_composite(input, output)
    }
}

/// Compare flattened cells pairwise. Grids with different cell counts never
/// match; shapes are otherwise ignored.
fn cells_match(input: &Grid, output: &Grid, relation: impl Fn(Cell, Cell) -> bool) -> bool {
    input.cell_count() == output.cell_count()
        && input.cells().zip(output.cells()).all(|(i, o)| relation(i, o))
}

fn identify_arithmetic(input: &Grid, output: &Grid) -> Option<Operation> {
    if cells_match(input, output, |i, o| o == i.wrapping_add(1)) {
        Some(Operation::Addition { value: 1 })
    } else if cells_match(input, output, |i, o| o == i.wrapping_mul(2)) {
        Some(Operation::Multiplication { value: 2 })
    } else {
        None
    }
}

fn identify_composite(input: &Grid, output: &Grid) -> Option<Program> {
    let multiply = Operation::Multiplication { value: 2 };
    let multiplied = multiply.apply(input);
    if cells_match(&multiplied, output, |m, o| o == m.wrapping_add(1)) {
        Program::from_operations(vec![multiply, Operation::Addition { value: 1 }])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::grid;
    use crate::core::task::TestCase;

    fn task(pairs: &[(&[&[Cell]], &[&[Cell]])]) -> Task {
        Task::new(
            pairs
                .iter()
                .map(|(i, o)| TrainingPair::new(grid(i), grid(o)))
                .collect(),
            vec![TestCase::new(grid(&[&[0]]))],
        )
    }

    fn composite() -> Program {
        Program::from_operations(vec![
            Operation::Multiplication { value: 2 },
            Operation::Addition { value: 1 },
        ])
        .unwrap()
    }

    #[test]
    fn test_identifies_addition() {
        let t = task(&[
            (&[&[1, 2], &[3, 4]], &[&[2, 3], &[4, 5]]),
            (&[&[0, 1], &[2, 3]], &[&[1, 2], &[3, 4]]),
        ]);
        assert_eq!(
            ProgramSearcher::new().search(&t),
            Some(Operation::Addition { value: 1 }.into())
        );
    }

    #[test]
    fn test_identifies_multiplication() {
        let t = task(&[
            (&[&[1, 2], &[3, 4]], &[&[2, 4], &[6, 8]]),
            (&[&[2, 3], &[4, 5]], &[&[4, 6], &[8, 10]]),
        ]);
        assert_eq!(
            ProgramSearcher::new().search(&t),
            Some(Operation::Multiplication { value: 2 }.into())
        );
    }

    #[test]
    fn test_identifies_row_reversal() {
        let t = task(&[
            (&[&[1, 2, 3], &[4, 5, 6]], &[&[3, 2, 1], &[6, 5, 4]]),
            (&[&[7, 8, 9], &[1, 2, 3]], &[&[9, 8, 7], &[3, 2, 1]]),
        ]);
        assert_eq!(
            ProgramSearcher::new().search(&t),
            Some(Operation::RowReversal.into())
        );
    }

    #[test]
    fn test_identifies_column_reversal() {
        let t = task(&[
            (&[&[1, 2], &[3, 4], &[5, 6]], &[&[5, 6], &[3, 4], &[1, 2]]),
            (&[&[7, 8], &[9, 1], &[2, 3]], &[&[2, 3], &[9, 1], &[7, 8]]),
        ]);
        assert_eq!(
            ProgramSearcher::new().search(&t),
            Some(Operation::ColumnReversal.into())
        );
    }

    #[test]
    fn test_identifies_composite() {
        let t = task(&[
            (&[&[1, 2], &[3, 4]], &[&[3, 5], &[7, 9]]),
            (&[&[2, 3], &[4, 5]], &[&[5, 7], &[9, 11]]),
        ]);
        let searcher = ProgramSearcher::new();
        let program = searcher.search(&t).unwrap();
        assert_eq!(program, composite());
        assert_eq!(
            searcher.apply(&grid(&[&[1, 2], &[3, 4]]), Some(&program)),
            grid(&[&[3, 5], &[7, 9]])
        );
    }

    #[test]
    fn test_unrecognized_pattern_returns_none() {
        let t = task(&[
            (&[&[1, 2], &[3, 4]], &[&[5, 6], &[7, 8]]),
            (&[&[2, 3], &[4, 5]], &[&[6, 7], &[8, 9]]),
        ]);
        assert_eq!(ProgramSearcher::new().search(&t), None);
    }

    #[test]
    fn test_disagreeing_pairs_return_none() {
        let t = task(&[
            (&[&[1, 2], &[3, 4]], &[&[2, 3], &[4, 5]]),
            (&[&[1, 2], &[3, 4]], &[&[2, 1], &[4, 3]]),
        ]);
        assert_eq!(ProgramSearcher::new().search(&t), None);
    }

    #[test]
    fn test_one_unidentifiable_pair_fails_the_task() {
        let t = task(&[
            (&[&[1, 2], &[3, 4]], &[&[2, 3], &[4, 5]]),
            (&[&[1, 2], &[3, 4]], &[&[9, 9], &[9, 9]]),
        ]);
        assert_eq!(ProgramSearcher::new().search(&t), None);
    }

    #[test]
    fn test_row_reversal_wins_over_arithmetic() {
        // Zeros are fixed by both reversals and by x2.
        let pair = TrainingPair::new(grid(&[&[0, 0]]), grid(&[&[0, 0]]));
        assert_eq!(
            ProgramSearcher::new().identify(&pair),
            Some(Operation::RowReversal.into())
        );
    }

    #[test]
    fn test_addition_wins_over_multiplication() {
        // 1 + 1 == 1 * 2, so both arithmetic rules fit; addition is tried first.
        let pair = TrainingPair::new(grid(&[&[1]]), grid(&[&[2]]));
        assert_eq!(
            ProgramSearcher::new().identify(&pair),
            Some(Operation::Addition { value: 1 }.into())
        );
    }

    #[test]
    fn test_arithmetic_uses_flattened_cells() {
        let pair = TrainingPair::new(grid(&[&[1, 2], &[3, 4]]), grid(&[&[2, 3, 4, 5]]));
        assert_eq!(
            ProgramSearcher::new().identify(&pair),
            Some(Operation::Addition { value: 1 }.into())
        );
    }

    #[test]
    fn test_different_cell_counts_never_match() {
        let pair = TrainingPair::new(grid(&[&[1, 2]]), grid(&[&[2, 3, 4]]));
        assert_eq!(ProgramSearcher::new().identify(&pair), None);
    }

    #[test]
    fn test_apply_none_is_identity() {
        let g = grid(&[&[1, 2], &[3, 4]]);
        assert_eq!(ProgramSearcher::new().apply(&g, None), g);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_rows() -> impl Strategy<Value = Vec<Vec<Cell>>> {
            // Cells start at 1: an all-zero input would also satisfy +1.
            (1usize..5, 2usize..5).prop_flat_map(|(h, w)| {
                prop::collection::vec(prop::collection::vec(1i64..10, w), h)
            })
        }

        proptest! {
            // Property: apply with no program is the identity
            #[test]
            fn prop_apply_none_identity(rows in arb_rows()) {
                let g = Grid::new(rows).unwrap();
                prop_assert_eq!(ProgramSearcher::new().apply(&g, None), g);
            }

            // Property: a consistent composite task is always recovered
            #[test]
            fn prop_composite_recovered(a in arb_rows(), b in arb_rows()) {
                let program = composite();
                let pairs: Vec<TrainingPair> = [a, b]
                    .into_iter()
                    .map(|rows| {
                        let input = Grid::new(rows).unwrap();
                        let output = program.apply(&input);
                        TrainingPair::new(input, output)
                    })
                    .collect();
                let t = Task::new(pairs, vec![TestCase::new(grid(&[&[0]]))]);
                prop_assert_eq!(ProgramSearcher::new().search(&t), Some(program));
            }
        }
    }
}
