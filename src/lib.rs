//! ARC solver - hybrid program search and mixture of experts
//!
//! Solves ARC-style grid puzzles by searching a small catalog of grid
//! programs against the training pairs, running a panel of fixed experts on
//! the test input, and letting a coarse pattern label decide which of the
//! two candidates to return.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod util;

pub use config::Config;
pub use core::{
    Analysis, Cell, Expert, FixedExpert, GateKind, GatingNetwork, Grid, HybridIntegrator,
    MixtureOfExperts, OnMissingDiscrete, Operation, Pattern, PatternKind, PatternRecognizer,
    Program, ProgramSearcher, Resolution, SolutionSource, Solver, Task, TestCase, TrainingPair,
};
pub use error::{Result, SolverError};

// CLI commands
pub use cli::{ExplainCommand, InitCommand, SolveCommand};
