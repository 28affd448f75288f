//! Core types and logic for the solver.
//!
//! This module contains the grid data model, the closed operation catalog,
//! and the four pipeline components plus the orchestrator that wires them.

pub mod experts;
pub mod grid;
pub mod integrator;
pub mod operation;
pub mod pattern;
pub mod searcher;
pub mod solver;
pub mod task;

pub use experts::{
    Expert, FirstExpertGate, FixedExpert, FnExpert, GateKind, GatingNetwork, MajorityVoteGate,
    MixtureOfExperts,
};
pub use grid::{Axis, Cell, Grid, Rotation};
pub use integrator::{HybridIntegrator, OnMissingDiscrete, Resolution, SolutionSource};
pub use operation::{Operation, Program};
pub use pattern::{Pattern, PatternKind, PatternRecognizer};
pub use searcher::ProgramSearcher;
pub use solver::{Analysis, Solver};
pub use task::{task_paths, Task, TestCase, TrainingPair};
