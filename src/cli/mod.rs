//! CLI commands for the solver.
//!
//! - **solve**: solve a task file or a directory of tasks
//! - **explain**: show every intermediate result for one task
//! - **init**: scaffold the project configuration

pub mod explain;
pub mod init;
pub mod solve;

pub use explain::ExplainCommand;
pub use init::InitCommand;
pub use solve::SolveCommand;
