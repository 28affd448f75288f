//! Task entities.
//!
//! A task is the unit the solver works on: a few training pairs and at
//! least one test input. Tasks are read from the ARC JSON layout:
//!
//! ```json
//! {"train": [{"input": [[1]], "output": [[2]]}], "test": [{"input": [[3]]}]}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::grid::Grid;
use crate::error::{Result, SolverError};
use crate::util::read_to_string_limited;

/// One worked example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub input: Grid,
    pub output: Grid,
}

impl TrainingPair {
    pub fn new(input: Grid, output: Grid) -> Self {
        Self { input, output }
    }
}

/// A test input, with the expected answer when the dataset ships one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: Grid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Grid>,
}

impl TestCase {
    pub fn new(input: Grid) -> Self {
        Self {
            input,
            output: None,
        }
    }
}

/// A puzzle: training pairs plus test inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub train: Vec<TrainingPair>,
    pub test: Vec<TestCase>,
}

impl Task {
    pub fn new(train: Vec<TrainingPair>, test: Vec<TestCase>) -> Self {
        Self { train, test }
    }

    /// Check the structural preconditions of the pipeline.
    ///
    /// Grid shapes are already guaranteed by [`Grid`]; this only checks that
    /// there is something to learn from and something to solve.
    pub fn validate(&self) -> Result<()> {
        if self.train.is_empty() {
            return Err(SolverError::invalid_task("task has no training pairs"));
        }
        if self.test.is_empty() {
            return Err(SolverError::invalid_task("task has no test inputs"));
        }
        Ok(())
    }

    /// The grid the pipeline transforms.
    pub fn test_input(&self) -> Result<&Grid> {
        self.test
            .first()
            .map(|case| &case.input)
            .ok_or_else(|| SolverError::invalid_task("task has no test inputs"))
    }

    /// The expected answer for the first test input, if known.
    pub fn expected_output(&self) -> Option<&Grid> {
        self.test.first().and_then(|case| case.output.as_ref())
    }

    /// Parse a task from ARC JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a task from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string_limited(path)?;
        Self::from_json_str(&content).map_err(|e| match e {
            SolverError::Serde { message } => {
                SolverError::serde(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }
}

/// List the task files at `path`: the file itself, or every `*.json` file
/// in a directory, sorted by name.
pub fn task_paths(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        if !path.exists() {
            return Err(SolverError::storage(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            ));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = fs::read_dir(path).map_err(|e| SolverError::storage(path, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry_path = entry.map_err(|e| SolverError::storage(path, e))?.path();
        if entry_path.is_file() && entry_path.extension().is_some_and(|ext| ext == "json") {
            paths.push(entry_path);
        }
    }
    paths.sort();
    Ok(paths)
}
