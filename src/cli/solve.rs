//! Solve command.
//!
//! Solves one task file or every task in a directory and, when the dataset
//! ships the expected test output, checks the prediction against it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::core::{task_paths, Grid, SolutionSource, Solver, Task};
use crate::error::{exit_codes, Result};

/// Options for the solve command.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Outcome of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Prediction equals the expected output.
    Matched,
    /// Prediction differs from the expected output.
    Mismatched,
    /// A prediction was made but no expected output was available.
    Predicted,
    /// The task could not be loaded or solved.
    Failed,
}

/// Result for a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    /// Task name (file stem).
    pub task: String,
    pub status: TaskStatus,
    /// Which candidate the integrator chose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SolutionSource>,
    /// Program found by the search, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Grid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counts over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveSummary {
    pub total: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub predicted: usize,
    pub failed: usize,
}

impl SolveSummary {
    fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Matched => self.matched += 1,
            TaskStatus::Mismatched => self.mismatched += 1,
            TaskStatus::Predicted => self.predicted += 1,
            TaskStatus::Failed => self.failed += 1,
        }
    }

    /// Fraction of tasks with a known answer that were matched.
    pub fn accuracy(&self) -> Option<f64> {
        let checked = self.matched + self.mismatched;
        if checked == 0 {
            None
        } else {
            Some(self.matched as f64 / checked as f64)
        }
    }
}

/// Output format for the solve command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOutput {
    /// Whether the run completed (individual tasks may still have failed).
    pub success: bool,
    pub tasks: Vec<TaskReport>,
    pub summary: SolveSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SolveOutput {
    /// Create a completed output.
    pub fn success(tasks: Vec<TaskReport>) -> Self {
        let mut summary = SolveSummary::default();
        for report in &tasks {
            summary.record(report.status);
        }
        Self {
            success: true,
            tasks,
            summary,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tasks: Vec::new(),
            summary: SolveSummary::default(),
            error: Some(error.into()),
        }
    }

    /// Exit code for this run.
    pub fn exit_code(&self) -> i32 {
        if !self.success {
            exit_codes::ERROR
        } else if self.summary.failed > 0 || self.summary.mismatched > 0 {
            exit_codes::UNSOLVED
        } else {
            exit_codes::SOLVED
        }
    }
}

/// The solve command implementation.
pub struct SolveCommand {
    solver: Solver,
}

impl SolveCommand {
    /// Create a new solve command.
    pub fn new(solver: Solver) -> Self {
        Self { solver }
    }

    /// Solve every task at `path`.
    pub fn run(&self, path: &Path) -> SolveOutput {
        let paths = match task_paths(path) {
            Ok(paths) => paths,
            Err(e) => return SolveOutput::failure(e.to_string()),
        };
        if paths.is_empty() {
            return SolveOutput::failure(format!("no task files found in {}", path.display()));
        }

        let reports = paths.iter().map(|p| self.run_one(p)).collect();
        SolveOutput::success(reports)
    }

    fn run_one(&self, path: &Path) -> TaskReport {
        let name = task_name(path);
        match Task::load(path).and_then(|task| self.solve_task(&name, &task)) {
            Ok(report) => report,
            Err(e) => {
                if e.is_input_error() {
                    warn!(task = %name, error = %e, "task rejected");
                } else {
                    error!(task = %name, error = %e, "task failed");
                }
                TaskReport {
                    task: name,
                    status: TaskStatus::Failed,
                    source: None,
                    program: None,
                    prediction: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Solve an already-loaded task.
    pub fn solve_task(&self, name: &str, task: &Task) -> Result<TaskReport> {
        let analysis = self.solver.analyze(task)?;
        let resolution = self.solver.resolve(&analysis)?;

        let status = match task.expected_output() {
            Some(expected) if *expected == resolution.grid => TaskStatus::Matched,
            Some(_) => TaskStatus::Mismatched,
            None => TaskStatus::Predicted,
        };

        Ok(TaskReport {
            task: name.to_string(),
            status,
            source: Some(resolution.source),
            program: analysis.program.map(|p| p.to_string()),
            prediction: Some(resolution.grid),
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SolveOutput, options: &SolveOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &SolveOutput) -> String {
        if !output.success {
            return format!(
                "Solve failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        for report in &output.tasks {
            let status = match report.status {
                TaskStatus::Matched => "matched",
                TaskStatus::Mismatched => "MISMATCH",
                TaskStatus::Predicted => "predicted",
                TaskStatus::Failed => "FAILED",
            };
            lines.push(format!("[{}] {}", status, report.task));

            if let Some(error) = &report.error {
                lines.push(format!("   Error: {}", error));
                continue;
            }
            if let Some(source) = report.source {
                lines.push(format!("   Source: {}", source));
            }
            lines.push(format!(
                "   Program: {}",
                report.program.as_deref().unwrap_or("none")
            ));
            if let Some(prediction) = &report.prediction {
                for row in prediction.to_string().lines() {
                    lines.push(format!("   | {}", row));
                }
            }
        }

        let summary = &output.summary;
        lines.push(String::new());
        let mut totals = format!(
            "{} task(s): {} matched, {} mismatched, {} unchecked, {} failed",
            summary.total, summary.matched, summary.mismatched, summary.predicted, summary.failed
        );
        if let Some(accuracy) = summary.accuracy() {
            totals.push_str(&format!(" (accuracy {:.1}%)", accuracy * 100.0));
        }
        lines.push(totals);

        lines.join("\n")
    }
}

/// Display name for a task file.
fn task_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const REVERSAL_TASK: &str = r#"{
        "train": [
            {"input": [[1, 2, 3]], "output": [[3, 2, 1]]},
            {"input": [[4, 5, 6]], "output": [[6, 5, 4]]}
        ],
        "test": [{"input": [[7, 8, 9]], "output": [[9, 8, 7]]}]
    }"#;

    const DOUBLING_TASK: &str = r#"{
        "train": [{"input": [[1, 2], [3, 4]], "output": [[2, 4], [6, 8]]}],
        "test": [{"input": [[5, 5]]}]
    }"#;

    fn setup(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(temp.path().join(name), content).unwrap();
        }
        temp
    }

    #[test]
    fn test_unknown_pattern_reported_as_mismatch() {
        // Row reversal is found, but the pattern label is Unknown, so the
        // doubling expert's output is returned and does not match.
        let temp = setup(&[("reversal.json", REVERSAL_TASK)]);
        let cmd = SolveCommand::new(Solver::default());

        let output = cmd.run(&temp.path().join("reversal.json"));
        assert!(output.success);
        let report = &output.tasks[0];
        assert_eq!(report.task, "reversal");
        assert_eq!(report.status, TaskStatus::Mismatched);
        assert_eq!(report.source, Some(SolutionSource::Expert));
        assert_eq!(report.program.as_deref(), Some("row_reversal"));
        assert_eq!(output.exit_code(), exit_codes::UNSOLVED);
    }

    #[test]
    fn test_directory_run_with_summary() {
        let temp = setup(&[
            ("a_doubling.json", DOUBLING_TASK),
            ("b_broken.json", "{"),
            ("c_reversal.json", REVERSAL_TASK),
        ]);
        let cmd = SolveCommand::new(Solver::default());

        let output = cmd.run(temp.path());
        assert!(output.success);
        assert_eq!(output.tasks.len(), 3);
        assert_eq!(output.tasks[0].status, TaskStatus::Predicted);
        assert_eq!(output.tasks[1].status, TaskStatus::Failed);
        assert_eq!(output.tasks[2].status, TaskStatus::Mismatched);
        assert_eq!(
            output.summary,
            SolveSummary {
                total: 3,
                matched: 0,
                mismatched: 1,
                predicted: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn test_all_predicted_exits_solved() {
        let temp = setup(&[("doubling.json", DOUBLING_TASK)]);
        let cmd = SolveCommand::new(Solver::default());

        let output = cmd.run(temp.path());
        assert_eq!(
            output.tasks[0].prediction,
            Some(Grid::new(vec![vec![10, 10]]).unwrap())
        );
        assert_eq!(output.exit_code(), exit_codes::SOLVED);
    }

    #[test]
    fn test_missing_path_fails() {
        let temp = TempDir::new().unwrap();
        let cmd = SolveCommand::new(Solver::default());
        let output = cmd.run(&temp.path().join("missing.json"));
        assert!(!output.success);
        assert_eq!(output.exit_code(), exit_codes::ERROR);
    }

    #[test]
    fn test_empty_directory_fails() {
        let temp = TempDir::new().unwrap();
        let output = SolveCommand::new(Solver::default()).run(temp.path());
        assert!(!output.success);
        assert!(output.error.unwrap().contains("no task files"));
    }

    #[test]
    fn test_accuracy() {
        let summary = SolveSummary {
            total: 4,
            matched: 3,
            mismatched: 1,
            predicted: 0,
            failed: 0,
        };
        assert_eq!(summary.accuracy(), Some(0.75));
        assert_eq!(SolveSummary::default().accuracy(), None);
    }

    #[test]
    fn test_format_output_quiet() {
        let cmd = SolveCommand::new(Solver::default());
        let output = SolveOutput::success(vec![]);
        let options = SolveOptions {
            quiet: true,
            ..Default::default()
        };
        assert!(cmd.format_output(&output, &options).is_empty());
    }

    #[test]
    fn test_format_output_json() {
        let temp = setup(&[("doubling.json", DOUBLING_TASK)]);
        let cmd = SolveCommand::new(Solver::default());
        let output = cmd.run(temp.path());

        let options = SolveOptions {
            json: true,
            ..Default::default()
        };
        let formatted = cmd.format_output(&output, &options);
        let parsed: serde_json::Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["tasks"][0]["status"], "predicted");
        assert_eq!(parsed["tasks"][0]["prediction"][0][0], 10);
    }

    #[test]
    fn test_format_human_readable() {
        let temp = setup(&[("doubling.json", DOUBLING_TASK)]);
        let cmd = SolveCommand::new(Solver::default());
        let output = cmd.run(temp.path());

        let formatted = cmd.format_output(&output, &SolveOptions::default());
        assert!(formatted.contains("[predicted] doubling"));
        assert!(formatted.contains("   | 10 10"));
        assert!(formatted.contains("1 task(s)"));
    }
}
