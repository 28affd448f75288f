//! Explain command.
//!
//! Shows every intermediate result of the pipeline for a single task: the
//! searched program, the pattern label, both candidates and the integrator's
//! choice.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Analysis, Grid, PatternKind, Solver, SolutionSource, Task};

/// Options for the explain command.
#[derive(Debug, Clone, Default)]
pub struct ExplainOptions {
    /// Output as JSON.
    pub json: bool,
}

/// Output format for the explain command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainOutput {
    /// Whether the task could be loaded and analyzed.
    pub success: bool,
    /// Expert names in panel order.
    pub experts: Vec<String>,
    /// Gate used to route expert outputs.
    pub gate: String,
    /// Integrator policy for a missing program.
    pub on_missing_discrete: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    /// Candidate the integrator picked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SolutionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Grid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Grid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The explain command implementation.
pub struct ExplainCommand {
    solver: Solver,
}

impl ExplainCommand {
    /// Create a new explain command.
    pub fn new(solver: Solver) -> Self {
        Self { solver }
    }

    fn empty_output(&self) -> ExplainOutput {
        ExplainOutput {
            success: false,
            experts: self.solver.experts().expert_names(),
            gate: self.solver.experts().gate_name().to_string(),
            on_missing_discrete: self.solver.integrator().on_missing_discrete().to_string(),
            analysis: None,
            source: None,
            prediction: None,
            expected: None,
            error: None,
        }
    }

    /// Explain the task stored at `path`.
    pub fn run(&self, path: &Path) -> ExplainOutput {
        match Task::load(path) {
            Ok(task) => self.explain(&task),
            Err(e) => {
                let mut output = self.empty_output();
                output.error = Some(e.to_string());
                output
            }
        }
    }

    /// Explain an already-loaded task.
    ///
    /// An integrator failure still reports the analysis; only a failure to
    /// analyze marks the output unsuccessful.
    pub fn explain(&self, task: &Task) -> ExplainOutput {
        let mut output = self.empty_output();
        output.expected = task.expected_output().cloned();

        let analysis = match self.solver.analyze(task) {
            Ok(analysis) => analysis,
            Err(e) => {
                output.error = Some(e.to_string());
                return output;
            }
        };

        output.success = true;
        match self.solver.resolve(&analysis) {
            Ok(resolution) => {
                output.source = Some(resolution.source);
                output.prediction = Some(resolution.grid);
            }
            Err(e) => output.error = Some(e.to_string()),
        }
        output.analysis = Some(analysis);
        output
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ExplainOutput, options: &ExplainOptions) -> String {
        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ExplainOutput) -> String {
        let mut lines = vec![
            format!("Experts: {} (gate: {})", output.experts.join(", "), output.gate),
            format!("On missing program: {}", output.on_missing_discrete),
        ];

        if let Some(analysis) = &output.analysis {
            lines.push(format!(
                "Program: {}",
                analysis
                    .program
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "none".to_string())
            ));
            let pattern = match (analysis.pattern.kind, analysis.pattern.factor) {
                (PatternKind::Multiplication, Some(factor)) => format!("multiplication (x{})", factor),
                (PatternKind::Multiplication, None) => "multiplication".to_string(),
                (PatternKind::Unknown, _) => "unknown".to_string(),
            };
            lines.push(format!("Pattern: {}", pattern));

            match &analysis.discrete {
                Some(grid) => push_grid(&mut lines, "Discrete candidate", grid),
                None => lines.push("Discrete candidate: none".to_string()),
            }
            push_grid(&mut lines, "Expert candidate", &analysis.expert);
        }

        if let (Some(source), Some(prediction)) = (output.source, &output.prediction) {
            push_grid(&mut lines, &format!("Chosen ({})", source), prediction);
        }
        if let Some(expected) = &output.expected {
            push_grid(&mut lines, "Expected", expected);
            if let Some(prediction) = &output.prediction {
                let verdict = if prediction == expected {
                    "match"
                } else {
                    "mismatch"
                };
                lines.push(format!("Result: {}", verdict));
            }
        }
        if let Some(error) = &output.error {
            lines.push(format!("Error: {}", error));
        }

        lines.join("\n")
    }
}

fn push_grid(lines: &mut Vec<String>, label: &str, grid: &Grid) {
    lines.push(format!("{}:", label));
    for row in grid.to_string().lines() {
        lines.push(format!("  {}", row));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::OnMissingDiscrete;
    use std::fs;
    use tempfile::TempDir;

    const FALLBACK_TASK: &str = r#"{
        "train": [{"input": [[1, 5]], "output": [[2, 2]]}],
        "test": [{"input": [[3, 4]], "output": [[6, 8]]}]
    }"#;

    #[test]
    fn test_explain_fallback_task() {
        let task = Task::from_json_str(FALLBACK_TASK).unwrap();
        let cmd = ExplainCommand::new(Solver::default());
        let output = cmd.explain(&task);

        assert!(output.success);
        assert_eq!(output.experts, vec!["doubling", "incrementing"]);
        assert_eq!(output.gate, "first");
        let analysis = output.analysis.as_ref().unwrap();
        assert!(analysis.program.is_none());
        assert_eq!(analysis.pattern.kind, PatternKind::Multiplication);
        assert_eq!(output.source, Some(SolutionSource::ExpertFallback));
        assert_eq!(output.prediction, output.expected);

        let text = cmd.format_output(&output, &ExplainOptions::default());
        assert!(text.contains("Program: none"));
        assert!(text.contains("Pattern: multiplication (x2)"));
        assert!(text.contains("Chosen (expert (fallback))"));
        assert!(text.contains("Result: match"));
    }

    #[test]
    fn test_explain_keeps_analysis_when_integrator_fails() {
        let mut config = Config::default();
        config.integrator.on_missing_discrete = OnMissingDiscrete::Fail;
        let cmd = ExplainCommand::new(Solver::from_config(&config).unwrap());

        let output = cmd.explain(&Task::from_json_str(FALLBACK_TASK).unwrap());
        assert!(output.success);
        assert!(output.analysis.is_some());
        assert!(output.prediction.is_none());
        assert!(output.error.unwrap().contains("no solution"));
    }

    #[test]
    fn test_explain_invalid_task() {
        let task = Task::from_json_str(r#"{"train": [], "test": [{"input": [[1]]}]}"#).unwrap();
        let output = ExplainCommand::new(Solver::default()).explain(&task);
        assert!(!output.success);
        assert!(output.analysis.is_none());
        assert!(output.error.is_some());
    }

    #[test]
    fn test_run_from_file_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("task.json");
        fs::write(&path, FALLBACK_TASK).unwrap();

        let cmd = ExplainCommand::new(Solver::default());
        let output = cmd.run(&path);
        let json = cmd.format_output(&output, &ExplainOptions { json: true });
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["source"], "expert_fallback");
        assert_eq!(parsed["analysis"]["pattern"]["type"], "multiplication");
        assert!(parsed["analysis"]["program"].is_null());
    }

    #[test]
    fn test_run_missing_file() {
        let temp = TempDir::new().unwrap();
        let output = ExplainCommand::new(Solver::default()).run(&temp.path().join("nope.json"));
        assert!(!output.success);
        assert!(output.error.is_some());
    }
}
