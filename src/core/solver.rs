//! Solver orchestration.
//!
//! Runs the three independent analyses (program search, expert panel,
//! pattern recognition) over one task and hands their results to the
//! integrator. The analyses share no data, so they may run on scoped
//! threads; the result is the same either way.

use std::panic;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::core::experts::MixtureOfExperts;
use crate::core::grid::Grid;
use crate::core::integrator::{HybridIntegrator, Resolution};
use crate::core::operation::Program;
use crate::core::pattern::{Pattern, PatternRecognizer};
use crate::core::searcher::ProgramSearcher;
use crate::core::task::Task;
use crate::error::Result;

/// Everything the pipeline computed for one task before arbitration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Program consistent with every training pair, if any.
    pub program: Option<Program>,
    /// Pattern label of the first training pair.
    pub pattern: Pattern,
    /// The program applied to the test input.
    pub discrete: Option<Grid>,
    /// The expert panel's candidate for the test input.
    pub expert: Grid,
}

/// Wires searcher, expert panel, recognizer and integrator together.
#[derive(Default)]
pub struct Solver {
    searcher: ProgramSearcher,
    experts: MixtureOfExperts,
    recognizer: PatternRecognizer,
    integrator: HybridIntegrator,
    parallel: bool,
}

impl Solver {
    /// Build a solver from its parts.
    pub fn new(experts: MixtureOfExperts, integrator: HybridIntegrator) -> Self {
        Self {
            searcher: ProgramSearcher::new(),
            experts,
            recognizer: PatternRecognizer::new(),
            integrator,
            parallel: false,
        }
    }

    /// Build a solver from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let experts =
            MixtureOfExperts::with_fixed(&config.experts.panel()?, config.experts.gate()?)?;
        let integrator = HybridIntegrator::new(config.integrator.on_missing_discrete);
        Ok(Self::new(experts, integrator).with_parallel(config.solver.parallel))
    }

    /// Run the three analyses concurrently.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn experts(&self) -> &MixtureOfExperts {
        &self.experts
    }

    pub fn integrator(&self) -> &HybridIntegrator {
        &self.integrator
    }

    /// Solve a task, returning the predicted grid for `test[0].input`.
    pub fn solve(&self, task: &Task) -> Result<Grid> {
        let analysis = self.analyze(task)?;
        self.resolve(&analysis).map(|r| r.grid)
    }

    /// Arbitrate between the candidates of an analysis.
    pub fn resolve(&self, analysis: &Analysis) -> Result<Resolution> {
        let resolution = self.integrator.decide(
            analysis.discrete.clone(),
            analysis.expert.clone(),
            &analysis.pattern,
        )?;
        info!(
            source = %resolution.source,
            program = analysis.program.as_ref().map(|p| p.to_string()).as_deref(),
            "task solved"
        );
        Ok(resolution)
    }

    /// Run search, expert panel and recognizer, without arbitrating.
    pub fn analyze(&self, task: &Task) -> Result<Analysis> {
        task.validate()?;
        let input = task.test_input()?;

        let (program, expert, pattern) = if self.parallel {
            debug!("running analyses on scoped threads");
            thread::scope(|scope| {
                let search = scope.spawn(|| self.searcher.search(task));
                let experts = scope.spawn(|| self.experts.process(input));
                let pattern = self.recognizer.recognize(task);
                let program = search.join().unwrap_or_else(|e| panic::resume_unwind(e));
                let expert = experts.join().unwrap_or_else(|e| panic::resume_unwind(e));
                (program, expert, pattern)
            })
        } else {
            let program = self.searcher.search(task);
            let expert = self.experts.process(input);
            let pattern = self.recognizer.recognize(task);
            (program, expert, pattern)
        };

        let expert = expert?;
        let pattern = pattern?;
        let discrete = program
            .as_ref()
            .map(|p| self.searcher.apply(input, Some(p)));

        debug!(
            found_program = program.is_some(),
            pattern = ?pattern.kind,
            "analysis complete"
        );

        Ok(Analysis {
            program,
            pattern,
            discrete,
            expert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::experts::{FirstExpertGate, FixedExpert, FnExpert, GateKind};
    use crate::core::grid::{grid, Cell};
    use crate::core::integrator::{OnMissingDiscrete, SolutionSource};
    use crate::core::operation::Operation;
    use crate::core::task::{TestCase, TrainingPair};
    use crate::error::SolverError;

    fn task(pairs: &[(&[&[Cell]], &[&[Cell]])], test: &[&[Cell]]) -> Task {
        Task::new(
            pairs
                .iter()
                .map(|(i, o)| TrainingPair::new(grid(i), grid(o)))
                .collect(),
            vec![TestCase::new(grid(test))],
        )
    }

    #[test]
    fn test_mult_then_add_task_is_labelled_unknown_and_uses_expert() {
        // The composite program is found, but the recognizer compares every
        // output cell to input[0] * 2 == 2, so the label is Unknown and the
        // expert (doubling) candidate wins.
        let t = task(
            &[(&[&[1, 2], &[3, 4]], &[&[3, 5], &[7, 9]])],
            &[&[1, 2], &[3, 4]],
        );
        let solver = Solver::default();
        let analysis = solver.analyze(&t).unwrap();

        assert_eq!(
            analysis.program,
            Program::from_operations(vec![
                Operation::Multiplication { value: 2 },
                Operation::Addition { value: 1 },
            ])
        );
        assert_eq!(analysis.discrete, Some(grid(&[&[3, 5], &[7, 9]])));
        assert!(analysis.pattern.is_unknown());
        assert_eq!(solver.solve(&t).unwrap(), grid(&[&[2, 4], &[6, 8]]));
    }

    #[test]
    fn test_recognized_pattern_selects_discrete() {
        // Uniform input: x2 is both the program and the recognized pattern.
        let t = task(&[(&[&[2, 2]], &[&[4, 4]])], &[&[1, 3]]);
        let solver = Solver::new(
            MixtureOfExperts::with_fixed(&[FixedExpert::Incrementing], GateKind::First).unwrap(),
            HybridIntegrator::default(),
        );
        let analysis = solver.analyze(&t).unwrap();
        // 2 + 1 != 4, so addition does not fit; multiplication does.
        assert_eq!(
            analysis.program,
            Some(Operation::Multiplication { value: 2 }.into())
        );
        let resolution = solver.resolve(&analysis).unwrap();
        assert_eq!(resolution.source, SolutionSource::Discrete);
        assert_eq!(resolution.grid, grid(&[&[2, 6]]));
    }

    #[test]
    fn test_missing_program_with_recognized_pattern_falls_back() {
        // Output is uniformly input[0] * 2, but no catalog entry maps the pair.
        let t = task(&[(&[&[1, 5]], &[&[2, 2]])], &[&[3, 4]]);
        let solver = Solver::default();
        let analysis = solver.analyze(&t).unwrap();
        assert!(analysis.program.is_none());
        assert!(!analysis.pattern.is_unknown());

        let resolution = solver.resolve(&analysis).unwrap();
        assert_eq!(resolution.source, SolutionSource::ExpertFallback);
        assert_eq!(resolution.grid, grid(&[&[6, 8]]));
    }

    #[test]
    fn test_missing_program_with_fail_policy() {
        let t = task(&[(&[&[1, 5]], &[&[2, 2]])], &[&[3, 4]]);
        let solver = Solver::new(
            MixtureOfExperts::default(),
            HybridIntegrator::new(OnMissingDiscrete::Fail),
        );
        assert!(matches!(
            solver.solve(&t),
            Err(SolverError::NoSolutionFound)
        ));
    }

    #[test]
    fn test_invalid_task_rejected_before_analysis() {
        let t = Task::new(vec![], vec![TestCase::new(grid(&[&[1]]))]);
        assert!(matches!(
            Solver::default().solve(&t),
            Err(SolverError::InvalidTask { .. })
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let t = task(
            &[
                (&[&[1, 2, 3]], &[&[3, 2, 1]]),
                (&[&[4, 5, 6]], &[&[6, 5, 4]]),
            ],
            &[&[7, 8, 9]],
        );
        let sequential = Solver::default().analyze(&t).unwrap();
        let parallel = Solver::default().with_parallel(true).analyze(&t).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.discrete, Some(grid(&[&[9, 8, 7]])));
    }

    #[test]
    fn test_custom_expert_is_used() {
        let t = task(&[(&[&[1, 2]], &[&[5, 6]])], &[&[1, 2]]);
        let solver = Solver::new(
            MixtureOfExperts::new(
                vec![Box::new(FnExpert::new("sevens", |g: &Grid| g.map_cells(|_| 7)))],
                Box::new(FirstExpertGate),
            )
            .unwrap(),
            HybridIntegrator::default(),
        );
        assert_eq!(solver.solve(&t).unwrap(), grid(&[&[7, 7]]));
    }

    #[test]
    fn test_extreme_expert_config_solves_without_panicking() {
        let mut config = Config::default();
        config.experts.panel = vec!["translate:9223372036854775807:0".to_string()];
        let solver = Solver::from_config(&config).unwrap();

        let t = task(&[(&[&[1, 2]], &[&[5, 6]])], &[&[1, 2]]);
        assert_eq!(solver.solve(&t).unwrap(), grid(&[&[0, 0]]));
    }

    #[test]
    fn test_oversized_scale_rejected_by_config() {
        let mut config = Config::default();
        config.experts.panel = vec![format!("scale:{}", usize::MAX / 2)];
        assert!(matches!(
            Solver::from_config(&config),
            Err(SolverError::Config { .. })
        ));
    }

    #[test]
    fn test_from_default_config() {
        let solver = Solver::from_config(&Config::default()).unwrap();
        assert_eq!(solver.experts().expert_names(), vec!["doubling", "incrementing"]);
        assert_eq!(
            solver.integrator().on_missing_discrete(),
            OnMissingDiscrete::UseExpert
        );
    }
}
