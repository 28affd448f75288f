//! Arbitration between the discrete and expert candidates.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::grid::Grid;
use crate::core::pattern::Pattern;
use crate::error::{Result, SolverError};

/// What to do when the pattern says "trust the program" but no program was
/// found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OnMissingDiscrete {
    /// Return the expert candidate instead.
    #[default]
    UseExpert,
    /// Fail with `NoSolutionFound`.
    Fail,
}

impl OnMissingDiscrete {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UseExpert => "use-expert",
            Self::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "use-expert" | "use_expert" | "expert" => Some(Self::UseExpert),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

impl fmt::Display for OnMissingDiscrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which candidate the integrator returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionSource {
    /// The searched program's output.
    Discrete,
    /// The expert panel's output, because the pattern was unknown.
    Expert,
    /// The expert panel's output, because the program was missing.
    ExpertFallback,
}

impl SolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discrete => "discrete",
            Self::Expert => "expert",
            Self::ExpertFallback => "expert (fallback)",
        }
    }
}

impl fmt::Display for SolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The chosen grid and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub grid: Grid,
    pub source: SolutionSource,
}

/// Picks between the discrete and expert candidates using the pattern label.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridIntegrator {
    on_missing_discrete: OnMissingDiscrete,
}

impl HybridIntegrator {
    pub fn new(on_missing_discrete: OnMissingDiscrete) -> Self {
        Self {
            on_missing_discrete,
        }
    }

    pub fn on_missing_discrete(&self) -> OnMissingDiscrete {
        self.on_missing_discrete
    }

    /// Return the chosen grid.
    pub fn combine(
        &self,
        discrete: Option<Grid>,
        expert: Grid,
        pattern: &Pattern,
    ) -> Result<Grid> {
        self.decide(discrete, expert, pattern).map(|r| r.grid)
    }

    /// Unknown pattern → expert; otherwise → discrete, with the configured
    /// policy covering a missing discrete candidate.
    pub fn decide(
        &self,
        discrete: Option<Grid>,
        expert: Grid,
        pattern: &Pattern,
    ) -> Result<Resolution> {
        if pattern.is_unknown() {
            return Ok(Resolution {
                grid: expert,
                source: SolutionSource::Expert,
            });
        }

        match (discrete, self.on_missing_discrete) {
            (Some(grid), _) => Ok(Resolution {
                grid,
                source: SolutionSource::Discrete,
            }),
            (None, OnMissingDiscrete::UseExpert) => {
                warn!(
                    pattern = ?pattern.kind,
                    "pattern recognized but no program fits; using expert candidate"
                );
                Ok(Resolution {
                    grid: expert,
                    source: SolutionSource::ExpertFallback,
                })
            }
            (None, OnMissingDiscrete::Fail) => Err(SolverError::NoSolutionFound),
        }
    }
}
