//! Mixture of experts.
//!
//! A panel of independent Grid→Grid experts runs over the test input and a
//! gating network reduces their outputs to one candidate. Both the experts
//! and the gate are traits, so a learned model can replace either side
//! without the rest of the pipeline noticing.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::grid::{Axis, Grid, Rotation, MAX_SCALED_SIDE};
use crate::error::{Result, SolverError};

/// A single Grid→Grid predictor.
///
/// Implementations must be pure with respect to the pipeline: same input,
/// same output, no observable side effects. A learned model may block
/// while predicting; the pipeline does not care how long it takes.
pub trait Expert: Send + Sync {
    /// Name used in logs and reports. Distinct panel entries should have
    /// distinct names.
    fn name(&self) -> Cow<'_, str>;

    /// Produce a candidate output for `input`.
    fn predict(&self, input: &Grid) -> Result<Grid>;
}

/// Blanket implementation for boxed trait objects.
impl Expert for Box<dyn Expert> {
    fn name(&self) -> Cow<'_, str> {
        (**self).name()
    }

    fn predict(&self, input: &Grid) -> Result<Grid> {
        (**self).predict(input)
    }
}

/// Built-in deterministic experts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedExpert {
    /// Every cell times two.
    Doubling,
    /// Every cell plus one.
    Incrementing,
    /// Clockwise rotation.
    Rotate(Rotation),
    /// Mirror along an axis.
    Reflect(Axis),
    /// Every cell becomes a `factor` x `factor` block.
    Scale(usize),
    /// Shift content with zero fill.
    Translate { dx: isize, dy: isize },
}

impl FixedExpert {
    /// The default panel, in order.
    pub fn default_panel() -> Vec<FixedExpert> {
        vec![Self::Doubling, Self::Incrementing]
    }

    /// Parse a panel entry such as `doubling`, `rotate90`, `scale:3` or
    /// `translate:1:-1`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        let mut parts = s.split(':');
        let head = parts.next()?;
        let args: Vec<&str> = parts.collect();

        let expert = match (head, args.as_slice()) {
            ("doubling", []) => Self::Doubling,
            ("incrementing", []) => Self::Incrementing,
            ("rotate90", []) => Self::Rotate(Rotation::Quarter),
            ("rotate180", []) => Self::Rotate(Rotation::Half),
            ("rotate270", []) => Self::Rotate(Rotation::ThreeQuarter),
            ("reflect-horizontal", []) => Self::Reflect(Axis::Horizontal),
            ("reflect-vertical", []) => Self::Reflect(Axis::Vertical),
            ("scale", [factor]) => {
                let factor: usize = factor.parse().ok()?;
                if factor == 0 || factor > MAX_SCALED_SIDE {
                    return None;
                }
                Self::Scale(factor)
            }
            ("translate", [dx, dy]) => Self::Translate {
                dx: dx.parse().ok()?,
                dy: dy.parse().ok()?,
            },
            _ => return None,
        };
        Some(expert)
    }
}

impl fmt::Display for FixedExpert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doubling => write!(f, "doubling"),
            Self::Incrementing => write!(f, "incrementing"),
            Self::Rotate(Rotation::Quarter) => write!(f, "rotate90"),
            Self::Rotate(Rotation::Half) => write!(f, "rotate180"),
            Self::Rotate(Rotation::ThreeQuarter) => write!(f, "rotate270"),
            Self::Reflect(Axis::Horizontal) => write!(f, "reflect-horizontal"),
            Self::Reflect(Axis::Vertical) => write!(f, "reflect-vertical"),
            Self::Scale(factor) => write!(f, "scale:{}", factor),
            Self::Translate { dx, dy } => write!(f, "translate:{}:{}", dx, dy),
        }
    }
}

impl Expert for FixedExpert {
    /// Same as the panel entry, so `rotate90` and `rotate180` stay apart.
    fn name(&self) -> Cow<'_, str> {
        match self {
            Self::Doubling => Cow::Borrowed("doubling"),
            Self::Incrementing => Cow::Borrowed("incrementing"),
            other => Cow::Owned(other.to_string()),
        }
    }

    fn predict(&self, input: &Grid) -> Result<Grid> {
        Ok(match *self {
            Self::Doubling => input.map_cells(|c| c.wrapping_mul(2)),
            Self::Incrementing => input.map_cells(|c| c.wrapping_add(1)),
            Self::Rotate(rotation) => input.rotate(rotation),
            Self::Reflect(axis) => input.reflect(axis),
            Self::Scale(factor) => input.scale(factor)?,
            Self::Translate { dx, dy } => input.translate(dx, dy),
        })
    }
}

/// An expert backed by a closure, for plugging in an external predictor.
pub struct FnExpert {
    name: String,
    predict: Box<dyn Fn(&Grid) -> Grid + Send + Sync>,
}

impl FnExpert {
    pub fn new(
        name: impl Into<String>,
        predict: impl Fn(&Grid) -> Grid + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predict: Box::new(predict),
        }
    }
}

impl Expert for FnExpert {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn predict(&self, input: &Grid) -> Result<Grid> {
        Ok((self.predict)(input))
    }
}

/// Reduces the panel's outputs to a single candidate.
pub trait GatingNetwork: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Pick or build one grid from the experts' outputs (in panel order).
    fn route(&self, input: &Grid, outputs: Vec<Grid>) -> Result<Grid>;
}

/// Always returns the first expert's output, ignoring the input and the
/// other experts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstExpertGate;

impl GatingNetwork for FirstExpertGate {
    fn name(&self) -> &'static str {
        "first"
    }

    fn route(&self, _input: &Grid, outputs: Vec<Grid>) -> Result<Grid> {
        outputs
            .into_iter()
            .next()
            .ok_or_else(|| SolverError::expert(self.name(), "no expert outputs to route"))
    }
}

/// Returns the most common output. Ties go to the earliest expert.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityVoteGate;

impl GatingNetwork for MajorityVoteGate {
    fn name(&self) -> &'static str {
        "majority"
    }

    fn route(&self, _input: &Grid, outputs: Vec<Grid>) -> Result<Grid> {
        let mut best: Option<(usize, usize)> = None;
        for (index, candidate) in outputs.iter().enumerate() {
            let votes = outputs.iter().filter(|o| *o == candidate).count();
            if best.is_none_or(|(_, top)| votes > top) {
                best = Some((index, votes));
            }
        }

        let (index, _) =
            best.ok_or_else(|| SolverError::expert(self.name(), "no expert outputs to route"))?;
        outputs
            .into_iter()
            .nth(index)
            .ok_or_else(|| SolverError::expert(self.name(), "vote index out of range"))
    }
}

/// Gate selection for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    #[default]
    First,
    Majority,
}

impl GateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Majority => "majority",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "first" => Some(Self::First),
            "majority" | "vote" => Some(Self::Majority),
            _ => None,
        }
    }

    /// Instantiate the gate.
    pub fn build(&self) -> Box<dyn GatingNetwork> {
        match self {
            Self::First => Box::new(FirstExpertGate),
            Self::Majority => Box::new(MajorityVoteGate),
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A panel of experts plus a gate.
pub struct MixtureOfExperts {
    experts: Vec<Box<dyn Expert>>,
    gate: Box<dyn GatingNetwork>,
}

impl MixtureOfExperts {
    /// Build a mixture. The panel must not be empty.
    pub fn new(experts: Vec<Box<dyn Expert>>, gate: Box<dyn GatingNetwork>) -> Result<Self> {
        if experts.is_empty() {
            return Err(SolverError::config("expert panel must not be empty"));
        }
        Ok(Self { experts, gate })
    }

    /// Build a mixture from built-in experts.
    pub fn with_fixed(panel: &[FixedExpert], gate: GateKind) -> Result<Self> {
        let experts = panel
            .iter()
            .map(|e| Box::new(*e) as Box<dyn Expert>)
            .collect();
        Self::new(experts, gate.build())
    }

    /// Names of the experts, in panel order.
    pub fn expert_names(&self) -> Vec<String> {
        self.experts.iter().map(|e| e.name().into_owned()).collect()
    }

    /// Name of the gate.
    pub fn gate_name(&self) -> &'static str {
        self.gate.name()
    }

    /// Run every expert over `input` and route the outputs through the gate.
    pub fn process(&self, input: &Grid) -> Result<Grid> {
        let outputs = self
            .experts
            .iter()
            .map(|expert| expert.predict(input))
            .collect::<Result<Vec<Grid>>>()?;

        debug!(
            experts = outputs.len(),
            gate = self.gate.name(),
            "routing expert outputs"
        );
        self.gate.route(input, outputs)
    }
}

impl Default for MixtureOfExperts {
    fn default() -> Self {
        Self {
            experts: FixedExpert::default_panel()
                .into_iter()
                .map(|e| Box::new(e) as Box<dyn Expert>)
                .collect(),
            gate: Box::new(FirstExpertGate),
        }
    }
}
