//! Configuration loading for the solver.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.arc-solver/config.toml`)
//! 3. User config (`~/.arc-solver/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The defaults give the two-expert
//! pipeline: doubling and incrementing experts, first-expert gate, and an
//! expert fallback when a recognized pattern has no program.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{FixedExpert, GateKind, OnMissingDiscrete};
use crate::error::{Result, SolverError};
use crate::util::read_to_string_limited;

/// Name of the per-project and per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".arc-solver";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Integrator arbitration policy.
    pub integrator: IntegratorConfig,
    /// Expert panel and gate.
    pub experts: ExpertsConfig,
    /// Orchestrator behavior.
    pub solver: SolverConfig,
}

/// Integrator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntegratorConfig {
    /// What to do when the pattern is recognized but no program fits.
    pub on_missing_discrete: OnMissingDiscrete,
}

/// Expert panel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExpertsConfig {
    /// Ordered panel entries (see [`FixedExpert::parse`]).
    pub panel: Vec<String>,
    /// Gate name: "first" or "majority".
    pub gate: String,
}

/// Valid values for the gate field.
pub const VALID_GATES: &[&str] = &["first", "majority"];

impl ExpertsConfig {
    /// Check if a gate value is valid.
    pub fn is_valid_gate(value: &str) -> bool {
        GateKind::parse(value).is_some()
    }

    /// Check if every panel entry names a known expert and the panel is non-empty.
    pub fn is_valid_panel(panel: &[String]) -> bool {
        !panel.is_empty() && panel.iter().all(|e| FixedExpert::parse(e).is_some())
    }

    /// Parse the panel entries.
    pub fn panel(&self) -> Result<Vec<FixedExpert>> {
        if self.panel.is_empty() {
            return Err(SolverError::config("experts.panel must not be empty"));
        }
        self.panel
            .iter()
            .map(|entry| {
                FixedExpert::parse(entry)
                    .ok_or_else(|| SolverError::config(format!("unknown expert '{}'", entry)))
            })
            .collect()
    }

    /// Parse the gate.
    pub fn gate(&self) -> Result<GateKind> {
        GateKind::parse(&self.gate).ok_or_else(|| {
            SolverError::config(format!(
                "unknown gate '{}', valid values: {:?}",
                self.gate, VALID_GATES
            ))
        })
    }
}

impl Default for ExpertsConfig {
    fn default() -> Self {
        Self {
            panel: FixedExpert::default_panel()
                .iter()
                .map(|e| e.to_string())
                .collect(),
            gate: GateKind::default().to_string(),
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    /// Run search, experts and recognizer on separate threads.
    pub parallel: bool,
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.arc-solver/config.toml` in the project root)
    /// 3. User config (`~/.arc-solver/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `<home>/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = solver_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from `.arc-solver/config.toml` under the project root.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&project_config_path(cwd))
    }

    /// Load a config file that may legitimately be absent. A file that
    /// exists but cannot be parsed is reported and skipped.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = read_to_string_limited(path)?;
        toml::from_str(&content).map_err(|e| SolverError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // ARC_SOLVER_ON_MISSING_DISCRETE
        if let Ok(val) = env::var("ARC_SOLVER_ON_MISSING_DISCRETE") {
            match OnMissingDiscrete::parse(&val) {
                Some(policy) => self.integrator.on_missing_discrete = policy,
                None => eprintln!(
                    "Warning: Invalid ARC_SOLVER_ON_MISSING_DISCRETE value '{}'. \
                    Valid values: [\"use-expert\", \"fail\"]. Using '{}'.",
                    val, self.integrator.on_missing_discrete
                ),
            }
        }

        // ARC_SOLVER_GATE
        if let Ok(val) = env::var("ARC_SOLVER_GATE") {
            if ExpertsConfig::is_valid_gate(&val) {
                self.experts.gate = val;
            } else {
                eprintln!(
                    "Warning: Invalid ARC_SOLVER_GATE value '{}'. \
                    Valid values: {:?}. Using '{}'.",
                    val, VALID_GATES, self.experts.gate
                );
            }
        }

        // ARC_SOLVER_EXPERTS
        if let Ok(val) = env::var("ARC_SOLVER_EXPERTS") {
            let panel: Vec<String> = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if ExpertsConfig::is_valid_panel(&panel) {
                self.experts.panel = panel;
            } else {
                eprintln!(
                    "Warning: Invalid ARC_SOLVER_EXPERTS value '{}'. \
                    Expected a comma-separated list of expert names. Using {:?}.",
                    val, self.experts.panel
                );
            }
        }

        // ARC_SOLVER_PARALLEL
        if let Ok(val) = env::var("ARC_SOLVER_PARALLEL") {
            self.solver.parallel = val == "true" || val == "1";
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field: every value in
    /// `other` that differs from the default replaces the value in `self`.
    ///
    /// # Limitation
    ///
    /// A higher layer cannot reset a value to its default if a lower layer
    /// changed it, because "set to default" and "not set" look the same.
    fn merge(mut self, other: Config) -> Self {
        let default_integrator = IntegratorConfig::default();
        if other.integrator.on_missing_discrete != default_integrator.on_missing_discrete {
            self.integrator.on_missing_discrete = other.integrator.on_missing_discrete;
        }

        let default_experts = ExpertsConfig::default();
        if other.experts.panel != default_experts.panel {
            self.experts.panel = other.experts.panel;
        }
        if other.experts.gate != default_experts.gate {
            self.experts.gate = other.experts.gate;
        }

        if other.solver.parallel != SolverConfig::default().parallel {
            self.solver.parallel = other.solver.parallel;
        }

        self
    }

    /// Check that every value can be turned into a working solver.
    pub fn validate(&self) -> Result<()> {
        self.experts.panel()?;
        self.experts.gate()?;
        Ok(())
    }

    /// Save configuration to the project config file.
    ///
    /// Writes to `.arc-solver/config.toml` in the given directory, creating
    /// the directory if needed. Uses write-to-temp then rename.
    pub fn save_project(&self, cwd: &Path) -> Result<()> {
        let config_dir = cwd.join(CONFIG_DIR_NAME);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).map_err(|e| SolverError::storage(&config_dir, e))?;
        }

        let config_path = config_dir.join("config.toml");

        let content =
            toml::to_string_pretty(self).map_err(|e| SolverError::config(e.to_string()))?;

        let temp_path = config_dir.join(".config.toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| SolverError::storage(&temp_path, e))?;

        let file = fs::File::open(&temp_path).map_err(|e| SolverError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| SolverError::storage(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &config_path).map_err(|e| SolverError::storage(&config_path, e))?;

        Ok(())
    }

    /// Generate a diff of changed values between two configs.
    ///
    /// Returns a list of (key, old_value, new_value) tuples for changed fields.
    pub fn diff(&self, other: &Config) -> Vec<(String, String, String)> {
        let mut changes = Vec::new();

        if self.integrator.on_missing_discrete != other.integrator.on_missing_discrete {
            changes.push((
                "integrator.on_missing_discrete".to_string(),
                self.integrator.on_missing_discrete.to_string(),
                other.integrator.on_missing_discrete.to_string(),
            ));
        }

        if self.experts.panel != other.experts.panel {
            changes.push((
                "experts.panel".to_string(),
                self.experts.panel.join(","),
                other.experts.panel.join(","),
            ));
        }

        if self.experts.gate != other.experts.gate {
            changes.push((
                "experts.gate".to_string(),
                self.experts.gate.clone(),
                other.experts.gate.clone(),
            ));
        }

        if self.solver.parallel != other.solver.parallel {
            changes.push((
                "solver.parallel".to_string(),
                self.solver.parallel.to_string(),
                other.solver.parallel.to_string(),
            ));
        }

        changes
    }
}

/// Get the solver home directory.
///
/// Checks `ARC_SOLVER_HOME` first, then falls back to `~/.arc-solver`.
/// An empty `ARC_SOLVER_HOME` is ignored.
pub fn solver_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("ARC_SOLVER_HOME") {
        if home.is_empty() {
            tracing::warn!("ARC_SOLVER_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("ARC_SOLVER_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(CONFIG_DIR_NAME));
    }

    let fallback_path = fallback_solver_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Fallback home path when HOME is unavailable.
#[cfg(unix)]
fn fallback_solver_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/arc-solver-{}", uid))
}

/// Fallback home path when HOME is unavailable.
#[cfg(not(unix))]
fn fallback_solver_home() -> PathBuf {
    std::env::temp_dir().join("arc-solver")
}

/// Find the project root for a given working directory.
///
/// 1. The nearest ancestor (or `cwd` itself) containing `.arc-solver/`.
/// 2. The git repository root, via `git rev-parse --show-toplevel`.
/// 3. `cwd`.
pub fn find_project_root(cwd: &Path) -> PathBuf {
    for ancestor in cwd.ancestors() {
        if ancestor.join(CONFIG_DIR_NAME).is_dir() {
            return ancestor.to_path_buf();
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(cwd)
        .output()
    {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
        }
    }

    cwd.to_path_buf()
}

/// Project config file for a given working directory.
pub fn project_config_path(cwd: &Path) -> PathBuf {
    find_project_root(cwd)
        .join(CONFIG_DIR_NAME)
        .join("config.toml")
}

/// Crash log location: `<home>/crash.log`.
pub fn crash_log_path() -> Option<PathBuf> {
    solver_home().map(|h| h.join("crash.log"))
}
