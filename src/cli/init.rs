//! Init command.
//!
//! Scaffolds the project configuration directory and a commented
//! `config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::{Config, CONFIG_DIR_NAME};

/// Options for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Force overwrite existing files.
    pub force: bool,
    /// Write the effective configuration instead of the commented template.
    pub current: bool,
}

/// Output format for the init command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOutput {
    /// Whether initialization was successful.
    pub success: bool,
    /// Files and directories created.
    pub created: Vec<String>,
    /// Files that already existed (skipped).
    pub skipped: Vec<String>,
    /// Values that differ from the defaults, when writing the effective config.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<ConfigChange>,
    /// Error message if initialization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One non-default configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChange {
    pub key: String,
    pub default: String,
    pub value: String,
}

impl InitOutput {
    /// Create a successful output.
    pub fn success(created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: true,
            created,
            skipped,
            changes: Vec::new(),
            error: None,
        }
    }

    /// Create a failed output with partial success information.
    ///
    /// Reports what was created before the failure occurred.
    pub fn failure(error: impl Into<String>, created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: false,
            created,
            skipped,
            changes: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Default config.toml content.
const DEFAULT_CONFIG: &str = r#"# ARC solver configuration
#
# Precedence: environment variables > this file > ~/.arc-solver/config.toml > defaults.

# What to do when the pattern is recognized but no program fits.
# Options: "use-expert" (default), "fail"
[integrator]
on_missing_discrete = "use-expert"

# Ordered expert panel. Options: doubling, incrementing, rotate90, rotate180,
# rotate270, reflect-horizontal, reflect-vertical, scale:N, translate:DX:DY
# gate: "first" (default) or "majority"
[experts]
panel = ["doubling", "incrementing"]
gate = "first"

# Run program search, experts and pattern recognition on separate threads.
[solver]
parallel = false
"#;

/// The init command implementation.
pub struct InitCommand {
    cwd: String,
    config: Config,
}

impl InitCommand {
    /// Create a new init command.
    pub fn new(cwd: impl Into<String>) -> Self {
        Self {
            cwd: cwd.into(),
            config: Config::default(),
        }
    }

    /// Use `config` as the effective configuration for `--current`.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Run the init command.
    pub fn run(&self, options: &InitOptions) -> InitOutput {
        let cwd = Path::new(&self.cwd);
        let mut created = Vec::new();
        let mut skipped = Vec::new();

        let config_dir = cwd.join(CONFIG_DIR_NAME);
        match self.ensure_dir(&config_dir) {
            Ok(true) => created.push(config_dir.display().to_string()),
            Ok(false) => skipped.push(config_dir.display().to_string()),
            Err(e) => return InitOutput::failure(e, created, skipped),
        }

        let config_path = config_dir.join("config.toml");
        if config_path.exists() && !options.force {
            skipped.push(config_path.display().to_string());
            return InitOutput::success(created, skipped);
        }

        if options.current {
            if let Err(e) = self.config.save_project(cwd) {
                return InitOutput::failure(e.to_string(), created, skipped);
            }
            created.push(config_path.display().to_string());
            let mut output = InitOutput::success(created, skipped);
            output.changes = Config::default()
                .diff(&self.config)
                .into_iter()
                .map(|(key, default, value)| ConfigChange {
                    key,
                    default,
                    value,
                })
                .collect();
            return output;
        }

        if let Err(e) = fs::write(&config_path, DEFAULT_CONFIG) {
            return InitOutput::failure(
                format!("Failed to write file {}: {}", config_path.display(), e),
                created,
                skipped,
            );
        }
        created.push(config_path.display().to_string());

        InitOutput::success(created, skipped)
    }

    /// Ensure a directory exists.
    /// Returns Ok(true) if created, Ok(false) if already exists.
    fn ensure_dir(&self, path: &Path) -> Result<bool, String> {
        if path.exists() {
            if path.is_dir() {
                return Ok(false);
            }
            return Err(format!("{} exists but is not a directory", path.display()));
        }

        fs::create_dir_all(path)
            .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))?;

        Ok(true)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InitOutput, options: &InitOptions) -> String {
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
    fn format_human_readable(&self, output: &InitOutput) -> String {
        let mut lines = Vec::new();

        if !output.success {
            lines.push(format!(
                "Initialization failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            ));
        } else if output.created.is_empty() {
            lines.push("Already initialized.".to_string());
        } else {
            lines.push("Initialized ARC solver configuration.".to_string());
        }

        for path in &output.created {
            lines.push(format!("  created  {}", path));
        }
        for path in &output.skipped {
            lines.push(format!("  exists   {}", path));
        }
        for change in &output.changes {
            lines.push(format!(
                "  {} = {} (default {})",
                change.key, change.value, change.default
            ));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OnMissingDiscrete;
    use tempfile::TempDir;

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_init_creates_config() {
        let temp = TempDir::new().unwrap();
        let cmd = InitCommand::new(temp.path().to_string_lossy());

        let output = cmd.run(&InitOptions::default());
        assert!(output.success);
        assert_eq!(output.created.len(), 2);

        let path = temp.path().join(CONFIG_DIR_NAME).join("config.toml");
        assert_eq!(fs::read_to_string(path).unwrap(), DEFAULT_CONFIG);
    }

    #[test]
    fn test_init_skips_existing_without_force() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR_NAME);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "# mine\n").unwrap();

        let cmd = InitCommand::new(temp.path().to_string_lossy());
        let output = cmd.run(&InitOptions::default());
        assert!(output.success);
        assert!(output.created.is_empty());
        assert_eq!(output.skipped.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.join("config.toml")).unwrap(),
            "# mine\n"
        );
    }

    #[test]
    fn test_init_force_overwrites() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR_NAME);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "# mine\n").unwrap();

        let cmd = InitCommand::new(temp.path().to_string_lossy());
        let options = InitOptions {
            force: true,
            ..Default::default()
        };
        let output = cmd.run(&options);
        assert!(output.success);
        assert_eq!(
            fs::read_to_string(dir.join("config.toml")).unwrap(),
            DEFAULT_CONFIG
        );
    }

    #[test]
    fn test_init_current_writes_effective_config() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.integrator.on_missing_discrete = OnMissingDiscrete::Fail;
        config.solver.parallel = true;

        let cmd = InitCommand::new(temp.path().to_string_lossy()).with_config(config.clone());
        let options = InitOptions {
            current: true,
            ..Default::default()
        };
        let output = cmd.run(&options);
        assert!(output.success);
        assert_eq!(output.changes.len(), 2);
        assert_eq!(output.changes[0].key, "integrator.on_missing_discrete");
        assert_eq!(output.changes[0].value, "fail");

        let written = Config::load_from_file(
            &temp.path().join(CONFIG_DIR_NAME).join("config.toml"),
        )
        .unwrap();
        assert_eq!(written, config);
    }

    #[test]
    fn test_init_fails_when_dir_is_a_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_DIR_NAME), "").unwrap();

        let cmd = InitCommand::new(temp.path().to_string_lossy());
        let output = cmd.run(&InitOptions::default());
        assert!(!output.success);
        assert!(output.error.unwrap().contains("not a directory"));
    }

    #[test]
    fn test_format_output() {
        let temp = TempDir::new().unwrap();
        let cmd = InitCommand::new(temp.path().to_string_lossy());
        let output = cmd.run(&InitOptions::default());

        let human = cmd.format_output(&output, &InitOptions::default());
        assert!(human.contains("Initialized"));
        assert!(human.contains("created"));

        let json = cmd.format_output(
            &output,
            &InitOptions {
                json: true,
                ..Default::default()
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["success"], true);

        let quiet = cmd.format_output(
            &output,
            &InitOptions {
                quiet: true,
                ..Default::default()
            },
        );
        assert!(quiet.is_empty());
    }
}
