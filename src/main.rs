//! ARC solver CLI entry point with global panic handler.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arc_solver::cli::explain::{ExplainCommand, ExplainOptions};
use arc_solver::cli::init::{InitCommand, InitOptions};
use arc_solver::cli::solve::{SolveCommand, SolveOptions};
use arc_solver::config::{crash_log_path, find_project_root, Config};
use arc_solver::core::{OnMissingDiscrete, Solver};
use arc_solver::error::exit_codes;

// =============================================================================
// CLI Definition
// =============================================================================

/// Hybrid program-search and mixture-of-experts solver for ARC grid puzzles
#[derive(Parser)]
#[command(name = "arc-solver")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a task file, or every *.json task in a directory
    Solve {
        /// Task file or directory
        path: PathBuf,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        #[command(flatten)]
        solver: SolverArgs,
    },

    /// Show every intermediate result of the pipeline for one task
    Explain {
        /// Task file
        path: PathBuf,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        #[command(flatten)]
        solver: SolverArgs,
    },

    /// Initialize the project configuration
    Init {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Force overwrite existing files
        #[arg(long, short)]
        force: bool,
        /// Write the effective configuration instead of the template
        #[arg(long)]
        current: bool,
    },
}

/// Overrides applied on top of the loaded configuration.
#[derive(Args)]
struct SolverArgs {
    /// Policy when the pattern is recognized but no program fits
    #[arg(long, value_enum)]
    on_missing_discrete: Option<MissingDiscreteArg>,
    /// Run the analyses on separate threads
    #[arg(long)]
    parallel: bool,
    /// Comma-separated expert panel (e.g. "doubling,rotate90")
    #[arg(long, value_delimiter = ',')]
    experts: Option<Vec<String>>,
    /// Gate routing expert outputs: first or majority
    #[arg(long)]
    gate: Option<String>,
}

#[derive(Clone, ValueEnum)]
enum MissingDiscreteArg {
    UseExpert,
    Fail,
}

impl From<MissingDiscreteArg> for OnMissingDiscrete {
    fn from(arg: MissingDiscreteArg) -> Self {
        match arg {
            MissingDiscreteArg::UseExpert => OnMissingDiscrete::UseExpert,
            MissingDiscreteArg::Fail => OnMissingDiscrete::Fail,
        }
    }
}

impl SolverArgs {
    fn apply(self, config: &mut Config) {
        if let Some(policy) = self.on_missing_discrete {
            config.integrator.on_missing_discrete = policy.into();
        }
        if self.parallel {
            config.solver.parallel = true;
        }
        if let Some(experts) = self.experts {
            config.experts.panel = experts;
        }
        if let Some(gate) = self.gate {
            config.experts.gate = gate;
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("arc-solver error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Set up the global panic handler.
///
/// On panic, appends to `<home>/crash.log` and exits with the crash code.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("arc-solver panic: {}", info);

        if let Some(crash_log) = crash_log_path() {
            if let Some(parent) = crash_log.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Solve {
            path,
            json,
            quiet,
            solver,
        } => run_solve(&path, json, quiet, solver),
        Commands::Explain { path, json, solver } => run_explain(&path, json, solver),
        Commands::Init {
            json,
            quiet,
            force,
            current,
        } => run_init(json, quiet, force, current, &cwd),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn build_solver(args: SolverArgs) -> Result<Solver, Box<dyn std::error::Error>> {
    let mut config = Config::load();
    args.apply(&mut config);
    Ok(Solver::from_config(&config)?)
}

fn run_solve(
    path: &Path,
    json: bool,
    quiet: bool,
    args: SolverArgs,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = SolveCommand::new(build_solver(args)?);
    let options = SolveOptions { json, quiet };

    let output = cmd.run(path);
    let formatted = cmd.format_output(&output, &options);
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
    Ok(ExitCode::from(output.exit_code() as u8))
}

fn run_explain(
    path: &Path,
    json: bool,
    args: SolverArgs,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = ExplainCommand::new(build_solver(args)?);
    let options = ExplainOptions { json };

    let output = cmd.run(path);
    println!("{}", cmd.format_output(&output, &options));

    let code = if !output.success {
        exit_codes::ERROR
    } else if output.prediction.is_none() {
        exit_codes::UNSOLVED
    } else {
        exit_codes::SOLVED
    };
    Ok(ExitCode::from(code as u8))
}

fn run_init(
    json: bool,
    quiet: bool,
    force: bool,
    current: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let root = find_project_root(cwd);
    let config = Config::load_from_cwd(cwd);
    let cmd = InitCommand::new(root.to_string_lossy()).with_config(config);
    let options = InitOptions {
        json,
        quiet,
        force,
        current,
    };

    let output = cmd.run(&options);
    let formatted = cmd.format_output(&output, &options);
    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    let code = if output.success {
        exit_codes::SOLVED
    } else {
        exit_codes::ERROR
    };
    Ok(ExitCode::from(code as u8))
}
