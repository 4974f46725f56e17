//! The command line interface for the planner.
use crate::formulation::Formulation;
use crate::input::load_model;
use crate::log;
use crate::output::metadata::write_metadata;
use crate::output::{ResultToggles, create_output_directory, get_output_dir, write_results};
use crate::settings::Settings;
use crate::simulation::{Diagnostics, StageController};
use crate::solver::HighsSolver;
use crate::toggle::parse_toggle;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the planner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the `run` command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write the detailed set of results (Yes/No)
    #[arg(long, value_name = "TOKEN", value_parser = parse_toggle)]
    pub output_results: Option<bool>,
    /// Whether to report every stage and export its LP file (Yes/No)
    #[arg(long, value_name = "TOKEN", value_parser = parse_toggle)]
    pub log_console: Option<bool>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a case.
    Run {
        /// Path to the case directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example cases.
    Example {
        /// The available subcommands for managing example cases.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a case.
    Validate {
        /// The path to the case directory.
        model_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start tepes
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ tepes --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    if let Some(command) = cli.command {
        command.execute()?;
    } else {
        // No command provided. Show help.
        Cli::command().print_long_help()?;
    }

    Ok(())
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // These settings can be overridden by command-line arguments
    if let Some(opt) = opts.output_results {
        settings.output_results = opt;
    }
    if let Some(opt) = opts.log_console {
        settings.log_console = opt;
    }
    if opts.overwrite {
        settings.overwrite = true;
    }

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path, settings.results_root)?;
        &pathbuf
    };

    let overwrite =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(&settings.log_level, Some(output_path)).context("Failed to initialise logging.")?;

    info!("Starting tepes v{}", env!("CARGO_PKG_VERSION"));

    // Load the case to run
    let (model, weights) = load_model(model_path).context("Failed to load model.")?;
    info!("Loaded case {} from {}", model.case_name(), model_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    // Formulate and solve stage by stage
    let diagnostics = Diagnostics {
        log_console: settings.log_console,
        lp_dir: Some(output_path.to_path_buf()),
    };
    let staged = StageController::new(
        &model,
        weights,
        Formulation::default(),
        HighsSolver::default(),
    )
    .with_diagnostics(diagnostics)
    .run()?;
    info!("All stages solved");

    let toggles = ResultToggles::from_output_results(settings.output_results);
    write_results(&staged, output_path, &toggles).context("Failed to write results.")?;
    write_metadata(output_path, &model, settings.output_results)
        .context("Failed to save metadata.")?;
    info!("Run complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    // Load/validate the case
    load_model(model_path).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}
