//! Wharf - declarative task workflows for developer and CI machines.
//!
//! Main entry point for the wharf CLI.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wharf_config::{Config, ConfigError, ConfigLoader, TemplateVars};
use wharf_engine::{ComposeEnv, EngineError, WorkflowRunner, CONFIG_EXIT_CODE};

/// Wharf CLI.
#[derive(Parser)]
#[command(name = "wharf")]
#[command(about = "Runs declarative task workflows locally and in compose services")]
#[command(version)]
struct Cli {
    /// Directory to start definition discovery from
    #[arg(short = 'C', long, global = true)]
    directory: Option<PathBuf>,

    /// Echo session commands before they run
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow
    Run {
        /// Workflow identifier from the definition file
        workflow: String,
    },

    /// List workflows in the nearest definition file
    List,

    /// Validate workflow and task references
    Check,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => CONFIG_EXIT_CODE,
            CliError::Engine(err) => err.exit_code(),
        }
    }
}

/// Diagnostics and progress banners go to stderr; stdout carries nothing
/// but subprocess output and `list` results.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            err.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    let start = match cli.directory {
        Some(dir) => dir,
        None => std::env::current_dir().map_err(ConfigError::from)?,
    };
    let definition = ConfigLoader::discover(&start)?;
    let root = definition
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let vars = TemplateVars::capture();
    let config = ConfigLoader::load(&definition, &vars)?;

    match cli.command {
        Commands::Run { workflow } => {
            let runner = WorkflowRunner::new(config.workflows, config.tasks, ComposeEnv::new(root))
                .with_verbose(cli.verbose);
            Ok(runner.execute(&workflow).await?)
        }
        Commands::List => {
            list_workflows(&config);
            Ok(0)
        }
        Commands::Check => Ok(check_references(&config)),
    }
}

fn list_workflows(config: &Config) {
    for (id, task_ids) in &config.workflows {
        println!("{}: {}", id, task_ids.join(" "));
    }
}

fn check_references(config: &Config) -> i32 {
    let mut ok = true;
    for (workflow_id, task_ids) in &config.workflows {
        for task_id in task_ids {
            if !config.tasks.contains_key(task_id) {
                error!(
                    "Workflow '{}' references unknown task '{}'",
                    workflow_id, task_id
                );
                ok = false;
            }
        }
    }
    if ok {
        info!(
            "Definition OK: {} workflows, {} tasks",
            config.workflows.len(),
            config.tasks.len()
        );
        0
    } else {
        CONFIG_EXIT_CODE
    }
}
