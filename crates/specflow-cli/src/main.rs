mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::task::TaskSubcommand;
use specflow_core::types::Phase;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "specflow",
    about = "Spec-driven workflow: requirements, design, tasks, execution",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .specflow/ or .git/)
    #[arg(long, global = true, env = "SPECFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .specflow/ with default config and state
    Init,

    /// Start a workflow for a feature
    Start { feature: String },

    /// Show the active feature, phase and task summary
    Status,

    /// Validate the current (or given) phase
    Validate {
        /// Phase to validate instead of the current one
        #[arg(long)]
        phase: Option<Phase>,

        /// Apply available one-step fixes for failed rules
        #[arg(long)]
        fix: bool,
    },

    /// Move to the next phase
    Advance {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Inspect and update tasks
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Start { feature } => cmd::start::run(&root, &feature, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Validate { phase, fix } => cmd::validate::run(&root, phase, fix, cli.json),
        Commands::Advance { yes } => cmd::advance::run(&root, yes, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
