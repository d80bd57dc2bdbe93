mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::Context;
use speclift_core::SpecliftError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "speclift",
    about = "Resumable stage state for legacy codebase analysis chains",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .speclift/ or .git/)
    #[arg(long, global = true, env = "SPECLIFT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Chain to operate on (default: the only chain in the state root)
    #[arg(long, global = true, env = "SPECLIFT_CHAIN")]
    chain: Option<String>,

    /// Use this directory as the State Directory directly, without
    /// per-chain namespacing
    #[arg(long, global = true, env = "SPECLIFT_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the project config and create a chain's state directory
    Init,

    /// Print a fresh chain id
    Id,

    /// Validate a document and save it as a stage (reads stdin without --file)
    Save {
        /// Stage name, e.g. 01-setup-and-scope
        stage: String,
        /// Read the document from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Print a saved stage document
    Load { stage: String },

    /// Print the most recently saved document
    Latest,

    /// Print the last completed stage, or "none"
    LastStage,

    /// Print whether a stage has been saved
    IsComplete { stage: String },

    /// Check a document for the required fields (reads stdin without --file)
    Validate {
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Layer new fields over a document (default base: the latest document)
    Merge {
        /// Base document (default: latest)
        #[arg(long)]
        old: Option<PathBuf>,
        /// Fields to layer on top
        #[arg(long)]
        new: PathBuf,
    },

    /// Append a stage to stages_complete and refresh the timestamp
    MarkComplete {
        stage: String,
        /// Base document (default: latest)
        #[arg(long)]
        from: Option<PathBuf>,
        /// Also save the result under <STAGE>
        #[arg(long)]
        save: bool,
    },

    /// Print the stage to run next when resuming
    Next,

    /// Show pipeline progress for the chain
    Status,

    /// List chains in the state root
    Chains,

    /// Inspect the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
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

    let ctx = Context {
        root: root::resolve_root(cli.root.as_deref()),
        json: cli.json,
        chain: cli.chain,
        state_dir: cli.state_dir,
    };

    let result = match cli.command {
        Commands::Init => cmd::init::run(&ctx),
        Commands::Id => cmd::document::id(&ctx),
        Commands::Save { stage, file } => cmd::state::save(&ctx, &stage, file.as_deref()),
        Commands::Load { stage } => cmd::state::load(&ctx, &stage),
        Commands::Latest => cmd::state::latest(&ctx),
        Commands::LastStage => cmd::state::last_stage(&ctx),
        Commands::IsComplete { stage } => cmd::state::is_complete(&ctx, &stage),
        Commands::Validate { file } => cmd::document::validate(&ctx, file.as_deref()),
        Commands::Merge { old, new } => cmd::document::merge(&ctx, old.as_deref(), &new),
        Commands::MarkComplete { stage, from, save } => {
            cmd::document::mark_complete(&ctx, &stage, from.as_deref(), save)
        }
        Commands::Next => cmd::resume::next(&ctx),
        Commands::Status => cmd::resume::status(&ctx),
        Commands::Chains => cmd::resume::chains(&ctx),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

/// Distinct exit codes so an orchestrator can tell "nothing saved yet"
/// from "corrupt input" without parsing stderr.
fn exit_code(err: &anyhow::Error) -> i32 {
    let core = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SpecliftError>());
    match core {
        Some(SpecliftError::NotFound(_)) => 3,
        Some(SpecliftError::Malformed(_)) => 4,
        Some(
            SpecliftError::InvalidState(_)
            | SpecliftError::InvalidStageName(_)
            | SpecliftError::ChainMismatch { .. },
        ) => 5,
        _ => 1,
    }
}
