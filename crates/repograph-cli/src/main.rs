//! repograph: CLI entry point for repository planning graph maintenance.

mod commands_data;
mod commands_init;
mod commands_sync;

use clap::{Parser, Subcommand};
use repograph_core::RpgError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "repograph",
    about = "Maintain a repository planning graph in sync with git"
)]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize .rpg/ in a repository and install git hooks
    Init {
        /// Repository directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Build the canonical graph from the repository tree
    Encode {
        /// Repository directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Keep entity source text on the graph nodes
        #[arg(long)]
        include_source: bool,
    },

    /// Synchronize the branch-local graph with the current commit
    Sync {
        /// Repository directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Re-copy the canonical graph before evolving
        #[arg(long)]
        force: bool,
    },

    /// Show graph statistics
    Stats {
        /// Repository directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Export the graph JSON
    Export {
        /// Repository directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("repograph=info".parse().expect("static directive")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = || std::env::current_dir().expect("current directory is accessible");
    match cli.command {
        Commands::Init { path } => commands_init::cmd_init(&path.unwrap_or_else(cwd)),
        Commands::Encode {
            path,
            include_source,
        } => commands_data::cmd_encode(&path.unwrap_or_else(cwd), include_source),
        Commands::Sync { path, force } => commands_sync::cmd_sync(&path.unwrap_or_else(cwd), force),
        Commands::Stats { path } => commands_data::cmd_stats(&path.unwrap_or_else(cwd)),
        Commands::Export { path, output } => {
            commands_data::cmd_export(&path.unwrap_or_else(cwd), output.as_deref())
        }
    }
}

/// Exit codes: 0 success, 1 missing graph or configuration problems,
/// 2 VCS failure.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<RpgError>() {
        Some(RpgError::Vcs(_)) => 2,
        _ => 1,
    }
}
