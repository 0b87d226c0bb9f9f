use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::context::CliContext;

#[derive(Parser)]
#[command(name = "clipref")]
#[command(about = "CLIPREF CLI - Inspect and manage pinned copy references", long_about = None)]
struct Cli {
    /// Storage directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show storage statistics
    Stats,
    /// List stored references, newest first
    List {
        /// Only show references of this session
        #[arg(long)]
        session: Option<String>,
        /// Maximum number of references to print
        #[arg(long)]
        limit: Option<usize>,
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Remove a single reference by id
    Remove {
        id: String,
    },
    /// Clear stored references
    Clear {
        /// Only clear references of this session
        #[arg(long)]
        session: Option<String>,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    clipref_application::init_tracing("warn");
    let cli = Cli::parse();
    let ctx = CliContext::resolve(cli.data_dir, cli.config)?;

    match cli.command {
        Commands::Stats => commands::stats::run(&ctx)?,
        Commands::List {
            session,
            limit,
            json,
        } => commands::list::run(&ctx, session.as_deref(), limit, json)?,
        Commands::Remove { id } => commands::remove::run(&ctx, &id)?,
        Commands::Clear { session } => commands::clear::run(&ctx, session.as_deref())?,
        Commands::Config => commands::config::run(&ctx)?,
    }

    Ok(())
}
