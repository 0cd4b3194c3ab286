//! CLI surface: argument definitions and dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands;
use crate::db::Database;

#[derive(Parser)]
#[command(name = "worklens")]
#[command(about = "Deal intelligence document analyzer")]
#[command(version)]
pub struct Cli {
    /// Data directory for the settings store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a file and print the critique
    Analyze {
        path: PathBuf,
        /// Emit the structured JSON report instead of Markdown
        #[arg(long)]
        structured: bool,
        /// Send extracted text instead of the raw file payload
        #[arg(long)]
        text_only: bool,
    },

    /// Ask a question about a file's content
    Ask {
        path: PathBuf,
        question: String,
        /// Wait for the full answer instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },

    /// Manage persisted settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List the model variants and what routes to them
    Models,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print one setting
    Get { key: String },
    /// Set a setting
    Set { key: String, value: String },
    /// Remove a setting
    Unset { key: String },
    /// Print all recognized settings
    List,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let db = Database::new(&data_dir)?;

    match cli.command {
        Commands::Analyze {
            path,
            structured,
            text_only,
        } => commands::analyze::run(&db, &path, structured, text_only).await,
        Commands::Ask {
            path,
            question,
            no_stream,
        } => commands::ask::run(&db, &path, &question, no_stream).await,
        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => commands::settings::get(&db, &key),
            ConfigCommands::Set { key, value } => commands::settings::set(&db, &key, &value),
            ConfigCommands::Unset { key } => commands::settings::unset(&db, &key),
            ConfigCommands::List => commands::settings::list(&db),
        },
        Commands::Models => {
            commands::settings::print_models();
            Ok(())
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("worklens")
}
