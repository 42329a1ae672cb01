//! Sanskara CLI, the operator entry point.
//!
//! Commands:
//! - `assemble`: Build one turn's orchestrator context from a state snapshot
//! - `remember`: Store a memory for a conversation
//! - `recall`: Run semantic recall against stored memories
//! - `config`: Show or initialize configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use sanskara_config::{AppConfig, LoggingConfig};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "sanskara",
    about = "Sanskara context assembly and semantic recall for the wedding planner",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.sanskara/config.toml)
    #[arg(short, long, global = true, env = "SANSKARA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the orchestrator context for one turn
    Assemble {
        /// JSON state snapshot
        #[arg(short, long)]
        snapshot: PathBuf,

        /// The user's message this turn
        #[arg(short, long, default_value = "")]
        message: String,

        #[arg(long, default_value = "wedding-local")]
        wedding: String,

        #[arg(long, default_value = "user-local")]
        user: String,

        /// Files uploaded with this turn
        #[arg(long)]
        attach: Vec<PathBuf>,
    },

    /// Store a memory
    Remember {
        /// Owning conversation (wedding id)
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        text: String,

        /// Mark as an end-of-session summary
        #[arg(long)]
        summary: bool,

        #[arg(long, default_value = "user")]
        author: String,
    },

    /// Recall facts relevant to a query
    Recall {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        query: String,

        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show the effective configuration
    Config {
        /// Write a default config file instead
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    if let Commands::Config { init: true } = cli.command {
        init_tracing(cli.verbose, &LoggingConfig::default());
        return commands::config_cmd::init(&config_path);
    }

    let config = AppConfig::load_with_env(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    init_tracing(cli.verbose, &config.logging);

    match cli.command {
        Commands::Assemble {
            snapshot,
            message,
            wedding,
            user,
            attach,
        } => commands::assemble::run(&config, &snapshot, &message, &wedding, &user, &attach).await?,
        Commands::Remember {
            owner,
            text,
            summary,
            author,
        } => commands::memory::remember(&config, &owner, &text, summary, &author).await?,
        Commands::Recall {
            owner,
            query,
            top_k,
        } => commands::memory::recall(&config, &owner, &query, top_k).await?,
        Commands::Config { .. } => commands::config_cmd::show(&config, &config_path)?,
    }

    Ok(())
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing(verbose: bool, logging: &LoggingConfig) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
