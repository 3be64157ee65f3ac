//! StemChat CLI: the operator entry point.
//!
//! Commands:
//! - `init`       Write a default config file and fact sheet
//! - `chat`       Interactive or single-message chat with the assistant
//! - `serve`      Start the HTTP gateway for the website
//! - `knowledge`  Aggregate and inspect the knowledge snapshot
//! - `status`     Show configuration status

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "stemchat",
    about = "StemChat: the STEMpower website assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.stemchat/config.toml
    #[arg(short, long, global = true, env = "STEMCHAT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and fact sheet
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Ask for replies in this language
        #[arg(short, long)]
        language: Option<String>,

        /// Never call the LLM, answer from the fallback rules only
        #[arg(long)]
        offline: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Aggregate the knowledge snapshot and report what was loaded
    Knowledge {
        /// Print the whole snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Chat {
            message,
            language,
            offline,
        } => commands::chat::run(config_path, message, language, offline).await?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Knowledge { json } => commands::knowledge::run(config_path, json).await?,
        Commands::Status => commands::status::run(config_path).await?,
    }

    Ok(())
}
