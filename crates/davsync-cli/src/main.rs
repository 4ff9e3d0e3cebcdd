//! DavSync CLI - Command-line interface for DavSync
//!
//! Provides commands for:
//! - Adding, enabling, disabling and removing accounts
//! - Listing folders and choosing which ones to sync
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use davsync_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    accounts::AccountsCommand, completions::CompletionsCommand, config::ConfigCommand,
    folders::FoldersCommand, AppContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "davsync", version, about = "CardDAV/CalDAV folder sync")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage accounts
    #[command(subcommand)]
    Accounts(AccountsCommand),
    /// List folders and choose which ones to sync
    #[command(subcommand)]
    Folders(FoldersCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Level used when `RUST_LOG` is unset
fn log_filter(config: &Config, verbose: u8, quiet: bool) -> String {
    match (verbose, quiet) {
        (0, true) => "warn".to_string(),
        (0, false) => config.logging.level.clone(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Setup tracing
    let filter = log_filter(&config, cli.verbose, cli.quiet);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let app = AppContext::new(config, config_path, format, cli.quiet);

    match cli.command {
        Commands::Accounts(cmd) => cmd.execute(&app).await,
        Commands::Folders(cmd) => cmd.execute(&app).await,
        Commands::Config(cmd) => cmd.execute(&app).await,
        Commands::Completions(cmd) => cmd.execute(&app).await,
    }
}
