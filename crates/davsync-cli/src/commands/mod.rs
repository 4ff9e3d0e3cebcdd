//! CLI subcommands

pub mod accounts;
pub mod completions;
pub mod config;
pub mod folders;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use davsync_cache::{DatabasePool, SqliteStateRepository};
use davsync_core::config::Config;
use davsync_core::domain::AccountId;

use crate::output::{Output, OutputFormat};

/// Settings shared by every subcommand
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl AppContext {
    pub fn new(config: Config, config_path: PathBuf, format: OutputFormat, quiet: bool) -> Self {
        Self {
            config,
            config_path,
            format,
            quiet,
        }
    }

    pub fn formatter(&self) -> Output {
        Output::new(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Opens the state database named by `storage.database`, creating it if needed
    pub async fn open_repository(&self) -> Result<Arc<SqliteStateRepository>> {
        let storage = &self.config.storage;
        let pool = DatabasePool::open(storage)
            .await
            .with_context(|| format!("Failed to open database {}", storage.database.display()))?;
        Ok(Arc::new(SqliteStateRepository::new(pool.pool().clone())))
    }
}

/// Parses an account id given on the command line
pub fn parse_account_id(value: &str) -> Result<AccountId> {
    value
        .parse::<AccountId>()
        .with_context(|| format!("'{}' is not an account id", value))
}
