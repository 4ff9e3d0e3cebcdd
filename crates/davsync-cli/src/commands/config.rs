//! Config command - View and manage DavSync configuration
//!
//! Provides the `davsync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use davsync_core::config::Config;
use tracing::info;

use super::AppContext;

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("sync.max_retries", "Retries for network failures"),
    ("sync.retry_base_delay_ms", "Base backoff delay (ms)"),
    ("sync.calendar_available", "true|false"),
    ("sync.autosync_check_secs", "Seconds between autosync checks"),
    ("folders.cached_retention_days", "Days, or 'none' to keep forever"),
    ("folders.default_calendar_color", "#rrggbb"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.json", "true|false"),
    ("storage.database", "State database path"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.max_retries")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, app: &AppContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(app),
            ConfigCommand::Set { key, value } => self.execute_set(app, key, value),
            ConfigCommand::Validate => self.execute_validate(app),
        }
    }

    fn execute_show(&self, app: &AppContext) -> Result<()> {
        let formatter = app.formatter();
        info!(config_path = %app.config_path.display(), "Showing configuration");

        if app.is_json() {
            let json = serde_json::to_value(&app.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", app.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&app.config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_set(&self, app: &AppContext, key: &str, value: &str) -> Result<()> {
        let formatter = app.formatter();
        let mut config = app.config.clone();

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if app.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {:#}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {:<32} - {}", name, help));
                }
            }
            return Ok(());
        }

        let errors: Vec<String> = config.validate().iter().map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            if app.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{}': {}", key, errors.join("; ")));
            }
            return Ok(());
        }

        save_config(&config, &app.config_path)?;

        if app.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": app.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", app.config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, app: &AppContext) -> Result<()> {
        let formatter = app.formatter();
        let config_path = &app.config_path;

        // Load explicitly so parse errors surface instead of falling back to defaults
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {}", e)
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if app.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");
        let errors = config.validate();

        if app.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }
}

/// Writes `config` as YAML, creating the parent directory if needed
fn save_config(config: &Config, path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    std::fs::write(path, yaml).context("Failed to write configuration file")?;
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .with_context(|| format!("Expected true or false, got '{}'", value))
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- sync ---
        "sync.max_retries" => {
            config.sync.max_retries = value
                .parse::<u32>()
                .context("Expected a non-negative integer")?;
        }
        "sync.retry_base_delay_ms" => {
            config.sync.retry_base_delay_ms = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "sync.calendar_available" => {
            config.sync.calendar_available = parse_bool(value)?;
        }
        "sync.autosync_check_secs" => {
            config.sync.autosync_check_secs = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }

        // --- folders ---
        "folders.cached_retention_days" => {
            config.folders.cached_retention_days = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.parse::<u32>().context("Expected a positive integer or 'none'")?)
            };
        }
        "folders.default_calendar_color" => {
            config.folders.default_calendar_color = value.to_string();
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.to_string();
        }
        "logging.json" => {
            config.logging.json = parse_bool(value)?;
        }

        // --- storage ---
        "storage.database" => {
            config.storage.database = PathBuf::from(value);
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
