//! Configuration module for DavSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::reconcile::{FolderKinds, RetentionPolicy};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DavSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub folders: FoldersConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

/// Sync run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Attempts after the first one for transient (network) failures.
    pub max_retries: u32,
    /// Base delay of the exponential backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Whether a calendar subsystem is present; if not, calendars are unsupported.
    pub calendar_available: bool,
    /// How often the autosync scheduler looks for due accounts, in seconds.
    pub autosync_check_secs: u64,
}

/// Folder registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldersConfig {
    /// Days a folder gone from the server is kept cached. `None` keeps it forever.
    pub cached_retention_days: Option<u32>,
    /// Color of newly created local calendars, `#rrggbb`.
    pub default_calendar_color: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite state database.
    pub database: PathBuf,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/davsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("davsync")
            .join("config.yaml")
    }

    /// Retention policy for cached folders.
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            cached_retention_days: self.folders.cached_retention_days,
        }
    }

    /// Local folder kinds that can be synced.
    pub fn folder_kinds(&self) -> FolderKinds {
        FolderKinds {
            calendar_available: self.sync.calendar_available,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 1000,
            calendar_available: true,
            autosync_check_secs: 60,
        }
    }
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            cached_retention_days: None,
            default_calendar_color: "#3a87ad".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("davsync")
                .join("state.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `sync.max_retries`.
const MAX_RETRIES_LIMIT: u32 = 10;

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl Config {
    /// Checks every field and returns all problems found.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.max_retries > MAX_RETRIES_LIMIT {
            errors.push(ValidationError {
                field: "sync.max_retries".into(),
                message: format!("must be in range 0..={MAX_RETRIES_LIMIT}"),
            });
        }
        if self.sync.retry_base_delay_ms == 0 {
            errors.push(ValidationError {
                field: "sync.retry_base_delay_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.sync.autosync_check_secs == 0 {
            errors.push(ValidationError {
                field: "sync.autosync_check_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- folders ---
        if self.folders.cached_retention_days == Some(0) {
            errors.push(ValidationError {
                field: "folders.cached_retention_days".into(),
                message: "must be greater than 0 (omit it to keep cached folders forever)"
                    .into(),
            });
        }
        if !is_hex_color(&self.folders.default_calendar_color) {
            errors.push(ValidationError {
                field: "folders.default_calendar_color".into(),
                message: format!(
                    "invalid color '{}'; expected #rrggbb",
                    self.folders.default_calendar_color
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- storage ---
        if self.storage.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: "must not be empty".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_max_retries(mut self, n: u32) -> Self {
        self.config.sync.max_retries = n;
        self
    }

    pub fn sync_retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.retry_base_delay_ms = ms;
        self
    }

    pub fn sync_calendar_available(mut self, available: bool) -> Self {
        self.config.sync.calendar_available = available;
        self
    }

    pub fn sync_autosync_check_secs(mut self, secs: u64) -> Self {
        self.config.sync.autosync_check_secs = secs;
        self
    }

    // --- folders ---

    pub fn folders_cached_retention_days(mut self, days: Option<u32>) -> Self {
        self.config.folders.cached_retention_days = days;
        self
    }

    pub fn folders_default_calendar_color(mut self, color: impl Into<String>) -> Self {
        self.config.folders.default_calendar_color = color.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- storage ---

    pub fn storage_database(mut self, path: PathBuf) -> Self {
        self.config.storage.database = path;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
