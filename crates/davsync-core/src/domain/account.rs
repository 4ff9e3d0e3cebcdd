//! Account domain entity
//!
//! An account is one configured connection to a DAV server together with the
//! status of its most recent sync run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{errors::DomainError, newtypes::AccountId};

/// Provider tag of accounts handled by this engine
pub const DAV_PROVIDER: &str = "dav";

/// Server type assigned to new accounts
pub const DEFAULT_SERVER_TYPE: &str = "custom";

/// Display-name separator of new accounts
pub const DEFAULT_SEPARATOR: char = ',';

/// Sync status of an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account is switched off; its folders are cached
    #[default]
    Disabled,
    /// Account is enabled but no run has completed yet
    NotSyncronized,
    /// A run owns the account
    Syncing,
    /// The last run completed without a fatal error
    Ok,
    /// The last run failed with the given message
    Error(String),
}

impl AccountStatus {
    /// Returns true if the account may be handed to the orchestrator
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AccountStatus::Disabled)
    }

    /// Returns true while a run owns the account
    pub fn is_syncing(&self) -> bool {
        matches!(self, AccountStatus::Syncing)
    }

    /// Parses the textual form produced by `Display`
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` for unknown status strings
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "disabled" => Ok(AccountStatus::Disabled),
            "notsyncronized" => Ok(AccountStatus::NotSyncronized),
            "syncing" => Ok(AccountStatus::Syncing),
            "ok" => Ok(AccountStatus::Ok),
            other => match other.strip_prefix("error: ") {
                Some(message) => Ok(AccountStatus::Error(message.to_string())),
                None => Err(DomainError::ValidationFailed(format!(
                    "Unknown account status: {other}"
                ))),
            },
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Disabled => write!(f, "disabled"),
            AccountStatus::NotSyncronized => write!(f, "notsyncronized"),
            AccountStatus::Syncing => write!(f, "syncing"),
            AccountStatus::Ok => write!(f, "ok"),
            AccountStatus::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// A configured DAV account
///
/// Connection settings are plain data edited by the front end; `status`,
/// `last_sync` and the sync markers are owned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for this account
    id: AccountId,
    /// Display name
    name: String,
    /// Provider tag, always `dav`
    provider: String,
    /// Server flavour (`custom`, or a known service preset)
    server_type: String,
    /// Host name with optional port and path prefix
    host: String,
    /// Login user name
    user: String,
    /// Use https instead of http
    https: bool,
    /// Authentication method understood by the transport
    auth_method: String,
    /// Opaque authentication options (realm and similar)
    auth_options: String,
    /// Periodic sync interval in minutes, 0 disables it
    autosync_minutes: u32,
    /// Never push local changes upstream
    download_only: bool,
    /// Select the server's default folders when they are first discovered
    sync_default_folders: bool,
    /// Let the server's display name override the local one
    display_override: bool,
    /// Separator between the parts of a composed display name
    separator: char,
    /// Current status
    status: AccountStatus,
    /// Timestamp of the last successful run (None if never synced)
    last_sync: Option<DateTime<Utc>>,
    /// Provider-specific sync-state markers
    sync_markers: BTreeMap<String, String>,
    /// When this account was created
    created_at: DateTime<Utc>,
}

impl Account {
    /// Returns a fresh account record with every field at its default
    ///
    /// The account starts disabled with no connection settings; the front end
    /// fills them in before enabling it.
    pub fn new_entry() -> Self {
        Self::with_id(AccountId::new(), "", "", "", Utc::now())
    }

    /// Creates an account with the given connection settings
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self::with_id(AccountId::new(), name, host, user, Utc::now())
    }

    /// Creates an Account with a specific ID (for reconstitution from storage)
    pub fn with_id(
        id: AccountId,
        name: impl Into<String>,
        host: impl Into<String>,
        user: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            provider: DAV_PROVIDER.to_string(),
            server_type: DEFAULT_SERVER_TYPE.to_string(),
            host: host.into(),
            user: user.into(),
            https: true,
            auth_method: String::new(),
            auth_options: String::new(),
            autosync_minutes: 0,
            download_only: false,
            sync_default_folders: true,
            display_override: false,
            separator: DEFAULT_SEPARATOR,
            status: AccountStatus::Disabled,
            last_sync: None,
            sync_markers: BTreeMap::new(),
            created_at,
        }
    }

    // --- Getters ---

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn server_type(&self) -> &str {
        &self.server_type
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn https(&self) -> bool {
        self.https
    }

    pub fn auth_method(&self) -> &str {
        &self.auth_method
    }

    pub fn auth_options(&self) -> &str {
        &self.auth_options
    }

    pub fn autosync_minutes(&self) -> u32 {
        self.autosync_minutes
    }

    pub fn download_only(&self) -> bool {
        self.download_only
    }

    pub fn sync_default_folders(&self) -> bool {
        self.sync_default_folders
    }

    pub fn display_override(&self) -> bool {
        self.display_override
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn status(&self) -> &AccountStatus {
        &self.status
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn sync_markers(&self) -> &BTreeMap<String, String> {
        &self.sync_markers
    }

    pub fn sync_marker(&self, key: &str) -> Option<&str> {
        self.sync_markers.get(key).map(String::as_str)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Base URL of the server, e.g. `https://dav.example.com`
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}", scheme, self.host)
    }

    // --- Setters / State Mutations ---

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_server_type(&mut self, server_type: impl Into<String>) {
        self.server_type = server_type.into();
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    pub fn set_https(&mut self, https: bool) {
        self.https = https;
    }

    pub fn set_auth(&mut self, method: impl Into<String>, options: impl Into<String>) {
        self.auth_method = method.into();
        self.auth_options = options.into();
    }

    pub fn set_autosync_minutes(&mut self, minutes: u32) {
        self.autosync_minutes = minutes;
    }

    pub fn set_download_only(&mut self, download_only: bool) {
        self.download_only = download_only;
    }

    pub fn set_sync_default_folders(&mut self, enabled: bool) {
        self.sync_default_folders = enabled;
    }

    pub fn set_display_override(&mut self, enabled: bool) {
        self.display_override = enabled;
    }

    pub fn set_separator(&mut self, separator: char) {
        self.separator = separator;
    }

    pub fn set_status(&mut self, status: AccountStatus) {
        self.status = status;
    }

    /// Marks the account with an error
    pub fn mark_error(&mut self, reason: impl Into<String>) {
        self.status = AccountStatus::Error(reason.into());
    }

    /// Records a successful run
    pub fn record_sync(&mut self, timestamp: DateTime<Utc>) {
        self.last_sync = Some(timestamp);
    }

    /// Restores a stored last-sync timestamp
    pub fn set_last_sync(&mut self, timestamp: Option<DateTime<Utc>>) {
        self.last_sync = timestamp;
    }

    pub fn set_sync_marker(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.sync_markers.insert(key.into(), value.into());
    }

    /// Drops all provider sync-state markers
    pub fn clear_sync_markers(&mut self) {
        self.sync_markers.clear();
    }

    /// Validates connection settings before the account is enabled
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` if host or user is empty
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.host.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "Account host cannot be empty".to_string(),
            ));
        }
        if self.user.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "Account user cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
