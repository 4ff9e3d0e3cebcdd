//! Folder domain entity
//!
//! A folder is one remote collection (address book or calendar) of an
//! account, together with its binding to a local sync target and the status
//! of its last sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    account::Account,
    errors::DomainError,
    newtypes::{AccountId, FolderId, SyncToken, TargetHandle},
};

/// Remote folder type of address books
pub const CARDDAV: &str = "carddav";

/// Remote folder type of calendars
pub const CALDAV: &str = "caldav";

/// Local object kind a remote folder type maps to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalFolderKind {
    /// Local address book
    Contact,
    /// Local calendar
    Event,
    /// No local counterpart; carries the remote type
    Unknown(String),
}

impl LocalFolderKind {
    /// Maps a remote folder type to its local kind
    pub fn from_folder_type(folder_type: &str) -> Self {
        match folder_type {
            CARDDAV => LocalFolderKind::Contact,
            CALDAV => LocalFolderKind::Event,
            other => LocalFolderKind::Unknown(other.to_string()),
        }
    }

    /// Returns true for contact and event kinds
    pub fn is_known(&self) -> bool {
        !matches!(self, LocalFolderKind::Unknown(_))
    }
}

impl std::fmt::Display for LocalFolderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalFolderKind::Contact => write!(f, "contact"),
            LocalFolderKind::Event => write!(f, "event"),
            LocalFolderKind::Unknown(folder_type) => write!(f, "unknown ({})", folder_type),
        }
    }
}

/// Sync status of a folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderStatus {
    /// Never queued, or reset by the lifecycle manager
    #[default]
    None,
    /// Queued for the current run
    Pending,
    /// The worker is processing this folder
    Syncing,
    /// The last sync of this folder succeeded
    Ok,
    /// The last sync of this folder failed
    Error(String),
    /// The remote type has no local counterpart
    NotSupported,
}

impl FolderStatus {
    /// Parses the textual form produced by `Display`
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` for unknown status strings
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "" => Ok(FolderStatus::None),
            "pending" => Ok(FolderStatus::Pending),
            "syncing" => Ok(FolderStatus::Syncing),
            "ok" => Ok(FolderStatus::Ok),
            "notsupported" => Ok(FolderStatus::NotSupported),
            other => match other.strip_prefix("error: ") {
                Some(message) => Ok(FolderStatus::Error(message.to_string())),
                None => Err(DomainError::ValidationFailed(format!(
                    "Unknown folder status: {other}"
                ))),
            },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FolderStatus::None => "none",
            FolderStatus::Pending => "pending",
            FolderStatus::Syncing => "syncing",
            FolderStatus::Ok => "ok",
            FolderStatus::Error(_) => "error",
            FolderStatus::NotSupported => "notsupported",
        }
    }
}

impl std::fmt::Display for FolderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderStatus::None => Ok(()),
            FolderStatus::Error(msg) => write!(f, "error: {}", msg),
            other => f.write_str(other.name()),
        }
    }
}

/// A remote collection known to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    account_id: AccountId,
    folder_id: FolderId,
    name: String,
    /// Remote type tag (`carddav`, `caldav`, ...)
    folder_type: String,
    /// Local address book or calendar bound to this folder
    target: Option<TargetHandle>,
    target_name: String,
    target_color: Option<String>,
    selected: bool,
    status: FolderStatus,
    last_sync: Option<DateTime<Utc>>,
    parent_id: Option<FolderId>,
    download_only: bool,
    /// Gone from the server (or account disabled); settings are kept
    cached: bool,
    cached_at: Option<DateTime<Utc>>,
    sync_token: Option<SyncToken>,
}

impl Folder {
    /// Returns a fresh folder record for `account` with every field at its default
    ///
    /// The folder is unselected, has no target and an empty status. It
    /// inherits the account's download-only setting.
    pub fn new_entry(account: &Account, folder_id: FolderId) -> Self {
        let mut folder = Self::with_id(*account.id(), folder_id);
        folder.download_only = account.download_only();
        folder
    }

    /// Creates an empty folder record (for reconstitution from storage)
    pub fn with_id(account_id: AccountId, folder_id: FolderId) -> Self {
        Self {
            account_id,
            folder_id,
            name: String::new(),
            folder_type: String::new(),
            target: None,
            target_name: String::new(),
            target_color: None,
            selected: false,
            status: FolderStatus::None,
            last_sync: None,
            parent_id: None,
            download_only: false,
            cached: false,
            cached_at: None,
            sync_token: None,
        }
    }

    // --- Getters ---

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn folder_id(&self) -> &FolderId {
        &self.folder_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn folder_type(&self) -> &str {
        &self.folder_type
    }

    pub fn local_kind(&self) -> LocalFolderKind {
        LocalFolderKind::from_folder_type(&self.folder_type)
    }

    pub fn target(&self) -> Option<&TargetHandle> {
        self.target.as_ref()
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn target_color(&self) -> Option<&str> {
        self.target_color.as_deref()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn status(&self) -> &FolderStatus {
        &self.status
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn parent_id(&self) -> Option<&FolderId> {
        self.parent_id.as_ref()
    }

    pub fn download_only(&self) -> bool {
        self.download_only
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.cached_at
    }

    pub fn sync_token(&self) -> Option<&SyncToken> {
        self.sync_token.as_ref()
    }

    // --- Remote metadata ---

    /// Overwrites the server-provided metadata
    pub fn update_remote(
        &mut self,
        name: impl Into<String>,
        folder_type: impl Into<String>,
        parent_id: Option<FolderId>,
    ) {
        self.name = name.into();
        self.folder_type = folder_type.into();
        self.parent_id = parent_id;
    }

    // --- Selection and target binding ---

    /// Selects or deselects the folder
    ///
    /// Deselecting drops the target binding and takes the folder out of the
    /// queue.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
        if !selected {
            self.unbind_target();
            if self.status == FolderStatus::Pending {
                self.status = FolderStatus::None;
            }
        }
    }

    pub fn set_download_only(&mut self, download_only: bool) {
        self.download_only = download_only;
    }

    /// Binds a local sync target
    ///
    /// # Errors
    /// Returns `DomainError::TargetNotAllowed` if the folder is not selected or
    /// its type has no local counterpart
    pub fn bind_target(
        &mut self,
        target: TargetHandle,
        target_name: impl Into<String>,
    ) -> Result<(), DomainError> {
        if !self.selected {
            return Err(DomainError::TargetNotAllowed(format!(
                "folder {} is not selected",
                self.folder_id
            )));
        }
        if !self.local_kind().is_known() {
            return Err(DomainError::TargetNotAllowed(format!(
                "folder {} has kind {}",
                self.folder_id,
                self.local_kind()
            )));
        }
        self.target = Some(target);
        self.target_name = target_name.into();
        Ok(())
    }

    /// Drops the target binding, returning the previous handle
    pub fn unbind_target(&mut self) -> Option<TargetHandle> {
        self.target_name.clear();
        self.target.take()
    }

    /// Restores a stored target binding (for reconstitution from storage)
    pub fn set_target(&mut self, target: Option<TargetHandle>, target_name: impl Into<String>) {
        self.target = target;
        self.target_name = target_name.into();
    }

    pub fn set_target_color(&mut self, color: Option<String>) {
        self.target_color = color;
    }

    // --- Status transitions ---

    pub fn set_status(&mut self, status: FolderStatus) {
        self.status = status;
    }

    /// Queues the folder for the current run
    pub fn mark_pending(&mut self) {
        self.status = FolderStatus::Pending;
    }

    /// Moves a pending folder to syncing
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` unless the folder is pending
    pub fn start_sync(&mut self) -> Result<(), DomainError> {
        self.transition(FolderStatus::Pending, FolderStatus::Syncing)
    }

    /// Records a successful sync of this folder
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` unless the folder is syncing
    pub fn complete_sync(&mut self, timestamp: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(FolderStatus::Syncing, FolderStatus::Ok)?;
        self.last_sync = Some(timestamp);
        Ok(())
    }

    /// Records a failed sync of this folder
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` unless the folder is syncing
    pub fn fail_sync(&mut self, message: impl Into<String>) -> Result<(), DomainError> {
        self.transition(FolderStatus::Syncing, FolderStatus::Error(message.into()))
    }

    fn transition(&mut self, from: FolderStatus, to: FolderStatus) -> Result<(), DomainError> {
        if self.status != from {
            return Err(DomainError::InvalidState {
                from: self.status.name().to_string(),
                to: to.name().to_string(),
            });
        }
        self.status = to;
        Ok(())
    }

    /// Restores a stored last-sync timestamp
    pub fn set_last_sync(&mut self, timestamp: Option<DateTime<Utc>>) {
        self.last_sync = timestamp;
    }

    // --- Cache ---

    /// Marks the folder as cached; the first caching time is kept
    pub fn mark_cached(&mut self, now: DateTime<Utc>) {
        self.cached = true;
        if self.cached_at.is_none() {
            self.cached_at = Some(now);
        }
    }

    /// Clears the cached flag
    pub fn restore(&mut self) {
        self.cached = false;
        self.cached_at = None;
    }

    /// Restores stored cache fields
    pub fn set_cached(&mut self, cached: bool, cached_at: Option<DateTime<Utc>>) {
        self.cached = cached;
        self.cached_at = cached_at;
    }

    // --- Sync token ---

    pub fn set_sync_token(&mut self, token: Option<SyncToken>) {
        self.sync_token = token;
    }

    /// Forces the next sync of this folder to be a full sync
    pub fn clear_sync_token(&mut self) {
        self.sync_token = None;
    }
}
