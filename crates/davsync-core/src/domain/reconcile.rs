//! Folder set reconciliation
//!
//! Merges the folder list reported by the server into the persisted folder
//! registry of an account. The merge is a pure function so it can be tested
//! without a transport or a database.
//!
//! With `P` the persisted folders and `R` the remote ones:
//!
//! - `R \ P` are appended as fresh entries, in server order.
//! - `P ∩ R` get their name, type and parent refreshed in place. Selection,
//!   target and status are left alone unless the type stops (or starts)
//!   having a local counterpart.
//! - `P \ R` are marked cached, keeping their settings.
//!
//! Running the merge twice against the same `R` yields the same registry.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    account::Account,
    folder::{Folder, FolderStatus, LocalFolderKind},
    newtypes::FolderId,
};

/// A collection as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: FolderId,
    pub folder_type: String,
    pub name: String,
    pub parent_id: Option<FolderId>,
}

impl RemoteFolder {
    pub fn new(id: FolderId, folder_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            folder_type: folder_type.into(),
            name: name.into(),
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: FolderId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Which local kinds can currently be synced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderKinds {
    /// Calendar subsystem present; without it event folders are unsupported
    pub calendar_available: bool,
}

impl Default for FolderKinds {
    fn default() -> Self {
        Self {
            calendar_available: true,
        }
    }
}

impl FolderKinds {
    /// Returns true if folders of `folder_type` can be bound to a local target
    pub fn is_supported(&self, folder_type: &str) -> bool {
        match LocalFolderKind::from_folder_type(folder_type) {
            LocalFolderKind::Contact => true,
            LocalFolderKind::Event => self.calendar_available,
            LocalFolderKind::Unknown(_) => false,
        }
    }
}

/// How long cached folders are kept after they disappear from the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// `None` keeps cached folders forever
    pub cached_retention_days: Option<u32>,
}

impl RetentionPolicy {
    pub fn forever() -> Self {
        Self {
            cached_retention_days: None,
        }
    }

    pub fn days(days: u32) -> Self {
        Self {
            cached_retention_days: Some(days),
        }
    }

    /// Returns true if a folder cached at `cached_at` must be dropped at `now`
    pub fn is_expired(&self, cached_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match (self.cached_retention_days, cached_at) {
            (Some(days), Some(cached_at)) => now - cached_at >= Duration::days(i64::from(days)),
            _ => false,
        }
    }
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The complete folder registry, in persisted order
    pub folders: Vec<Folder>,
    pub added: usize,
    pub updated: usize,
    pub cached: usize,
    pub restored: usize,
    /// Cached folders dropped by the retention policy
    pub evicted: Vec<FolderId>,
}

impl ReconcileOutcome {
    /// Returns true if the pass changed anything
    pub fn has_changes(&self) -> bool {
        self.added + self.updated + self.cached + self.restored > 0 || !self.evicted.is_empty()
    }
}

/// Merges `remote` into `persisted`
pub fn reconcile(
    account: &Account,
    persisted: &[Folder],
    remote: &[RemoteFolder],
    kinds: &FolderKinds,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let mut remote_by_id: HashMap<&FolderId, &RemoteFolder> = HashMap::new();
    for folder in remote {
        remote_by_id.entry(&folder.id).or_insert(folder);
    }

    let mut outcome = ReconcileOutcome {
        folders: Vec::with_capacity(persisted.len() + remote.len()),
        added: 0,
        updated: 0,
        cached: 0,
        restored: 0,
        evicted: Vec::new(),
    };

    for existing in persisted {
        let mut folder = existing.clone();
        match remote_by_id.get(folder.folder_id()) {
            Some(remote_folder) => {
                if folder.is_cached() {
                    folder.restore();
                    outcome.restored += 1;
                }
                if refresh(&mut folder, remote_folder, kinds) {
                    outcome.updated += 1;
                }
            }
            None => {
                if !folder.is_cached() {
                    folder.mark_cached(now);
                    outcome.cached += 1;
                }
                if policy.is_expired(folder.cached_at(), now) {
                    outcome.evicted.push(folder.folder_id().clone());
                    continue;
                }
            }
        }
        outcome.folders.push(folder);
    }

    let known: HashSet<&FolderId> = persisted.iter().map(Folder::folder_id).collect();
    let mut appended: HashSet<&FolderId> = HashSet::new();
    for remote_folder in remote {
        if known.contains(&remote_folder.id) || !appended.insert(&remote_folder.id) {
            continue;
        }
        let mut folder = Folder::new_entry(account, remote_folder.id.clone());
        folder.update_remote(
            remote_folder.name.clone(),
            remote_folder.folder_type.clone(),
            remote_folder.parent_id.clone(),
        );
        if !kinds.is_supported(&remote_folder.folder_type) {
            folder.set_status(FolderStatus::NotSupported);
        }
        outcome.folders.push(folder);
        outcome.added += 1;
    }

    outcome
}

/// Applies server metadata to a folder present on both sides
///
/// Returns true if anything changed.
fn refresh(folder: &mut Folder, remote: &RemoteFolder, kinds: &FolderKinds) -> bool {
    let mut changed = false;

    if folder.name() != remote.name
        || folder.folder_type() != remote.folder_type
        || folder.parent_id() != remote.parent_id.as_ref()
    {
        folder.update_remote(
            remote.name.clone(),
            remote.folder_type.clone(),
            remote.parent_id.clone(),
        );
        changed = true;
    }

    if kinds.is_supported(folder.folder_type()) {
        if *folder.status() == FolderStatus::NotSupported {
            folder.set_status(FolderStatus::None);
            changed = true;
        }
    } else if *folder.status() != FolderStatus::NotSupported
        || folder.is_selected()
        || folder.target().is_some()
    {
        folder.set_status(FolderStatus::NotSupported);
        folder.set_selected(false);
        folder.unbind_target();
        changed = true;
    }

    changed
}
