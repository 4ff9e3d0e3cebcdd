//! Folder sync worker
//!
//! Synchronizes the items of a single folder: makes sure the folder has a
//! local target, pulls remote changes into it and, unless the folder is
//! download-only, pushes local changes back.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    domain::{Account, Folder, FolderKinds, LocalFolderKind, ProviderError, TargetHandle},
    ports::{IDavTransport, IStateRepository, ITargetManager},
};

/// Item counts of one folder sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSyncStats {
    pub downloaded: u32,
    pub deleted: u32,
    pub uploaded: u32,
    /// The local identity map was rebuilt from a full listing
    pub full_sync: bool,
}

/// Use case for syncing one folder
pub struct SyncFolderUseCase {
    transport: Arc<dyn IDavTransport + Send + Sync>,
    targets: Arc<dyn ITargetManager + Send + Sync>,
    state_repository: Arc<dyn IStateRepository + Send + Sync>,
    default_calendar_color: String,
}

impl SyncFolderUseCase {
    pub fn new(
        transport: Arc<dyn IDavTransport + Send + Sync>,
        targets: Arc<dyn ITargetManager + Send + Sync>,
        state_repository: Arc<dyn IStateRepository + Send + Sync>,
        default_calendar_color: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            targets,
            state_repository,
            default_calendar_color: default_calendar_color.into(),
        }
    }

    /// Syncs `folder`, updating its target binding and sync token in place
    ///
    /// The caller owns the folder's status; this method only persists the
    /// target binding when it creates one.
    ///
    /// # Errors
    ///
    /// - `unsupported-folder-type` if the folder type cannot be synced
    /// - Transport and target errors, with their classification intact
    pub async fn execute(
        &self,
        account: &Account,
        folder: &mut Folder,
        kinds: &FolderKinds,
    ) -> Result<FolderSyncStats> {
        if !kinds.is_supported(folder.folder_type()) {
            return Err(ProviderError::unsupported_folder_type(folder.folder_type()).into());
        }
        if !folder.is_selected() {
            debug!(folder_id = %folder.folder_id(), "Folder deselected, nothing to sync");
            return Ok(FolderSyncStats::default());
        }

        let target = self.ensure_target(account, folder).await?;
        let mut stats = FolderSyncStats::default();

        let token = folder.sync_token().cloned();
        let changes = self
            .transport
            .fetch_changes(account, folder, token.as_ref())
            .await
            .with_context(|| format!("Failed to fetch changes of {}", folder.folder_id()))?;

        if changes.full {
            debug!(folder_id = %folder.folder_id(), had_token = token.is_some(), "Full sync, resetting identity map");
            self.targets
                .reset_target(&target)
                .await
                .context("Failed to reset local target")?;
            stats.full_sync = true;
        }

        for item in &changes.items {
            self.targets
                .apply_remote_item(&target, item)
                .await
                .with_context(|| format!("Failed to apply remote item {}", item.href))?;
            stats.downloaded += 1;
        }

        for href in &changes.deleted {
            let removed = self
                .targets
                .remove_remote_item(&target, href)
                .await
                .with_context(|| format!("Failed to remove local copy of {href}"))?;
            if removed {
                stats.deleted += 1;
            }
        }

        if folder.download_only() {
            debug!(folder_id = %folder.folder_id(), "Download-only folder, skipping upload");
        } else {
            let local = self
                .targets
                .local_changes(&target)
                .await
                .context("Failed to collect local changes")?;
            if !local.is_empty() {
                let pushed = self
                    .transport
                    .push_changes(account, folder, &local)
                    .await
                    .with_context(|| format!("Failed to push changes of {}", folder.folder_id()))?;
                self.targets
                    .mark_pushed(&target, &pushed)
                    .await
                    .context("Failed to record pushed changes")?;
                stats.uploaded = u32::try_from(pushed.len()).unwrap_or(u32::MAX);
            }
        }

        folder.set_sync_token(changes.sync_token);

        info!(
            folder_id = %folder.folder_id(),
            downloaded = stats.downloaded,
            deleted = stats.deleted,
            uploaded = stats.uploaded,
            full_sync = stats.full_sync,
            "Folder synced"
        );
        Ok(stats)
    }

    /// Returns the folder's target, creating and binding one if needed
    async fn ensure_target(&self, account: &Account, folder: &mut Folder) -> Result<TargetHandle> {
        if let Some(target) = folder.target() {
            return Ok(target.clone());
        }

        let name = if folder.name().is_empty() {
            folder.folder_id().to_string()
        } else {
            folder.name().to_string()
        };

        let target = match folder.local_kind() {
            LocalFolderKind::Contact => self
                .targets
                .create_address_book(&name, account, folder.folder_id())
                .await
                .context("Failed to create address book")?,
            LocalFolderKind::Event => {
                let color = folder
                    .target_color()
                    .map(str::to_string)
                    .unwrap_or_else(|| self.default_calendar_color.clone());
                let target = self
                    .targets
                    .create_calendar(&name, account, folder.folder_id(), &color)
                    .await
                    .context("Failed to create calendar")?;
                folder.set_target_color(Some(color));
                target
            }
            LocalFolderKind::Unknown(folder_type) => {
                return Err(ProviderError::unsupported_folder_type(&folder_type).into());
            }
        };

        folder.bind_target(target.clone(), name)?;
        self.state_repository
            .save_folder(folder)
            .await
            .context("Failed to store target binding")?;

        info!(folder_id = %folder.folder_id(), target = %target, "Local target created");
        Ok(target)
    }
}
