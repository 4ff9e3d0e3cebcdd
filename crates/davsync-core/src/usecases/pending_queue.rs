//! Pending queue processor
//!
//! Marks the folders of an account as pending and then drains them, one at
//! a time and in persisted order, through the folder sync worker.
//!
//! Each drained folder goes `pending -> syncing -> ok | error` exactly once.
//! A non-fatal failure is recorded on its folder and the drain moves on; a
//! fatal one is recorded and then returned, leaving every later folder
//! pending. A folder deselected while queued is dropped from the queue.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    domain::{Account, AccountId, Folder, FolderKinds, FolderStatus, SyncContext, SyncError},
    ports::{INotificationService, IStateRepository, SyncEvent},
};

use super::sync_folder::SyncFolderUseCase;

/// Outcome of a drain that was not stopped by a fatal error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainSummary {
    pub synced: u32,
    pub failed: u32,
    /// Status message of the first folder that failed
    pub first_error: Option<String>,
    /// The abort flag stopped the drain before the queue was empty
    pub aborted: bool,
}

/// Queue of folders waiting to be synced
pub struct PendingQueue {
    state_repository: Arc<dyn IStateRepository + Send + Sync>,
    notifications: Arc<dyn INotificationService + Send + Sync>,
    worker: Arc<SyncFolderUseCase>,
}

impl PendingQueue {
    pub fn new(
        state_repository: Arc<dyn IStateRepository + Send + Sync>,
        notifications: Arc<dyn INotificationService + Send + Sync>,
        worker: Arc<SyncFolderUseCase>,
    ) -> Self {
        Self {
            state_repository,
            notifications,
            worker,
        }
    }

    /// Marks every syncable folder of the run as pending
    ///
    /// A folder is syncable when it is selected, not cached and of a
    /// supported type. If the context names a folder, only that folder is
    /// considered. Folders that were `ok` or `error` are queued again.
    ///
    /// Returns the number of folders marked.
    pub async fn mark_pending(
        &self,
        ctx: &SyncContext,
        kinds: &FolderKinds,
    ) -> anyhow::Result<usize> {
        let folders = self
            .state_repository
            .get_folders(ctx.account_id())
            .await
            .context("Failed to load folders")?;

        let mut marked = 0;
        for mut folder in folders {
            if let Some(only) = ctx.folder_id() {
                if folder.folder_id() != only {
                    continue;
                }
            }
            if !folder.is_selected()
                || folder.is_cached()
                || !kinds.is_supported(folder.folder_type())
            {
                continue;
            }

            folder.mark_pending();
            self.state_repository
                .save_folder(&folder)
                .await
                .with_context(|| format!("Failed to queue folder {}", folder.folder_id()))?;
            self.publish_status(&folder).await;
            marked += 1;
        }

        debug!(account_id = %ctx.account_id(), marked, "Folders marked pending");
        Ok(marked)
    }

    /// Syncs pending folders until the queue is empty, a fatal error occurs
    /// or the run is aborted
    ///
    /// # Errors
    ///
    /// Returns the classified fatal error that stopped the drain. The
    /// failing folder has already been marked `error`.
    pub async fn drain(
        &self,
        ctx: &mut SyncContext,
        account: &Account,
        kinds: &FolderKinds,
    ) -> Result<DrainSummary, SyncError> {
        let folders = self
            .state_repository
            .get_folders(account.id())
            .await
            .context("Failed to load folders")?;

        let mut summary = DrainSummary::default();
        for mut folder in folders
            .into_iter()
            .filter(|f| *f.status() == FolderStatus::Pending)
        {
            if ctx.is_aborted() {
                info!(account_id = %account.id(), "Sync aborted, leaving remaining folders pending");
                summary.aborted = true;
                break;
            }

            if !folder.is_selected() {
                debug!(folder_id = %folder.folder_id(), "Folder deselected, dropping it from the queue");
                folder.set_status(FolderStatus::None);
                self.store(&folder).await?;
                continue;
            }

            folder.start_sync()?;
            self.store(&folder).await?;

            let result = self.worker.execute(account, &mut folder, kinds).await;
            match result {
                Ok(stats) => {
                    folder.complete_sync(Utc::now())?;
                    self.store(&folder).await?;

                    let counters = ctx.counters_mut();
                    counters.folders_synced += 1;
                    counters.items_downloaded += stats.downloaded;
                    counters.items_deleted += stats.deleted;
                    counters.items_uploaded += stats.uploaded;
                    summary.synced += 1;
                }
                Err(err) => {
                    let err = SyncError::classify(err);
                    folder.fail_sync(err.status_message())?;
                    self.store(&folder).await?;
                    ctx.counters_mut().folders_failed += 1;
                    summary.failed += 1;
                    if summary.first_error.is_none() {
                        summary.first_error = Some(err.status_message());
                    }

                    if err.is_fatal() {
                        warn!(
                            folder_id = %folder.folder_id(),
                            error = %err,
                            "Fatal error, stopping drain"
                        );
                        return Err(err);
                    }
                    warn!(folder_id = %folder.folder_id(), error = %err, "Folder sync failed");
                }
            }
        }

        Ok(summary)
    }

    /// Number of folders of an account still waiting to be synced
    pub async fn queue_length(&self, account_id: &AccountId) -> anyhow::Result<usize> {
        let folders = self
            .state_repository
            .get_folders(account_id)
            .await
            .context("Failed to load folders")?;
        Ok(folders
            .iter()
            .filter(|f| *f.status() == FolderStatus::Pending)
            .count())
    }

    /// Marks folders left `syncing` by an interrupted run as failed
    ///
    /// Returns the number of folders updated.
    pub async fn fail_interrupted(
        &self,
        account_id: &AccountId,
        message: &str,
    ) -> anyhow::Result<usize> {
        let folders = self
            .state_repository
            .get_folders(account_id)
            .await
            .context("Failed to load folders")?;

        let mut failed = 0;
        for mut folder in folders
            .into_iter()
            .filter(|f| *f.status() == FolderStatus::Syncing)
        {
            folder.fail_sync(message)?;
            self.state_repository
                .save_folder(&folder)
                .await
                .with_context(|| format!("Failed to store folder {}", folder.folder_id()))?;
            self.publish_status(&folder).await;
            failed += 1;
        }
        Ok(failed)
    }

    async fn store(&self, folder: &Folder) -> Result<(), SyncError> {
        self.state_repository
            .save_folder(folder)
            .await
            .with_context(|| format!("Failed to store folder {}", folder.folder_id()))?;
        self.publish_status(folder).await;
        Ok(())
    }

    async fn publish_status(&self, folder: &Folder) {
        let event = SyncEvent::FolderStatusChanged {
            account_id: *folder.account_id(),
            folder_id: folder.folder_id().clone(),
            status: folder.status().clone(),
        };
        if let Err(e) = self.notifications.publish(&event).await {
            warn!(folder_id = %folder.folder_id(), error = %e, "Failed to publish folder status");
        }
    }
}
