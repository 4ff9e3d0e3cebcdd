//! Notification service port (driven/secondary port)
//!
//! Carries sync events to whoever displays them (settings UI, tray icon,
//! log) and unexpected failures to the diagnostic channel.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because delivery is adapter-specific.
//! - Events are fire-and-forget; the engine logs and ignores delivery errors.

use serde::{Deserialize, Serialize};

use crate::domain::{
    account::AccountStatus,
    folder::FolderStatus,
    newtypes::{AccountId, FolderId},
};

// ============================================================================
// SyncEvent enum
// ============================================================================

/// An observable step of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// The folder registry was reconciled and folders were queued
    FolderListUpdated { account_id: AccountId },
    /// A folder moved to a new status
    FolderStatusChanged {
        account_id: AccountId,
        folder_id: FolderId,
        status: FolderStatus,
    },
    /// A run was finalized
    AccountFinished {
        account_id: AccountId,
        status: AccountStatus,
    },
}

impl SyncEvent {
    pub fn account_id(&self) -> &AccountId {
        match self {
            SyncEvent::FolderListUpdated { account_id }
            | SyncEvent::FolderStatusChanged { account_id, .. }
            | SyncEvent::AccountFinished { account_id, .. } => account_id,
        }
    }
}

// ============================================================================
// INotificationService trait
// ============================================================================

/// Port trait for sync events and diagnostics
#[async_trait::async_trait]
pub trait INotificationService: Send + Sync {
    /// Publishes a sync event
    async fn publish(&self, event: &SyncEvent) -> anyhow::Result<()>;

    /// Reports an unexpected failure to the diagnostic channel
    ///
    /// # Arguments
    /// * `account_id` - The account whose run failed
    /// * `details` - Full error chain, not shown to the user as a status
    async fn report_error(&self, account_id: &AccountId, details: &str) -> anyhow::Result<()>;
}
