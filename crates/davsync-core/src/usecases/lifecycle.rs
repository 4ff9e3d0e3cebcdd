//! Account lifecycle use case
//!
//! Enabling and disabling an account. Disabling keeps every folder record
//! (selection, target binding, color) as a cached entry so that enabling the
//! account again brings the previous setup back without asking the server.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::{
    domain::{Account, AccountId, AccountStatus, Folder, FolderStatus},
    ports::IStateRepository,
};

/// Use case for switching accounts on and off
pub struct AccountLifecycleUseCase {
    state_repository: Arc<dyn IStateRepository + Send + Sync>,
}

impl AccountLifecycleUseCase {
    pub fn new(state_repository: Arc<dyn IStateRepository + Send + Sync>) -> Self {
        Self { state_repository }
    }

    /// Enables an account
    ///
    /// The account becomes `notsyncronized` with no last sync and no sync
    /// markers. Its cached folders are restored with their settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the account does not exist or storage fails.
    pub async fn enable(&self, account_id: &AccountId) -> Result<Account> {
        let mut account = self.load(account_id).await?;
        account.set_status(AccountStatus::NotSyncronized);
        account.set_last_sync(None);
        account.clear_sync_markers();

        let mut folders = self.folders(account_id).await?;
        let mut restored = 0;
        for folder in folders.iter_mut().filter(|f| f.is_cached()) {
            folder.restore();
            reset_status(folder);
            restored += 1;
        }

        self.store(&account, &folders).await?;
        info!(account_id = %account_id, restored, "Account enabled");
        Ok(account)
    }

    /// Disables an account
    ///
    /// The account becomes `disabled` with no sync markers. Every folder is
    /// cached, keeping its settings, and its status is reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the account does not exist or storage fails.
    pub async fn disable(&self, account_id: &AccountId) -> Result<Account> {
        let mut account = self.load(account_id).await?;
        account.set_status(AccountStatus::Disabled);
        account.clear_sync_markers();

        let now = Utc::now();
        let mut folders = self.folders(account_id).await?;
        for folder in folders.iter_mut() {
            folder.mark_cached(now);
            reset_status(folder);
        }

        self.store(&account, &folders).await?;
        info!(account_id = %account_id, cached = folders.len(), "Account disabled");
        Ok(account)
    }

    async fn load(&self, account_id: &AccountId) -> Result<Account> {
        self.state_repository
            .get_account(account_id)
            .await
            .context("Failed to load account")?
            .with_context(|| format!("Account not found: {account_id}"))
    }

    async fn folders(&self, account_id: &AccountId) -> Result<Vec<Folder>> {
        self.state_repository
            .get_folders(account_id)
            .await
            .context("Failed to load folders")
    }

    async fn store(&self, account: &Account, folders: &[Folder]) -> Result<()> {
        self.state_repository
            .replace_folders(account.id(), folders)
            .await
            .context("Failed to store folders")?;
        self.state_repository
            .save_account(account)
            .await
            .context("Failed to store account")
    }
}

/// Clears a run status; `notsupported` describes the folder type and stays
fn reset_status(folder: &mut Folder) {
    if *folder.status() != FolderStatus::NotSupported {
        folder.set_status(FolderStatus::None);
    }
}
