//! The `dav` sync provider
//!
//! [`DavProvider`] is the provider instance the front end registers for DAV
//! accounts. It hands out default records, switches accounts on and off and
//! forwards jobs to the [`SyncEngine`].

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use davsync_core::config::Config;
use davsync_core::domain::account::DAV_PROVIDER;
use davsync_core::domain::{
    Account, AccountId, Folder, FolderId, LocalFolderKind, SyncContext, SyncError, TargetHandle,
};
use davsync_core::ports::{
    IDavTransport, INotificationService, IStateRepository, ITargetManager, SyncProvider,
    SyncReport,
};
use davsync_core::usecases::AccountLifecycleUseCase;

use crate::engine::SyncEngine;

/// Sync provider for CardDAV/CalDAV accounts
pub struct DavProvider {
    engine: SyncEngine,
    lifecycle: AccountLifecycleUseCase,
    targets: Arc<dyn ITargetManager + Send + Sync>,
}

impl DavProvider {
    pub fn new(
        transport: Arc<dyn IDavTransport + Send + Sync>,
        targets: Arc<dyn ITargetManager + Send + Sync>,
        state_repository: Arc<dyn IStateRepository + Send + Sync>,
        notifications: Arc<dyn INotificationService + Send + Sync>,
        config: &Config,
    ) -> Self {
        Self {
            engine: SyncEngine::new(
                transport,
                Arc::clone(&targets),
                Arc::clone(&state_repository),
                notifications,
                config,
            ),
            lifecycle: AccountLifecycleUseCase::new(state_repository),
            targets,
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }
}

#[async_trait::async_trait]
impl SyncProvider for DavProvider {
    fn provider_tag(&self) -> &'static str {
        DAV_PROVIDER
    }

    fn init(&self, calendar_available: bool) {
        info!(calendar_available, "DAV provider initialized");
        self.engine.set_calendar_available(calendar_available);
    }

    fn new_account_entry(&self) -> Account {
        Account::new_entry()
    }

    fn new_folder_entry(&self, account: &Account, folder_id: FolderId) -> Folder {
        Folder::new_entry(account, folder_id)
    }

    fn local_folder_kind(&self, folder_type: &str) -> LocalFolderKind {
        LocalFolderKind::from_folder_type(folder_type)
    }

    async fn enable_account(&self, account_id: &AccountId) -> anyhow::Result<Account> {
        self.lifecycle.enable(account_id).await
    }

    async fn disable_account(&self, account_id: &AccountId) -> anyhow::Result<Account> {
        self.lifecycle.disable(account_id).await
    }

    async fn create_address_book(
        &self,
        name: &str,
        account: &Account,
        folder_id: &FolderId,
    ) -> anyhow::Result<TargetHandle> {
        self.targets
            .create_address_book(name, account, folder_id)
            .await
            .with_context(|| format!("Failed to create address book '{name}'"))
    }

    async fn create_calendar(
        &self,
        name: &str,
        account: &Account,
        folder_id: &FolderId,
        color: &str,
    ) -> anyhow::Result<TargetHandle> {
        self.targets
            .create_calendar(name, account, folder_id, color)
            .await
            .with_context(|| format!("Failed to create calendar '{name}'"))
    }

    async fn start(&self, ctx: SyncContext, job: &str) -> Result<SyncReport, SyncError> {
        self.engine.start(ctx, job).await
    }
}
