//! Orchestration registry
//!
//! Holds one provider instance per provider tag and routes account
//! operations to the provider named by the account record.
//!
//! At most one job runs per account: each account has its own
//! `tokio::sync::Mutex`, so jobs of different accounts run concurrently
//! while jobs of the same account wait for each other. The abort flag of the
//! running job is kept so it can be stopped from another task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{debug, info};

use davsync_core::domain::{Account, AccountId, SyncContext, SyncError};
use davsync_core::ports::{IStateRepository, SyncProvider, SyncReport};

use crate::RegistryError;

/// Registry of sync providers and running jobs
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn SyncProvider>>,
    state_repository: Arc<dyn IStateRepository + Send + Sync>,
    account_locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
    running: Mutex<HashMap<AccountId, Arc<AtomicBool>>>,
}

impl ProviderRegistry {
    pub fn new(state_repository: Arc<dyn IStateRepository + Send + Sync>) -> Self {
        Self {
            providers: HashMap::new(),
            state_repository,
            account_locks: Mutex::new(HashMap::new()),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a provider under its tag
    ///
    /// # Errors
    /// Returns `RegistryError::DuplicateProvider` if the tag is taken
    pub fn register(&mut self, provider: Arc<dyn SyncProvider>) -> Result<(), RegistryError> {
        let tag = provider.provider_tag();
        if self.providers.contains_key(tag) {
            return Err(RegistryError::DuplicateProvider(tag.to_string()));
        }
        debug!(provider = tag, "Provider registered");
        self.providers.insert(tag, provider);
        Ok(())
    }

    /// Initializes every registered provider
    pub fn init(&self, calendar_available: bool) {
        for provider in self.providers.values() {
            provider.init(calendar_available);
        }
    }

    /// Returns the provider registered for `tag`
    pub fn provider(&self, tag: &str) -> Option<Arc<dyn SyncProvider>> {
        self.providers.get(tag).cloned()
    }

    /// Loads an account together with its provider
    ///
    /// # Errors
    /// Returns `RegistryError::AccountNotFound` or `RegistryError::UnknownProvider`
    pub async fn provider_for(
        &self,
        account_id: &AccountId,
    ) -> anyhow::Result<(Account, Arc<dyn SyncProvider>)> {
        let account = self
            .state_repository
            .get_account(account_id)
            .await
            .context("Failed to load account")?
            .ok_or(RegistryError::AccountNotFound(*account_id))?;
        let provider = self
            .provider(account.provider())
            .ok_or_else(|| RegistryError::UnknownProvider(account.provider().to_string()))?;
        Ok((account, provider))
    }

    /// Runs `job` for the account of `ctx`, after any job already running
    /// for the same account
    ///
    /// # Errors
    /// Returns the provider's error, `SyncError::AccountDisabled` for a
    /// disabled account, or an unexpected error if the account cannot be
    /// routed.
    pub async fn run_job(&self, ctx: SyncContext, job: &str) -> Result<SyncReport, SyncError> {
        let account_id = *ctx.account_id();
        let lock = self.account_lock(&account_id).await;
        let _guard = lock.lock().await;

        let (account, provider) = self.provider_for(&account_id).await?;
        if !account.status().is_enabled() {
            return Err(SyncError::AccountDisabled(account_id));
        }

        self.running
            .lock()
            .await
            .insert(account_id, ctx.abort_flag());
        let result = provider.start(ctx, job).await;
        self.running.lock().await.remove(&account_id);

        result
    }

    /// Asks the running job of an account to stop before its next folder
    ///
    /// Returns false if no job is running for the account.
    pub async fn abort(&self, account_id: &AccountId) -> bool {
        match self.running.lock().await.get(account_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                info!(account_id = %account_id, "Abort requested");
                true
            }
            None => false,
        }
    }

    /// Returns true while a job runs for the account
    pub async fn is_running(&self, account_id: &AccountId) -> bool {
        self.running.lock().await.contains_key(account_id)
    }

    /// Enables an account through its provider
    pub async fn enable_account(&self, account_id: &AccountId) -> anyhow::Result<Account> {
        let (_, provider) = self.provider_for(account_id).await?;
        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;
        provider.enable_account(account_id).await
    }

    /// Disables an account through its provider
    ///
    /// A running job is aborted first; the account is disabled once it has
    /// been finalized.
    pub async fn disable_account(&self, account_id: &AccountId) -> anyhow::Result<Account> {
        let (_, provider) = self.provider_for(account_id).await?;
        self.abort(account_id).await;
        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;
        provider.disable_account(account_id).await
    }

    /// Deletes an account and its folder registry
    pub async fn remove_account(&self, account_id: &AccountId) -> anyhow::Result<()> {
        self.abort(account_id).await;
        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;
        self.state_repository
            .delete_account(account_id)
            .await
            .context("Failed to delete account")?;
        self.account_locks.lock().await.remove(account_id);
        info!(account_id = %account_id, "Account removed");
        Ok(())
    }

    async fn account_lock(&self, account_id: &AccountId) -> Arc<Mutex<()>> {
        let mut locks = self.account_locks.lock().await;
        Arc::clone(locks.entry(*account_id).or_default())
    }
}
