//! Folder discovery use case
//!
//! Fetches the folder list of an account from the server and merges it into
//! the persisted registry. Nothing is written unless the fetch succeeded, and
//! the new registry is committed in a single repository call, so a failed or
//! retried discovery never leaves a half-merged registry behind.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use crate::{
    domain::{reconcile, Account, FolderKinds, ReconcileOutcome, RetentionPolicy},
    ports::{IDavTransport, IStateRepository},
};

/// Use case for discovering and reconciling remote folders
pub struct DiscoverFoldersUseCase {
    transport: Arc<dyn IDavTransport + Send + Sync>,
    state_repository: Arc<dyn IStateRepository + Send + Sync>,
    policy: RetentionPolicy,
}

impl DiscoverFoldersUseCase {
    /// Creates a new DiscoverFoldersUseCase
    ///
    /// # Arguments
    ///
    /// * `transport` - DAV transport used to list remote folders
    /// * `state_repository` - Storage of the folder registry
    /// * `policy` - Retention of folders that disappeared from the server
    pub fn new(
        transport: Arc<dyn IDavTransport + Send + Sync>,
        state_repository: Arc<dyn IStateRepository + Send + Sync>,
        policy: RetentionPolicy,
    ) -> Self {
        Self {
            transport,
            state_repository,
            policy,
        }
    }

    /// Reconciles the registry of `account` with the server
    ///
    /// # Errors
    ///
    /// Returns the transport error (with its classification intact) if the
    /// folder list cannot be fetched, or a storage error if the registry
    /// cannot be read or written.
    pub async fn execute(&self, account: &Account, kinds: &FolderKinds) -> Result<ReconcileOutcome> {
        let remote = self
            .transport
            .list_folders(account)
            .await
            .context("Failed to list remote folders")?;

        let persisted = self
            .state_repository
            .get_folders(account.id())
            .await
            .context("Failed to load folder registry")?;

        let outcome = reconcile(account, &persisted, &remote, kinds, &self.policy, Utc::now());

        if outcome.has_changes() {
            self.state_repository
                .replace_folders(account.id(), &outcome.folders)
                .await
                .context("Failed to store folder registry")?;
            info!(
                account_id = %account.id(),
                added = outcome.added,
                updated = outcome.updated,
                cached = outcome.cached,
                restored = outcome.restored,
                evicted = outcome.evicted.len(),
                "Folder registry reconciled"
            );
        } else {
            debug!(account_id = %account.id(), folders = outcome.folders.len(), "Folder registry unchanged");
        }

        Ok(outcome)
    }
}
