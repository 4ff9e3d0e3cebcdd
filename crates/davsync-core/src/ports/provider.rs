//! Provider port (driving/primary port)
//!
//! The front end talks to a sync provider through this trait: it asks for
//! default records, switches accounts on and off, and starts jobs. One
//! provider instance is registered per provider tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    account::{Account, AccountStatus},
    errors::SyncError,
    folder::{Folder, LocalFolderKind},
    newtypes::{AccountId, FolderId, TargetHandle},
    sync_context::{SyncContext, SyncCounters},
};

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub account_id: AccountId,
    pub job: String,
    pub status: AccountStatus,
    pub counters: SyncCounters,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Contract between the front end and a sync provider
#[async_trait::async_trait]
pub trait SyncProvider: Send + Sync {
    /// Provider tag this implementation handles
    fn provider_tag(&self) -> &'static str;

    /// Called once at startup; without a calendar subsystem event folders
    /// are unsupported
    fn init(&self, calendar_available: bool);

    /// Returns a fresh account record with default settings
    fn new_account_entry(&self) -> Account;

    /// Returns a fresh folder record of `account` with default settings
    fn new_folder_entry(&self, account: &Account, folder_id: FolderId) -> Folder;

    /// Maps a remote folder type to the local kind it syncs into
    fn local_folder_kind(&self, folder_type: &str) -> LocalFolderKind;

    /// Switches an account on
    async fn enable_account(&self, account_id: &AccountId) -> anyhow::Result<Account>;

    /// Switches an account off, caching its folders
    async fn disable_account(&self, account_id: &AccountId) -> anyhow::Result<Account>;

    /// Creates the local address book of a folder
    async fn create_address_book(
        &self,
        name: &str,
        account: &Account,
        folder_id: &FolderId,
    ) -> anyhow::Result<TargetHandle>;

    /// Creates the local calendar of a folder
    async fn create_calendar(
        &self,
        name: &str,
        account: &Account,
        folder_id: &FolderId,
        color: &str,
    ) -> anyhow::Result<TargetHandle>;

    /// Runs `job` for the account of `ctx`
    ///
    /// The account is finalized before this returns, whatever the outcome.
    async fn start(&self, ctx: SyncContext, job: &str) -> Result<SyncReport, SyncError>;
}
