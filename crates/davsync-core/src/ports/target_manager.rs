//! Target manager port (driven/secondary port)
//!
//! Local address books and calendars are owned by the host application.
//! The target manager creates them and applies remote items to them; it also
//! keeps the mapping between remote hrefs and local item ids.

use crate::domain::{
    account::Account,
    newtypes::{FolderId, TargetHandle},
};

use super::dav_transport::{LocalChange, PushedChange, RemoteItem};

/// Port trait for local sync targets
#[async_trait::async_trait]
pub trait ITargetManager: Send + Sync {
    /// Creates a local address book for a contact folder
    async fn create_address_book(
        &self,
        name: &str,
        account: &Account,
        folder_id: &FolderId,
    ) -> anyhow::Result<TargetHandle>;

    /// Creates a local calendar for an event folder
    async fn create_calendar(
        &self,
        name: &str,
        account: &Account,
        folder_id: &FolderId,
        color: &str,
    ) -> anyhow::Result<TargetHandle>;

    /// Creates or updates the local copy of a remote item
    async fn apply_remote_item(&self, target: &TargetHandle, item: &RemoteItem)
        -> anyhow::Result<()>;

    /// Deletes the local copy of a remote item
    ///
    /// Returns false if no local item was mapped to `href`.
    async fn remove_remote_item(&self, target: &TargetHandle, href: &str) -> anyhow::Result<bool>;

    /// Forgets every href mapping of a target before a full resync
    async fn reset_target(&self, target: &TargetHandle) -> anyhow::Result<()>;

    /// Returns local modifications not yet uploaded
    async fn local_changes(&self, target: &TargetHandle) -> anyhow::Result<Vec<LocalChange>>;

    /// Records uploaded changes so they are not reported again
    async fn mark_pushed(&self, target: &TargetHandle, pushed: &[PushedChange])
        -> anyhow::Result<()>;
}
