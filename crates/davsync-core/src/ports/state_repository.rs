//! State repository port (driven/secondary port)
//!
//! This module defines the interface for persisting accounts and their
//! folder registries.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, filesystem, etc.) and don't need domain-level classification.
//! - Folders of an account have a persisted order (insertion order). Every
//!   read returns them in that order; the pending queue drains in it.
//! - All write operations take references to domain entities, allowing
//!   the caller to retain ownership.

use crate::domain::{
    account::Account,
    folder::Folder,
    newtypes::{AccountId, FolderId},
};

/// Port trait for persistent account and folder storage
///
/// ## Implementation Notes
///
/// - `save_folder` of an unknown folder appends it at the end of the
///   account's order; saving a known folder keeps its position.
/// - `replace_folders` must be atomic: either the whole new registry is
///   visible or the old one is.
/// - Deleting an account deletes its folders.
#[async_trait::async_trait]
pub trait IStateRepository: Send + Sync {
    // --- Account operations ---

    /// Saves an account (insert or update)
    async fn save_account(&self, account: &Account) -> anyhow::Result<()>;

    /// Retrieves an account by its ID
    async fn get_account(&self, id: &AccountId) -> anyhow::Result<Option<Account>>;

    /// Lists every account, oldest first
    async fn list_accounts(&self) -> anyhow::Result<Vec<Account>>;

    /// Deletes an account and its folders
    async fn delete_account(&self, id: &AccountId) -> anyhow::Result<()>;

    // --- Folder operations ---

    /// Returns the folders of an account in persisted order
    async fn get_folders(&self, account_id: &AccountId) -> anyhow::Result<Vec<Folder>>;

    /// Retrieves one folder
    async fn get_folder(
        &self,
        account_id: &AccountId,
        folder_id: &FolderId,
    ) -> anyhow::Result<Option<Folder>>;

    /// Saves a folder (insert or update)
    async fn save_folder(&self, folder: &Folder) -> anyhow::Result<()>;

    /// Replaces the whole folder registry of an account
    ///
    /// The order of `folders` becomes the persisted order.
    async fn replace_folders(&self, account_id: &AccountId, folders: &[Folder])
        -> anyhow::Result<()>;

    /// Deletes one folder
    async fn delete_folder(&self, account_id: &AccountId, folder_id: &FolderId)
        -> anyhow::Result<()>;
}
