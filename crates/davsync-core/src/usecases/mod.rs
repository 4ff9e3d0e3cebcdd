//! Use cases (interactors) for DavSync
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`DiscoverFoldersUseCase`] - Fetch the remote folder list and reconcile it
//! - [`PendingQueue`] - Queue selected folders and drain them through the worker
//! - [`SyncFolderUseCase`] - Sync the items of one folder
//! - [`AccountLifecycleUseCase`] - Enable and disable accounts
//! - [`FolderRows`] - Folder row data for the settings UI
//! - [`account_settings`] - Account option names, locks and icons for the settings UI

pub mod account_settings;
pub mod discover_folders;
pub mod folder_rows;
pub mod lifecycle;
pub mod pending_queue;
pub mod sync_folder;

pub use discover_folders::DiscoverFoldersUseCase;
pub use folder_rows::{folder_row_data, folder_status_message, FolderRows};
pub use lifecycle::AccountLifecycleUseCase;
pub use pending_queue::{DrainSummary, PendingQueue};
pub use sync_folder::{FolderSyncStats, SyncFolderUseCase};
