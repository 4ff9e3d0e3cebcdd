//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDavTransport`] - Folder listing and item exchange with the DAV server
//! - [`ITargetManager`] - Local address books and calendars
//! - [`IStateRepository`] - Persistent storage for accounts and folders
//! - [`INotificationService`] - Sync events and diagnostic error reports
//! - [`IFolderListView`] - Folder rows of the account settings UI
//! - [`SyncProvider`] - The provider contract driven by the front end

pub mod dav_transport;
pub mod folder_view;
pub mod notification;
pub mod provider;
pub mod state_repository;
pub mod target_manager;

pub use dav_transport::{
    IDavTransport, LocalChange, PushedChange, RemoteChanges, RemoteFolder, RemoteItem,
};
pub use folder_view::{FolderRowData, IFolderListView};
pub use notification::{INotificationService, SyncEvent};
pub use provider::{SyncProvider, SyncReport};
pub use state_repository::IStateRepository;
pub use target_manager::ITargetManager;
