//! DavSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Account`, `Folder`, `SyncContext`, classified errors
//! - **Reconciliation** - merging the remote folder set into the persisted registry
//! - **Use cases** - `DiscoverFoldersUseCase`, `PendingQueue`, `SyncFolderUseCase`,
//!   `AccountLifecycleUseCase`, folder row data for the UI bridge
//! - **Port definitions** - Traits for adapters: `IDavTransport`, `ITargetManager`,
//!   `IStateRepository`, `INotificationService`, `IFolderListView`, `SyncProvider`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
