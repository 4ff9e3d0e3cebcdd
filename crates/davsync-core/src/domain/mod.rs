//! Domain entities and business logic
//!
//! This module contains the core domain types for DavSync:
//! - Newtypes for type-safe identifiers
//! - Account and folder records with their default entries
//! - The per-run sync context
//! - Folder set reconciliation
//! - Domain and provider error types

pub mod account;
pub mod errors;
pub mod folder;
pub mod newtypes;
pub mod reconcile;
pub mod sync_context;

// Re-export commonly used types
pub use account::{Account, AccountStatus};
pub use errors::{DomainError, ErrorKind, ProviderError, SyncError};
pub use folder::{Folder, FolderStatus, LocalFolderKind};
pub use newtypes::*;
pub use reconcile::{reconcile, FolderKinds, ReconcileOutcome, RemoteFolder, RetentionPolicy};
pub use sync_context::{SyncContext, SyncCounters, SyncJob, SyncPhase};
