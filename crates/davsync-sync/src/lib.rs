//! DavSync Sync - Account sync orchestration
//!
//! Provides:
//! - The account sync orchestrator with guaranteed finalization
//! - The `dav` sync provider
//! - A registry that serializes jobs per account and aborts running ones
//! - Periodic autosync
//!
//! ## Modules
//!
//! - [`engine`] - Runs a job over one account: discovery, queueing, draining, finalization
//! - [`provider`] - `SyncProvider` implementation for DAV accounts
//! - [`registry`] - Provider lookup, per-account job locks and abort handles
//! - [`scheduler`] - Starts `sync` jobs for accounts whose autosync interval elapsed

pub mod engine;
pub mod provider;
pub mod registry;
pub mod scheduler;

pub use engine::SyncEngine;
pub use provider::DavProvider;
pub use registry::ProviderRegistry;
pub use scheduler::AutosyncScheduler;

use davsync_core::domain::AccountId;
use thiserror::Error;

/// Errors raised by the orchestration registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No provider is registered for the account's provider tag
    #[error("No provider registered for '{0}'")]
    UnknownProvider(String),

    /// The account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// A provider with the same tag is already registered
    #[error("Provider '{0}' is already registered")]
    DuplicateProvider(String),
}
