//! DAV transport port (driven/secondary port)
//!
//! This module defines the interface to the remote collection server.
//! Request construction, authentication and XML parsing live in the adapter;
//! the core only sees folder lists and item batches.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//!   Adapters that can tell what went wrong wrap a
//!   [`ProviderError`](crate::domain::ProviderError) so the failure is classified;
//!   any other error is treated as unexpected.
//! - Item payloads (vCard / iCalendar text) are opaque to the core.

use serde::{Deserialize, Serialize};

use crate::domain::{account::Account, folder::Folder, newtypes::SyncToken};

pub use crate::domain::reconcile::RemoteFolder;

// ============================================================================
// Item DTOs
// ============================================================================

/// One remote resource (contact or event)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Resource href, unique within the folder
    pub href: String,
    pub etag: Option<String>,
    /// Raw vCard or iCalendar payload
    pub data: String,
}

/// Changes reported by the server for one folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChanges {
    /// Created or modified resources
    pub items: Vec<RemoteItem>,
    /// Hrefs of resources removed on the server
    pub deleted: Vec<String>,
    /// Token to use for the next incremental fetch
    pub sync_token: Option<SyncToken>,
    /// The server answered with a full listing (first sync, or the stored
    /// token was rejected); the local identity map must be rebuilt
    pub full: bool,
}

/// A local modification waiting to be uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalChange {
    /// Created or modified locally; `href` is `None` for new items
    Upsert {
        local_id: String,
        href: Option<String>,
        data: String,
    },
    /// Deleted locally
    Delete { local_id: String, href: String },
}

impl LocalChange {
    pub fn local_id(&self) -> &str {
        match self {
            LocalChange::Upsert { local_id, .. } | LocalChange::Delete { local_id, .. } => {
                local_id
            }
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, LocalChange::Delete { .. })
    }
}

/// Server acknowledgement of one uploaded change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedChange {
    pub local_id: String,
    pub href: String,
    pub etag: Option<String>,
    pub deleted: bool,
}

// ============================================================================
// IDavTransport trait
// ============================================================================

/// Port trait for DAV server operations
#[async_trait::async_trait]
pub trait IDavTransport: Send + Sync {
    /// Lists the address books and calendars of an account
    async fn list_folders(&self, account: &Account) -> anyhow::Result<Vec<RemoteFolder>>;

    /// Fetches changes of one folder
    ///
    /// If `token` is `None`, returns every item (full sync).
    async fn fetch_changes(
        &self,
        account: &Account,
        folder: &Folder,
        token: Option<&SyncToken>,
    ) -> anyhow::Result<RemoteChanges>;

    /// Uploads local changes of one folder
    async fn push_changes(
        &self,
        account: &Account,
        folder: &Folder,
        changes: &[LocalChange],
    ) -> anyhow::Result<Vec<PushedChange>>;
}
