//! Domain error types
//!
//! This module defines two families of errors:
//!
//! - [`DomainError`]: validation failures and invalid state transitions on
//!   domain entities.
//! - [`ProviderError`] / [`SyncError`]: the classified failure taxonomy of a
//!   sync run. A `ProviderError` is an expected failure tagged with an
//!   [`ErrorKind`]; anything else that goes wrong during a run is an
//!   unexpected fault carried by [`SyncError::Unexpected`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::newtypes::AccountId;

/// Status message stored on an account when a run fails for an unclassified reason
pub const GENERIC_FAILURE: &str = "unexpected error";

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Invalid folder identifier
    #[error("Invalid folder ID: {0}")]
    InvalidFolderId(String),

    /// Invalid target handle
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Invalid sync token
    #[error("Invalid sync token: {0}")]
    InvalidSyncToken(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// A folder cannot be bound to a local target in its current configuration
    #[error("Target binding not allowed: {0}")]
    TargetNotAllowed(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

// ============================================================================
// Classified provider errors
// ============================================================================

/// Kind tag of an expected provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The orchestrator was asked to run a job it does not know
    UnknownJob,
    /// The server rejected the credentials
    AuthFailure,
    /// The server could not be reached or the connection dropped
    NetworkFailure,
    /// The server answered with something that could not be understood
    ParseFailure,
    /// The folder type has no local counterpart
    UnsupportedFolderType,
}

impl ErrorKind {
    /// Returns true if this kind must stop the whole run
    ///
    /// Non-fatal kinds are isolated to the folder that produced them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::AuthFailure)
    }

    /// Returns true if retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::NetworkFailure)
    }

    /// Returns the stable tag of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownJob => "unknown-job",
            ErrorKind::AuthFailure => "auth-failure",
            ErrorKind::NetworkFailure => "network-failure",
            ErrorKind::ParseFailure => "parse-failure",
            ErrorKind::UnsupportedFolderType => "unsupported-folder-type",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expected, kind-tagged failure raised by the provider or its collaborators
///
/// Transport and target adapters return `anyhow::Error`; wrapping a
/// `ProviderError` in it (directly or under `.context(...)`) is how an adapter
/// marks a failure as classified.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    kind: ErrorKind,
    message: String,
}

impl ProviderError {
    /// Creates a new classified error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error for a job name the orchestrator does not recognize
    pub fn unknown_job(job: &str) -> Self {
        Self::new(ErrorKind::UnknownJob, format!("unknown::{job}"))
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthFailure, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkFailure, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailure, message)
    }

    pub fn unsupported_folder_type(folder_type: &str) -> Self {
        Self::new(
            ErrorKind::UnsupportedFolderType,
            format!("folder type '{folder_type}' has no local counterpart"),
        )
    }

    /// Returns the kind tag
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error must stop the whole run
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

// ============================================================================
// Run-level error
// ============================================================================

/// Failure of a sync run (or of one folder inside it), after classification
#[derive(Debug, Error)]
pub enum SyncError {
    /// An expected failure carrying a kind tag
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The account was disabled when the run was asked for; nothing ran
    #[error("Account is disabled: {0}")]
    AccountDisabled(AccountId),

    /// Anything not raised as a `ProviderError`; always fatal to the run
    #[error("unexpected error: {0:#}")]
    Unexpected(anyhow::Error),
}

impl SyncError {
    /// Classifies an adapter error
    ///
    /// Walks the error chain looking for a [`ProviderError`]; if none is found
    /// the error is unexpected.
    pub fn classify(err: anyhow::Error) -> Self {
        let classified = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ProviderError>())
            .cloned();
        match classified {
            Some(provider_error) => SyncError::Provider(provider_error),
            None => SyncError::Unexpected(err),
        }
    }

    /// Returns the kind tag for classified errors
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SyncError::Provider(e) => Some(e.kind()),
            SyncError::AccountDisabled(_) | SyncError::Unexpected(_) => None,
        }
    }

    /// Returns true if this error must stop the run
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Provider(e) => e.is_fatal(),
            SyncError::AccountDisabled(_) | SyncError::Unexpected(_) => true,
        }
    }

    /// Returns true if the same request may succeed when retried
    pub fn is_transient(&self) -> bool {
        self.kind().is_some_and(|kind| kind.is_transient())
    }

    /// Returns true for unclassified faults
    pub fn is_unexpected(&self) -> bool {
        matches!(self, SyncError::Unexpected(_))
    }

    /// Message recorded on the account or folder status
    ///
    /// Classified errors keep their own message; unexpected faults collapse to
    /// [`GENERIC_FAILURE`] so internal details stay in the diagnostic channel.
    pub fn status_message(&self) -> String {
        match self {
            SyncError::Provider(e) => e.to_string(),
            SyncError::AccountDisabled(_) => "account disabled".to_string(),
            SyncError::Unexpected(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::classify(err)
    }
}

impl From<DomainError> for SyncError {
    fn from(err: DomainError) -> Self {
        SyncError::Unexpected(err.into())
    }
}
