//! Per-run sync context
//!
//! A [`SyncContext`] lives for one orchestrator run. It is never persisted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    errors::ProviderError,
    newtypes::{AccountId, FolderId},
};

/// Jobs the orchestrator knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncJob {
    /// Discover folders, then sync every selected folder
    Sync,
}

impl SyncJob {
    /// Parses a job name
    ///
    /// # Errors
    /// Returns an `unknown-job` [`ProviderError`] naming the job
    pub fn parse(name: &str) -> Result<Self, ProviderError> {
        match name {
            "sync" => Ok(SyncJob::Sync),
            other => Err(ProviderError::unknown_job(other)),
        }
    }
}

impl std::fmt::Display for SyncJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncJob::Sync => write!(f, "sync"),
        }
    }
}

/// Orchestrator phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Discovering,
    MarkingPending,
    Draining,
    Finalizing,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Discovering => "discovering",
            SyncPhase::MarkingPending => "marking_pending",
            SyncPhase::Draining => "draining",
            SyncPhase::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// Progress counters of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounters {
    pub folders_synced: u32,
    pub folders_failed: u32,
    pub items_downloaded: u32,
    pub items_uploaded: u32,
    pub items_deleted: u32,
}

/// State of one orchestrator run
#[derive(Debug, Clone)]
pub struct SyncContext {
    account_id: AccountId,
    /// Restricts the run to a single folder
    folder_id: Option<FolderId>,
    job: String,
    phase: SyncPhase,
    counters: SyncCounters,
    abort: Arc<AtomicBool>,
}

impl SyncContext {
    /// Creates a context for a run over the whole account
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            folder_id: None,
            job: String::new(),
            phase: SyncPhase::Idle,
            counters: SyncCounters::default(),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restricts the run to one folder
    pub fn for_folder(mut self, folder_id: FolderId) -> Self {
        self.folder_id = Some(folder_id);
        self
    }

    /// Shares an existing abort flag with this context
    pub fn with_abort_flag(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = abort;
        self
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn folder_id(&self) -> Option<&FolderId> {
        self.folder_id.as_ref()
    }

    /// Name of the job this run was started with
    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn set_job(&mut self, job: impl Into<String>) {
        self.job = job.into();
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: SyncPhase) {
        self.phase = phase;
    }

    pub fn counters(&self) -> &SyncCounters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut SyncCounters {
        &mut self.counters
    }

    /// Returns a handle that can abort this run from another task
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Asks the run to stop before the next folder
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }
}
