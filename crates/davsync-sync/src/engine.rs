//! Account sync orchestrator
//!
//! The [`SyncEngine`] runs one job over one account:
//!
//! 1. **Discovering**: reconcile the folder registry with the server
//! 2. **MarkingPending**: queue every syncable folder, announce the new list
//! 3. **Draining**: sync queued folders one by one in persisted order
//! 4. **Finalizing**: record the outcome on the account, always exactly once
//!
//! Finalization also runs when the pipeline panics or fails with an error
//! that no collaborator classified.
//!
//! ## Retry Logic
//!
//! Discovery is retried on transient (network) failures with exponential
//! backoff. The attempt count and base delay come from the `sync` section of
//! the configuration.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use davsync_core::config::Config;
use davsync_core::domain::errors::GENERIC_FAILURE;
use davsync_core::domain::{
    Account, AccountId, AccountStatus, FolderKinds, ProviderError, SyncContext, SyncError,
    SyncJob, SyncPhase,
};
use davsync_core::ports::{
    IDavTransport, INotificationService, IStateRepository, ITargetManager, SyncEvent, SyncReport,
};
use davsync_core::usecases::{
    DiscoverFoldersUseCase, DrainSummary, PendingQueue, SyncFolderUseCase,
};

// ============================================================================
// Retry logic
// ============================================================================

/// Returns true if the error chain carries a transient provider error
fn is_transient_error(err: &anyhow::Error) -> bool {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ProviderError>())
        .is_some_and(|e| e.kind().is_transient())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Orchestrates sync jobs for DAV accounts
///
/// ## Dependencies
///
/// - `transport`: folder listing and item exchange with the server
/// - `targets`: local address books and calendars
/// - `state_repository`: accounts and folder registries
/// - `notifications`: sync events and the diagnostic channel
pub struct SyncEngine {
    state_repository: Arc<dyn IStateRepository + Send + Sync>,
    notifications: Arc<dyn INotificationService + Send + Sync>,
    discovery: DiscoverFoldersUseCase,
    queue: PendingQueue,
    max_retries: u32,
    retry_base_delay: Duration,
    calendar_available: AtomicBool,
}

impl SyncEngine {
    /// Creates a new `SyncEngine` with the given dependencies
    ///
    /// # Arguments
    /// * `transport` - DAV transport (IDavTransport)
    /// * `targets` - Local sync targets (ITargetManager)
    /// * `state_repository` - State persistence (IStateRepository)
    /// * `notifications` - Event sink (INotificationService)
    /// * `config` - Retry, retention and calendar settings
    pub fn new(
        transport: Arc<dyn IDavTransport + Send + Sync>,
        targets: Arc<dyn ITargetManager + Send + Sync>,
        state_repository: Arc<dyn IStateRepository + Send + Sync>,
        notifications: Arc<dyn INotificationService + Send + Sync>,
        config: &Config,
    ) -> Self {
        let worker = Arc::new(SyncFolderUseCase::new(
            Arc::clone(&transport),
            targets,
            Arc::clone(&state_repository),
            config.folders.default_calendar_color.clone(),
        ));

        Self {
            discovery: DiscoverFoldersUseCase::new(
                transport,
                Arc::clone(&state_repository),
                config.retention_policy(),
            ),
            queue: PendingQueue::new(
                Arc::clone(&state_repository),
                Arc::clone(&notifications),
                worker,
            ),
            state_repository,
            notifications,
            max_retries: config.sync.max_retries,
            retry_base_delay: Duration::from_millis(config.sync.retry_base_delay_ms),
            calendar_available: AtomicBool::new(config.sync.calendar_available),
        }
    }

    /// Switches event folders on or off
    pub fn set_calendar_available(&self, available: bool) {
        self.calendar_available.store(available, Ordering::SeqCst);
    }

    /// Local folder kinds that can currently be synced
    pub fn folder_kinds(&self) -> FolderKinds {
        FolderKinds {
            calendar_available: self.calendar_available.load(Ordering::SeqCst),
        }
    }

    /// The pending queue of this engine
    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// Runs `job` for the account of `ctx`
    ///
    /// The account is finalized before this returns, on every path.
    ///
    /// # Errors
    ///
    /// - `unknown-job` if `job` is not a job name this engine runs
    /// - The first fatal error of the run, classified
    #[tracing::instrument(skip(self, ctx), fields(account_id = %ctx.account_id()))]
    pub async fn start(&self, mut ctx: SyncContext, job: &str) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        ctx.set_job(job);

        let result = match SyncJob::parse(job) {
            Ok(SyncJob::Sync) => AssertUnwindSafe(self.run_sync(&mut ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    error!(panic = %message, "Sync run panicked");
                    Err(SyncError::Unexpected(anyhow!("sync run panicked: {message}")))
                }),
            Err(e) => {
                warn!(error = %e, "Rejected job");
                Err(e.into())
            }
        };

        self.finalize(&mut ctx, result, started_at).await
    }

    async fn run_sync(&self, ctx: &mut SyncContext) -> Result<DrainSummary, SyncError> {
        let account_id = *ctx.account_id();
        let mut account = self.load_account(&account_id).await?;
        if !account.status().is_enabled() {
            return Err(SyncError::AccountDisabled(account_id));
        }

        account.set_status(AccountStatus::Syncing);
        self.state_repository
            .save_account(&account)
            .await
            .context("Failed to store account")?;
        let kinds = self.folder_kinds();

        ctx.set_phase(SyncPhase::Discovering);
        let outcome = self
            .with_retry("discover folders", || self.discovery.execute(&account, &kinds))
            .await?;
        debug!(folders = outcome.folders.len(), "Discovery finished");

        ctx.set_phase(SyncPhase::MarkingPending);
        let queued = self.queue.mark_pending(ctx, &kinds).await?;
        self.publish(&SyncEvent::FolderListUpdated { account_id })
            .await;

        ctx.set_phase(SyncPhase::Draining);
        let summary = self.queue.drain(ctx, &account, &kinds).await?;

        info!(
            queued,
            synced = summary.synced,
            failed = summary.failed,
            aborted = summary.aborted,
            "Sync run finished"
        );
        Ok(summary)
    }

    /// Records the outcome of a run; never fails
    ///
    /// The account ends `ok` only if every drained folder synced. Otherwise
    /// it carries the first folder failure, and the report is still returned.
    async fn finalize(
        &self,
        ctx: &mut SyncContext,
        result: Result<DrainSummary, SyncError>,
        started_at: DateTime<Utc>,
    ) -> Result<SyncReport, SyncError> {
        ctx.set_phase(SyncPhase::Finalizing);
        let account_id = *ctx.account_id();

        let (status, folder_message) = match &result {
            Ok(DrainSummary {
                first_error: Some(message),
                ..
            }) => (AccountStatus::Error(message.clone()), GENERIC_FAILURE.to_string()),
            Ok(_) => (AccountStatus::Ok, GENERIC_FAILURE.to_string()),
            Err(e @ SyncError::AccountDisabled(_)) => {
                (AccountStatus::Disabled, e.status_message())
            }
            Err(e) => (
                AccountStatus::Error(e.status_message()),
                e.status_message(),
            ),
        };

        match self.queue.fail_interrupted(&account_id, &folder_message).await {
            Ok(0) => {}
            Ok(count) => warn!(count, "Folders left syncing were marked failed"),
            Err(e) => error!(error = %format!("{e:#}"), "Failed to close interrupted folders"),
        }

        let finished_at = Utc::now();
        if let Err(e) = self.store_outcome(&account_id, &status, finished_at).await {
            error!(error = %format!("{e:#}"), "Failed to store account status");
        }

        if let Err(err) = &result {
            if err.is_unexpected() {
                error!(error = %err, "Sync run failed unexpectedly");
                if let Err(e) = self
                    .notifications
                    .report_error(&account_id, &err.to_string())
                    .await
                {
                    warn!(error = %e, "Failed to report error");
                }
            } else {
                warn!(error = %err, "Sync run failed");
            }
        }

        self.publish(&SyncEvent::AccountFinished {
            account_id,
            status: status.clone(),
        })
        .await;
        ctx.set_phase(SyncPhase::Idle);

        result.map(|_| SyncReport {
            account_id,
            job: ctx.job().to_string(),
            status,
            counters: *ctx.counters(),
            started_at,
            finished_at,
        })
    }

    /// Writes the final status; a disabled account keeps its status
    async fn store_outcome(
        &self,
        account_id: &AccountId,
        status: &AccountStatus,
        finished_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let Some(mut account) = self.state_repository.get_account(account_id).await? else {
            warn!(account_id = %account_id, "Account vanished during the run");
            return Ok(());
        };
        if !account.status().is_enabled() {
            debug!(account_id = %account_id, "Account disabled, keeping its status");
            return Ok(());
        }

        account.set_status(status.clone());
        if *status == AccountStatus::Ok {
            account.record_sync(finished_at);
        }
        self.state_repository.save_account(&account).await
    }

    async fn load_account(&self, account_id: &AccountId) -> anyhow::Result<Account> {
        self.state_repository
            .get_account(account_id)
            .await
            .context("Failed to load account")?
            .with_context(|| format!("Account not found: {account_id}"))
    }

    async fn publish(&self, event: &SyncEvent) {
        if let Err(e) = self.notifications.publish(event).await {
            warn!(account_id = %event.account_id(), error = %e, "Failed to publish event");
        }
    }

    /// Executes an async operation with exponential backoff retry
    ///
    /// Only transient errors are retried; anything else is returned at once.
    async fn with_retry<F, Fut, T>(&self, operation: &str, f: F) -> anyhow::Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_retries && is_transient_error(&err) => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
