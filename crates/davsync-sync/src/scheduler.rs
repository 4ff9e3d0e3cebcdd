//! Autosync scheduler
//!
//! The [`AutosyncScheduler`] periodically looks for enabled accounts whose
//! autosync interval (`autosync_minutes`, 0 = off) has elapsed and starts a
//! `sync` job for each of them through the [`ProviderRegistry`].
//!
//! ## Flow
//!
//! ```text
//! interval tick ──→ due_accounts() ──→ registry.run_job(ctx, "sync")  (one per account, concurrently)
//!       │
//!  CancellationToken ──→ stop
//! ```
//!
//! An account is due when neither its last successful sync nor the
//! scheduler's last attempt for it lies within the interval, so a failing
//! account is retried once per interval rather than on every tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use davsync_core::config::Config;
use davsync_core::domain::{Account, AccountId, SyncContext, SyncJob};
use davsync_core::ports::IStateRepository;

use crate::registry::ProviderRegistry;

/// Returns true if `account` should be synced at `now`
fn is_due(account: &Account, last_attempt: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let minutes = account.autosync_minutes();
    if minutes == 0 || !account.status().is_enabled() {
        return false;
    }

    let last = match (account.last_sync(), last_attempt) {
        (Some(synced), Some(attempted)) => Some(synced.max(attempted)),
        (synced, attempted) => synced.or(attempted),
    };
    match last {
        None => true,
        Some(last) => now - last >= chrono::Duration::minutes(i64::from(minutes)),
    }
}

/// Shortest period between two autosync checks
const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Check period from configuration, never below [`MIN_CHECK_INTERVAL`]
fn check_interval(config: &Config) -> Duration {
    Duration::from_secs(config.sync.autosync_check_secs).max(MIN_CHECK_INTERVAL)
}

/// Starts periodic `sync` jobs
pub struct AutosyncScheduler {
    registry: Arc<ProviderRegistry>,
    state_repository: Arc<dyn IStateRepository + Send + Sync>,
    check_interval: Duration,
    last_attempt: Mutex<HashMap<AccountId, DateTime<Utc>>>,
}

impl AutosyncScheduler {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        state_repository: Arc<dyn IStateRepository + Send + Sync>,
        config: &Config,
    ) -> Self {
        Self {
            registry,
            state_repository,
            check_interval: check_interval(config),
            last_attempt: Mutex::new(HashMap::new()),
        }
    }

    /// Accounts whose autosync interval has elapsed at `now`
    ///
    /// Accounts with a job already running are skipped.
    pub async fn due_accounts(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<AccountId>> {
        let accounts = self
            .state_repository
            .list_accounts()
            .await
            .context("Failed to list accounts")?;

        let attempts = self.last_attempt.lock().await;
        let mut due = Vec::new();
        for account in accounts {
            if !is_due(&account, attempts.get(account.id()).copied(), now) {
                continue;
            }
            if self.registry.is_running(account.id()).await {
                debug!(account_id = %account.id(), "Job already running, skipping autosync");
                continue;
            }
            due.push(*account.id());
        }
        Ok(due)
    }

    /// Runs a `sync` job for every due account
    ///
    /// Returns the number of jobs started. Job failures are logged; they are
    /// already recorded on the account by finalization.
    pub async fn run_due(&self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let due = self.due_accounts(now).await?;
        {
            let mut attempts = self.last_attempt.lock().await;
            for account_id in &due {
                attempts.insert(*account_id, now);
            }
        }

        let job = SyncJob::Sync.to_string();
        let runs = due.iter().map(|account_id| {
            let job = job.as_str();
            async move {
                match self.registry.run_job(SyncContext::new(*account_id), job).await {
                    Ok(report) => info!(
                        account_id = %account_id,
                        folders_synced = report.counters.folders_synced,
                        folders_failed = report.counters.folders_failed,
                        "Autosync finished"
                    ),
                    Err(e) => warn!(account_id = %account_id, error = %e, "Autosync failed"),
                }
            }
        });
        join_all(runs).await;

        Ok(due.len())
    }

    /// Checks for due accounts until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            check_interval_secs = self.check_interval.as_secs(),
            "Starting autosync scheduler"
        );
        let mut interval = tokio::time::interval(self.check_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_due(Utc::now()).await {
                        warn!(error = %format!("{e:#}"), "Autosync check failed");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping autosync");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use davsync_core::domain::AccountStatus;

    use super::*;

    fn account(minutes: u32, status: AccountStatus) -> Account {
        let mut account = Account::new("Work", "dav.example.com", "alice");
        account.set_autosync_minutes(minutes);
        account.set_status(status);
        account
    }

    #[test]
    fn test_zero_check_interval_is_clamped() {
        let mut config = Config::default();
        config.sync.autosync_check_secs = 0;
        assert_eq!(check_interval(&config), MIN_CHECK_INTERVAL);

        config.sync.autosync_check_secs = 90;
        assert_eq!(check_interval(&config), std::time::Duration::from_secs(90));
    }

    #[test]
    fn test_autosync_off() {
        let now = Utc::now();
        assert!(!is_due(&account(0, AccountStatus::Ok), None, now));
    }

    #[test]
    fn test_disabled_account_never_due() {
        let now = Utc::now();
        assert!(!is_due(&account(5, AccountStatus::Disabled), None, now));
    }

    #[test]
    fn test_never_synced_is_due() {
        let now = Utc::now();
        assert!(is_due(&account(5, AccountStatus::NotSyncronized), None, now));
    }

    #[test]
    fn test_interval_from_last_sync() {
        let now = Utc::now();
        let mut a = account(15, AccountStatus::Ok);
        a.record_sync(now - Duration::minutes(10));
        assert!(!is_due(&a, None, now));
        a.record_sync(now - Duration::minutes(15));
        assert!(is_due(&a, None, now));
    }

    #[test]
    fn test_failed_attempt_waits_for_interval() {
        let now = Utc::now();
        let mut a = account(15, AccountStatus::Error("network-failure: down".to_string()));
        a.record_sync(now - Duration::hours(3));
        assert!(!is_due(&a, Some(now - Duration::minutes(1)), now));
        assert!(is_due(&a, Some(now - Duration::minutes(20)), now));
    }
}
