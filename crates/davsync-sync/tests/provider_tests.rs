//! Integration tests for DavProvider, ProviderRegistry and AutosyncScheduler

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Notify;

use davsync_core::domain::{
    Account, AccountStatus, Folder, FolderId, FolderStatus, LocalFolderKind, RemoteFolder,
    SyncContext, SyncError, SyncToken,
};
use davsync_core::ports::{
    IDavTransport, IStateRepository, LocalChange, PushedChange, RemoteChanges, SyncProvider,
};
use davsync_sync::{AutosyncScheduler, DavProvider, ProviderRegistry, RegistryError};

use common::*;

/// Transport whose folder listing waits until released
struct GatedTransport {
    inner: Arc<FakeTransport>,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait::async_trait]
impl IDavTransport for GatedTransport {
    async fn list_folders(&self, account: &Account) -> anyhow::Result<Vec<RemoteFolder>> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.list_folders(account).await
    }

    async fn fetch_changes(
        &self,
        account: &Account,
        folder: &Folder,
        token: Option<&SyncToken>,
    ) -> anyhow::Result<RemoteChanges> {
        self.inner.fetch_changes(account, folder, token).await
    }

    async fn push_changes(
        &self,
        account: &Account,
        folder: &Folder,
        changes: &[LocalChange],
    ) -> anyhow::Result<Vec<PushedChange>> {
        self.inner.push_changes(account, folder, changes).await
    }
}

fn dav_registry(h: &Harness) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new(h.repo.clone());
    registry.register(Arc::new(h.provider())).unwrap();
    registry
}

// ============================================================================
// DavProvider
// ============================================================================

#[tokio::test]
async fn test_provider_defaults() {
    let h = harness().await;
    let provider = h.provider();

    assert_eq!(provider.provider_tag(), "dav");

    let account = provider.new_account_entry();
    assert_eq!(*account.status(), AccountStatus::Disabled);
    assert_eq!(account.provider(), "dav");
    assert_eq!(account.server_type(), "custom");
    assert!(account.https());
    assert_eq!(account.autosync_minutes(), 0);

    let mut account = Account::new("Work", "dav.example.com", "alice");
    account.set_download_only(true);
    let folder = provider.new_folder_entry(&account, FolderId::new("/a/").unwrap());
    assert!(folder.download_only());
    assert!(!folder.is_selected());
    assert_eq!(*folder.status(), FolderStatus::None);

    assert_eq!(provider.local_folder_kind("carddav"), LocalFolderKind::Contact);
    assert_eq!(provider.local_folder_kind("caldav"), LocalFolderKind::Event);
    assert_eq!(
        provider.local_folder_kind("webcal").to_string(),
        "unknown (webcal)"
    );
}

#[tokio::test]
async fn test_init_without_calendar() {
    let h = harness().await;
    let provider = h.provider();
    assert!(provider.engine().folder_kinds().calendar_available);

    provider.init(false);
    assert!(!provider.engine().folder_kinds().calendar_available);
}

#[tokio::test]
async fn test_create_targets() {
    let h = harness().await;
    let provider = h.provider();
    let account = h.enabled_account().await;
    let folder_id = FolderId::new("/a/").unwrap();

    let book = provider
        .create_address_book("Family", &account, &folder_id)
        .await
        .unwrap();
    let calendar = provider
        .create_calendar("Work", &account, &folder_id, "#00ff00")
        .await
        .unwrap();

    assert_eq!(book.as_str(), "target-0");
    assert_eq!(calendar.as_str(), "target-1");
    let created = h.targets.created.lock().unwrap().clone();
    assert_eq!(created[1].color.as_deref(), Some("#00ff00"));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_disable_then_enable_restores_folders() {
    let h = harness().await;
    let provider = h.provider();
    let mut account = h.enabled_account().await;
    account.set_sync_marker("ctag", "7");
    h.repo.save_account(&account).await.unwrap();
    seed(
        &h,
        &account,
        &[
            ("/a/", "carddav", true),
            ("/b/", "caldav", false),
            ("/c/", "webcal", false),
        ],
    )
    .await;
    provider
        .start(SyncContext::new(*account.id()), "sync")
        .await
        .unwrap();
    let target = h.folder(account.id(), "/a/").await.target().cloned();
    assert!(target.is_some());

    let disabled = provider.disable_account(account.id()).await.unwrap();
    assert_eq!(*disabled.status(), AccountStatus::Disabled);
    assert!(disabled.sync_markers().is_empty());
    let folders = h.folders(account.id()).await;
    assert!(folders.iter().all(|f| f.is_cached()));
    assert_eq!(*folders[0].status(), FolderStatus::None);
    assert_eq!(*folders[2].status(), FolderStatus::NotSupported);

    let enabled = provider.enable_account(account.id()).await.unwrap();
    assert_eq!(*enabled.status(), AccountStatus::NotSyncronized);
    assert!(enabled.last_sync().is_none());

    let folders = h.folders(account.id()).await;
    let ids: Vec<&str> = folders.iter().map(|f| f.folder_id().as_str()).collect();
    assert_eq!(ids, vec!["/a/", "/b/", "/c/"]);
    assert!(folders.iter().all(|f| !f.is_cached()));
    assert!(folders[0].is_selected());
    assert_eq!(folders[0].target().cloned(), target);
    assert_eq!(*folders[2].status(), FolderStatus::NotSupported);
    // No network access needed
    assert_eq!(h.transport.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_enable_unknown_account() {
    let h = harness().await;
    let provider = h.provider();
    let account = Account::new("Ghost", "dav.example.com", "nobody");

    let err = provider.enable_account(account.id()).await.unwrap_err();
    assert!(err.to_string().contains("Account not found"));
}

// ============================================================================
// ProviderRegistry
// ============================================================================

#[tokio::test]
async fn test_duplicate_provider() {
    let h = harness().await;
    let mut registry = dav_registry(&h);
    let err = registry.register(Arc::new(h.provider())).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateProvider(tag) if tag == "dav"));
}

#[tokio::test]
async fn test_run_job_without_provider() {
    let h = harness().await;
    let account = h.enabled_account().await;
    let registry = ProviderRegistry::new(h.repo.clone());

    let err = registry
        .run_job(SyncContext::new(*account.id()), "sync")
        .await
        .unwrap_err();
    assert!(err.is_unexpected());
    assert!(err.to_string().contains("No provider registered for 'dav'"));
}

#[tokio::test]
async fn test_run_job_routes_to_provider() {
    let h = harness().await;
    let account = h.enabled_account().await;
    seed(&h, &account, &[("/a/", "carddav", true)]).await;
    let registry = dav_registry(&h);

    let report = registry
        .run_job(SyncContext::new(*account.id()), "sync")
        .await
        .unwrap();

    assert_eq!(report.counters.folders_synced, 1);
    assert!(!registry.is_running(account.id()).await);
}

#[tokio::test]
async fn test_run_job_skips_disabled_account() {
    let h = harness().await;
    let account = h.enabled_account().await;
    let registry = dav_registry(&h);
    registry.disable_account(account.id()).await.unwrap();

    let err = registry
        .run_job(SyncContext::new(*account.id()), "sync")
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::AccountDisabled(_)));
    assert!(err.to_string().contains("Account is disabled"));
    assert_eq!(h.transport.list_calls.load(Ordering::SeqCst), 0);
    assert!(h.notifications.errors().is_empty());
    assert!(h.notifications.finished_events().is_empty());
}

#[tokio::test]
async fn test_abort_without_running_job() {
    let h = harness().await;
    let account = h.enabled_account().await;
    let registry = dav_registry(&h);
    assert!(!registry.abort(account.id()).await);
}

#[tokio::test]
async fn test_abort_running_job() {
    let h = harness().await;
    let account = h.enabled_account().await;
    seed(&h, &account, &[("/a/", "carddav", true)]).await;

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let transport = Arc::new(GatedTransport {
        inner: h.transport.clone(),
        entered: entered.clone(),
        release: release.clone(),
    });
    let provider = DavProvider::new(
        transport,
        h.targets.clone(),
        h.repo.clone(),
        h.notifications.clone(),
        &h.config,
    );
    let mut registry = ProviderRegistry::new(h.repo.clone());
    registry.register(Arc::new(provider)).unwrap();
    let registry = Arc::new(registry);

    let account_id = *account.id();
    let job = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.run_job(SyncContext::new(account_id), "sync").await })
    };

    entered.notified().await;
    assert!(registry.is_running(&account_id).await);
    assert!(registry.abort(&account_id).await);
    release.notify_one();

    let report = job.await.unwrap().unwrap();
    assert_eq!(report.counters.folders_synced, 0);
    assert!(h.transport.fetched().is_empty());
    assert_eq!(*h.folder(&account_id, "/a/").await.status(), FolderStatus::Pending);
    assert!(!registry.is_running(&account_id).await);
}

#[tokio::test]
async fn test_disable_waits_for_running_job() {
    let h = harness().await;
    let account = h.enabled_account().await;
    seed(&h, &account, &[("/a/", "carddav", true)]).await;

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let transport = Arc::new(GatedTransport {
        inner: h.transport.clone(),
        entered: entered.clone(),
        release: release.clone(),
    });
    let provider = DavProvider::new(
        transport,
        h.targets.clone(),
        h.repo.clone(),
        h.notifications.clone(),
        &h.config,
    );
    let mut registry = ProviderRegistry::new(h.repo.clone());
    registry.register(Arc::new(provider)).unwrap();
    let registry = Arc::new(registry);

    let account_id = *account.id();
    let job = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.run_job(SyncContext::new(account_id), "sync").await })
    };
    entered.notified().await;

    let disable = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.disable_account(&account_id).await })
    };
    tokio::task::yield_now().await;
    release.notify_one();

    job.await.unwrap().unwrap();
    let disabled = disable.await.unwrap().unwrap();

    assert_eq!(*disabled.status(), AccountStatus::Disabled);
    assert_eq!(*h.account(&account_id).await.status(), AccountStatus::Disabled);
    assert!(h.folders(&account_id).await.iter().all(|f| f.is_cached()));
}

#[tokio::test]
async fn test_remove_account() {
    let h = harness().await;
    let account = h.enabled_account().await;
    seed(&h, &account, &[("/a/", "carddav", true)]).await;
    let registry = dav_registry(&h);

    registry.remove_account(account.id()).await.unwrap();

    assert!(h.repo.get_account(account.id()).await.unwrap().is_none());
    assert!(h.folders(account.id()).await.is_empty());
}

// ============================================================================
// AutosyncScheduler
// ============================================================================

#[tokio::test]
async fn test_autosync_runs_due_accounts_once_per_interval() {
    let h = harness().await;
    let mut due = h.enabled_account().await;
    due.set_autosync_minutes(5);
    h.repo.save_account(&due).await.unwrap();
    let manual = h.enabled_account().await;

    let registry = Arc::new(dav_registry(&h));
    let scheduler = AutosyncScheduler::new(registry, h.repo.clone(), &h.config);
    let now = Utc::now();

    assert_eq!(scheduler.due_accounts(now).await.unwrap(), vec![*due.id()]);
    assert_eq!(scheduler.run_due(now).await.unwrap(), 1);
    assert_eq!(*h.account(due.id()).await.status(), AccountStatus::Ok);
    assert_eq!(
        *h.account(manual.id()).await.status(),
        AccountStatus::NotSyncronized
    );

    assert_eq!(scheduler.run_due(now).await.unwrap(), 0);
    assert_eq!(h.transport.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_autosync_stops_on_shutdown() {
    let h = harness().await;
    let registry = Arc::new(dav_registry(&h));
    let scheduler = AutosyncScheduler::new(registry, h.repo.clone(), &h.config);
    let shutdown = tokio_util::sync::CancellationToken::new();
    shutdown.cancel();

    tokio::time::timeout(std::time::Duration::from_secs(5), scheduler.run(shutdown))
        .await
        .expect("scheduler did not stop");
}
