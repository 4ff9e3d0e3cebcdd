//! Hand-written fakes shared by the orchestration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use davsync_cache::{DatabasePool, SqliteStateRepository};
use davsync_core::config::{Config, ConfigBuilder};
use davsync_core::domain::{
    Account, AccountId, AccountStatus, Folder, FolderId, FolderStatus, ProviderError,
    RemoteFolder, SyncToken, TargetHandle,
};
use davsync_core::ports::{
    FolderRowData, IDavTransport, IFolderListView, INotificationService, IStateRepository,
    ITargetManager, LocalChange, PushedChange, RemoteChanges, RemoteItem, SyncEvent,
};

// ============================================================================
// Scripted failures
// ============================================================================

/// A failure a fake returns instead of its normal answer
#[derive(Debug, Clone)]
pub enum Failure {
    Provider(ProviderError),
    Unexpected(String),
    Panic(String),
}

impl Failure {
    fn raise<T>(self) -> anyhow::Result<T> {
        match self {
            Failure::Provider(e) => Err(e.into()),
            Failure::Unexpected(message) => Err(anyhow::anyhow!(message)),
            Failure::Panic(message) => panic!("{message}"),
        }
    }
}

// ============================================================================
// FakeTransport
// ============================================================================

#[derive(Default)]
pub struct FakeTransport {
    folders: Mutex<Vec<RemoteFolder>>,
    list_failures: Mutex<VecDeque<Failure>>,
    fetch_failures: Mutex<HashMap<String, Failure>>,
    changes: Mutex<HashMap<String, RemoteChanges>>,
    pub list_calls: AtomicUsize,
    pub fetched: Mutex<Vec<String>>,
    pub tokens_seen: Mutex<Vec<Option<String>>>,
    pub pushed: Mutex<Vec<LocalChange>>,
}

impl FakeTransport {
    pub fn set_folders(&self, folders: Vec<RemoteFolder>) {
        *self.folders.lock().unwrap() = folders;
    }

    /// The next `list_folders` calls fail, one failure per call
    pub fn fail_listing(&self, failures: Vec<Failure>) {
        self.list_failures.lock().unwrap().extend(failures);
    }

    /// Every fetch of `folder_id` fails
    pub fn fail_fetch(&self, folder_id: &str, failure: Failure) {
        self.fetch_failures
            .lock()
            .unwrap()
            .insert(folder_id.to_string(), failure);
    }

    pub fn clear_fetch_failures(&self) {
        self.fetch_failures.lock().unwrap().clear();
    }

    pub fn set_changes(&self, folder_id: &str, changes: RemoteChanges) {
        self.changes
            .lock()
            .unwrap()
            .insert(folder_id.to_string(), changes);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IDavTransport for FakeTransport {
    async fn list_folders(&self, _account: &Account) -> anyhow::Result<Vec<RemoteFolder>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.list_failures.lock().unwrap().pop_front();
        if let Some(failure) = failure {
            return failure.raise();
        }
        Ok(self.folders.lock().unwrap().clone())
    }

    async fn fetch_changes(
        &self,
        _account: &Account,
        folder: &Folder,
        token: Option<&SyncToken>,
    ) -> anyhow::Result<RemoteChanges> {
        let id = folder.folder_id().as_str().to_string();
        self.fetched.lock().unwrap().push(id.clone());
        self.tokens_seen
            .lock()
            .unwrap()
            .push(token.map(|t| t.as_str().to_string()));

        let failure = self.fetch_failures.lock().unwrap().get(&id).cloned();
        if let Some(failure) = failure {
            return failure.raise();
        }
        let changes = self.changes.lock().unwrap().get(&id).cloned();
        Ok(changes.unwrap_or_else(|| RemoteChanges {
            sync_token: Some(SyncToken::new(format!("{id}#1")).unwrap()),
            full: token.is_none(),
            ..RemoteChanges::default()
        }))
    }

    async fn push_changes(
        &self,
        _account: &Account,
        _folder: &Folder,
        changes: &[LocalChange],
    ) -> anyhow::Result<Vec<PushedChange>> {
        self.pushed.lock().unwrap().extend_from_slice(changes);
        Ok(changes
            .iter()
            .map(|change| match change {
                LocalChange::Upsert { local_id, href, .. } => PushedChange {
                    local_id: local_id.clone(),
                    href: href.clone().unwrap_or_else(|| format!("/new/{local_id}.vcf")),
                    etag: Some("\"1\"".to_string()),
                    deleted: false,
                },
                LocalChange::Delete { local_id, href } => PushedChange {
                    local_id: local_id.clone(),
                    href: href.clone(),
                    etag: None,
                    deleted: true,
                },
            })
            .collect())
    }
}

// ============================================================================
// FakeTargets
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTarget {
    pub kind: &'static str,
    pub name: String,
    pub color: Option<String>,
    pub folder_id: String,
}

#[derive(Default)]
pub struct FakeTargets {
    next_handle: AtomicUsize,
    pub created: Mutex<Vec<CreatedTarget>>,
    pub items: Mutex<HashMap<String, BTreeMap<String, String>>>,
    pub local: Mutex<HashMap<String, Vec<LocalChange>>>,
    pub resets: AtomicUsize,
}

impl FakeTargets {
    fn create(&self, created: CreatedTarget) -> TargetHandle {
        let n = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(created);
        TargetHandle::new(format!("target-{n}")).unwrap()
    }

    pub fn queue_local_change(&self, target: &str, change: LocalChange) {
        self.local
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push(change);
    }

    pub fn items_of(&self, target: &str) -> BTreeMap<String, String> {
        self.items
            .lock()
            .unwrap()
            .get(target)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ITargetManager for FakeTargets {
    async fn create_address_book(
        &self,
        name: &str,
        _account: &Account,
        folder_id: &FolderId,
    ) -> anyhow::Result<TargetHandle> {
        Ok(self.create(CreatedTarget {
            kind: "addressbook",
            name: name.to_string(),
            color: None,
            folder_id: folder_id.as_str().to_string(),
        }))
    }

    async fn create_calendar(
        &self,
        name: &str,
        _account: &Account,
        folder_id: &FolderId,
        color: &str,
    ) -> anyhow::Result<TargetHandle> {
        Ok(self.create(CreatedTarget {
            kind: "calendar",
            name: name.to_string(),
            color: Some(color.to_string()),
            folder_id: folder_id.as_str().to_string(),
        }))
    }

    async fn apply_remote_item(&self, target: &TargetHandle, item: &RemoteItem) -> anyhow::Result<()> {
        self.items
            .lock()
            .unwrap()
            .entry(target.as_str().to_string())
            .or_default()
            .insert(item.href.clone(), item.data.clone());
        Ok(())
    }

    async fn remove_remote_item(&self, target: &TargetHandle, href: &str) -> anyhow::Result<bool> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .get_mut(target.as_str())
            .and_then(|items| items.remove(href))
            .is_some())
    }

    async fn reset_target(&self, _target: &TargetHandle) -> anyhow::Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn local_changes(&self, target: &TargetHandle) -> anyhow::Result<Vec<LocalChange>> {
        Ok(self
            .local
            .lock()
            .unwrap()
            .get(target.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_pushed(&self, target: &TargetHandle, pushed: &[PushedChange]) -> anyhow::Result<()> {
        let mut local = self.local.lock().unwrap();
        if let Some(changes) = local.get_mut(target.as_str()) {
            changes.retain(|c| !pushed.iter().any(|p| p.local_id == c.local_id()));
        }
        Ok(())
    }
}

// ============================================================================
// RecordingNotifications
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifications {
    pub events: Mutex<Vec<SyncEvent>>,
    pub errors: Mutex<Vec<(AccountId, String)>>,
}

impl RecordingNotifications {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<(AccountId, String)> {
        self.errors.lock().unwrap().clone()
    }

    pub fn finished_events(&self) -> Vec<AccountStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SyncEvent::AccountFinished { status, .. } => Some(status),
                _ => None,
            })
            .collect()
    }

    /// Statuses published for one folder, in order
    pub fn folder_statuses(&self, folder_id: &str) -> Vec<FolderStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SyncEvent::FolderStatusChanged {
                    folder_id: id,
                    status,
                    ..
                } if id.as_str() == folder_id => Some(status),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl INotificationService for RecordingNotifications {
    async fn publish(&self, event: &SyncEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn report_error(&self, account_id: &AccountId, details: &str) -> anyhow::Result<()> {
        self.errors
            .lock()
            .unwrap()
            .push((*account_id, details.to_string()));
        Ok(())
    }
}

// ============================================================================
// FlakyRepository
// ============================================================================

/// Delegates to SQLite but can fail folder saves of one status
pub struct FlakyRepository {
    inner: SqliteStateRepository,
    fail_saving: Mutex<Option<FolderStatus>>,
}

impl FlakyRepository {
    pub fn fail_saving_status(&self, status: FolderStatus) {
        *self.fail_saving.lock().unwrap() = Some(status);
    }
}

#[async_trait::async_trait]
impl IStateRepository for FlakyRepository {
    async fn save_account(&self, account: &Account) -> anyhow::Result<()> {
        self.inner.save_account(account).await
    }

    async fn get_account(&self, id: &AccountId) -> anyhow::Result<Option<Account>> {
        self.inner.get_account(id).await
    }

    async fn list_accounts(&self) -> anyhow::Result<Vec<Account>> {
        self.inner.list_accounts().await
    }

    async fn delete_account(&self, id: &AccountId) -> anyhow::Result<()> {
        self.inner.delete_account(id).await
    }

    async fn get_folders(&self, account_id: &AccountId) -> anyhow::Result<Vec<Folder>> {
        self.inner.get_folders(account_id).await
    }

    async fn get_folder(
        &self,
        account_id: &AccountId,
        folder_id: &FolderId,
    ) -> anyhow::Result<Option<Folder>> {
        self.inner.get_folder(account_id, folder_id).await
    }

    async fn save_folder(&self, folder: &Folder) -> anyhow::Result<()> {
        let failing = self.fail_saving.lock().unwrap().clone();
        if failing.as_ref() == Some(folder.status()) {
            anyhow::bail!("disk I/O error");
        }
        self.inner.save_folder(folder).await
    }

    async fn replace_folders(&self, account_id: &AccountId, folders: &[Folder]) -> anyhow::Result<()> {
        self.inner.replace_folders(account_id, folders).await
    }

    async fn delete_folder(&self, account_id: &AccountId, folder_id: &FolderId) -> anyhow::Result<()> {
        self.inner.delete_folder(account_id, folder_id).await
    }
}

// ============================================================================
// RecordingView
// ============================================================================

#[derive(Default)]
pub struct RecordingView {
    pub added: Mutex<Vec<FolderRowData>>,
    pub updated: Mutex<Vec<FolderRowData>>,
}

impl IFolderListView for RecordingView {
    fn add_row(&self, row: &FolderRowData) {
        self.added.lock().unwrap().push(row.clone());
    }

    fn update_row(&self, row: &FolderRowData) {
        self.updated.lock().unwrap().push(row.clone());
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub repo: Arc<FlakyRepository>,
    pub transport: Arc<FakeTransport>,
    pub targets: Arc<FakeTargets>,
    pub notifications: Arc<RecordingNotifications>,
    pub config: Config,
}

/// Config with a 1 ms retry delay
pub fn test_config() -> Config {
    ConfigBuilder::new()
        .sync_max_retries(2)
        .sync_retry_base_delay_ms(1)
        .build()
}

pub async fn harness() -> Harness {
    harness_with(test_config()).await
}

pub async fn harness_with(config: Config) -> Harness {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    Harness {
        repo: Arc::new(FlakyRepository {
            inner: SqliteStateRepository::new(pool.pool().clone()),
            fail_saving: Mutex::new(None),
        }),
        transport: Arc::new(FakeTransport::default()),
        targets: Arc::new(FakeTargets::default()),
        notifications: Arc::new(RecordingNotifications::default()),
        config,
    }
}

impl Harness {
    pub fn engine(&self) -> davsync_sync::SyncEngine {
        davsync_sync::SyncEngine::new(
            self.transport.clone(),
            self.targets.clone(),
            self.repo.clone(),
            self.notifications.clone(),
            &self.config,
        )
    }

    pub fn provider(&self) -> davsync_sync::DavProvider {
        davsync_sync::DavProvider::new(
            self.transport.clone(),
            self.targets.clone(),
            self.repo.clone(),
            self.notifications.clone(),
            &self.config,
        )
    }

    /// Saves an enabled account that was never synced
    pub async fn enabled_account(&self) -> Account {
        let mut account = Account::new("Work", "dav.example.com", "alice");
        account.set_status(AccountStatus::NotSyncronized);
        self.repo.save_account(&account).await.unwrap();
        account
    }

    pub async fn account(&self, id: &AccountId) -> Account {
        self.repo.get_account(id).await.unwrap().unwrap()
    }

    pub async fn folders(&self, id: &AccountId) -> Vec<Folder> {
        self.repo.get_folders(id).await.unwrap()
    }

    pub async fn folder(&self, account_id: &AccountId, folder_id: &str) -> Folder {
        self.repo
            .get_folder(account_id, &FolderId::new(folder_id).unwrap())
            .await
            .unwrap()
            .unwrap()
    }

    /// Marks the given folders selected
    pub async fn select(&self, account_id: &AccountId, folder_ids: &[&str]) {
        for id in folder_ids {
            let mut folder = self.folder(account_id, id).await;
            folder.set_selected(true);
            self.repo.save_folder(&folder).await.unwrap();
        }
    }
}

pub fn remote(id: &str, folder_type: &str) -> RemoteFolder {
    RemoteFolder::new(FolderId::new(id).unwrap(), folder_type, format!("Folder {id}"))
}

pub fn network_failure() -> Failure {
    Failure::Provider(ProviderError::network("connection reset by peer"))
}

pub fn auth_failure() -> Failure {
    Failure::Provider(ProviderError::auth("401 Unauthorized"))
}

/// Stores folders in the registry before a run, in the given order
pub async fn seed(harness: &Harness, account: &Account, folders: &[(&str, &str, bool)]) {
    for (id, folder_type, selected) in folders {
        let mut folder = Folder::new_entry(account, FolderId::new(*id).unwrap());
        folder.update_remote(format!("Folder {id}"), *folder_type, None);
        folder.set_selected(*selected);
        harness.repo.save_folder(&folder).await.unwrap();
    }
    harness.transport.set_folders(
        folders
            .iter()
            .map(|(id, folder_type, _)| remote(id, folder_type))
            .collect(),
    );
}
