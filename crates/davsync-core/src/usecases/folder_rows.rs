//! Folder rows for the account settings UI

use std::sync::Arc;

use anyhow::{Context, Result};

use super::account_settings::type_image;
use crate::{
    domain::{AccountId, Folder, FolderStatus, SyncContext, SyncPhase},
    ports::{FolderRowData, IFolderListView, IStateRepository},
};

/// Status text shown next to a folder
///
/// `ctx` is the run currently owning the folder's account, if any.
pub fn folder_status_message(folder: &Folder, ctx: Option<&SyncContext>) -> String {
    if folder.is_cached() {
        return "cached".to_string();
    }
    match folder.status() {
        FolderStatus::None if folder.is_selected() => "not synchronized".to_string(),
        FolderStatus::None => String::new(),
        FolderStatus::NotSupported => format!("not supported ({})", folder.local_kind()),
        FolderStatus::Pending => match ctx {
            Some(ctx) if ctx.is_aborted() => "aborted".to_string(),
            _ => "waiting to sync".to_string(),
        },
        FolderStatus::Syncing => match ctx {
            Some(ctx) if ctx.phase() == SyncPhase::Draining => {
                let counters = ctx.counters();
                format!(
                    "syncing ({} received, {} sent)",
                    counters.items_downloaded, counters.items_uploaded
                )
            }
            _ => "syncing".to_string(),
        },
        FolderStatus::Ok => "ok".to_string(),
        FolderStatus::Error(message) => format!("error: {message}"),
    }
}

/// Row data of one folder
pub fn folder_row_data(folder: &Folder, ctx: Option<&SyncContext>) -> FolderRowData {
    FolderRowData {
        folder_id: folder.folder_id().clone(),
        selected: folder.is_selected(),
        folder_type: folder.folder_type().to_string(),
        kind: folder.local_kind(),
        type_image: type_image(folder.folder_type()).map(str::to_string),
        name: folder.name().to_string(),
        status_message: folder_status_message(folder, ctx),
    }
}

/// Feeds the folder list widget
pub struct FolderRows {
    state_repository: Arc<dyn IStateRepository + Send + Sync>,
}

impl FolderRows {
    pub fn new(state_repository: Arc<dyn IStateRepository + Send + Sync>) -> Self {
        Self { state_repository }
    }

    /// Row data of every visible folder of an account, in persisted order
    ///
    /// Cached folders are hidden.
    pub async fn sorted_folder_data(&self, account_id: &AccountId) -> Result<Vec<FolderRowData>> {
        let folders = self
            .state_repository
            .get_folders(account_id)
            .await
            .context("Failed to load folders")?;
        Ok(folders
            .iter()
            .filter(|f| !f.is_cached())
            .map(|f| folder_row_data(f, None))
            .collect())
    }

    /// Adds one row per visible folder to `view`
    pub async fn populate(&self, view: &dyn IFolderListView, account_id: &AccountId) -> Result<usize> {
        let rows = self.sorted_folder_data(account_id).await?;
        for row in &rows {
            view.add_row(row);
        }
        Ok(rows.len())
    }

    /// Refreshes the row of `folder` while a run is in progress
    pub fn refresh(&self, view: &dyn IFolderListView, folder: &Folder, ctx: Option<&SyncContext>) {
        view.update_row(&folder_row_data(folder, ctx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, FolderId};

    fn folder(folder_type: &str) -> Folder {
        let account = Account::new("Work", "dav.example.com", "alice");
        let mut folder = Folder::new_entry(&account, FolderId::new("/f/").unwrap());
        folder.update_remote("Family", folder_type, None);
        folder
    }

    #[test]
    fn test_status_messages() {
        let mut f = folder("carddav");
        assert_eq!(folder_status_message(&f, None), "");

        f.set_selected(true);
        assert_eq!(folder_status_message(&f, None), "not synchronized");

        f.mark_pending();
        assert_eq!(folder_status_message(&f, None), "waiting to sync");

        f.set_status(FolderStatus::Error("auth-failure: denied".to_string()));
        assert_eq!(folder_status_message(&f, None), "error: auth-failure: denied");

        f.mark_cached(chrono::Utc::now());
        assert_eq!(folder_status_message(&f, None), "cached");
    }

    #[test]
    fn test_not_supported_names_type() {
        let mut f = folder("webcal");
        f.set_status(FolderStatus::NotSupported);
        assert_eq!(folder_status_message(&f, None), "not supported (unknown (webcal))");
    }

    #[test]
    fn test_progress_while_draining() {
        let mut f = folder("caldav");
        f.set_selected(true);
        f.mark_pending();
        f.start_sync().unwrap();

        let mut ctx = SyncContext::new(*f.account_id());
        assert_eq!(folder_status_message(&f, Some(&ctx)), "syncing");

        ctx.set_phase(SyncPhase::Draining);
        ctx.counters_mut().items_downloaded = 12;
        ctx.counters_mut().items_uploaded = 1;
        assert_eq!(
            folder_status_message(&f, Some(&ctx)),
            "syncing (12 received, 1 sent)"
        );
    }

    #[test]
    fn test_aborted_pending_folder() {
        let mut f = folder("caldav");
        f.set_selected(true);
        f.mark_pending();
        let ctx = SyncContext::new(*f.account_id());
        ctx.request_abort();
        assert_eq!(folder_status_message(&f, Some(&ctx)), "aborted");
    }

    #[test]
    fn test_row_data() {
        let mut f = folder("caldav");
        f.set_selected(true);
        let row = folder_row_data(&f, None);
        assert_eq!(row.folder_id.as_str(), "/f/");
        assert!(row.selected);
        assert_eq!(row.folder_type, "caldav");
        assert_eq!(row.name, "Family");
        assert_eq!(row.status_message, "not synchronized");
        assert_eq!(row.type_image.as_deref(), Some("calendar16.png"));

        let row = folder_row_data(&folder("webcal"), None);
        assert_eq!(row.type_image, None);
    }
}
