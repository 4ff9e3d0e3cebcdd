//! Folders command - Show and select the folders of an account

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use davsync_core::domain::{AccountId, Folder, FolderId};
use davsync_core::ports::{FolderRowData, IStateRepository};
use davsync_core::usecases::FolderRows;
use tracing::info;

use super::{parse_account_id, AppContext};

#[derive(Debug, Subcommand)]
pub enum FoldersCommand {
    /// List the folders of an account in their stored order
    List {
        /// Account id
        account: String,
    },
    /// Sync a folder on the next run
    Select {
        /// Account id
        account: String,
        /// Folder id (collection href)
        folder: String,
    },
    /// Stop syncing a folder
    Deselect {
        /// Account id
        account: String,
        /// Folder id (collection href)
        folder: String,
    },
}

impl FoldersCommand {
    pub async fn execute(&self, app: &AppContext) -> Result<()> {
        let repo: Arc<dyn IStateRepository + Send + Sync> = app.open_repository().await?;

        match self {
            FoldersCommand::List { account } => {
                let account_id = parse_account_id(account)?;
                let rows = FolderRows::new(repo).sorted_folder_data(&account_id).await?;
                print_rows(app, &rows);
                Ok(())
            }
            FoldersCommand::Select { account, folder } => {
                let folder = set_selected(repo.as_ref(), account, folder, true).await?;
                app.formatter()
                    .success(&format!("Selected {} ({})", folder.name(), folder.folder_id()));
                Ok(())
            }
            FoldersCommand::Deselect { account, folder } => {
                let folder = set_selected(repo.as_ref(), account, folder, false).await?;
                app.formatter()
                    .success(&format!("Deselected {} ({})", folder.name(), folder.folder_id()));
                Ok(())
            }
        }
    }
}

/// Changes the selection flag of one visible folder
///
/// Cached folders belong to a disabled account or are gone from the server
/// and cannot be selected.
async fn set_selected(
    repo: &dyn IStateRepository,
    account: &str,
    folder: &str,
    selected: bool,
) -> Result<Folder> {
    let account_id: AccountId = parse_account_id(account)?;
    let folder_id = FolderId::new(folder)?;

    let mut folder = repo
        .get_folder(&account_id, &folder_id)
        .await
        .context("Failed to load folder")?
        .with_context(|| format!("Folder not found: {}", folder_id))?;
    if folder.is_cached() {
        anyhow::bail!("Folder {} is cached and cannot be changed", folder_id);
    }

    folder.set_selected(selected);
    repo.save_folder(&folder)
        .await
        .context("Failed to save folder")?;
    info!(account_id = %account_id, folder_id = %folder_id, selected, "Folder selection changed");
    Ok(folder)
}

fn print_rows(app: &AppContext, rows: &[FolderRowData]) {
    let formatter = app.formatter();
    if app.is_json() {
        let json = serde_json::to_value(rows).unwrap_or_default();
        formatter.print_json(&json);
        return;
    }

    if rows.is_empty() {
        formatter.info("No folders known yet. They are discovered on the next sync.");
        return;
    }

    formatter.success(&format!("{} folder(s)", rows.len()));
    for row in rows {
        let mark = if row.selected { "[x]" } else { "[ ]" };
        let status = if row.status_message.is_empty() {
            String::new()
        } else {
            format!("  {}", row.status_message)
        };
        formatter.info(&format!(
            "{} {} ({}, {}){}",
            mark, row.name, row.kind, row.folder_id, status
        ));
    }
}
