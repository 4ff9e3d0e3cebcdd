//! Folder list view port
//!
//! The account settings UI shows one row per folder. The core hands it plain
//! row data and never touches widgets.

use serde::{Deserialize, Serialize};

use crate::domain::{folder::LocalFolderKind, newtypes::FolderId};

/// Display data of one folder row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRowData {
    pub folder_id: FolderId,
    pub selected: bool,
    /// Remote type tag
    pub folder_type: String,
    pub kind: LocalFolderKind,
    /// Icon of the folder type, if it has one
    pub type_image: Option<String>,
    pub name: String,
    pub status_message: String,
}

/// Port trait for the folder list widget
pub trait IFolderListView: Send + Sync {
    /// Appends a row
    fn add_row(&self, row: &FolderRowData);

    /// Refreshes an existing row
    fn update_row(&self, row: &FolderRowData);
}
