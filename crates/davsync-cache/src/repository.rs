//! SQLite implementation of IStateRepository
//!
//! This module provides the concrete SQLite-based implementation of the
//! state repository port defined in davsync-core. It handles all domain
//! type serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type                   | SQL Type | Strategy                                  |
//! |-------------------------------|----------|-------------------------------------------|
//! | AccountId                     | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | FolderId, TargetHandle, SyncToken | TEXT | String via `.as_str()` / `::new()`       |
//! | DateTime<Utc>                 | TEXT     | ISO 8601 via `to_rfc3339()` / `DateTime::parse_from_rfc3339()` |
//! | AccountStatus, FolderStatus   | TEXT     | `Display` form / `parse()`                |
//! | sync markers                  | TEXT     | serde_json object                         |
//! | bool                          | INTEGER  | 0 / 1                                     |
//!
//! Folders carry a `position` column holding the persisted order of the
//! account's registry.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};

use davsync_core::domain::{
    newtypes::{AccountId, FolderId, SyncToken, TargetHandle},
    Account, AccountStatus, Folder, FolderStatus,
};
use davsync_core::ports::IStateRepository;

use crate::CacheError;

/// SQLite-based implementation of the state repository port
///
/// All operations are performed through a connection pool for concurrency.
pub struct SqliteStateRepository {
    pool: SqlitePool,
}

impl SqliteStateRepository {
    /// Creates a new repository instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn account_status_from_string(s: &str) -> Result<AccountStatus, CacheError> {
    AccountStatus::parse(s).map_err(|e| CacheError::InvalidValue(e.to_string()))
}

fn folder_status_from_string(s: &str) -> Result<FolderStatus, CacheError> {
    FolderStatus::parse(s).map_err(|e| CacheError::InvalidValue(e.to_string()))
}

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite default format
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            CacheError::InvalidValue(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

fn parse_folder_id(s: &str) -> Result<FolderId, CacheError> {
    FolderId::new(s)
        .map_err(|e| CacheError::InvalidValue(format!("Invalid FolderId '{}': {}", s, e)))
}

fn parse_account_id(s: &str) -> Result<AccountId, CacheError> {
    AccountId::from_str(s)
        .map_err(|e| CacheError::InvalidValue(format!("Invalid AccountId '{}': {}", s, e)))
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct an Account from a database row
fn account_from_row(row: &SqliteRow) -> Result<Account, CacheError> {
    let id_str: String = row.get("id");
    let name: String = row.get("name");
    let server_type: String = row.get("server_type");
    let host: String = row.get("host");
    let user: String = row.get("user");
    let https: bool = row.get("https");
    let auth_method: String = row.get("auth_method");
    let auth_options: String = row.get("auth_options");
    let autosync_minutes: i64 = row.get("autosync_minutes");
    let download_only: bool = row.get("download_only");
    let sync_default_folders: bool = row.get("sync_default_folders");
    let display_override: bool = row.get("display_override");
    let separator: i64 = row.get("separator");
    let status_str: String = row.get("status");
    let last_sync_str: Option<String> = row.get("last_sync");
    let markers_str: String = row.get("sync_markers");
    let created_at_str: String = row.get("created_at");

    let id = parse_account_id(&id_str)?;
    let created_at = parse_datetime(&created_at_str)?;
    let autosync_minutes = u32::try_from(autosync_minutes).map_err(|_| {
        CacheError::InvalidValue(format!("Invalid autosync interval: {autosync_minutes}"))
    })?;
    let markers: BTreeMap<String, String> = serde_json::from_str(&markers_str)
        .map_err(|e| CacheError::InvalidValue(format!("Invalid sync markers: {}", e)))?;
    let separator = u32::try_from(separator)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| CacheError::InvalidValue(format!("Invalid separator code: {separator}")))?;

    let mut account = Account::with_id(id, name, host, user, created_at);
    account.set_server_type(server_type);
    account.set_https(https);
    account.set_auth(auth_method, auth_options);
    account.set_autosync_minutes(autosync_minutes);
    account.set_download_only(download_only);
    account.set_sync_default_folders(sync_default_folders);
    account.set_display_override(display_override);
    account.set_separator(separator);
    account.set_status(account_status_from_string(&status_str)?);
    account.set_last_sync(parse_optional_datetime(last_sync_str)?);
    for (key, value) in markers {
        account.set_sync_marker(key, value);
    }

    Ok(account)
}

/// Reconstruct a Folder from a database row
fn folder_from_row(row: &SqliteRow) -> Result<Folder, CacheError> {
    let account_id_str: String = row.get("account_id");
    let folder_id_str: String = row.get("folder_id");
    let name: String = row.get("name");
    let folder_type: String = row.get("folder_type");
    let target_str: Option<String> = row.get("target");
    let target_name: String = row.get("target_name");
    let target_color: Option<String> = row.get("target_color");
    let selected: bool = row.get("selected");
    let status_str: String = row.get("status");
    let last_sync_str: Option<String> = row.get("last_sync");
    let parent_id_str: Option<String> = row.get("parent_id");
    let download_only: bool = row.get("download_only");
    let cached: bool = row.get("cached");
    let cached_at_str: Option<String> = row.get("cached_at");
    let sync_token_str: Option<String> = row.get("sync_token");

    let parent_id = match parent_id_str {
        Some(ref s) if !s.is_empty() => Some(parse_folder_id(s)?),
        _ => None,
    };
    let target = match target_str {
        Some(s) if !s.is_empty() => Some(TargetHandle::new(s).map_err(|e| {
            CacheError::InvalidValue(format!("Invalid target handle: {}", e))
        })?),
        _ => None,
    };
    let sync_token = match sync_token_str {
        Some(s) if !s.is_empty() => Some(SyncToken::new(s).map_err(|e| {
            CacheError::InvalidValue(format!("Invalid sync token: {}", e))
        })?),
        _ => None,
    };

    let mut folder = Folder::with_id(
        parse_account_id(&account_id_str)?,
        parse_folder_id(&folder_id_str)?,
    );
    folder.update_remote(name, folder_type, parent_id);
    folder.set_selected(selected);
    folder.set_target(target, target_name);
    folder.set_target_color(target_color);
    folder.set_status(folder_status_from_string(&status_str)?);
    folder.set_last_sync(parse_optional_datetime(last_sync_str)?);
    folder.set_download_only(download_only);
    folder.set_cached(cached, parse_optional_datetime(cached_at_str)?);
    folder.set_sync_token(sync_token);

    Ok(folder)
}

/// Inserts or updates a folder row
///
/// A new row gets `position`, or the next free position of its account when
/// `position` is `None`. An existing row keeps its position.
async fn upsert_folder<'e, E>(
    executor: E,
    folder: &Folder,
    position: Option<i64>,
) -> Result<(), CacheError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let account_id = folder.account_id().to_string();

    sqlx::query(
        "INSERT INTO folders \
         (account_id, folder_id, position, name, folder_type, target, target_name, \
          target_color, selected, status, last_sync, parent_id, download_only, \
          cached, cached_at, sync_token) \
         VALUES (?, ?, \
                 COALESCE(?, (SELECT COALESCE(MAX(position), -1) + 1 FROM folders WHERE account_id = ?)), \
                 ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(account_id, folder_id) DO UPDATE SET \
            name = excluded.name, \
            folder_type = excluded.folder_type, \
            target = excluded.target, \
            target_name = excluded.target_name, \
            target_color = excluded.target_color, \
            selected = excluded.selected, \
            status = excluded.status, \
            last_sync = excluded.last_sync, \
            parent_id = excluded.parent_id, \
            download_only = excluded.download_only, \
            cached = excluded.cached, \
            cached_at = excluded.cached_at, \
            sync_token = excluded.sync_token",
    )
    .bind(&account_id)
    .bind(folder.folder_id().as_str().to_string())
    .bind(position)
    .bind(&account_id)
    .bind(folder.name().to_string())
    .bind(folder.folder_type().to_string())
    .bind(folder.target().map(|t| t.as_str().to_string()))
    .bind(folder.target_name().to_string())
    .bind(folder.target_color().map(str::to_string))
    .bind(folder.is_selected())
    .bind(folder.status().to_string())
    .bind(folder.last_sync().map(|dt| dt.to_rfc3339()))
    .bind(folder.parent_id().map(|p| p.as_str().to_string()))
    .bind(folder.download_only())
    .bind(folder.is_cached())
    .bind(folder.cached_at().map(|dt| dt.to_rfc3339()))
    .bind(folder.sync_token().map(|t| t.as_str().to_string()))
    .execute(executor)
    .await?;

    Ok(())
}

// ============================================================================
// IStateRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl IStateRepository for SqliteStateRepository {
    // --- Account operations ---

    async fn save_account(&self, account: &Account) -> anyhow::Result<()> {
        let id = account.id().to_string();
        let markers = serde_json::to_string(account.sync_markers())
            .map_err(|e| CacheError::InvalidValue(e.to_string()))?;

        sqlx::query(
            "INSERT INTO accounts \
             (id, name, provider, server_type, host, user, https, auth_method, auth_options, \
              autosync_minutes, download_only, sync_default_folders, display_override, separator, \
              status, last_sync, sync_markers, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                name = excluded.name, \
                provider = excluded.provider, \
                server_type = excluded.server_type, \
                host = excluded.host, \
                user = excluded.user, \
                https = excluded.https, \
                auth_method = excluded.auth_method, \
                auth_options = excluded.auth_options, \
                autosync_minutes = excluded.autosync_minutes, \
                download_only = excluded.download_only, \
                sync_default_folders = excluded.sync_default_folders, \
                display_override = excluded.display_override, \
                separator = excluded.separator, \
                status = excluded.status, \
                last_sync = excluded.last_sync, \
                sync_markers = excluded.sync_markers",
        )
        .bind(&id)
        .bind(account.name())
        .bind(account.provider())
        .bind(account.server_type())
        .bind(account.host())
        .bind(account.user())
        .bind(account.https())
        .bind(account.auth_method())
        .bind(account.auth_options())
        .bind(i64::from(account.autosync_minutes()))
        .bind(account.download_only())
        .bind(account.sync_default_folders())
        .bind(account.display_override())
        .bind(i64::from(u32::from(account.separator())))
        .bind(account.status().to_string())
        .bind(account.last_sync().map(|dt| dt.to_rfc3339()))
        .bind(&markers)
        .bind(account.created_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;

        tracing::trace!(account_id = %id, "Saved account");
        Ok(())
    }

    async fn get_account(&self, id: &AccountId) -> anyhow::Result<Option<Account>> {
        let id_str = id.to_string();

        let row = sqlx::query("SELECT * FROM accounts WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(account_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_accounts(&self) -> anyhow::Result<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in &rows {
            accounts.push(account_from_row(row)?);
        }
        Ok(accounts)
    }

    async fn delete_account(&self, id: &AccountId) -> anyhow::Result<()> {
        let id_str = id.to_string();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM folders WHERE account_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(account_id = %id_str, "Deleted account");
        Ok(())
    }

    // --- Folder operations ---

    async fn get_folders(&self, account_id: &AccountId) -> anyhow::Result<Vec<Folder>> {
        let rows = sqlx::query("SELECT * FROM folders WHERE account_id = ? ORDER BY position ASC")
            .bind(account_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        let mut folders = Vec::with_capacity(rows.len());
        for row in &rows {
            folders.push(folder_from_row(row)?);
        }
        Ok(folders)
    }

    async fn get_folder(
        &self,
        account_id: &AccountId,
        folder_id: &FolderId,
    ) -> anyhow::Result<Option<Folder>> {
        let row = sqlx::query("SELECT * FROM folders WHERE account_id = ? AND folder_id = ?")
            .bind(account_id.to_string())
            .bind(folder_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(folder_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn save_folder(&self, folder: &Folder) -> anyhow::Result<()> {
        upsert_folder(&self.pool, folder, None).await?;
        tracing::trace!(
            account_id = %folder.account_id(),
            folder_id = %folder.folder_id(),
            status = %folder.status(),
            "Saved folder"
        );
        Ok(())
    }

    async fn replace_folders(
        &self,
        account_id: &AccountId,
        folders: &[Folder],
    ) -> anyhow::Result<()> {
        if let Some(foreign) = folders.iter().find(|f| f.account_id() != account_id) {
            anyhow::bail!(
                "Folder {} belongs to account {}, not {}",
                foreign.folder_id(),
                foreign.account_id(),
                account_id
            );
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM folders WHERE account_id = ?")
            .bind(account_id.to_string())
            .execute(&mut *tx)
            .await?;
        for (position, folder) in folders.iter().enumerate() {
            let position = i64::try_from(position)?;
            upsert_folder(&mut *tx, folder, Some(position)).await?;
        }
        tx.commit().await?;

        tracing::debug!(account_id = %account_id, folders = folders.len(), "Replaced folder registry");
        Ok(())
    }

    async fn delete_folder(&self, account_id: &AccountId, folder_id: &FolderId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM folders WHERE account_id = ? AND folder_id = ?")
            .bind(account_id.to_string())
            .bind(folder_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
