//! State database pool
//!
//! [`DatabasePool`] opens the SQLite database named by
//! [`StorageConfig`] and brings its schema up to date. The schema version
//! lives in `PRAGMA user_version`; each migration newer than the stored
//! version runs in its own transaction and bumps it.

use std::str::FromStr;
use std::time::Duration;

use davsync_core::config::StorageConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::CacheError;

/// Schema migrations, oldest first
const MIGRATIONS: &[(u32, &str)] = &[
    (1, include_str!("migrations/20261016_initial.sql")),
    (2, include_str!("migrations/20261016_account_options.sql")),
];

/// Schema version of a fully migrated database
pub const SCHEMA_VERSION: u32 = 2;

const FILE_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool of connections to the state database
///
/// Foreign keys are always on, so deleting an account drops its folders.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database at `storage.database`
    ///
    /// # Errors
    ///
    /// `CacheError::Storage` if the parent directory cannot be created,
    /// `CacheError::Database` if SQLite refuses the connection,
    /// `CacheError::SchemaTooNew` for a database from a newer release, and
    /// `CacheError::Migration` if a schema step fails.
    pub async fn open(storage: &StorageConfig) -> Result<Self, CacheError> {
        let path = storage.database.as_path();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| CacheError::Storage {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let db = Self::connect(options, FILE_CONNECTIONS).await?;

        info!(
            path = %path.display(),
            schema_version = db.schema_version().await?,
            "State database opened"
        );
        Ok(db)
    }

    /// Opens a private in-memory database
    ///
    /// SQLite keeps in-memory data per connection, so the pool holds one.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options, 1).await
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options.foreign_keys(true))
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Schema version stored in the database
    pub async fn schema_version(&self) -> Result<u32, CacheError> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        u32::try_from(version)
            .map_err(|_| CacheError::InvalidValue(format!("Invalid schema version: {version}")))
    }

    async fn migrate(&self) -> Result<(), CacheError> {
        let current = self.schema_version().await?;
        if current > SCHEMA_VERSION {
            return Err(CacheError::SchemaTooNew {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }
        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            let stamp = format!("PRAGMA user_version = {version}");
            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(sql)
                .execute(&mut *tx)
                .await
                .map_err(|source| CacheError::Migration { version, source })?;
            sqlx::raw_sql(&stamp).execute(&mut *tx).await?;
            tx.commit().await?;
            debug!(version, "Applied schema migration");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered() {
        let versions: Vec<u32> = MIGRATIONS.iter().map(|(v, _)| *v).collect();
        let expected: Vec<u32> = (1..=SCHEMA_VERSION).collect();
        assert_eq!(versions, expected);
    }

    #[tokio::test]
    async fn test_in_memory_is_fully_migrated() {
        let db = DatabasePool::in_memory().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), SCHEMA_VERSION);

        let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(fk, 1);
    }
}
