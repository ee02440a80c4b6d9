// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document database connection management with PRAGMA setup and migrations.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::time::Duration;

use marginalia_core::MarginaliaError;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into `MarginaliaError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MarginaliaError {
    MarginaliaError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the document database.
///
/// Wraps a single `tokio_rusqlite::Connection`; query modules accept
/// `&Database` and go through [`Database::connection`].
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs, and
    /// run pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, MarginaliaError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| MarginaliaError::Storage { source: Box::new(e) })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| MarginaliaError::Storage { source: Box::new(e) })?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(Duration::from_secs(5))?;
            if wal_mode {
                let mode: String = conn.pragma_update_and_check(
                    None,
                    "journal_mode",
                    "WAL",
                    |row| row.get(0),
                )?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), MigrationFailed> {
            migrations::run_migrations(conn).map_err(|e| MigrationFailed(e.to_string()))
        })
        .await
        .map_err(|e| MarginaliaError::Storage {
            source: e.to_string().into(),
        })?;

        debug!(path, wal_mode, "document database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// The single connection all queries go through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Filesystem path the database was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checkpoint and truncate the WAL.
    pub async fn checkpoint(&self) -> Result<(), MarginaliaError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE);", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Migration failure carried out of the connection thread.
#[derive(Debug, thiserror::Error)]
#[error("migration failed: {0}")]
struct MigrationFailed(String);

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_documents_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("docs.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docs.db");
        let path = path.to_str().unwrap();
        drop(Database::open(path, true).await.unwrap());
        let db = Database::open(path, true).await.unwrap();
        db.checkpoint().await.unwrap();
        assert_eq!(db.path(), path);
    }

    #[test]
    fn migration_failure_names_the_cause() {
        let err = MigrationFailed("no such table: refinery_schema_history".into());
        assert_eq!(
            err.to_string(),
            "migration failed: no such table: refinery_schema_history"
        );
    }
}
