// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the DocumentStore trait.

use async_trait::async_trait;
use tracing::debug;

use marginalia_config::model::StorageConfig;
use marginalia_core::{
    AdapterType, CollectionPath, Document, DocumentPath, DocumentStore, Fields, HealthStatus,
    MarginaliaError, PluginAdapter, WriteBatch,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed document store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// Each [`WriteBatch`] is one SQLite transaction.
pub struct SqliteDocumentStore {
    db: Database,
    max_batch_size: usize,
}

impl SqliteDocumentStore {
    /// Open the store described by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, MarginaliaError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(
            path = %config.database_path,
            max_batch_writes = config.max_batch_writes,
            "SQLite document store initialized"
        );
        Ok(Self {
            db,
            max_batch_size: config.max_batch_writes.max(1),
        })
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Number of documents stored anywhere under `users/<uid>/`.
    pub async fn count_user_documents(&self, user_id: &str) -> Result<i64, MarginaliaError> {
        queries::documents::count_user_documents(&self.db, user_id).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteDocumentStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DocumentStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MarginaliaError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MarginaliaError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), MarginaliaError> {
        if batch.len() > self.max_batch_size {
            return Err(MarginaliaError::Write {
                message: format!(
                    "batch of {} write(s) exceeds capacity of {}",
                    batch.len(),
                    self.max_batch_size
                ),
                source: None,
            });
        }
        if batch.is_empty() {
            return Ok(());
        }
        queries::documents::commit_batch(&self.db, batch).await
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Fields>, MarginaliaError> {
        queries::documents::get_document(&self.db, path).await
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, MarginaliaError> {
        queries::documents::list_documents(&self.db, collection).await
    }
}
