// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store wiring and the `marginalia ingest` command.

use std::sync::Arc;
use std::time::Duration;

use marginalia_config::model::{BlobBackend, MarginaliaConfig};
use marginalia_core::{BlobStore, MarginaliaError, PluginAdapter, UploadEvent};
use marginalia_ingest::{IngestPipeline, RunOutcome};
use marginalia_storage::{HttpBlobStore, LocalBlobStore, SqliteDocumentStore};
use tracing::{info, warn};

/// Blob backend selected by `[blobs]`.
pub fn open_blob_store(config: &MarginaliaConfig) -> Result<Arc<dyn BlobStore>, MarginaliaError> {
    let blobs = &config.blobs;
    match blobs.backend {
        BlobBackend::Local => Ok(Arc::new(LocalBlobStore::new(&blobs.root))),
        BlobBackend::Http => {
            let base_url = blobs.base_url.as_deref().ok_or_else(|| {
                MarginaliaError::Config("blobs.base_url is required for the http backend".into())
            })?;
            Ok(Arc::new(HttpBlobStore::new(
                base_url,
                Duration::from_secs(blobs.timeout_secs),
            )?))
        }
    }
}

/// Open the document store described by `[storage]`.
pub async fn open_document_store(
    config: &MarginaliaConfig,
) -> Result<Arc<SqliteDocumentStore>, MarginaliaError> {
    Ok(Arc::new(SqliteDocumentStore::open(&config.storage).await?))
}

/// Wire a pipeline to explicit store handles.
pub fn build_pipeline(
    config: &MarginaliaConfig,
    blobs: Arc<dyn BlobStore>,
    documents: Arc<SqliteDocumentStore>,
) -> IngestPipeline {
    IngestPipeline::new(&config.ingest, blobs, documents)
}

/// Run `marginalia ingest`.
///
/// Exits successfully for every terminal outcome, since failures are recorded
/// in the status document. Only a failed status write is an error.
pub async fn run_ingest(
    config: &MarginaliaConfig,
    bucket: String,
    object_path: String,
) -> Result<(), MarginaliaError> {
    let blobs = open_blob_store(config)?;
    let documents = open_document_store(config).await?;
    let pipeline = build_pipeline(config, blobs, documents.clone());

    let outcome = pipeline
        .handle(&UploadEvent::new(bucket, object_path))
        .await;

    if let Err(e) = documents.shutdown().await {
        warn!(error = %e, "document store shutdown failed");
    }

    match outcome? {
        RunOutcome::Ignored => println!("ignored: not a reader database upload"),
        RunOutcome::Completed { user_id, status } => {
            info!(user_id = %user_id, status = %status.status, "run finished");
            println!("{}", describe(&user_id, &status));
        }
    }
    Ok(())
}

/// One-line summary of a terminal status.
pub fn describe(user_id: &str, status: &marginalia_core::ProcessingStatus) -> String {
    use marginalia_core::StatusKind;

    match status.status {
        StatusKind::Success => format!(
            "{user_id}: success ({} books, {} highlights)",
            status.book_count.unwrap_or(0),
            status.highlight_count.unwrap_or(0)
        ),
        StatusKind::NoHighlights => format!(
            "{user_id}: no highlights found ({} books)",
            status.book_count.unwrap_or(0)
        ),
        StatusKind::Error => format!(
            "{user_id}: error: {}",
            status.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
