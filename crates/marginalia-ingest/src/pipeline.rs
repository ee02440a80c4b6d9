// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline orchestration: trigger filter, fetch, extract, normalize, write,
//! and the terminal status write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, instrument};

use marginalia_config::model::IngestConfig;
use marginalia_core::{
    BlobStore, DocumentStore, MarginaliaError, ProcessingStatus, UploadEvent,
};

use crate::extract::Extractor;
use crate::fetch::SourceFetcher;
use crate::lock::UserLocks;
use crate::normalize::{normalize, Normalized};
use crate::status::StatusReporter;
use crate::trigger::{TriggerFilter, UploadTarget};
use crate::writer::IdempotentWriter;

/// What [`IngestPipeline::handle`] did with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The object did not match the upload convention. Nothing was touched.
    Ignored,
    /// A run finished and its terminal status was written.
    Completed {
        user_id: String,
        status: ProcessingStatus,
    },
}

impl RunOutcome {
    pub fn status(&self) -> Option<&ProcessingStatus> {
        match self {
            RunOutcome::Ignored => None,
            RunOutcome::Completed { status, .. } => Some(status),
        }
    }
}

/// One ingestion pipeline, wired to its stores once and shared across runs.
///
/// Steps within a run are strictly sequential. Runs for different users may
/// be driven concurrently from clones of the same `Arc<IngestPipeline>`.
pub struct IngestPipeline {
    filter: TriggerFilter,
    fetcher: SourceFetcher,
    extractor: Extractor,
    writer: IdempotentWriter,
    reporter: StatusReporter,
    locks: UserLocks,
}

impl IngestPipeline {
    pub fn new(
        config: &IngestConfig,
        blobs: Arc<dyn BlobStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            filter: TriggerFilter::from_config(config),
            fetcher: SourceFetcher::new(blobs, config.scratch_dir.as_ref().map(PathBuf::from)),
            extractor: Extractor::new(config.book_content_type),
            writer: IdempotentWriter::new(documents.clone()),
            reporter: StatusReporter::new(documents),
            locks: UserLocks::new(),
        }
    }

    pub fn filter(&self) -> &TriggerFilter {
        &self.filter
    }

    pub fn reporter(&self) -> &StatusReporter {
        &self.reporter
    }

    /// Handle one object-creation event.
    ///
    /// Fetch, extraction and write failures do not surface here: they become
    /// an `"error"` status document. The only error returned is a failed
    /// status write.
    #[instrument(skip(self, event), fields(bucket = %event.bucket, object_path = %event.object_path))]
    pub async fn handle(&self, event: &UploadEvent) -> Result<RunOutcome, MarginaliaError> {
        let Some(target) = self.filter.accept(event) else {
            info!("upload does not match the reader database convention; ignoring");
            return Ok(RunOutcome::Ignored);
        };

        let _guard = self.locks.acquire(&target.user_id).await;
        info!(user_id = %target.user_id, "ingestion started");

        let status = match self.run(&target).await {
            Ok(records) => {
                ProcessingStatus::completed(records.books.len(), records.highlights.len())
            }
            Err(e) => {
                error!(user_id = %target.user_id, error = %e, "ingestion failed");
                ProcessingStatus::failed(e.to_string())
            }
        };

        self.reporter.report(&target.user_id, &status).await?;
        Ok(RunOutcome::Completed {
            user_id: target.user_id,
            status,
        })
    }

    async fn run(&self, target: &UploadTarget) -> Result<Normalized, MarginaliaError> {
        let scratch = self.fetcher.fetch(target).await?;
        let extraction = self.extractor.extract(scratch.path()).await;
        scratch.remove();

        let records = normalize(&target.user_id, extraction?);
        let report = self.writer.write(&target.user_id, &records).await?;
        info!(
            user_id = %target.user_id,
            book_count = records.books.len(),
            highlight_count = records.highlights.len(),
            batches = report.batches,
            "records committed"
        );
        Ok(records)
    }
}

/// Extract and normalize a local reader database without touching any store.
pub async fn normalize_file(
    extractor: &Extractor,
    path: &Path,
    owner_user_id: &str,
) -> Result<Normalized, MarginaliaError> {
    let extraction = extractor.extract(path).await?;
    Ok(normalize(owner_user_id, extraction))
}
