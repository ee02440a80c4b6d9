// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent, batched commit of normalized records.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, instrument};

use marginalia_core::document::to_fields;
use marginalia_core::{
    DocumentPath, DocumentStore, Fields, MarginaliaError, WriteBatch, WriteOp,
};

use crate::normalize::Normalized;

/// Social fields seeded on first write of a highlight and never overwritten.
pub fn highlight_defaults() -> Fields {
    let mut defaults = Fields::new();
    defaults.insert("likes".to_string(), Value::Array(Vec::new()));
    defaults.insert("like_count".to_string(), json!(0));
    defaults
}

/// Summary of a successful [`IdempotentWriter::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub batches: usize,
    pub writes: usize,
}

/// Commits one run's records with field-merge upserts.
///
/// All records go into one atomic batch when they fit the store's capacity;
/// otherwise they are split into sequential batches. Every write is keyed by
/// a stable id, so repeating a run converges on the same state even after a
/// partially committed split.
#[derive(Clone)]
pub struct IdempotentWriter {
    store: Arc<dyn DocumentStore>,
}

impl IdempotentWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Build the ordered write list for `owner_user_id`: books first, then highlights.
    pub fn plan(
        &self,
        owner_user_id: &str,
        records: &Normalized,
    ) -> Result<Vec<WriteOp>, MarginaliaError> {
        let mut ops = Vec::with_capacity(records.books.len() + records.highlights.len());
        for book in &records.books {
            ops.push(WriteOp::Merge {
                path: DocumentPath::book(owner_user_id, &book.book_id)?,
                fields: to_fields(book)?,
                defaults: Fields::new(),
            });
        }
        let defaults = highlight_defaults();
        for highlight in &records.highlights {
            ops.push(WriteOp::Merge {
                path: DocumentPath::highlight(owner_user_id, &highlight.highlight_id)?,
                fields: to_fields(highlight)?,
                defaults: defaults.clone(),
            });
        }
        Ok(ops)
    }

    /// Split planned writes into batches no larger than the store's capacity.
    pub fn split(&self, ops: Vec<WriteOp>) -> Vec<WriteBatch> {
        let capacity = self.store.max_batch_size().max(1);
        let mut batches = Vec::with_capacity(ops.len().div_ceil(capacity));
        let mut ops = ops.into_iter().peekable();
        while ops.peek().is_some() {
            batches.push(ops.by_ref().take(capacity).collect::<WriteBatch>());
        }
        batches
    }

    /// Plan, split, and commit. Stops at the first failed batch; batches
    /// committed before it stay applied.
    #[instrument(skip(self, records), fields(user_id = owner_user_id))]
    pub async fn write(
        &self,
        owner_user_id: &str,
        records: &Normalized,
    ) -> Result<WriteReport, MarginaliaError> {
        let ops = self.plan(owner_user_id, records)?;
        let writes = ops.len();
        let batches = self.split(ops);
        let total = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            let size = batch.len();
            if let Err(e) = self.store.commit(batch).await {
                error!(
                    batch = index + 1,
                    total,
                    committed_batches = index,
                    error = %e,
                    "batch commit failed"
                );
                return Err(e);
            }
            debug!(batch = index + 1, total, size, "batch committed");
        }

        Ok(WriteReport {
            batches: total,
            writes,
        })
    }
}
