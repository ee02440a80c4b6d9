// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal processing-status writes.

use std::sync::Arc;

use tracing::info;

use marginalia_core::document::to_fields;
use marginalia_core::{
    DocumentPath, DocumentStore, MarginaliaError, ProcessingStatus, WriteBatch,
};

/// Writes the per-user status document, replacing whatever a previous run left.
#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<dyn DocumentStore>,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Commit `status` as a single full-replace write.
    pub async fn report(
        &self,
        user_id: &str,
        status: &ProcessingStatus,
    ) -> Result<(), MarginaliaError> {
        let mut batch = WriteBatch::new();
        batch.set(DocumentPath::processing_status(user_id)?, to_fields(status)?);
        self.store.commit(batch).await?;
        info!(
            user_id,
            status = %status.status,
            book_count = status.book_count,
            highlight_count = status.highlight_count,
            error = status.error.as_deref(),
            "processing status written"
        );
        Ok(())
    }

    /// Read back the current status document, if any.
    pub async fn current(&self, user_id: &str) -> Result<Option<ProcessingStatus>, MarginaliaError> {
        let Some(fields) = self.store.get(&DocumentPath::processing_status(user_id)?).await? else {
            return Ok(None);
        };
        serde_json::from_value(serde_json::Value::Object(fields))
            .map(Some)
            .map_err(|e| MarginaliaError::Internal(format!("malformed status document: {e}")))
    }
}
