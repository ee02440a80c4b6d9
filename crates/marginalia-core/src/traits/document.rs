// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store adapter trait for the per-user record collections.

use async_trait::async_trait;

use crate::document::{CollectionPath, Document, DocumentPath, Fields, WriteBatch};
use crate::error::MarginaliaError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for the shared document store.
#[async_trait]
pub trait DocumentStore: PluginAdapter {
    /// Maximum number of writes a single [`WriteBatch`] may carry.
    fn max_batch_size(&self) -> usize;

    /// Applies every write in `batch` atomically: either all of them become
    /// visible or none do. Failures are [`MarginaliaError::Write`].
    async fn commit(&self, batch: WriteBatch) -> Result<(), MarginaliaError>;

    /// Reads a single document.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Fields>, MarginaliaError>;

    /// Lists every document directly inside `collection`, ordered by id.
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, MarginaliaError>;
}
