// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory document store for deterministic pipeline tests.
//!
//! `MemoryDocumentStore` applies each batch to a staged copy and swaps it in
//! only when every write succeeded, so an injected fault never leaves part of
//! a batch visible.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use marginalia_core::traits::adapter::PluginAdapter;
use marginalia_core::traits::document::DocumentStore;
use marginalia_core::types::{AdapterType, HealthStatus};
use marginalia_core::{
    CollectionPath, Document, DocumentPath, Fields, MarginaliaError, WriteBatch,
};

const DEFAULT_MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Default)]
struct State {
    docs: BTreeMap<DocumentPath, Fields>,
    attempts: usize,
    failing_attempts: HashSet<usize>,
    commit_log: Vec<usize>,
}

/// A document store backed by a `BTreeMap`.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    state: Mutex<State>,
    max_batch_size: usize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Override the batch capacity reported to writers.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Make the `n`-th commit attempt (1-based, counting every call to
    /// `commit`) fail halfway through its batch.
    pub fn fail_commit(&self, n: usize) {
        self.lock().failing_attempts.insert(n);
    }

    /// Store a document directly, bypassing batches.
    pub fn seed(&self, path: DocumentPath, fields: Fields) {
        self.lock().docs.insert(path, fields);
    }

    /// Sizes of the batches that were applied, in commit order.
    pub fn commit_log(&self) -> Vec<usize> {
        self.lock().commit_log.clone()
    }

    /// Number of commit calls, including failed ones.
    pub fn commit_attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Copy of every stored document.
    pub fn snapshot(&self) -> BTreeMap<DocumentPath, Fields> {
        self.lock().docs.clone()
    }

    /// Number of documents inside `collection`.
    pub fn count(&self, collection: &CollectionPath) -> usize {
        self.lock()
            .docs
            .keys()
            .filter(|path| path.collection() == *collection)
            .count()
    }

    /// Total number of stored documents.
    pub fn len(&self) -> usize {
        self.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().docs.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryDocumentStore {
    fn name(&self) -> &str {
        "memory-documents"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DocumentStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MarginaliaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MarginaliaError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), MarginaliaError> {
        let mut state = self.lock();
        state.attempts += 1;
        let attempt = state.attempts;

        if batch.len() > self.max_batch_size {
            return Err(MarginaliaError::Write {
                message: format!(
                    "batch of {} write(s) exceeds capacity {}",
                    batch.len(),
                    self.max_batch_size
                ),
                source: None,
            });
        }

        let fail_at = state
            .failing_attempts
            .contains(&attempt)
            .then_some(batch.len() / 2);
        let size = batch.len();
        let mut staged = state.docs.clone();
        for (index, op) in batch.into_ops().into_iter().enumerate() {
            if fail_at == Some(index) {
                return Err(MarginaliaError::Write {
                    message: format!("injected fault at write {} of commit {attempt}", index + 1),
                    source: None,
                });
            }
            let existing = staged.remove(op.path());
            let fields = op.apply(existing);
            staged.insert(op.path().clone(), fields);
        }

        state.docs = staged;
        if size > 0 {
            state.commit_log.push(size);
        }
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Fields>, MarginaliaError> {
        Ok(self.lock().docs.get(path).cloned())
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, MarginaliaError> {
        Ok(self
            .lock()
            .docs
            .iter()
            .filter(|(path, _)| path.collection() == *collection)
            .map(|(path, fields)| Document {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect())
    }
}
