// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory blob store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use marginalia_core::traits::adapter::PluginAdapter;
use marginalia_core::traits::blob::BlobStore;
use marginalia_core::types::{AdapterType, HealthStatus};
use marginalia_core::MarginaliaError;

/// Objects keyed by `(bucket, object_path)`.
///
/// `set_unavailable(true)` turns every download into a transient
/// [`MarginaliaError::Fetch`].
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    unavailable: AtomicBool,
    downloads: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object, replacing any previous content.
    pub fn put(&self, bucket: &str, object_path: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((bucket.to_string(), object_path.to_string()), bytes);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of download calls made so far.
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn object(&self, bucket: &str, object_path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(bucket.to_string(), object_path.to_string()))
            .cloned()
    }
}

#[async_trait]
impl PluginAdapter for MemoryBlobStore {
    fn name(&self) -> &str {
        "memory-blobs"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::BlobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MarginaliaError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("marked unavailable".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), MarginaliaError> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(
        &self,
        bucket: &str,
        object_path: &str,
        destination: &Path,
    ) -> Result<u64, MarginaliaError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MarginaliaError::Fetch {
                message: format!("blob store unavailable while reading {bucket}/{object_path}"),
                source: None,
            });
        }
        let bytes = self
            .object(bucket, object_path)
            .ok_or_else(|| MarginaliaError::ObjectNotFound {
                bucket: bucket.to_string(),
                object_path: object_path.to_string(),
            })?;
        tokio::fs::write(destination, &bytes)
            .await
            .map_err(|e| MarginaliaError::fetch("cannot write scratch file", e))?;
        Ok(bytes.len() as u64)
    }
}
