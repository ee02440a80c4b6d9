// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory-tree blob store: objects live at `<root>/<bucket>/<object path>`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use marginalia_core::{
    AdapterType, BlobStore, HealthStatus, MarginaliaError, PluginAdapter, UploadEvent,
};

use super::validate_object_address;

/// Blob store backed by a local directory tree.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of `bucket/object_path`.
    pub fn object_file(&self, bucket: &str, object_path: &str) -> PathBuf {
        object_path
            .split('/')
            .fold(self.root.join(bucket), |acc, seg| acc.join(seg))
    }

    /// Map a file under the root back to the object-creation event it represents.
    ///
    /// Returns `None` for files outside the root or directly inside it.
    pub fn event_for(&self, file: &Path) -> Option<UploadEvent> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(seg) => parts.push(seg.to_str()?.to_string()),
                _ => return None,
            }
        }
        if parts.len() < 2 {
            return None;
        }
        let bucket = parts.remove(0);
        Some(UploadEvent::new(bucket, parts.join("/")))
    }
}

#[async_trait]
impl PluginAdapter for LocalBlobStore {
    fn name(&self) -> &str {
        "local"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::BlobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MarginaliaError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            Err(e) => Ok(HealthStatus::Degraded(format!(
                "{}: {e}",
                self.root.display()
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), MarginaliaError> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn download(
        &self,
        bucket: &str,
        object_path: &str,
        destination: &Path,
    ) -> Result<u64, MarginaliaError> {
        validate_object_address(bucket, object_path)?;
        let source = self.object_file(bucket, object_path);

        match tokio::fs::metadata(&source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(MarginaliaError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    object_path: object_path.to_string(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MarginaliaError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    object_path: object_path.to_string(),
                });
            }
            Err(e) => return Err(MarginaliaError::fetch(format!("cannot stat {bucket}/{object_path}"), e)),
        }

        let bytes = tokio::fs::copy(&source, destination).await.map_err(|e| {
            MarginaliaError::fetch(format!("cannot copy {bucket}/{object_path}"), e)
        })?;
        debug!(bucket, object_path, bytes, "object copied from local bucket");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn download_copies_object() {
        let root = tempdir().unwrap();
        let store = LocalBlobStore::new(root.path());
        let object = store.object_file("bkt", "uploads/alice/KoboReader.sqlite");
        std::fs::create_dir_all(object.parent().unwrap()).unwrap();
        std::fs::write(&object, b"sqlite bytes").unwrap();

        let scratch = tempdir().unwrap();
        let dest = scratch.path().join("copy.sqlite");
        let bytes = store
            .download("bkt", "uploads/alice/KoboReader.sqlite", &dest)
            .await
            .unwrap();
        assert_eq!(bytes, 12);
        assert_eq!(std::fs::read(&dest).unwrap(), b"sqlite bytes");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let root = tempdir().unwrap();
        let store = LocalBlobStore::new(root.path());
        let scratch = tempdir().unwrap();

        let err = store
            .download("bkt", "uploads/alice/KoboReader.sqlite", &scratch.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarginaliaError::ObjectNotFound { .. }));
    }

    #[test]
    fn event_for_maps_file_back_to_bucket_and_path() {
        let store = LocalBlobStore::new("/srv/buckets");
        let event = store
            .event_for(Path::new("/srv/buckets/bkt/uploads/alice/KoboReader.sqlite"))
            .unwrap();
        assert_eq!(event, UploadEvent::new("bkt", "uploads/alice/KoboReader.sqlite"));
        assert!(store.event_for(Path::new("/elsewhere/bkt/x")).is_none());
        assert!(store.event_for(Path::new("/srv/buckets/loose-file")).is_none());
    }

    #[tokio::test]
    async fn health_reflects_root_presence() {
        let root = tempdir().unwrap();
        assert_eq!(
            LocalBlobStore::new(root.path()).health_check().await.unwrap(),
            HealthStatus::Healthy
        );
        let missing = LocalBlobStore::new(root.path().join("nope"));
        assert!(matches!(
            missing.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
