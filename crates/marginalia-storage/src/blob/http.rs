// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP blob store: objects are served at `<base_url>/<bucket>/<object path>`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use marginalia_core::{AdapterType, BlobStore, HealthStatus, MarginaliaError, PluginAdapter};

use super::validate_object_address;

/// Blob store reached over plain HTTP GET.
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MarginaliaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarginaliaError::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_url(&self, bucket: &str, object_path: &str) -> String {
        format!("{}/{bucket}/{object_path}", self.base_url)
    }
}

#[async_trait]
impl PluginAdapter for HttpBlobStore {
    fn name(&self) -> &str {
        "http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::BlobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MarginaliaError> {
        match self.client.head(&self.base_url).send().await {
            Ok(resp) if resp.status().is_server_error() => Ok(HealthStatus::Degraded(format!(
                "{} answered {}",
                self.base_url,
                resp.status()
            ))),
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), MarginaliaError> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn download(
        &self,
        bucket: &str,
        object_path: &str,
        destination: &Path,
    ) -> Result<u64, MarginaliaError> {
        validate_object_address(bucket, object_path)?;
        let url = self.object_url(bucket, object_path);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MarginaliaError::fetch(format!("GET {url} failed"), e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MarginaliaError::ObjectNotFound {
                bucket: bucket.to_string(),
                object_path: object_path.to_string(),
            });
        }
        if !status.is_success() {
            return Err(MarginaliaError::Fetch {
                message: format!("GET {url} returned {status}"),
                source: None,
            });
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| MarginaliaError::fetch("cannot create scratch file", e))?;
        let mut stream = resp.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| MarginaliaError::fetch(format!("download of {url} interrupted"), e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| MarginaliaError::fetch("cannot write scratch file", e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| MarginaliaError::fetch("cannot flush scratch file", e))?;

        debug!(%url, bytes = written, "object downloaded");
        Ok(written)
    }
}
