// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob storage adapter trait (where uploaded reader databases land).

use std::path::Path;

use async_trait::async_trait;

use crate::error::MarginaliaError;
use crate::traits::adapter::PluginAdapter;

/// Read access to uploaded objects.
#[async_trait]
pub trait BlobStore: PluginAdapter {
    /// Copies `bucket/object_path` into the local file at `destination`,
    /// truncating it first. Returns the number of bytes written.
    ///
    /// A missing object is [`MarginaliaError::ObjectNotFound`]; any other
    /// storage fault is [`MarginaliaError::Fetch`].
    async fn download(
        &self,
        bucket: &str,
        object_path: &str,
        destination: &Path,
    ) -> Result<u64, MarginaliaError>;
}
