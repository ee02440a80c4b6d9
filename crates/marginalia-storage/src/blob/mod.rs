// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob store backends serving uploaded reader databases.

pub mod http;
pub mod local;

pub use http::HttpBlobStore;
pub use local::LocalBlobStore;

use marginalia_core::MarginaliaError;

/// Reject bucket names and object paths that could escape their bucket.
pub(crate) fn validate_object_address(
    bucket: &str,
    object_path: &str,
) -> Result<(), MarginaliaError> {
    let bad_bucket = bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "..";
    let bad_object = object_path.is_empty()
        || object_path.starts_with('/')
        || object_path.contains('\\')
        || object_path
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad_bucket || bad_object {
        return Err(MarginaliaError::Fetch {
            message: format!("invalid object address {bucket}/{object_path}"),
            source: None,
        });
    }
    Ok(())
}
