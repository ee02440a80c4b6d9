// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upload trigger filter.
//!
//! Only objects at `<prefix>/<user id>/<source filename>` start a run. Anything
//! else is someone else's file or not a reader database, and is ignored
//! without touching storage or the status record.

use marginalia_config::model::IngestConfig;
use marginalia_core::UploadEvent;

/// An upload accepted by the [`TriggerFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    pub object_path: String,
    /// Owner derived from the second path segment.
    pub user_id: String,
}

/// Path-convention filter for object-creation events.
#[derive(Debug, Clone)]
pub struct TriggerFilter {
    upload_prefix: String,
    source_filename: String,
}

impl TriggerFilter {
    pub fn new(upload_prefix: impl Into<String>, source_filename: impl Into<String>) -> Self {
        Self {
            upload_prefix: upload_prefix.into(),
            source_filename: source_filename.into(),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(&config.upload_prefix, &config.source_filename)
    }

    /// Returns the target when `event` follows the upload path convention.
    pub fn accept(&self, event: &UploadEvent) -> Option<UploadTarget> {
        let mut segments = event.object_path.split('/');
        let (Some(prefix), Some(user_id), Some(filename), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return None;
        };

        if prefix != self.upload_prefix || filename != self.source_filename {
            return None;
        }
        if user_id.is_empty() || user_id == "." || user_id == ".." {
            return None;
        }

        Some(UploadTarget {
            bucket: event.bucket.clone(),
            object_path: event.object_path.clone(),
            user_id: user_id.to_string(),
        })
    }
}

impl Default for TriggerFilter {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}
