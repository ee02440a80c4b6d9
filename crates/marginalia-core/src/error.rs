// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Marginalia ingestion pipeline.

use thiserror::Error;

/// Boxed error source carried by the fallible variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across all Marginalia adapter traits and pipeline steps.
///
/// The `Display` rendering of every variant is human-readable, because it is
/// what ends up in the `error` field of an `"error"` processing status.
#[derive(Debug, Error)]
pub enum MarginaliaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The uploaded object does not exist in blob storage.
    #[error("uploaded file not found: {bucket}/{object_path}")]
    ObjectNotFound { bucket: String, object_path: String },

    /// Blob storage failed while retrieving the uploaded file.
    #[error("failed to fetch uploaded file: {message}")]
    Fetch {
        message: String,
        source: Option<BoxError>,
    },

    /// The uploaded database could not be read.
    #[error("failed to read highlight database: {message}")]
    Extraction {
        message: String,
        source: Option<BoxError>,
    },

    /// A batch commit to the document store failed.
    #[error("failed to save highlights: {message}")]
    Write {
        message: String,
        source: Option<BoxError>,
    },

    /// Document store backend errors outside a batch commit (open, read, migrate).
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MarginaliaError {
    /// Build an extraction error that wraps an underlying source.
    pub fn extraction(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Extraction {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a write error that wraps an underlying source.
    pub fn write(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Write {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a fetch error that wraps an underlying source.
    pub fn fetch(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
