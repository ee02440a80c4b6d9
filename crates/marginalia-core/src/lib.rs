// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Marginalia highlight ingester.
//!
//! This crate provides the error type, the domain records produced by the
//! ingestion pipeline, the document model of the per-user store, and the
//! adapter traits implemented by the storage backends.

pub mod document;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use document::{CollectionPath, Document, DocumentPath, Fields, WriteBatch, WriteOp};
pub use error::MarginaliaError;
pub use types::{
    AdapterType, BookRecord, HealthStatus, HighlightKind, HighlightRecord, ProcessingStatus,
    StatusKind, UploadEvent,
};

pub use traits::{BlobStore, DocumentStore, PluginAdapter};
