// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion pipeline for uploaded Kobo highlight databases.
//!
//! An object-creation event passes the [`trigger`] filter, the upload is
//! copied to a scratch file by [`fetch`], read by [`extract`], turned into
//! keyed records by [`normalize`], committed by [`writer`], and the outcome
//! is recorded by [`status`]. [`pipeline`] ties the steps together.

pub mod extract;
pub mod fetch;
pub mod lock;
pub mod normalize;
pub mod pipeline;
pub mod status;
pub mod trigger;
pub mod writer;

pub use extract::{Extraction, Extractor, HighlightShape, SchemaReport};
pub use fetch::{ScratchFile, SourceFetcher};
pub use normalize::{highlight_id, normalize, sanitize_book_id, Normalized};
pub use pipeline::{normalize_file, IngestPipeline, RunOutcome};
pub use status::StatusReporter;
pub use trigger::{TriggerFilter, UploadTarget};
pub use writer::{IdempotentWriter, WriteReport};
