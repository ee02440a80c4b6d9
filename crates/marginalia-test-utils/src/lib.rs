// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Marginalia integration tests.
//!
//! Provides in-memory adapters and source-file fixtures for fast,
//! deterministic tests without a document database or blob service.
//!
//! # Components
//!
//! - [`KoboFixture`] - Builder for Kobo-shaped SQLite databases
//! - [`MemoryDocumentStore`] - Atomic in-memory document store with fault injection
//! - [`MemoryBlobStore`] - In-memory blob store

pub mod kobo;
pub mod memory_blob;
pub mod memory_documents;

pub use kobo::{FixtureBook, FixtureBookmark, KoboFixture};
pub use memory_blob::MemoryBlobStore;
pub use memory_documents::MemoryDocumentStore;
