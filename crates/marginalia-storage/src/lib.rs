// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backends for the Marginalia highlight ingester.
//!
//! Provides the SQLite-backed document store that holds per-user book,
//! highlight, and status documents (WAL mode, embedded migrations, one
//! transaction per write batch), plus the blob store backends that serve
//! uploaded reader databases.

pub mod adapter;
pub mod blob;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteDocumentStore;
pub use blob::{HttpBlobStore, LocalBlobStore};
pub use database::Database;
