// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the storage collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod blob;
pub mod document;

pub use adapter::PluginAdapter;
pub use blob::BlobStore;
pub use document::DocumentStore;
