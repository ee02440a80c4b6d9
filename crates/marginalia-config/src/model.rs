// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Marginalia highlight ingester.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Marginalia configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarginaliaConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Document store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Blob store (upload bucket) settings.
    #[serde(default)]
    pub blobs: BlobConfig,

    /// Ingestion pipeline settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Upload watcher settings.
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Process-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file holding user documents.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Maximum number of writes committed in one atomic batch.
    #[serde(default = "default_max_batch_writes")]
    pub max_batch_writes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            max_batch_writes: default_max_batch_writes(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("marginalia").join("marginalia.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("marginalia.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Upper bound on `storage.max_batch_writes`.
pub const MAX_BATCH_WRITES_LIMIT: usize = 500;

fn default_max_batch_writes() -> usize {
    MAX_BATCH_WRITES_LIMIT
}

/// Which blob store backend serves uploaded files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// Directory tree laid out as `<root>/<bucket>/<object path>`.
    #[default]
    Local,
    /// HTTP object endpoint serving `<base_url>/<bucket>/<object path>`.
    Http,
}

/// Blob store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlobConfig {
    /// Backend used to fetch uploads.
    #[serde(default)]
    pub backend: BlobBackend,

    /// Root directory of the local backend.
    #[serde(default = "default_blob_root")]
    pub root: String,

    /// Endpoint of the HTTP backend. Required when `backend = "http"`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout for the HTTP backend, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            root: default_blob_root(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_blob_root() -> String {
    dirs::data_dir()
        .map(|p| p.join("marginalia").join("buckets"))
        .unwrap_or_else(|| std::path::PathBuf::from("buckets"))
        .to_string_lossy()
        .into_owned()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Ingestion pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// First path segment of accepted uploads.
    #[serde(default = "default_upload_prefix")]
    pub upload_prefix: String,

    /// File name an accepted upload must have.
    #[serde(default = "default_source_filename")]
    pub source_filename: String,

    /// Directory for scratch copies of uploads. System temp dir when unset.
    #[serde(default)]
    pub scratch_dir: Option<String>,

    /// `content.ContentType` value identifying top-level books.
    #[serde(default = "default_book_content_type")]
    pub book_content_type: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_prefix: default_upload_prefix(),
            source_filename: default_source_filename(),
            scratch_dir: None,
            book_content_type: default_book_content_type(),
        }
    }
}

fn default_upload_prefix() -> String {
    "uploads".to_string()
}

fn default_source_filename() -> String {
    "KoboReader.sqlite".to_string()
}

fn default_book_content_type() -> i64 {
    6
}

/// Upload watcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Bucket (directory under `blobs.root`) to watch.
    #[serde(default = "default_watch_bucket")]
    pub bucket: String,

    /// Debounce window for filesystem events, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long shutdown waits for in-flight runs, in seconds.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            bucket: default_watch_bucket(),
            debounce_ms: default_debounce_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_watch_bucket() -> String {
    "default".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_drain_timeout_secs() -> u64 {
    30
}
