// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the ingestion pipeline and the storage adapters.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Object-creation event delivered by blob storage for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEvent {
    /// Bucket that received the object.
    pub bucket: String,
    /// Full object path inside the bucket, e.g. `uploads/<uid>/KoboReader.sqlite`.
    pub object_path: String,
}

impl UploadEvent {
    pub fn new(bucket: impl Into<String>, object_path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object_path: object_path.into(),
        }
    }
}

/// One title in a user's library, keyed by its sanitized content identifier.
///
/// Absent optional fields are left out of the serialized form, so a merge
/// never clears a value stored by an earlier run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Sanitized source content identifier (storage key).
    pub book_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Seconds spent reading, as tracked by the reader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_reading: Option<i64>,
    /// Reading progress, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_read: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_last_read: Option<String>,
}

/// Whether a bookmark row is a plain highlight or an annotated note.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HighlightKind {
    Highlight,
    Note,
}

/// One highlight or note, keyed by a content-derived hash.
///
/// The social fields (`likes`, `like_count`) are deliberately absent: they are
/// owned by another collaborator and only seeded on first write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRecord {
    /// Hex SHA-1 of `"{owner}-{book_id}-{text}"`.
    pub highlight_id: String,
    /// Sanitized book identifier, same transformation as [`BookRecord::book_id`].
    pub book_id: String,
    pub text: String,
    pub annotation: Option<String>,
    pub date_created: Option<String>,
    /// Reader highlight color enum; `0` when the source has no color.
    pub color: i64,
    #[serde(rename = "type")]
    pub kind: HighlightKind,
}

/// Terminal outcome of an ingestion run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusKind {
    Success,
    NoHighlights,
    Error,
}

/// Per-user status document, overwritten by every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub status: StatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 UTC timestamp of the write.
    pub updated_at: String,
}

impl ProcessingStatus {
    /// Status for a run that committed its records.
    ///
    /// Books without any highlight yield `no_highlights`; everything else,
    /// including an empty library, is `success`.
    pub fn completed(book_count: usize, highlight_count: usize) -> Self {
        let status = if book_count > 0 && highlight_count == 0 {
            StatusKind::NoHighlights
        } else {
            StatusKind::Success
        };
        Self {
            status,
            book_count: Some(book_count),
            highlight_count: Some(highlight_count),
            error: None,
            updated_at: now_rfc3339(),
        }
    }

    /// Status for a run aborted by a fatal error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: StatusKind::Error,
            book_count: None,
            highlight_count: None,
            error: Some(message.into()),
            updated_at: now_rfc3339(),
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    BlobStore,
    DocumentStore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn books_without_highlights_report_no_highlights() {
        let status = ProcessingStatus::completed(3, 0);
        assert_eq!(status.status, StatusKind::NoHighlights);
        assert_eq!(status.book_count, Some(3));
        assert_eq!(status.highlight_count, Some(0));
        assert!(status.error.is_none());
    }

    #[test]
    fn empty_library_reports_success() {
        let status = ProcessingStatus::completed(0, 0);
        assert_eq!(status.status, StatusKind::Success);
    }

    #[test]
    fn failed_status_carries_message_and_no_counts() {
        let status = ProcessingStatus::failed("boom");
        assert_eq!(status.status, StatusKind::Error);
        assert_eq!(status.error.as_deref(), Some("boom"));
        assert!(status.book_count.is_none());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("book_count").is_none());
    }

    #[test]
    fn book_record_omits_absent_fields() {
        let record = BookRecord {
            book_id: "b1".into(),
            title: "Dune".into(),
            author: None,
            time_spent_reading: Some(0),
            percent_read: None,
            word_count: None,
            series: None,
            series_number: None,
            description: None,
            average_rating: None,
            rating_count: None,
            date_last_read: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"book_id": "b1", "title": "Dune", "time_spent_reading": 0}));

        let back: BookRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn highlight_kind_serializes_as_type_field() {
        let record = HighlightRecord {
            highlight_id: "abc".into(),
            book_id: "book".into(),
            text: "quote".into(),
            annotation: None,
            date_created: None,
            color: 0,
            kind: HighlightKind::Note,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "note");
        assert!(json["annotation"].is_null());
    }

    #[test]
    fn highlight_kind_parses_from_source_strings() {
        use std::str::FromStr;
        assert_eq!(HighlightKind::from_str("highlight").unwrap(), HighlightKind::Highlight);
        assert_eq!(HighlightKind::from_str("note").unwrap(), HighlightKind::Note);
        assert!(HighlightKind::from_str("dogear").is_err());
    }
}
