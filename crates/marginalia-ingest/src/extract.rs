// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema-tolerant extraction of books and bookmarks from a Kobo database.
//!
//! The `Bookmark.Color` column only exists on newer firmware. The schema is
//! probed up front and one of two fixed query shapes is run; extraction never
//! inspects error text to decide between them. Optional columns are read
//! leniently: a value of the wrong storage class is treated as absent.
//!
//! Extraction is all-or-nothing. Any failure other than the missing color
//! column aborts the run before anything is written.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, OpenFlags, Row};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use marginalia_core::MarginaliaError;

/// Table holding books, chapters, and other content items.
pub const CONTENT_TABLE: &str = "content";
/// Table holding highlights, notes, and dogears.
pub const BOOKMARK_TABLE: &str = "Bookmark";
/// Optional bookmark column added by newer firmware.
pub const COLOR_COLUMN: &str = "Color";

const BOOKS_QUERY: &str = "SELECT ContentID, Title, Attribution, TimeSpentReading, ___PercentRead,
        WordCount, Series, SeriesNumber, Description, AverageRating, RatingCount, DateLastRead
     FROM content
     WHERE ContentType = ?1";

const HIGHLIGHTS_WITH_COLOR_QUERY: &str =
    "SELECT VolumeID, Text, Annotation, DateCreated, Type, Color
     FROM Bookmark
     WHERE Type = 'highlight' OR Type = 'note'";

const HIGHLIGHTS_WITHOUT_COLOR_QUERY: &str = "SELECT VolumeID, Text, Annotation, DateCreated, Type
     FROM Bookmark
     WHERE Type = 'highlight' OR Type = 'note'";

/// Which bookmark projection a source file supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightShape {
    WithColor,
    WithoutColor,
}

/// A book row as read from `content`, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBook {
    pub content_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub time_spent_reading: Option<i64>,
    pub percent_read: Option<i64>,
    pub word_count: Option<i64>,
    pub series: Option<String>,
    pub series_number: Option<String>,
    pub description: Option<String>,
    pub average_rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub date_last_read: Option<String>,
}

/// A highlight or note row as read from `Bookmark`, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHighlight {
    pub volume_id: Option<String>,
    pub text: Option<String>,
    pub annotation: Option<String>,
    pub date_created: Option<String>,
    pub kind: Option<String>,
    pub color: Option<i64>,
}

/// Both record sets of one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub shape: HighlightShape,
    pub books: Vec<RawBook>,
    pub highlights: Vec<RawHighlight>,
}

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub decl_type: String,
}

/// Column lists of the two tables extraction depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    /// `None` when the table does not exist.
    pub content: Option<Vec<ColumnInfo>>,
    pub bookmark: Option<Vec<ColumnInfo>>,
}

impl SchemaReport {
    /// The extraction path this schema selects, or `None` if a table is missing.
    pub fn highlight_shape(&self) -> Option<HighlightShape> {
        self.content.as_ref()?;
        let bookmark = self.bookmark.as_ref()?;
        if bookmark
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(COLOR_COLUMN))
        {
            Some(HighlightShape::WithColor)
        } else {
            Some(HighlightShape::WithoutColor)
        }
    }
}

/// Failure inside the reader connection, before mapping to [`MarginaliaError`].
#[derive(Debug, Error)]
enum ExtractFailure {
    #[error("table `{0}` not found; is this a KoboReader.sqlite file?")]
    MissingTable(&'static str),

    #[error("{what} failed: {source}")]
    Query {
        what: &'static str,
        source: rusqlite::Error,
    },
}

fn map_extract_err(e: tokio_rusqlite::Error<ExtractFailure>) -> MarginaliaError {
    match e {
        tokio_rusqlite::Error::Error(failure) => {
            MarginaliaError::extraction(failure.to_string(), failure)
        }
        other => MarginaliaError::extraction(other.to_string(), other),
    }
}

fn query_failed(what: &'static str) -> impl FnOnce(rusqlite::Error) -> ExtractFailure {
    move |source| ExtractFailure::Query { what, source }
}

/// Reads books and highlights from a Kobo database file.
#[derive(Debug, Clone)]
pub struct Extractor {
    book_content_type: i64,
}

impl Extractor {
    pub fn new(book_content_type: i64) -> Self {
        Self { book_content_type }
    }

    /// Probe the schema and run the matching query shape.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn extract(&self, path: &Path) -> Result<Extraction, MarginaliaError> {
        let content_type = self.book_content_type;
        let conn = open_read_only(path).await?;

        let extraction = conn
            .call(move |conn| -> Result<Extraction, ExtractFailure> {
                let schema = read_schema(conn)?;
                let shape = match schema.highlight_shape() {
                    Some(shape) => shape,
                    None if schema.content.is_none() => {
                        return Err(ExtractFailure::MissingTable(CONTENT_TABLE));
                    }
                    None => return Err(ExtractFailure::MissingTable(BOOKMARK_TABLE)),
                };

                let books = read_books(conn, content_type)?;
                let highlights = match shape {
                    HighlightShape::WithColor => read_highlights_with_color(conn)?,
                    HighlightShape::WithoutColor => read_highlights_without_color(conn)?,
                };
                Ok(Extraction {
                    shape,
                    books,
                    highlights,
                })
            })
            .await
            .map_err(map_extract_err)?;

        if extraction.shape == HighlightShape::WithoutColor {
            info!("Bookmark.Color absent; highlights default to color 0");
        }
        debug!(
            books = extraction.books.len(),
            highlights = extraction.highlights.len(),
            shape = ?extraction.shape,
            "source extracted"
        );
        Ok(extraction)
    }

    /// Report the columns of `content` and `Bookmark` without extracting rows.
    pub async fn inspect(&self, path: &Path) -> Result<SchemaReport, MarginaliaError> {
        let conn = open_read_only(path).await?;
        conn.call(|conn| -> Result<SchemaReport, ExtractFailure> { read_schema(conn) })
            .await
            .map_err(map_extract_err)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(6)
    }
}

async fn open_read_only(path: &Path) -> Result<tokio_rusqlite::Connection, MarginaliaError> {
    tokio_rusqlite::Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .await
    .map_err(|e| MarginaliaError::extraction(format!("cannot open {}", path.display()), e))
}

fn read_schema(conn: &rusqlite::Connection) -> Result<SchemaReport, ExtractFailure> {
    Ok(SchemaReport {
        content: table_columns(conn, CONTENT_TABLE)?,
        bookmark: table_columns(conn, BOOKMARK_TABLE)?,
    })
}

fn table_columns(
    conn: &rusqlite::Connection,
    table: &'static str,
) -> Result<Option<Vec<ColumnInfo>>, ExtractFailure> {
    let mut stmt = conn
        .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(query_failed("schema probe"))?;
    let columns = stmt
        .query_map(params![table], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                decl_type: row.get(1)?,
            })
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(query_failed("schema probe"))?;
    Ok((!columns.is_empty()).then_some(columns))
}

fn read_books(conn: &rusqlite::Connection, content_type: i64) -> Result<Vec<RawBook>, ExtractFailure> {
    let mut stmt = conn.prepare(BOOKS_QUERY).map_err(query_failed("books query"))?;
    stmt.query_map(params![content_type], |row| {
        Ok(RawBook {
            content_id: text(row, 0)?,
            title: text(row, 1)?,
            author: text(row, 2)?,
            time_spent_reading: integer(row, 3)?,
            percent_read: integer(row, 4)?,
            word_count: integer(row, 5)?,
            series: text(row, 6)?,
            series_number: text(row, 7)?,
            description: text(row, 8)?,
            average_rating: real(row, 9)?,
            rating_count: integer(row, 10)?,
            date_last_read: text(row, 11)?,
        })
    })
    .and_then(|rows| rows.collect())
    .map_err(query_failed("books query"))
}

fn read_highlights_with_color(
    conn: &rusqlite::Connection,
) -> Result<Vec<RawHighlight>, ExtractFailure> {
    let mut stmt = conn
        .prepare(HIGHLIGHTS_WITH_COLOR_QUERY)
        .map_err(query_failed("highlights query"))?;
    stmt.query_map([], |row| {
        Ok(RawHighlight {
            color: integer(row, 5)?,
            ..bookmark_columns(row)?
        })
    })
    .and_then(|rows| rows.collect())
    .map_err(query_failed("highlights query"))
}

fn read_highlights_without_color(
    conn: &rusqlite::Connection,
) -> Result<Vec<RawHighlight>, ExtractFailure> {
    let mut stmt = conn
        .prepare(HIGHLIGHTS_WITHOUT_COLOR_QUERY)
        .map_err(query_failed("highlights query"))?;
    stmt.query_map([], |row| {
        Ok(RawHighlight {
            color: Some(0),
            ..bookmark_columns(row)?
        })
    })
    .and_then(|rows| rows.collect())
    .map_err(query_failed("highlights query"))
}

/// The five bookmark columns shared by both query shapes.
fn bookmark_columns(row: &Row<'_>) -> rusqlite::Result<RawHighlight> {
    Ok(RawHighlight {
        volume_id: text(row, 0)?,
        text: text(row, 1)?,
        annotation: text(row, 2)?,
        date_created: text(row, 3)?,
        kind: text(row, 4)?,
        color: None,
    })
}

fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(lenient_text(row.get_ref(idx)?))
}

fn integer(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(lenient_integer(row.get_ref(idx)?))
}

fn real(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(lenient_real(row.get_ref(idx)?))
}

/// Text, or a number rendered as text. Blobs and NULL are absent.
pub(crate) fn lenient_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

/// Integer, a whole real, or numeric text. Anything else is absent.
pub(crate) fn lenient_integer(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) => whole(f),
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes).ok()?.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))
        }
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

/// Real, integer, or numeric text. Non-finite values are absent.
pub(crate) fn lenient_real(value: ValueRef<'_>) -> Option<f64> {
    let f = match value {
        ValueRef::Real(f) => f,
        ValueRef::Integer(i) => i as f64,
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok()?,
        ValueRef::Null | ValueRef::Blob(_) => return None,
    };
    f.is_finite().then_some(f)
}

fn whole(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}
