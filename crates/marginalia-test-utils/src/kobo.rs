// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builder for Kobo-shaped reader databases.
//!
//! Produces the `content` and `Bookmark` tables as the reader firmware lays
//! them out, trimmed to the columns ingestion reads, with switches for the
//! schema variants ingestion has to cope with.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

/// `ContentType` of a top-level book.
pub const BOOK_CONTENT_TYPE: i64 = 6;
/// `ContentType` of a chapter entry.
pub const CHAPTER_CONTENT_TYPE: i64 = 9;

/// One `content` row.
#[derive(Debug, Clone, Default)]
pub struct FixtureBook {
    pub content_id: String,
    pub content_type: i64,
    pub title: Option<String>,
    pub attribution: Option<String>,
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

impl FixtureBook {
    pub fn new(content_id: &str, title: &str) -> Self {
        Self {
            content_id: content_id.to_string(),
            content_type: BOOK_CONTENT_TYPE,
            title: Some(title.to_string()),
            ..Default::default()
        }
    }
}

/// One `Bookmark` row.
#[derive(Debug, Clone, Default)]
pub struct FixtureBookmark {
    pub volume_id: Option<String>,
    pub text: Option<String>,
    pub annotation: Option<String>,
    pub date_created: Option<String>,
    pub kind: String,
    pub color: Option<i64>,
}

/// Builds a reader database file.
#[derive(Debug, Clone)]
pub struct KoboFixture {
    with_color: bool,
    with_bookmark_table: bool,
    broken_content: bool,
    wal: bool,
    books: Vec<FixtureBook>,
    bookmarks: Vec<FixtureBookmark>,
    statements: Vec<String>,
}

impl Default for KoboFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl KoboFixture {
    /// Current-firmware schema, with `Bookmark.Color`.
    pub fn new() -> Self {
        Self {
            with_color: true,
            with_bookmark_table: true,
            broken_content: false,
            wal: false,
            books: Vec::new(),
            bookmarks: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Older firmware: `Bookmark` has no `Color` column.
    pub fn without_color(mut self) -> Self {
        self.with_color = false;
        self
    }

    /// Drop the `Bookmark` table entirely.
    pub fn without_bookmark_table(mut self) -> Self {
        self.with_bookmark_table = false;
        self
    }

    /// Leave out `content.___PercentRead`, so the book query fails with an
    /// ordinary SQL error.
    pub fn broken(mut self) -> Self {
        self.broken_content = true;
        self
    }

    /// Leave the file in WAL journal mode, as current firmware does.
    pub fn wal(mut self) -> Self {
        self.wal = true;
        self
    }

    pub fn book(self, content_id: &str, title: &str) -> Self {
        self.book_row(FixtureBook::new(content_id, title))
    }

    /// A non-book `content` row (chapter) that extraction must not pick up.
    pub fn chapter(self, content_id: &str, title: &str) -> Self {
        self.book_row(FixtureBook {
            content_type: CHAPTER_CONTENT_TYPE,
            ..FixtureBook::new(content_id, title)
        })
    }

    pub fn book_row(mut self, book: FixtureBook) -> Self {
        self.books.push(book);
        self
    }

    pub fn highlight(self, volume_id: &str, text: &str) -> Self {
        self.bookmark(FixtureBookmark {
            volume_id: Some(volume_id.to_string()),
            text: Some(text.to_string()),
            kind: "highlight".to_string(),
            color: Some(0),
            ..Default::default()
        })
    }

    pub fn note(self, volume_id: &str, text: &str, annotation: &str) -> Self {
        self.bookmark(FixtureBookmark {
            volume_id: Some(volume_id.to_string()),
            text: Some(text.to_string()),
            annotation: Some(annotation.to_string()),
            kind: "note".to_string(),
            color: Some(0),
            ..Default::default()
        })
    }

    /// A bookmark of a type ingestion ignores.
    pub fn dogear(self, volume_id: &str) -> Self {
        self.bookmark(FixtureBookmark {
            volume_id: Some(volume_id.to_string()),
            kind: "dogear".to_string(),
            ..Default::default()
        })
    }

    pub fn bookmark(mut self, bookmark: FixtureBookmark) -> Self {
        self.bookmarks.push(bookmark);
        self
    }

    /// Run an arbitrary statement after the rows are inserted.
    pub fn sql(mut self, statement: &str) -> Self {
        self.statements.push(statement.to_string());
        self
    }

    /// Write the database to `path`, replacing any existing file.
    pub fn write(&self, path: &Path) -> rusqlite::Result<()> {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
        let conn = Connection::open(path)?;
        if self.wal {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
        }
        conn.execute_batch(&self.schema())?;

        {
            let mut insert = conn.prepare(&self.book_insert())?;
            for b in &self.books {
                if self.broken_content {
                    insert.execute(params![
                        b.content_id,
                        b.content_type,
                        b.title,
                        b.attribution,
                        b.time_spent_reading,
                        b.word_count,
                        b.series,
                        b.series_number,
                        b.description,
                        b.average_rating,
                        b.rating_count,
                        b.date_last_read,
                    ])?;
                } else {
                    insert.execute(params![
                        b.content_id,
                        b.content_type,
                        b.title,
                        b.attribution,
                        b.time_spent_reading,
                        b.percent_read,
                        b.word_count,
                        b.series,
                        b.series_number,
                        b.description,
                        b.average_rating,
                        b.rating_count,
                        b.date_last_read,
                    ])?;
                }
            }
        }

        if self.with_bookmark_table {
            let sql = if self.with_color {
                "INSERT INTO Bookmark (BookmarkID, VolumeID, Text, Annotation, DateCreated, Type, Color)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            } else {
                "INSERT INTO Bookmark (BookmarkID, VolumeID, Text, Annotation, DateCreated, Type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            };
            let mut insert = conn.prepare(sql)?;
            for (i, m) in self.bookmarks.iter().enumerate() {
                let id = format!("bm-{i:05}");
                if self.with_color {
                    insert.execute(params![
                        id,
                        m.volume_id,
                        m.text,
                        m.annotation,
                        m.date_created,
                        m.kind,
                        m.color
                    ])?;
                } else {
                    insert.execute(params![
                        id,
                        m.volume_id,
                        m.text,
                        m.annotation,
                        m.date_created,
                        m.kind
                    ])?;
                }
            }
        }

        for statement in &self.statements {
            conn.execute_batch(statement)?;
        }
        Ok(())
    }

    /// Write the database into `dir` as `KoboReader.sqlite` and return its path.
    pub fn write_in(&self, dir: &Path) -> rusqlite::Result<PathBuf> {
        let path = dir.join("KoboReader.sqlite");
        self.write(&path)?;
        Ok(path)
    }

    /// The database file contents, for seeding a blob store.
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let path = self
            .write_in(dir.path())
            .map_err(std::io::Error::other)?;
        std::fs::read(path)
    }

    fn schema(&self) -> String {
        let percent = if self.broken_content {
            ""
        } else {
            "___PercentRead INTEGER,"
        };
        let mut sql = format!(
            "CREATE TABLE content (
                ContentID TEXT NOT NULL PRIMARY KEY,
                ContentType TEXT NOT NULL,
                MimeType TEXT,
                BookID TEXT,
                Title TEXT,
                Attribution TEXT,
                TimeSpentReading INTEGER DEFAULT 0,
                {percent}
                WordCount INTEGER DEFAULT -1,
                Series TEXT,
                SeriesNumber TEXT,
                Description TEXT,
                AverageRating REAL,
                RatingCount INTEGER,
                DateLastRead TEXT
            );"
        );
        if self.with_bookmark_table {
            let color = if self.with_color { ", Color INTEGER" } else { "" };
            sql.push_str(&format!(
                "CREATE TABLE Bookmark (
                    BookmarkID TEXT NOT NULL PRIMARY KEY,
                    VolumeID TEXT,
                    ContentID TEXT,
                    Text TEXT,
                    Annotation TEXT,
                    DateCreated TEXT,
                    Type TEXT{color}
                );"
            ));
        }
        sql
    }

    fn book_insert(&self) -> String {
        let (percent_col, placeholders) = if self.broken_content {
            ("", "?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12")
        } else {
            (
                "___PercentRead, ",
                "?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13",
            )
        };
        format!(
            "INSERT INTO content (ContentID, ContentType, Title, Attribution, TimeSpentReading,
                {percent_col}WordCount, Series, SeriesNumber, Description, AverageRating,
                RatingCount, DateLastRead)
             VALUES ({placeholders})"
        )
    }
}
