// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction against fixture reader databases.

use marginalia_core::MarginaliaError;
use marginalia_ingest::extract::{Extractor, HighlightShape};
use marginalia_ingest::normalize_file;
use marginalia_test_utils::kobo::{FixtureBook, FixtureBookmark, KoboFixture};
use tempfile::tempdir;

#[tokio::test]
async fn reads_books_and_qualifying_bookmarks() {
    let dir = tempdir().unwrap();
    let path = KoboFixture::new()
        .book_row(FixtureBook {
            attribution: Some("Frank Herbert".into()),
            percent_read: Some(42),
            average_rating: Some(4.5),
            ..FixtureBook::new("file:///mnt/onboard/dune.epub", "Dune")
        })
        .chapter("file:///mnt/onboard/dune.epub#ch1", "Chapter 1")
        .highlight("file:///mnt/onboard/dune.epub", "Fear is the mind-killer.")
        .note("file:///mnt/onboard/dune.epub", "The spice must flow.", "classic")
        .dogear("file:///mnt/onboard/dune.epub")
        .write_in(dir.path())
        .unwrap();

    let extraction = Extractor::default().extract(&path).await.unwrap();
    assert_eq!(extraction.shape, HighlightShape::WithColor);
    assert_eq!(extraction.books.len(), 1);
    assert_eq!(extraction.highlights.len(), 2);

    let book = &extraction.books[0];
    assert_eq!(book.title.as_deref(), Some("Dune"));
    assert_eq!(book.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(book.percent_read, Some(42));
    assert_eq!(book.average_rating, Some(4.5));
}

#[tokio::test]
async fn missing_color_column_selects_colorless_path() {
    let dir = tempdir().unwrap();
    let path = KoboFixture::new()
        .without_color()
        .book("b1", "Old Firmware")
        .highlight("b1", "one")
        .highlight("b1", "two")
        .write_in(dir.path())
        .unwrap();

    let extraction = Extractor::default().extract(&path).await.unwrap();
    assert_eq!(extraction.shape, HighlightShape::WithoutColor);
    assert_eq!(extraction.highlights.len(), 2);
    assert!(extraction.highlights.iter().all(|h| h.color == Some(0)));
}

#[tokio::test]
async fn stored_colors_are_kept() {
    let dir = tempdir().unwrap();
    let path = KoboFixture::new()
        .book("b1", "Colorful")
        .bookmark(FixtureBookmark {
            volume_id: Some("b1".into()),
            text: Some("yellow".into()),
            kind: "highlight".into(),
            color: Some(3),
            ..Default::default()
        })
        .bookmark(FixtureBookmark {
            volume_id: Some("b1".into()),
            text: Some("unset".into()),
            kind: "highlight".into(),
            color: None,
            ..Default::default()
        })
        .write_in(dir.path())
        .unwrap();

    let normalized = normalize_file(&Extractor::default(), &path, "alice")
        .await
        .unwrap();
    let colors: Vec<i64> = normalized.highlights.iter().map(|h| h.color).collect();
    assert_eq!(colors, [3, 0]);
}

#[tokio::test]
async fn malformed_optional_columns_read_as_absent() {
    let dir = tempdir().unwrap();
    let path = KoboFixture::new()
        .book("b1", "Messy")
        .sql(
            "UPDATE content SET ___PercentRead = 'lots', WordCount = x'00ff',
                 AverageRating = 'n/a', RatingCount = 12.5
             WHERE ContentID = 'b1'",
        )
        .write_in(dir.path())
        .unwrap();

    let extraction = Extractor::default().extract(&path).await.unwrap();
    let book = &extraction.books[0];
    assert_eq!(book.percent_read, None);
    assert_eq!(book.word_count, None);
    assert_eq!(book.average_rating, None);
    assert_eq!(book.rating_count, None);
    assert_eq!(book.title.as_deref(), Some("Messy"));
}

#[tokio::test]
async fn unrelated_sql_error_is_fatal() {
    let dir = tempdir().unwrap();
    let path = KoboFixture::new()
        .broken()
        .book("b1", "Broken")
        .highlight("b1", "never read")
        .write_in(dir.path())
        .unwrap();

    let err = Extractor::default().extract(&path).await.unwrap_err();
    assert!(matches!(err, MarginaliaError::Extraction { .. }));
    assert!(err.to_string().contains("___PercentRead"), "{err}");
}

#[tokio::test]
async fn missing_bookmark_table_is_fatal() {
    let dir = tempdir().unwrap();
    let path = KoboFixture::new()
        .without_bookmark_table()
        .book("b1", "No bookmarks")
        .write_in(dir.path())
        .unwrap();

    let err = Extractor::default().extract(&path).await.unwrap_err();
    assert!(matches!(err, MarginaliaError::Extraction { .. }));
    assert!(err.to_string().contains("Bookmark"));
}

#[tokio::test]
async fn non_database_file_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("KoboReader.sqlite");
    std::fs::write(&path, b"definitely not sqlite, just text that is long enough").unwrap();

    let err = Extractor::default().extract(&path).await.unwrap_err();
    assert!(matches!(err, MarginaliaError::Extraction { .. }));
}

#[tokio::test]
async fn inspect_reports_columns_and_shape() {
    let dir = tempdir().unwrap();
    let path = KoboFixture::new()
        .without_color()
        .write_in(dir.path())
        .unwrap();

    let report = Extractor::default().inspect(&path).await.unwrap();
    assert_eq!(report.highlight_shape(), Some(HighlightShape::WithoutColor));
    let content = report.content.unwrap();
    assert!(content.iter().any(|c| c.name == "___PercentRead"));
    assert!(report.bookmark.unwrap().iter().all(|c| c.name != "Color"));
}
