// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity derivation and normalization of extracted rows.
//!
//! Everything here is pure. Malformed optional fields are dropped rather than
//! reported; a row is only excluded when it cannot be identified.

use std::collections::HashMap;
use std::str::FromStr;

use sha1::{Digest, Sha1};
use tracing::debug;

use marginalia_core::{BookRecord, HighlightKind, HighlightRecord};

use crate::extract::{Extraction, RawBook, RawHighlight};

/// Replacement for `/` in book identifiers used as storage keys.
pub const PATH_SEPARATOR_SUBSTITUTE: &str = "__";

/// Make a source content identifier safe to use as a single path segment.
pub fn sanitize_book_id(raw: &str) -> String {
    raw.replace('/', PATH_SEPARATOR_SUBSTITUTE)
}

/// Hex SHA-1 of `"{owner}-{sanitized_book_id}-{text}"`.
///
/// Stable across runs for the same triple. Editing the text yields a new id.
pub fn highlight_id(owner_user_id: &str, sanitized_book_id: &str, text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(owner_user_id.as_bytes());
    hasher.update(b"-");
    hasher.update(sanitized_book_id.as_bytes());
    hasher.update(b"-");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Normalize one book row. `None` when the row has no identifier or no title.
pub fn normalize_book(raw: RawBook) -> Option<BookRecord> {
    let book_id = sanitize_book_id(non_empty(&raw.content_id)?);
    let title = non_empty(&raw.title)?.to_string();
    Some(BookRecord {
        book_id,
        title,
        author: raw.author,
        time_spent_reading: raw.time_spent_reading,
        percent_read: raw.percent_read.filter(|p| (0..=100).contains(p)),
        word_count: raw.word_count,
        series: raw.series,
        series_number: raw.series_number,
        description: raw.description,
        average_rating: raw.average_rating,
        rating_count: raw.rating_count,
        date_last_read: raw.date_last_read,
    })
}

/// Normalize one bookmark row for `owner_user_id`.
///
/// `None` when the book reference or text is missing, or the type is neither
/// `highlight` nor `note`.
pub fn normalize_highlight(owner_user_id: &str, raw: RawHighlight) -> Option<HighlightRecord> {
    let book_id = sanitize_book_id(non_empty(&raw.volume_id)?);
    let text = non_empty(&raw.text)?.to_string();
    let kind = HighlightKind::from_str(raw.kind.as_deref()?.trim()).ok()?;
    Some(HighlightRecord {
        highlight_id: highlight_id(owner_user_id, &book_id, &text),
        book_id,
        text,
        annotation: raw.annotation,
        date_created: raw.date_created,
        color: raw.color.unwrap_or(0),
        kind,
    })
}

/// Output of [`normalize`]: records ready to write, plus what was dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub books: Vec<BookRecord>,
    pub highlights: Vec<HighlightRecord>,
    pub skipped_books: usize,
    pub skipped_highlights: usize,
}

/// Normalize a whole extraction for one owner.
///
/// Records that map to the same storage key are collapsed: the last row wins
/// and keeps the position of the first, so one run never writes a key twice.
pub fn normalize(owner_user_id: &str, extraction: Extraction) -> Normalized {
    let raw_books = extraction.books.len();
    let raw_highlights = extraction.highlights.len();

    let books = dedup_by_key(
        extraction.books.into_iter().filter_map(normalize_book),
        |b| b.book_id.clone(),
    );
    let highlights = dedup_by_key(
        extraction
            .highlights
            .into_iter()
            .filter_map(|h| normalize_highlight(owner_user_id, h)),
        |h| h.highlight_id.clone(),
    );

    let normalized = Normalized {
        skipped_books: raw_books.saturating_sub(books.len()),
        skipped_highlights: raw_highlights.saturating_sub(highlights.len()),
        books,
        highlights,
    };
    debug!(
        user_id = owner_user_id,
        book_count = normalized.books.len(),
        highlight_count = normalized.highlights.len(),
        skipped_books = normalized.skipped_books,
        skipped_highlights = normalized.skipped_highlights,
        "records normalized"
    );
    normalized
}

fn dedup_by_key<T>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::new();
    for item in items {
        match index.get(&key(&item)) {
            Some(&pos) => out[pos] = item,
            None => {
                index.insert(key(&item), out.len());
                out.push(item);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::HighlightShape;
    use proptest::prelude::*;

    fn raw_highlight(volume: &str, text: &str, kind: &str) -> RawHighlight {
        RawHighlight {
            volume_id: Some(volume.to_string()),
            text: Some(text.to_string()),
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn sanitize_replaces_every_separator() {
        assert_eq!(sanitize_book_id("abc/123"), "abc__123");
        assert_eq!(
            sanitize_book_id("file:///mnt/onboard/book.epub"),
            "file:______mnt__onboard__book.epub"
        );
        assert_eq!(sanitize_book_id("plain"), "plain");
    }

    #[test]
    fn highlight_id_is_hex_sha1_of_joined_triple() {
        // sha1("alice-b1-hello")
        let id = highlight_id("alice", "b1", "hello");
        assert_eq!(id.len(), 40);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        let mut hasher = Sha1::new();
        hasher.update(b"alice-b1-hello");
        assert_eq!(id, hex::encode(hasher.finalize()));
    }

    #[test]
    fn book_without_title_or_id_is_skipped() {
        let titled = RawBook {
            content_id: Some("a/b".into()),
            title: Some("Dune".into()),
            ..Default::default()
        };
        assert_eq!(normalize_book(titled).map(|b| b.book_id), Some("a__b".into()));

        let untitled = RawBook {
            content_id: Some("x".into()),
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(normalize_book(untitled).is_none());
        assert!(normalize_book(RawBook::default()).is_none());
    }

    #[test]
    fn percent_read_out_of_range_is_dropped() {
        let book = |p| RawBook {
            content_id: Some("x".into()),
            title: Some("T".into()),
            percent_read: Some(p),
            ..Default::default()
        };
        assert_eq!(normalize_book(book(100)).and_then(|b| b.percent_read), Some(100));
        assert_eq!(normalize_book(book(140)).and_then(|b| b.percent_read), None);
        assert_eq!(normalize_book(book(-1)).and_then(|b| b.percent_read), None);
    }

    #[test]
    fn highlight_requires_book_and_text() {
        assert!(normalize_highlight("u", raw_highlight("", "t", "highlight")).is_none());
        assert!(normalize_highlight("u", raw_highlight("b", "", "highlight")).is_none());
        assert!(normalize_highlight("u", raw_highlight("b", "t", "dogear")).is_none());

        let h = normalize_highlight("u", raw_highlight("b/1", "t", "note")).unwrap();
        assert_eq!(h.book_id, "b__1");
        assert_eq!(h.kind, HighlightKind::Note);
        assert_eq!(h.color, 0);
        assert_eq!(h.highlight_id, highlight_id("u", "b__1", "t"));
    }

    #[test]
    fn duplicates_collapse_to_last_value_at_first_position() {
        let mut first = raw_highlight("b", "same", "highlight");
        first.annotation = Some("old".into());
        let mut last = raw_highlight("b", "same", "note");
        last.annotation = Some("new".into());
        let extraction = Extraction {
            shape: HighlightShape::WithColor,
            books: vec![],
            highlights: vec![first, raw_highlight("b", "other", "highlight"), last],
        };

        let n = normalize("u", extraction);
        assert_eq!(n.highlights.len(), 2);
        assert_eq!(n.highlights[0].annotation.as_deref(), Some("new"));
        assert_eq!(n.highlights[0].kind, HighlightKind::Note);
        assert_eq!(n.highlights[1].text, "other");
        assert_eq!(n.skipped_highlights, 1);
    }

    proptest! {
        #[test]
        fn sanitized_ids_never_contain_separators(raw in ".*") {
            prop_assert!(!sanitize_book_id(&raw).contains('/'));
        }

        #[test]
        fn identity_is_stable(owner in "[a-z0-9]{1,12}", book in ".{1,20}", text in ".{1,40}") {
            let book = sanitize_book_id(&book);
            prop_assert_eq!(highlight_id(&owner, &book, &text), highlight_id(&owner, &book, &text));
        }

        #[test]
        fn edited_text_changes_identity(owner in "[a-z]{1,8}", book in "[a-z]{1,8}", text in ".{1,40}", suffix in ".{1,5}") {
            let edited = format!("{text}{suffix}");
            prop_assert_ne!(highlight_id(&owner, &book, &text), highlight_id(&owner, &book, &edited));
        }

        #[test]
        fn owners_do_not_share_identities(book in "[a-z]{1,8}", text in ".{1,40}") {
            prop_assert_ne!(highlight_id("alice", &book, &text), highlight_id("bob", &book, &text));
        }
    }
}
