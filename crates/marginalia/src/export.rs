// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `marginalia export`: extract and normalize a local reader database into
//! two JSON files, without touching any store.

use std::path::Path;

use marginalia_config::model::MarginaliaConfig;
use marginalia_core::MarginaliaError;
use marginalia_ingest::extract::Extractor;
use marginalia_ingest::normalize_file;
use serde::Serialize;
use tracing::info;

pub async fn run_export(
    config: &MarginaliaConfig,
    db: &Path,
    user_id: &str,
    books_out: &Path,
    highlights_out: &Path,
) -> Result<(), MarginaliaError> {
    let extractor = Extractor::new(config.ingest.book_content_type);
    let records = normalize_file(&extractor, db, user_id).await?;

    write_json(books_out, &records.books).await?;
    write_json(highlights_out, &records.highlights).await?;

    info!(
        user_id,
        book_count = records.books.len(),
        highlight_count = records.highlights.len(),
        "export written"
    );
    println!(
        "exported {} books to {} and {} highlights to {}",
        records.books.len(),
        books_out.display(),
        records.highlights.len(),
        highlights_out.display()
    );
    Ok(())
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MarginaliaError> {
    let mut rendered = serde_json::to_string_pretty(value)
        .map_err(|e| MarginaliaError::Internal(format!("failed to render JSON: {e}")))?;
    rendered.push('\n');
    tokio::fs::write(path, rendered)
        .await
        .map_err(|e| MarginaliaError::Internal(format!("cannot write {}: {e}", path.display())))
}
