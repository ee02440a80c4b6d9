// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `marginalia schema`: show the reader database columns ingestion relies on.

use std::path::Path;

use marginalia_config::model::MarginaliaConfig;
use marginalia_core::MarginaliaError;
use marginalia_ingest::extract::{ColumnInfo, Extractor, HighlightShape, SchemaReport};

pub async fn run_schema(
    config: &MarginaliaConfig,
    db: &Path,
    json: bool,
) -> Result<(), MarginaliaError> {
    let report = Extractor::new(config.ingest.book_content_type)
        .inspect(db)
        .await?;

    if json {
        let shape = report.highlight_shape();
        let rendered = serde_json::to_string_pretty(&serde_json::json!({
            "content": report.content,
            "bookmark": report.bookmark,
            "highlight_shape": shape,
        }))
        .map_err(|e| MarginaliaError::Internal(format!("failed to render schema: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", render(&report));
    }
    Ok(())
}

fn render(report: &SchemaReport) -> String {
    let mut out = String::new();
    render_table(&mut out, "content", report.content.as_deref());
    render_table(&mut out, "Bookmark", report.bookmark.as_deref());
    let path = match report.highlight_shape() {
        Some(HighlightShape::WithColor) => "highlights with color",
        Some(HighlightShape::WithoutColor) => "highlights without color (color defaults to 0)",
        None => "none: required table missing",
    };
    out.push_str(&format!("extraction path: {path}\n"));
    out
}

fn render_table(out: &mut String, name: &str, columns: Option<&[ColumnInfo]>) {
    match columns {
        Some(columns) => {
            out.push_str(&format!("{name} ({} columns)\n", columns.len()));
            for column in columns {
                let decl = if column.decl_type.is_empty() {
                    "-"
                } else {
                    column.decl_type.as_str()
                };
                out.push_str(&format!("  {:<24} {decl}\n", column.name));
            }
        }
        None => out.push_str(&format!("{name}: missing\n")),
    }
}
