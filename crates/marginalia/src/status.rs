// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `marginalia status` command implementation.
//!
//! Reads the user's processing-status document, which is what an uploading
//! client polls for after a run. `--json` prints the document as stored.

use std::io::IsTerminal;

use marginalia_config::model::MarginaliaConfig;
use marginalia_core::{MarginaliaError, PluginAdapter, ProcessingStatus, StatusKind};
use marginalia_ingest::StatusReporter;
use serde::Serialize;

use crate::ingest::open_document_store;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub user_id: String,
    /// `"pending"` when no run has finished yet.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl StatusResponse {
    fn new(user_id: &str, status: Option<ProcessingStatus>) -> Self {
        match status {
            Some(s) => Self {
                user_id: user_id.to_string(),
                status: s.status.to_string(),
                book_count: s.book_count,
                highlight_count: s.highlight_count,
                error: s.error,
                updated_at: Some(s.updated_at),
            },
            None => Self {
                user_id: user_id.to_string(),
                status: "pending".to_string(),
                book_count: None,
                highlight_count: None,
                error: None,
                updated_at: None,
            },
        }
    }
}

/// Run the `marginalia status` command.
pub async fn run_status(
    config: &MarginaliaConfig,
    user_id: &str,
    json: bool,
    plain: bool,
) -> Result<(), MarginaliaError> {
    let documents = open_document_store(config).await?;
    let current = StatusReporter::new(documents.clone()).current(user_id).await;
    documents.shutdown().await?;
    let response = StatusResponse::new(user_id, current?);

    if json {
        let rendered = serde_json::to_string_pretty(&response)
            .map_err(|e| MarginaliaError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&response, use_color);
    }
    Ok(())
}

fn headline(response: &StatusResponse) -> String {
    match response.status.parse::<StatusKind>() {
        Ok(StatusKind::Success) => format!(
            "imported {} highlights from {} books",
            response.highlight_count.unwrap_or(0),
            response.book_count.unwrap_or(0)
        ),
        Ok(StatusKind::NoHighlights) => format!(
            "no highlights found in {} books",
            response.book_count.unwrap_or(0)
        ),
        Ok(StatusKind::Error) => format!(
            "import failed: {}",
            response.error.as_deref().unwrap_or("unknown error")
        ),
        Err(_) => "no upload processed yet".to_string(),
    }
}

fn print_status(response: &StatusResponse, use_color: bool) {
    println!();
    println!("  marginalia status: {}", response.user_id);
    println!("  {}", "-".repeat(35));

    let line = headline(response);
    if use_color {
        use colored::Colorize;
        let (mark, line) = match response.status.as_str() {
            "success" => ("✓".green(), line.green()),
            "no_highlights" => ("!".yellow(), line.yellow()),
            "error" => ("✗".red(), line.red()),
            _ => ("·".dimmed(), line.dimmed()),
        };
        println!("    State:    {mark} {line}");
    } else {
        let tag = match response.status.as_str() {
            "success" => "[OK]",
            "no_highlights" => "[WARN]",
            "error" => "[FAIL]",
            _ => "[--]",
        };
        println!("    State:    {tag} {line}");
    }

    if let Some(updated_at) = &response.updated_at {
        println!("    Updated:  {updated_at}");
    }
    println!();
}
