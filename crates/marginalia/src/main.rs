// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marginalia - ingests uploaded Kobo highlight databases.
//!
//! This is the binary entry point: it loads configuration, initialises
//! logging, wires the blob and document stores into the ingestion pipeline,
//! and dispatches operator subcommands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod export;
mod ingest;
mod schema;
mod shutdown;
mod status;
mod watch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marginalia_config::model::MarginaliaConfig;
use marginalia_core::MarginaliaError;

/// Marginalia - turns uploaded Kobo highlight databases into shareable highlights.
#[derive(Parser, Debug)]
#[command(name = "marginalia", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle one object-creation event.
    Ingest {
        /// Bucket that received the upload.
        #[arg(long)]
        bucket: String,
        /// Object path inside the bucket, e.g. uploads/<uid>/KoboReader.sqlite.
        #[arg(long = "object")]
        object_path: String,
    },
    /// Watch the local bucket tree and ingest every new upload.
    Watch,
    /// Show a user's processing status.
    Status {
        /// User id whose status to read.
        #[arg(long)]
        user: String,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Extract and normalize a local reader database into JSON files.
    Export {
        /// Path to a KoboReader.sqlite file.
        db: PathBuf,
        /// Owner user id used to derive highlight ids.
        #[arg(long)]
        user: String,
        /// Output file for book records.
        #[arg(long, default_value = "books.json")]
        books: PathBuf,
        /// Output file for highlight records.
        #[arg(long, default_value = "highlights.json")]
        highlights: PathBuf,
    },
    /// Print the reader database tables ingestion depends on.
    Schema {
        /// Path to a KoboReader.sqlite file.
        db: PathBuf,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => marginalia_config::load_and_validate_path(path),
        None => marginalia_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            marginalia_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    if let Err(e) = dispatch(cli.command, config).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("marginalia: {e}");
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands, config: MarginaliaConfig) -> Result<(), MarginaliaError> {
    match command {
        Commands::Ingest {
            bucket,
            object_path,
        } => ingest::run_ingest(&config, bucket, object_path).await,
        Commands::Watch => watch::run_watch(&config).await,
        Commands::Status { user, json, plain } => {
            status::run_status(&config, &user, json, plain).await
        }
        Commands::Export {
            db,
            user,
            books,
            highlights,
        } => export::run_export(&config, &db, &user, &books, &highlights).await,
        Commands::Schema { db, json } => schema::run_schema(&config, &db, json).await,
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).map_err(|e| {
                MarginaliaError::Internal(format!("failed to render configuration: {e}"))
            })?;
            print!("{rendered}");
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("marginalia={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_ingest_event() {
        let cli = Cli::try_parse_from([
            "marginalia",
            "ingest",
            "--bucket",
            "default",
            "--object",
            "uploads/alice/KoboReader.sqlite",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest {
                bucket,
                object_path,
            } => {
                assert_eq!(bucket, "default");
                assert_eq!(object_path, "uploads/alice/KoboReader.sqlite");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_config_flag_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "marginalia",
            "status",
            "--user",
            "alice",
            "--config",
            "/tmp/m.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/m.toml")));
    }

    #[test]
    fn export_defaults_output_files() {
        let cli =
            Cli::try_parse_from(["marginalia", "export", "Kobo.sqlite", "--user", "u"]).unwrap();
        match cli.command {
            Commands::Export {
                books, highlights, ..
            } => {
                assert_eq!(books, PathBuf::from("books.json"));
                assert_eq!(highlights, PathBuf::from("highlights.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
