// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `marginalia watch`: turns file activity in the local bucket tree into
//! object-creation events.
//!
//! Each debounced path is mapped back to `(bucket, object path)` and handed to
//! the pipeline on its own task, so different users ingest concurrently while
//! the pipeline's per-user lock keeps same-user runs in order. Runs are
//! tracked so shutdown can drain them before the store is closed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use marginalia_config::model::{BlobBackend, MarginaliaConfig};
use marginalia_core::{MarginaliaError, PluginAdapter, UploadEvent};
use marginalia_ingest::{IngestPipeline, RunOutcome};
use marginalia_storage::LocalBlobStore;
use notify_debouncer_mini::notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::ingest::{build_pipeline, open_document_store};
use crate::shutdown::{drain_runs, install_signal_handler};

/// Run the watcher until SIGINT or SIGTERM.
pub async fn run_watch(config: &MarginaliaConfig) -> Result<(), MarginaliaError> {
    if !matches!(config.blobs.backend, BlobBackend::Local) {
        return Err(MarginaliaError::Config(
            "watch requires blobs.backend = \"local\"".into(),
        ));
    }

    let bucket_dir = Path::new(&config.blobs.root).join(&config.watch.bucket);
    std::fs::create_dir_all(&bucket_dir).map_err(|e| {
        MarginaliaError::Config(format!("cannot create {}: {e}", bucket_dir.display()))
    })?;
    // Event paths arrive absolute; compare them against the canonical root.
    let root = Path::new(&config.blobs.root).canonicalize().map_err(|e| {
        MarginaliaError::Config(format!("cannot resolve {}: {e}", config.blobs.root))
    })?;

    let blobs = Arc::new(LocalBlobStore::new(root.clone()));
    let documents = open_document_store(config).await?;
    let pipeline = Arc::new(build_pipeline(config, blobs.clone(), documents.clone()));

    let (tx, mut rx) = mpsc::unbounded_channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(
        Duration::from_millis(config.watch.debounce_ms),
        move |result: DebounceEventResult| {
            // Receiver gone means the watcher is shutting down.
            let _ = tx.send(result);
        },
    )
    .map_err(|e| MarginaliaError::Internal(format!("failed to start file watcher: {e}")))?;
    debouncer
        .watcher()
        .watch(&root.join(&config.watch.bucket), RecursiveMode::Recursive)
        .map_err(|e| MarginaliaError::Internal(format!("failed to watch bucket: {e}")))?;

    info!(
        bucket = %config.watch.bucket,
        root = %root.display(),
        "watching for uploads"
    );

    let shutdown = install_signal_handler();
    let runs = TaskTracker::new();
    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(result) = received else { break };
                match result {
                    Ok(events) => {
                        let paths = events.into_iter().map(|event| event.path).collect();
                        for event in upload_events(&blobs, paths) {
                            spawn_run(&runs, pipeline.clone(), event);
                        }
                    }
                    Err(e) => warn!(error = %e, "file watcher error"),
                }
            }
            _ = shutdown.cancelled() => {
                info!("shutting down watcher");
                break;
            }
        }
    }

    drop(debouncer);
    drain_runs(&runs, Duration::from_secs(config.watch.drain_timeout_secs)).await;
    documents.shutdown().await
}

/// Distinct upload events for the regular files among `paths`.
fn upload_events(blobs: &LocalBlobStore, mut paths: Vec<PathBuf>) -> Vec<UploadEvent> {
    paths.sort();
    paths.dedup();
    paths
        .into_iter()
        .filter(|path| path.is_file())
        .filter_map(|path| blobs.event_for(&path))
        .collect()
}

fn spawn_run(runs: &TaskTracker, pipeline: Arc<IngestPipeline>, event: UploadEvent) {
    // Cheap pre-check keeps unrelated file churn out of the logs.
    if pipeline.filter().accept(&event).is_none() {
        debug!(object_path = %event.object_path, "ignoring non-upload file");
        return;
    }
    runs.spawn(async move {
        match pipeline.handle(&event).await {
            Ok(RunOutcome::Completed { user_id, status }) => {
                info!(user_id = %user_id, status = %status.status, "upload processed");
            }
            Ok(RunOutcome::Ignored) => {}
            Err(e) => error!(
                object_path = %event.object_path,
                error = %e,
                "status write failed"
            ),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_config::model::IngestConfig;
    use marginalia_core::{DocumentPath, DocumentStore};
    use marginalia_test_utils::{KoboFixture, MemoryBlobStore, MemoryDocumentStore};

    #[tokio::test]
    async fn drained_runs_reach_their_status_write() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let docs = Arc::new(MemoryDocumentStore::new());
        let fixture = KoboFixture::new()
            .book("b1", "Dune")
            .highlight("b1", "Fear is the mind-killer.");
        blobs.put("default", "uploads/alice/KoboReader.sqlite", fixture.to_bytes().unwrap());
        blobs.put("default", "uploads/bob/KoboReader.sqlite", fixture.to_bytes().unwrap());
        let pipeline = Arc::new(IngestPipeline::new(
            &IngestConfig::default(),
            blobs,
            docs.clone(),
        ));

        let runs = TaskTracker::new();
        for user in ["alice", "bob"] {
            let event = UploadEvent::new("default", format!("uploads/{user}/KoboReader.sqlite"));
            spawn_run(&runs, pipeline.clone(), event);
        }
        spawn_run(&runs, pipeline, UploadEvent::new("default", "uploads/carol/notes.sqlite"));
        assert_eq!(runs.len(), 2);

        assert_eq!(drain_runs(&runs, Duration::from_secs(10)).await, 0);
        for user in ["alice", "bob"] {
            let status = docs
                .get(&DocumentPath::processing_status(user).unwrap())
                .await
                .unwrap();
            assert_eq!(status.unwrap()["status"], "success");
        }
    }

    #[test]
    fn only_existing_files_become_events() {
        let root = tempfile::tempdir().unwrap();
        let upload_dir = root.path().join("default/uploads/alice");
        std::fs::create_dir_all(&upload_dir).unwrap();
        let file = upload_dir.join("KoboReader.sqlite");
        std::fs::write(&file, b"x").unwrap();

        let blobs = LocalBlobStore::new(root.path());
        let events = upload_events(
            &blobs,
            vec![
                file.clone(),
                file.clone(),
                upload_dir.clone(),
                root.path().join("default/uploads/bob/KoboReader.sqlite"),
            ],
        );
        assert_eq!(
            events,
            [UploadEvent::new("default", "uploads/alice/KoboReader.sqlite")]
        );
    }
}
