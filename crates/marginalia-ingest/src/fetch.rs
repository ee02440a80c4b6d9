// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source file fetcher: copies an upload into a run-owned scratch file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use marginalia_core::{BlobStore, MarginaliaError};
use tempfile::TempDir;
use tracing::{debug, instrument, warn};

use crate::trigger::UploadTarget;

/// Name of the copy inside its scratch directory.
const SCRATCH_FILENAME: &str = "upload.sqlite";

/// A local copy of an upload, exclusively owned by one run.
///
/// The copy lives alone in a private directory. Opening it may leave SQLite
/// side files (`-wal`, `-shm`) next to it, so the whole directory is
/// removed when this value is dropped. [`ScratchFile::remove`] does the same
/// but reports a failed removal.
#[derive(Debug)]
pub struct ScratchFile {
    dir: TempDir,
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve an empty scratch file under `dir` (system temp dir when `None`).
    pub fn create(dir: Option<&Path>) -> Result<Self, MarginaliaError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("marginalia-");
        let dir = match dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|e| MarginaliaError::fetch("cannot create scratch directory", e))?;
        let path = dir.path().join(SCRATCH_FILENAME);
        std::fs::File::create(&path)
            .map_err(|e| MarginaliaError::fetch("cannot create scratch file", e))?;
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the scratch directory now, logging instead of failing the run.
    pub fn remove(self) {
        let dir = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %dir.display(), "scratch directory removed"),
            Err(e) => warn!(path = %dir.display(), error = %e, "failed to remove scratch directory"),
        }
    }
}

/// Retrieves uploads from blob storage into scratch files.
pub struct SourceFetcher {
    blobs: Arc<dyn BlobStore>,
    scratch_dir: Option<PathBuf>,
}

impl SourceFetcher {
    pub fn new(blobs: Arc<dyn BlobStore>, scratch_dir: Option<PathBuf>) -> Self {
        Self { blobs, scratch_dir }
    }

    /// Copy the target object into a fresh scratch file.
    ///
    /// On failure the partially written scratch file is already gone.
    #[instrument(skip(self), fields(bucket = %target.bucket, object_path = %target.object_path))]
    pub async fn fetch(&self, target: &UploadTarget) -> Result<ScratchFile, MarginaliaError> {
        let scratch = ScratchFile::create(self.scratch_dir.as_deref())?;
        let bytes = self
            .blobs
            .download(&target.bucket, &target.object_path, scratch.path())
            .await?;
        debug!(bytes, path = %scratch.path().display(), "upload fetched");
        Ok(scratch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_test_utils::MemoryBlobStore;

    fn target() -> UploadTarget {
        UploadTarget {
            bucket: "bkt".into(),
            object_path: "uploads/alice/KoboReader.sqlite".into(),
            user_id: "alice".into(),
        }
    }

    #[tokio::test]
    async fn fetch_writes_object_into_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put("bkt", "uploads/alice/KoboReader.sqlite", b"payload".to_vec());
        let fetcher = SourceFetcher::new(blobs, Some(dir.path().to_path_buf()));

        let scratch = fetcher.fetch(&target()).await.unwrap();
        assert!(scratch.path().starts_with(dir.path()));
        assert_eq!(std::fs::read(scratch.path()).unwrap(), b"payload");

        scratch.remove();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new(
            Arc::new(MemoryBlobStore::new()),
            Some(dir.path().to_path_buf()),
        );

        let err = fetcher.fetch(&target()).await.unwrap_err();
        assert!(matches!(err, MarginaliaError::ObjectNotFound { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn dropping_scratch_file_deletes_it() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::create(Some(dir.path())).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        drop(scratch);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn side_files_go_with_the_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::create(Some(dir.path())).unwrap();
        let wal = scratch.path().with_extension("sqlite-wal");
        let shm = scratch.path().with_extension("sqlite-shm");
        std::fs::write(&wal, b"wal").unwrap();
        std::fs::write(&shm, b"shm").unwrap();

        scratch.remove();
        assert!(!wal.exists());
        assert!(!shm.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
