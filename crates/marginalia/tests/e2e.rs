// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the `marginalia` binary.
//!
//! Each test gets its own config file, bucket tree, scratch directory and
//! document database under a temp dir.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use marginalia_test_utils::KoboFixture;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("buckets/default")).unwrap();
        std::fs::create_dir_all(root.join("scratch")).unwrap();
        let config = root.join("marginalia.toml");
        std::fs::write(
            &config,
            format!(
                r#"
[service]
log_level = "warn"

[storage]
database_path = "{db}"

[blobs]
backend = "local"
root = "{buckets}"

[ingest]
scratch_dir = "{scratch}"
"#,
                db = root.join("docs.db").display(),
                buckets = root.join("buckets").display(),
                scratch = root.join("scratch").display(),
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn upload(&self, object_path: &str, fixture: &KoboFixture) {
        let target = self.path("buckets/default").join(object_path);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        fixture.write(&target).unwrap();
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("marginalia").unwrap();
        cmd.arg("--config").arg(&self.config).env_remove("RUST_LOG");
        cmd
    }

    fn ingest(&self, object_path: &str) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["ingest", "--bucket", "default", "--object", object_path])
            .assert()
    }

    fn status(&self, user: &str) -> Value {
        let assert = self
            .cmd()
            .args(["status", "--user", user, "--json"])
            .assert()
            .success();
        serde_json::from_slice(&assert.get_output().stdout).unwrap()
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.path("scratch")).unwrap().next().is_none()
    }
}

fn library() -> KoboFixture {
    KoboFixture::new()
        .book("file:///mnt/onboard/dune.epub", "Dune")
        .highlight("file:///mnt/onboard/dune.epub", "Fear is the mind-killer.")
        .note("file:///mnt/onboard/dune.epub", "The spice must flow.", "again")
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn ingest_then_status_reports_success() {
    let ws = Workspace::new();
    ws.upload("uploads/alice/KoboReader.sqlite", &library());

    ws.ingest("uploads/alice/KoboReader.sqlite")
        .success()
        .stdout(predicate::str::contains(
            "alice: success (1 books, 2 highlights)",
        ));
    assert!(ws.scratch_is_empty());

    let status = ws.status("alice");
    assert_eq!(status["status"], "success");
    assert_eq!(status["book_count"], 1);
    assert_eq!(status["highlight_count"], 2);
}

#[test]
fn failed_run_still_exits_cleanly_with_error_status() {
    let ws = Workspace::new();
    ws.upload(
        "uploads/bob/KoboReader.sqlite",
        &KoboFixture::new().broken().book("b1", "Broken"),
    );

    ws.ingest("uploads/bob/KoboReader.sqlite")
        .success()
        .stdout(predicate::str::contains("bob: error:"));

    let status = ws.status("bob");
    assert_eq!(status["status"], "error");
    assert!(status["error"]
        .as_str()
        .unwrap()
        .starts_with("failed to read highlight database"));
    assert!(ws.scratch_is_empty());
}

#[test]
fn missing_upload_is_reported_in_status() {
    let ws = Workspace::new();
    ws.ingest("uploads/dave/KoboReader.sqlite").success();

    let status = ws.status("dave");
    assert_eq!(status["status"], "error");
    assert_eq!(
        status["error"],
        "uploaded file not found: default/uploads/dave/KoboReader.sqlite"
    );
}

#[test]
fn ignored_upload_leaves_status_pending() {
    let ws = Workspace::new();
    ws.upload("random/carol/KoboReader.sqlite", &library());

    ws.ingest("random/carol/KoboReader.sqlite")
        .success()
        .stdout(predicate::str::starts_with("ignored"));
    assert_eq!(ws.status("carol")["status"], "pending");
}

#[test]
fn export_writes_normalized_records() {
    let ws = Workspace::new();
    let db = ws.path("KoboReader.sqlite");
    library().write(&db).unwrap();
    let books = ws.path("books.json");
    let highlights = ws.path("highlights.json");

    ws.cmd()
        .arg("export")
        .arg(&db)
        .args(["--user", "alice"])
        .arg("--books")
        .arg(&books)
        .arg("--highlights")
        .arg(&highlights)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported 1 books"));

    let books = read_json(&books);
    assert_eq!(books[0]["book_id"], "file:______mnt__onboard__dune.epub");
    let highlights = read_json(&highlights);
    assert_eq!(highlights.as_array().unwrap().len(), 2);
    assert_eq!(highlights[1]["type"], "note");
    assert_eq!(highlights[1]["book_id"], books[0]["book_id"]);
}

#[test]
fn schema_reports_colorless_path() {
    let ws = Workspace::new();
    let db = ws.path("old.sqlite");
    KoboFixture::new().without_color().write(&db).unwrap();

    let assert = ws
        .cmd()
        .arg("schema")
        .arg(&db)
        .arg("--json")
        .assert()
        .success();
    let report: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["highlight_shape"], "without_color");
}

#[test]
fn config_prints_effective_settings() {
    let ws = Workspace::new();
    let assert = ws.cmd().arg("config").assert().success();
    let rendered: toml::Value =
        toml::from_str(&String::from_utf8_lossy(&assert.get_output().stdout)).unwrap();
    assert_eq!(rendered["service"]["log_level"].as_str(), Some("warn"));
    assert_eq!(rendered["storage"]["max_batch_writes"].as_integer(), Some(500));
    assert_eq!(
        rendered["ingest"]["source_filename"].as_str(),
        Some("KoboReader.sqlite")
    );
}

#[test]
fn invalid_config_exits_nonzero() {
    let ws = Workspace::new();
    std::fs::write(&ws.config, "[storage]\nmax_bach_writes = 10\n").unwrap();
    ws.cmd()
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_batch_writes"));
}
