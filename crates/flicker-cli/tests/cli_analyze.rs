// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end runs of the `flicker` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use flicker_core::{ErrorReport, TagTrace};
use flicker_dry_tests::{status_bar_traces, trace_json};
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"{
  "plans": [{
    "tags": ["layer-geometry"],
    "groups": [
      [{ "name": "bar-visible", "check": { "kind": "layer_visible", "layer": "StatusBar" } }],
      [{ "name": "bar-settled", "check": {
        "kind": "layer_covers_exactly",
        "layer": "StatusBar",
        "rect": { "left": 0, "top": 0, "right": 1080, "bottom": 100 }
      } }]
    ]
  }]
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(settles: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let (wm, layers) = status_bar_traces(settles);
        fs::write(dir.path().join("wm.json"), trace_json(wm.entries())).unwrap();
        fs::write(dir.path().join("layers.json"), trace_json(layers.entries())).unwrap();
        fs::write(dir.path().join("config.json"), CONFIG).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn analyze(&self, out: &Path) -> Command {
        let mut cmd = Command::cargo_bin("flicker").unwrap();
        cmd.arg("analyze")
            .arg("--wm-trace")
            .arg(self.path("wm.json"))
            .arg("--layers-trace")
            .arg(self.path("layers.json"))
            .arg("--config")
            .arg(self.path("config.json"))
            .arg("--out")
            .arg(out);
        cmd
    }
}

#[test]
fn settled_transition_succeeds_and_writes_artifacts() {
    let fx = Fixture::new(true);
    let out = fx.path("out");
    fx.analyze(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""bar-visible": 1"#))
        .stdout(predicate::str::contains(r#""bar-settled": 1"#));

    let tags: TagTrace =
        serde_json::from_slice(&fs::read(out.join("tag_trace.json")).unwrap()).unwrap();
    assert_eq!(tags.by_name("layer-geometry").count(), 1);
    let report: ErrorReport =
        serde_json::from_slice(&fs::read(out.join("error_trace.json")).unwrap()).unwrap();
    assert!(report.is_empty());
}

#[test]
fn unsettled_transition_fails_with_report() {
    let fx = Fixture::new(false);
    let out = fx.path("out");
    fx.analyze(&out)
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""bar-settled": 0"#))
        .stderr(predicate::str::contains("1 problem(s) found"))
        .stderr(predicate::str::contains("layers.json"));

    let report: ErrorReport =
        serde_json::from_slice(&fs::read(out.join("error_trace.json")).unwrap()).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.entries()[0].assertion.as_deref(), Some("bar-settled"));
    assert!(report.layers_source().is_some());
}

#[test]
fn clean_removes_stale_files_but_keeps_directories() {
    let fx = Fixture::new(true);
    let out = fx.path("out");
    fs::create_dir_all(out.join("keep")).unwrap();
    fs::write(out.join("stale.txt"), "old").unwrap();

    fx.analyze(&out).arg("--clean").assert().success();

    assert!(!out.join("stale.txt").exists());
    assert!(out.join("keep").is_dir());
    assert!(out.join("tag_trace.json").is_file());
}

#[test]
fn parallel_workers_produce_the_same_report() {
    let fx = Fixture::new(false);
    let sequential = fx.path("seq");
    let parallel = fx.path("par");
    fx.analyze(&sequential).assert().failure();
    fx.analyze(&parallel).args(["--workers", "4"]).assert().failure();
    assert_eq!(
        fs::read(sequential.join("error_trace.json")).unwrap(),
        fs::read(parallel.join("error_trace.json")).unwrap()
    );
}

#[test]
fn tags_prints_the_tag_trace() {
    let fx = Fixture::new(true);
    Command::cargo_bin("flicker")
        .unwrap()
        .arg("tags")
        .arg("--wm-trace")
        .arg(fx.path("wm.json"))
        .arg("--layers-trace")
        .arg(fx.path("layers.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("layer-geometry"));
}

#[test]
fn unreadable_trace_is_reported() {
    let fx = Fixture::new(true);
    Command::cargo_bin("flicker")
        .unwrap()
        .arg("tags")
        .arg("--wm-trace")
        .arg(fx.path("missing.json"))
        .arg("--layers-trace")
        .arg(fx.path("layers.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading WM trace"));
}

#[test]
fn invalid_check_in_config_is_rejected() {
    let fx = Fixture::new(true);
    fs::write(
        fx.path("config.json"),
        r#"{ "plans": [{ "tags": ["x"], "groups": [[{ "name": "a", "check": { "kind": "layer_visible", "layer": "" } }]] }] }"#,
    )
    .unwrap();
    fx.analyze(&fx.path("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid assertion configuration"));
}
