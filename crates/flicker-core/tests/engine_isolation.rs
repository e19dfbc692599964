// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Crash isolation and parallel determinism of the assertion engine.

use flicker_core::{
    AssertionEngine, AssertionPlan, ErrorKind, ErrorReport, MetricMap, Tag, TagTrace,
    TaggingEngine,
};
use flicker_dry_tests::{
    crashing, failing, layers_trace, panicking, passing, status_bar_traces, LayerEntryBuilder,
};
use flicker_trace::{LayersTrace, Timestamp, WindowManagerTrace};

fn three_snapshots() -> LayersTrace {
    layers_trace(vec![
        LayerEntryBuilder::at(10).build(),
        LayerEntryBuilder::at(20).build(),
        LayerEntryBuilder::at(30).build(),
    ])
}

fn one_tag(name: &str) -> TagTrace {
    TagTrace::new(vec![Tag::new(0, name, Timestamp(10), Timestamp(30))])
}

fn analyze(engine: &AssertionEngine, tags: &TagTrace) -> (ErrorReport, MetricMap) {
    engine.analyze(&WindowManagerTrace::empty(), &three_snapshots(), tags)
}

#[test]
fn crashing_assertion_does_not_hide_its_neighbours() {
    let plan = AssertionPlan::builder()
        .check(crashing("boom", &["t"], "bad hierarchy"))
        .and()
        .check(passing("steady", &["t"]))
        .build();
    let engine = AssertionEngine::new(vec![plan]).unwrap();
    let (report, metrics) = analyze(&engine, &one_tag("t"));

    assert_eq!(metrics.get("boom"), Some(0));
    assert_eq!(metrics.get("steady"), Some(1));
    assert_eq!(report.len(), 1);
    let entry = &report.entries()[0];
    assert_eq!(entry.kind, ErrorKind::AssertionCrashed);
    assert_eq!(entry.assertion.as_deref(), Some("boom"));
    assert_eq!(entry.timestamp, Timestamp(10));
    assert_eq!(entry.reason, "bad hierarchy");
}

#[test]
fn panicking_assertion_is_reported_as_a_crash() {
    let plans = vec![
        AssertionPlan::builder().check(panicking("wild", &["t"])).build(),
        AssertionPlan::builder().check(passing("calm", &["t"])).build(),
    ];
    let engine = AssertionEngine::new(plans).unwrap();
    let (report, metrics) = analyze(&engine, &one_tag("t"));

    assert_eq!(metrics.get("calm"), Some(1));
    assert_eq!(metrics.get("wild"), Some(0));
    let crashes: Vec<_> = report
        .iter()
        .filter(|e| e.kind == ErrorKind::AssertionCrashed)
        .collect();
    assert_eq!(crashes.len(), 1);
    assert!(crashes[0].reason.contains("wild blew up"));
}

#[test]
fn crash_in_one_tag_leaves_other_tags_untouched() {
    let plans = vec![
        AssertionPlan::builder().check(crashing("boom", &["a"], "x")).build(),
        AssertionPlan::builder().check(passing("fine", &["b"])).build(),
    ];
    let engine = AssertionEngine::new(plans).unwrap();
    let tags = TagTrace::new(vec![
        Tag::new(0, "a", Timestamp(10), Timestamp(20)),
        Tag::new(1, "b", Timestamp(20), Timestamp(30)),
    ]);
    let (report, metrics) = analyze(&engine, &tags);
    assert_eq!(metrics.get("fine"), Some(1));
    assert!(report.iter().all(|e| e.tag_name == "a"));
}

#[test]
fn parallel_run_matches_sequential_run() {
    let plans = vec![
        AssertionPlan::builder()
            .check(passing("p", &["a", "b", "c"]))
            .then()
            .check(failing("f", &["b"], "never"))
            .build(),
        AssertionPlan::builder()
            .check(crashing("c", &["c"], "oops"))
            .build(),
    ];
    let engine = AssertionEngine::new(plans).unwrap();
    let tags = TagTrace::new(
        (0u32..12)
            .map(|i| {
                let name = ["a", "b", "c"][i as usize % 3];
                let start = Timestamp(10 * i64::from(i % 3 + 1));
                Tag::new(i, name, start, Timestamp(30))
            })
            .collect(),
    );
    let wm = WindowManagerTrace::empty();
    let layers = three_snapshots();

    let sequential = engine.analyze(&wm, &layers, &tags);
    for workers in [2, 3, 8, 64] {
        assert_eq!(engine.analyze_parallel(&wm, &layers, &tags, workers), sequential);
    }
}

#[test]
fn tagging_is_deterministic() {
    let (wm, layers) = status_bar_traces(false);
    let tagging = TaggingEngine::new();
    let first = tagging.run(&wm, &layers);
    let second = tagging.run(&wm, &layers);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}
