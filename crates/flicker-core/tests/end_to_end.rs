// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Status bar transition checked through the engine, the service and a
//! stored configuration.

use flicker_config::ConfigService;
use flicker_core::{
    AssertionConfig, AssertionEngine, ErrorKind, FlickerService, Tag, TagTrace, TaggingEngine,
};
use flicker_dry_tests::{
    status_bar_plan, status_bar_traces, InMemoryConfigStore, WholeTraceRule, STATUS_BAR,
};
use flicker_trace::Timestamp;

const GEOMETRY: &str = "layer-geometry";

fn transition_tag(name: &str) -> TagTrace {
    TagTrace::new(vec![Tag::new(0, name, Timestamp(10), Timestamp(50))])
}

#[test]
fn settled_status_bar_passes_both_groups() {
    let (wm, layers) = status_bar_traces(true);
    let engine = AssertionEngine::new(vec![status_bar_plan("transition")]).unwrap();
    let (report, metrics) = engine.analyze(&wm, &layers, &transition_tag("transition"));

    assert!(report.is_empty(), "{report}");
    assert_eq!(metrics.get("G0"), Some(1));
    assert_eq!(metrics.get("G1"), Some(1));
}

#[test]
fn unsettled_status_bar_exhausts_second_group() {
    let (wm, layers) = status_bar_traces(false);
    let engine = AssertionEngine::new(vec![status_bar_plan("transition")]).unwrap();
    let (report, metrics) = engine.analyze(&wm, &layers, &transition_tag("transition"));

    assert_eq!(metrics.get("G0"), Some(1));
    assert_eq!(metrics.get("G1"), Some(0));
    assert_eq!(report.len(), 1);
    let entry = &report.entries()[0];
    assert_eq!(entry.kind, ErrorKind::AssertionGroupExhausted);
    assert_eq!(entry.assertion.as_deref(), Some("G1"));
    assert_eq!(entry.timestamp, Timestamp(50));
    assert_eq!(entry.tag_name, "transition");
}

#[test]
fn service_tags_the_transition_with_built_in_rules() {
    let (wm, layers) = status_bar_traces(true);
    let service = FlickerService::from_plans(vec![status_bar_plan(GEOMETRY)]).unwrap();
    let analysis = service.run(&wm, &layers);

    let tags: Vec<_> = analysis.tags.by_name(GEOMETRY).collect();
    assert_eq!(tags.len(), 1);
    assert_eq!((tags[0].start, tags[0].end), (Timestamp(10), Timestamp(50)));
    assert!(analysis.report.is_empty());
    assert_eq!(analysis.metrics.get("G0"), Some(1));
    assert_eq!(analysis.metrics.get("G1"), Some(1));
}

#[test]
fn service_reports_unsettled_transition() {
    let (wm, layers) = status_bar_traces(false);
    let service = FlickerService::from_plans(vec![status_bar_plan(GEOMETRY)])
        .unwrap()
        .with_workers(4);
    let (report, metrics) = service.analyze(&wm, &layers);

    assert_eq!(metrics.get("G1"), Some(0));
    let summary = report.summary();
    assert_eq!(summary.exhausted, 1);
    assert!(!summary.is_green());
    assert!(report.to_string().contains("G1"));
}

#[test]
fn custom_tag_rule_drives_the_same_plan() {
    let (wm, layers) = status_bar_traces(true);
    let service = FlickerService::from_plans(vec![status_bar_plan("whole")])
        .unwrap()
        .with_tagging(TaggingEngine::with_rules(vec![Box::new(WholeTraceRule::new("whole"))]));
    let analysis = service.run(&wm, &layers);
    assert_eq!(analysis.tags.len(), 1);
    assert!(analysis.report.is_empty());
}

#[test]
fn sink_receives_diagnostics_from_both_engines() {
    use std::sync::{Arc, Mutex};

    let (wm, layers) = status_bar_traces(false);
    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let captured = Arc::clone(&lines);
    let service = FlickerService::from_plans(vec![status_bar_plan(GEOMETRY)])
        .unwrap()
        .with_sink(Arc::new(move |line: &str| {
            captured.lock().unwrap().push(line.to_owned());
        }));
    let _ = service.analyze(&wm, &layers);

    let lines = lines.lock().unwrap();
    assert!(lines.iter().any(|l| l.starts_with("tagging")));
    assert!(lines.iter().any(|l| l.contains("exhausted")));
}

#[test]
fn stored_configuration_builds_the_same_checks() {
    let json = format!(
        r#"{{
            "plans": [{{
                "tags": ["{GEOMETRY}"],
                "groups": [
                    [{{ "name": "bar-visible", "check": {{ "kind": "layer_visible", "layer": "StatusBar" }} }}],
                    [{{ "name": "bar-settled", "check": {{
                        "kind": "layer_covers_exactly",
                        "layer": "{STATUS_BAR}",
                        "rect": {{ "left": 0, "top": 0, "right": 1080, "bottom": 100 }}
                    }} }}]
                ]
            }}]
        }}"#
    );
    let store = InMemoryConfigStore::new();
    store.set_raw("assertions", json.as_bytes());
    let config: AssertionConfig = ConfigService::new(&store)
        .load("assertions")
        .unwrap()
        .expect("config present");
    assert_eq!(config.assertion_count(), 2);

    let service = FlickerService::from_config(&config).unwrap();
    let (wm, layers) = status_bar_traces(false);
    let (report, metrics) = service.analyze(&wm, &layers);
    assert_eq!(metrics.get("bar-visible"), Some(1));
    assert_eq!(metrics.get("bar-settled"), Some(0));
    assert_eq!(report.entries()[0].assertion.as_deref(), Some("bar-settled"));

    let (wm, layers) = status_bar_traces(true);
    let (report, _) = service.analyze(&wm, &layers);
    assert!(report.is_empty());
}
