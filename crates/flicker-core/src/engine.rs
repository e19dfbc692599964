// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-tag assertion orchestration.
//!
//! For every tag, each plan is narrowed to the descriptors declared for that
//! tag's name and run over the frames inside the tag interval. Results from
//! all tags are merged once into an [`ErrorReport`] and a [`MetricMap`].
//!
//! A tag is the unit of work. Tags share no mutable state, so
//! [`AssertionEngine::analyze_parallel`] fans them out over scoped worker
//! threads and sorts the per-tag results back into tag order before merging.
//! Sequential and parallel runs produce identical output.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use flicker_trace::{LayersTrace, WindowManagerTrace};

use crate::assertion::AssertionDescriptor;
use crate::checker::{AssertionFailure, AssertionsChecker, CheckOutcome, CheckerState};
use crate::error::AnalysisError;
use crate::frame::{frames_between, merge_frames, Frame, FrameSubject, SnapshotKind};
use crate::log::{emit, LogSink};
use crate::report::{ErrorEntry, ErrorKind, ErrorReport, MetricMap};
use crate::tag::{Tag, TagTrace};

/// Ordered groups of frame descriptors plus policy.
pub type AssertionPlan = AssertionsChecker<AssertionDescriptor>;

/// Runs assertion plans against every tag of a tag trace.
#[derive(Clone)]
pub struct AssertionEngine {
    plans: Vec<AssertionPlan>,
    sink: Option<LogSink>,
}

impl std::fmt::Debug for AssertionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionEngine")
            .field("plans", &self.plans)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// What one tag contributed before merging.
#[derive(Debug)]
struct TagEvaluation {
    tag_key: String,
    errors: Vec<ErrorEntry>,
    samples: Vec<(String, bool)>,
}

impl AssertionEngine {
    /// Validates `plans` and builds an engine.
    ///
    /// Descriptor names must be non-empty and unique across all plans, and
    /// every descriptor must apply to at least one tag name.
    pub fn new(plans: Vec<AssertionPlan>) -> Result<Self, AnalysisError> {
        let mut seen = BTreeSet::new();
        for descriptor in plans.iter().flat_map(AssertionsChecker::assertions) {
            let name = descriptor.name();
            if name.trim().is_empty() {
                return Err(AnalysisError::EmptyAssertionName);
            }
            if descriptor.tags().is_empty() {
                return Err(AnalysisError::UntaggedAssertion(name.to_owned()));
            }
            if !seen.insert(name) {
                return Err(AnalysisError::DuplicateAssertion(name.to_owned()));
            }
        }
        Ok(Self { plans, sink: None })
    }

    /// Installs a diagnostic sink.
    #[must_use]
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Configured plans.
    #[must_use]
    pub fn plans(&self) -> &[AssertionPlan] {
        &self.plans
    }

    /// Evaluates every tag on the calling thread.
    #[must_use]
    pub fn analyze(
        &self,
        wm: &WindowManagerTrace,
        layers: &LayersTrace,
        tags: &TagTrace,
    ) -> (ErrorReport, MetricMap) {
        let frames = merge_frames(wm, layers);
        let evaluations = tags
            .iter()
            .map(|tag| self.evaluate_tag(tag, &frames))
            .collect();
        self.assemble(wm, layers, evaluations)
    }

    /// Evaluates tags on up to `workers` scoped threads.
    ///
    /// Output is identical to [`AssertionEngine::analyze`].
    #[must_use]
    pub fn analyze_parallel(
        &self,
        wm: &WindowManagerTrace,
        layers: &LayersTrace,
        tags: &TagTrace,
        workers: usize,
    ) -> (ErrorReport, MetricMap) {
        let workers = workers.clamp(1, tags.len().max(1));
        if workers == 1 {
            return self.analyze(wm, layers, tags);
        }

        let frames = merge_frames(wm, layers);
        let next_tag = AtomicUsize::new(0);
        let mut indexed: Vec<(usize, TagEvaluation)> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let frames = &frames;
                    let next_tag = &next_tag;
                    s.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next_tag.fetch_add(1, Ordering::Relaxed);
                            let Some(tag) = tags.get(index) else {
                                break;
                            };
                            done.push((index, self.evaluate_tag(tag, frames)));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(done) => done,
                    Err(e) => std::panic::resume_unwind(e),
                })
                .collect()
        });
        indexed.sort_by_key(|(index, _)| *index);
        let evaluations = indexed.into_iter().map(|(_, evaluation)| evaluation).collect();
        self.assemble(wm, layers, evaluations)
    }

    fn evaluate_tag(&self, tag: &Tag, frames: &[Frame<'_>]) -> TagEvaluation {
        let mut evaluation = TagEvaluation {
            tag_key: tag.key(),
            errors: Vec::new(),
            samples: Vec::new(),
        };
        let plans: Vec<_> = self
            .plans
            .iter()
            .filter_map(|plan| restrict(plan, &tag.name))
            .collect();
        if plans.is_empty() {
            return evaluation;
        }

        let range = frames_between(frames, tag.start, tag.end);
        emit(self.sink.as_ref(), || {
            format!("evaluating {tag} over {} frames with {} plans", range.len(), plans.len())
        });

        if range.is_empty() {
            evaluation.errors.push(ErrorEntry::new(
                tag,
                ErrorKind::EmptyTrace,
                tag.start,
                format!("no snapshot between {} and {}", tag.start, tag.end),
            ));
            evaluation.samples = plans
                .iter()
                .flat_map(AssertionsChecker::assertions)
                .map(|d| (d.name().to_owned(), false))
                .collect();
            return evaluation;
        }

        let subjects: Vec<FrameSubject<'_>> =
            range.iter().map(|frame| FrameSubject::new(tag, *frame)).collect();
        for plan in &plans {
            let reads = plan_reads(plan);
            let own: Vec<FrameSubject<'_>>;
            let scanned: &[FrameSubject<'_>] = match reads {
                Some(kind) => {
                    own = subjects
                        .iter()
                        .filter(|s| s.frame().is_snapshot_of(kind))
                        .copied()
                        .collect();
                    &own
                }
                None => &subjects,
            };
            if scanned.is_empty() {
                let kind = match reads {
                    Some(SnapshotKind::Window) => "window-hierarchy",
                    Some(SnapshotKind::Layers) | None => "layer",
                };
                evaluation.errors.push(ErrorEntry::new(
                    tag,
                    ErrorKind::EmptyTrace,
                    tag.start,
                    format!("no {kind} snapshot between {} and {}", tag.start, tag.end),
                ));
                evaluation
                    .samples
                    .extend(plan.assertions().map(|d| (d.name().to_owned(), false)));
                continue;
            }

            let outcome = plan.check(scanned);
            self.record(tag, &outcome, &mut evaluation);
            for descriptor in plan.assertions() {
                let passed = outcome.passed(descriptor.name());
                emit(self.sink.as_ref(), || {
                    let verdict = if passed { "passed" } else { "failed" };
                    format!("{}: {} {verdict}", evaluation.tag_key, descriptor.name())
                });
                evaluation.samples.push((descriptor.name().to_owned(), passed));
            }
        }
        evaluation
    }

    fn record(&self, tag: &Tag, outcome: &CheckOutcome, evaluation: &mut TagEvaluation) {
        let entry = |kind: ErrorKind, failure: &AssertionFailure| {
            ErrorEntry::new(tag, kind, failure.timestamp, failure.reason.clone())
                .with_assertion(failure.assertion.clone())
        };
        for crash in &outcome.crashes {
            evaluation.errors.push(entry(ErrorKind::AssertionCrashed, crash));
        }
        let kind = match outcome.state {
            CheckerState::Exhausted { group } => {
                emit(self.sink.as_ref(), || {
                    format!("{}: trace exhausted in group {group}", evaluation.tag_key)
                });
                ErrorKind::AssertionGroupExhausted
            }
            CheckerState::FailedFast { group } => {
                emit(self.sink.as_ref(), || {
                    format!("{}: group {group} failed fast", evaluation.tag_key)
                });
                ErrorKind::AssertionFailed
            }
            CheckerState::AllGroupsSatisfied { .. } | CheckerState::Scanning { .. } => return,
        };
        for failure in outcome.surfaced_failures() {
            evaluation.errors.push(entry(kind, &failure));
        }
    }

    fn assemble(
        &self,
        wm: &WindowManagerTrace,
        layers: &LayersTrace,
        evaluations: Vec<TagEvaluation>,
    ) -> (ErrorReport, MetricMap) {
        let mut uses: BTreeMap<&str, usize> = BTreeMap::new();
        for evaluation in &evaluations {
            for (name, _) in &evaluation.samples {
                *uses.entry(name.as_str()).or_insert(0) += 1;
            }
        }

        let mut metrics = MetricMap::new();
        for evaluation in &evaluations {
            for (name, passed) in &evaluation.samples {
                if uses.get(name.as_str()).copied().unwrap_or(0) > 1 {
                    metrics.record(format!("{}/{name}", evaluation.tag_key), *passed);
                } else {
                    metrics.record(name.clone(), *passed);
                }
            }
        }

        let entries = evaluations.into_iter().flat_map(|e| e.errors).collect();
        let report = ErrorReport::new(entries)
            .with_sources(wm.source().cloned(), layers.source().cloned());
        emit(self.sink.as_ref(), || {
            format!(
                "analysis done: {} report entries, {}/{} metrics passed",
                report.len(),
                metrics.passed_count(),
                metrics.len()
            )
        });
        (report, metrics)
    }
}

/// The snapshot kind every descriptor of `plan` reads, when they agree.
fn plan_reads(plan: &AssertionsChecker<&AssertionDescriptor>) -> Option<SnapshotKind> {
    let mut kinds = plan.assertions().map(|d| d.reads());
    let first = kinds.next()??;
    kinds.all(|k| k == Some(first)).then_some(first)
}

/// Narrows `plan` to the descriptors declared for `tag_name`, dropping groups
/// left empty. `None` when nothing applies.
fn restrict<'p>(
    plan: &'p AssertionPlan,
    tag_name: &str,
) -> Option<AssertionsChecker<&'p AssertionDescriptor>> {
    let groups: Vec<Vec<&AssertionDescriptor>> = plan
        .groups()
        .iter()
        .map(|group| group.iter().filter(|d| d.applies_to(tag_name)).collect::<Vec<_>>())
        .filter(|group| !group.is_empty())
        .collect();
    if groups.is_empty() {
        None
    } else {
        Some(AssertionsChecker::from_groups(groups, plan.policy()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use flicker_trace::{LayerTraceEntry, Timestamp};

    use super::*;
    use crate::assertion::AssertionError;

    fn always(name: &str, tags: &[&str]) -> AssertionDescriptor {
        AssertionDescriptor::new(name, tags.iter().copied(), |_| Ok(()))
    }

    fn layers_at(ts: &[i64]) -> LayersTrace {
        LayersTrace::new(
            ts.iter()
                .map(|t| LayerTraceEntry {
                    timestamp: Timestamp(*t),
                    displays: vec![],
                    layers: vec![],
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_duplicate_empty_and_untagged_names() {
        let dup = vec![
            AssertionPlan::builder().check(always("a", &["t"])).build(),
            AssertionPlan::builder().check(always("a", &["t"])).build(),
        ];
        assert_eq!(
            AssertionEngine::new(dup).unwrap_err(),
            AnalysisError::DuplicateAssertion("a".into())
        );
        let empty = vec![AssertionPlan::builder().check(always(" ", &["t"])).build()];
        assert_eq!(
            AssertionEngine::new(empty).unwrap_err(),
            AnalysisError::EmptyAssertionName
        );
        let untagged = vec![AssertionPlan::builder().check(always("u", &[])).build()];
        assert_eq!(
            AssertionEngine::new(untagged).unwrap_err(),
            AnalysisError::UntaggedAssertion("u".into())
        );
    }

    #[test]
    fn restrict_drops_groups_for_other_tags() {
        let plan = AssertionPlan::builder()
            .check(always("open", &["open"]))
            .then()
            .check(always("close", &["close"]))
            .build();
        let narrowed = restrict(&plan, "close").unwrap();
        assert_eq!(narrowed.groups().len(), 1);
        assert_eq!(narrowed.groups()[0][0].name(), "close");
        assert!(restrict(&plan, "other").is_none());
    }

    #[test]
    fn empty_range_reports_empty_trace() {
        let engine =
            AssertionEngine::new(vec![AssertionPlan::builder().check(always("a", &["t"])).build()])
                .unwrap();
        let tags = TagTrace::new(vec![Tag::new(0, "t", Timestamp(100), Timestamp(200))]);
        let (report, metrics) =
            engine.analyze(&WindowManagerTrace::empty(), &layers_at(&[0, 1]), &tags);
        assert_eq!(report.len(), 1);
        assert_eq!(report.entries()[0].kind, ErrorKind::EmptyTrace);
        assert_eq!(metrics.get("a"), Some(0));
    }

    #[test]
    fn tags_without_applicable_descriptors_are_skipped() {
        let engine =
            AssertionEngine::new(vec![AssertionPlan::builder().check(always("a", &["x"])).build()])
                .unwrap();
        let tags = TagTrace::new(vec![Tag::new(0, "t", Timestamp(0), Timestamp(1))]);
        let (report, metrics) =
            engine.analyze(&WindowManagerTrace::empty(), &layers_at(&[0, 1]), &tags);
        assert!(report.is_empty());
        assert!(metrics.is_empty());
    }

    #[test]
    fn names_used_under_several_tags_are_namespaced() {
        let engine = AssertionEngine::new(vec![AssertionPlan::builder()
            .check(always("a", &["t"]))
            .build()])
        .unwrap();
        let tags = TagTrace::new(vec![
            Tag::new(0, "t", Timestamp(0), Timestamp(0)),
            Tag::new(1, "t", Timestamp(1), Timestamp(1)),
        ]);
        let (_, metrics) = engine.analyze(&WindowManagerTrace::empty(), &layers_at(&[0, 1]), &tags);
        assert_eq!(metrics.get("a"), None);
        assert_eq!(metrics.get("t#0/a"), Some(1));
        assert_eq!(metrics.get("t#1/a"), Some(1));
    }

    #[test]
    fn fail_fast_reports_assertion_failed() {
        let plan = AssertionPlan::builder()
            .check(AssertionDescriptor::new("never", ["t"], |_| {
                Err(AssertionError::failed("nope"))
            }))
            .fail_fast()
            .build();
        let engine = AssertionEngine::new(vec![plan]).unwrap();
        let tags = TagTrace::new(vec![Tag::new(0, "t", Timestamp(0), Timestamp(2))]);
        let (report, _) =
            engine.analyze(&WindowManagerTrace::empty(), &layers_at(&[0, 1, 2]), &tags);
        assert_eq!(report.len(), 1);
        assert_eq!(report.entries()[0].kind, ErrorKind::AssertionFailed);
        assert_eq!(report.entries()[0].timestamp, Timestamp(0));
    }
}
