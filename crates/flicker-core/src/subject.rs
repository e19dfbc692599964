// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fluent assertions over a single trace.
//!
//! ```
//! use flicker_core::LayersTraceSubject;
//! use flicker_trace::{LayersTrace, Rect};
//!
//! let trace = LayersTrace::empty();
//! let result = LayersTraceSubject::assert_that(&trace)
//!     .shows_layer("StatusBar")
//!     .then()
//!     .covers_exactly("StatusBar", Rect::new(0, 0, 1080, 100))
//!     .test();
//! assert!(result.is_err());
//! ```
//!
//! Every call consumes the subject and returns a new one, so a partially
//! built chain can't be shared and mutated from two places.

use std::fmt;

use flicker_trace::{LayerTraceEntry, Rect, Trace, TraceEntry, WindowManagerState};
use thiserror::Error;

use crate::assertion::{ensure, Assertion, AssertionError};
use crate::checker::{AssertionFailure, AssertionsChecker, CheckOutcome, CheckerBuilder};

/// A failed [`TraceSubject::test`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubjectFailure {
    /// Provenance header followed by one line per failure.
    pub message: String,
    /// The failures behind the message.
    pub failures: Vec<AssertionFailure>,
}

/// Builder-style assertions over every entry of one trace.
pub struct TraceSubject<'t, E> {
    trace: &'t Trace<E>,
    label: &'static str,
    builder: CheckerBuilder<Assertion<E>>,
}

/// Fluent subject over a layer trace.
pub type LayersTraceSubject<'t> = TraceSubject<'t, LayerTraceEntry>;

/// Fluent subject over a window-hierarchy trace.
pub type WindowManagerTraceSubject<'t> = TraceSubject<'t, WindowManagerState>;

impl<E: TraceEntry> fmt::Debug for TraceSubject<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSubject")
            .field("label", &self.label)
            .field("entries", &self.trace.len())
            .field("groups", &self.builder.group_count())
            .finish()
    }
}

impl<'t, E: TraceEntry> TraceSubject<'t, E> {
    /// Starts a chain over `trace`; `label` names the trace kind in failures.
    #[must_use]
    pub fn new(trace: &'t Trace<E>, label: &'static str) -> Self {
        Self {
            trace,
            label,
            builder: CheckerBuilder::default(),
        }
    }

    /// Adds a named custom assertion to the current group.
    #[must_use]
    pub fn check<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&E) -> Result<(), AssertionError> + Send + Sync + 'static,
    {
        self.builder = self.builder.check(Assertion::new(name, predicate));
        self
    }

    /// The next assertion joins the current group.
    #[must_use]
    pub fn and(mut self) -> Self {
        self.builder = self.builder.and();
        self
    }

    /// The next assertion starts a new group, checked after this one held.
    #[must_use]
    pub fn then(mut self) -> Self {
        self.builder = self.builder.then();
        self
    }

    /// Ignores leading entries until the first group holds. If it never
    /// does, the first failure is reported.
    #[must_use]
    pub fn skip_until_first_assertion(mut self) -> Self {
        self.builder = self.builder.skip_until_first_pass();
        self
    }

    /// Stops at the first failing entry.
    #[must_use]
    pub fn fail_fast(mut self) -> Self {
        self.builder = self.builder.fail_fast();
        self
    }

    /// Runs the chain and returns the raw outcome.
    #[must_use]
    pub fn outcome(self) -> CheckOutcome {
        let checker: AssertionsChecker<Assertion<E>> = self.builder.build();
        checker.check(self.trace.entries())
    }

    /// Runs the chain, failing with a provenance-prefixed message.
    pub fn test(self) -> Result<(), SubjectFailure> {
        let trace = self.trace;
        let label = self.label;
        let outcome = self.outcome();
        if outcome.is_success() && outcome.crashes.is_empty() {
            return Ok(());
        }

        let mut failures = outcome.crashes.clone();
        failures.extend(outcome.surfaced_failures());

        let mut message = String::new();
        if let Some(source) = trace.source() {
            message.push_str(&format!(
                "{label} trace can be found in: {}\nChecksum: {}\n",
                source.path.display(),
                source.checksum
            ));
        }
        let lines: Vec<String> = failures
            .iter()
            .map(|f| format!("{} @ {}: {}", f.assertion, f.timestamp, f.reason))
            .collect();
        message.push_str(&lines.join("\n"));
        Err(SubjectFailure { message, failures })
    }
}

impl<'t> TraceSubject<'t, LayerTraceEntry> {
    /// Starts a chain over a layer trace.
    #[must_use]
    pub fn assert_that(trace: &'t Trace<LayerTraceEntry>) -> Self {
        Self::new(trace, "Layers")
    }

    /// A layer matching `name` is visible.
    #[must_use]
    pub fn shows_layer(self, name: &str) -> Self {
        let layer = name.to_owned();
        self.check(format!("showsLayer({name})"), move |e: &LayerTraceEntry| {
            ensure(e.is_visible(&layer), || format!("{layer} is not visible"))
        })
    }

    /// No layer matching `name` is visible.
    #[must_use]
    pub fn hides_layer(self, name: &str) -> Self {
        let layer = name.to_owned();
        self.check(format!("hidesLayer({name})"), move |e: &LayerTraceEntry| {
            ensure(!e.is_visible(&layer), || format!("{layer} is visible"))
        })
    }

    /// A layer matching `name` exists.
    #[must_use]
    pub fn has_layer(self, name: &str) -> Self {
        let layer = name.to_owned();
        self.check(format!("hasLayer({name})"), move |e: &LayerTraceEntry| {
            ensure(e.exists(&layer), || format!("{layer} does not exist"))
        })
    }

    /// No layer matching `name` exists.
    #[must_use]
    pub fn has_not_layer(self, name: &str) -> Self {
        let layer = name.to_owned();
        self.check(format!("hasNotLayer({name})"), move |e: &LayerTraceEntry| {
            ensure(!e.exists(&layer), || format!("{layer} exists"))
        })
    }

    /// The visible region of `name` is exactly `rect`.
    #[must_use]
    pub fn covers_exactly(self, name: &str, rect: Rect) -> Self {
        let layer = name.to_owned();
        self.check(
            format!("coversExactly({name}, {rect})"),
            move |e: &LayerTraceEntry| {
                let actual = e
                    .visible_region(&layer)
                    .ok_or_else(|| AssertionError::failed(format!("{layer} is not visible")))?;
                ensure(actual == rect, || {
                    format!("{layer} covers {actual}, expected exactly {rect}")
                })
            },
        )
    }

    /// Visible layers together cover `rect`.
    #[must_use]
    pub fn covers_region(self, rect: Rect) -> Self {
        self.check(format!("coversRegion({rect})"), move |e: &LayerTraceEntry| {
            ensure(e.covers_region(rect), || format!("visible layers do not cover {rect}"))
        })
    }

    /// `previous` is hidden and `current` shown, in the same entry.
    #[must_use]
    pub fn replace_visible_layer(self, previous: &str, current: &str) -> Self {
        self.hides_layer(previous).and().shows_layer(current)
    }
}

impl<'t> TraceSubject<'t, WindowManagerState> {
    /// Starts a chain over a window-hierarchy trace.
    #[must_use]
    pub fn assert_that(trace: &'t Trace<WindowManagerState>) -> Self {
        Self::new(trace, "WM")
    }

    /// A window matching `name` is visible.
    #[must_use]
    pub fn shows_window(self, name: &str) -> Self {
        let window = name.to_owned();
        self.check(format!("showsWindow({name})"), move |s: &WindowManagerState| {
            ensure(s.is_visible(&window), || format!("{window} is not visible"))
        })
    }

    /// No window matching `name` is visible.
    #[must_use]
    pub fn hides_window(self, name: &str) -> Self {
        let window = name.to_owned();
        self.check(format!("hidesWindow({name})"), move |s: &WindowManagerState| {
            ensure(!s.is_visible(&window), || format!("{window} is visible"))
        })
    }

    /// The focused window matches `name`.
    #[must_use]
    pub fn is_focused(self, name: &str) -> Self {
        let window = name.to_owned();
        self.check(format!("isFocused({name})"), move |s: &WindowManagerState| {
            ensure(s.is_focused(&window), || {
                format!(
                    "{window} is not focused (focus: {})",
                    s.focused_window.as_deref().unwrap_or("none")
                )
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::path::PathBuf;

    use flicker_trace::{Layer, LayersTrace, Timestamp, TraceSource, WindowManagerTrace};

    use super::*;

    fn entry(ts: i64, visible: &[&str]) -> LayerTraceEntry {
        LayerTraceEntry {
            timestamp: Timestamp(ts),
            displays: vec![],
            layers: visible
                .iter()
                .zip(1..)
                .map(|(name, id)| Layer {
                    id,
                    name: format!("{name}#0"),
                    visible: true,
                    visible_region: Rect::new(0, 0, 10, 10),
                    z: id,
                })
                .collect(),
        }
    }

    #[test]
    fn replace_visible_layer_passes_after_swap() {
        let trace = LayersTrace::new(vec![
            entry(0, &["Launcher"]),
            entry(1, &["Launcher", "App"]),
            entry(2, &["App"]),
        ])
        .unwrap();
        LayersTraceSubject::assert_that(&trace)
            .shows_layer("Launcher")
            .then()
            .replace_visible_layer("Launcher", "App")
            .test()
            .unwrap();
    }

    #[test]
    fn debug_shows_label_and_entry_count() {
        let trace = LayersTrace::new(vec![entry(0, &["A"]), entry(5, &["A"])]).unwrap();
        let subject = LayersTraceSubject::assert_that(&trace).shows_layer("A");
        let shown = format!("{subject:?}");
        assert!(shown.contains("entries: 2"), "{shown}");
        assert!(shown.contains("groups: 1"), "{shown}");
    }

    #[test]
    fn failure_message_carries_provenance() {
        let trace = LayersTrace::new(vec![entry(0, &["Launcher"])])
            .unwrap()
            .with_source(TraceSource {
                path: PathBuf::from("/data/layers_trace.json"),
                checksum: "deadbeef".into(),
            });
        let failure = LayersTraceSubject::assert_that(&trace)
            .shows_layer("App")
            .test()
            .unwrap_err();
        assert!(failure
            .message
            .starts_with("Layers trace can be found in: /data/layers_trace.json\nChecksum: deadbeef\n"));
        assert!(failure.message.contains("showsLayer(App) @ 0ns: App is not visible"));
        assert_eq!(failure.failures.len(), 1);
    }

    #[test]
    fn skip_until_first_assertion_reports_first_failure() {
        let trace = LayersTrace::new(vec![entry(0, &["A"]), entry(5, &["B"])]).unwrap();
        let failure = LayersTraceSubject::assert_that(&trace)
            .skip_until_first_assertion()
            .shows_layer("C")
            .test()
            .unwrap_err();
        assert_eq!(failure.failures[0].timestamp, Timestamp(0));
    }

    #[test]
    fn window_subject_checks_focus() {
        let trace = WindowManagerTrace::new(vec![WindowManagerState {
            timestamp: Timestamp(3),
            focused_window: Some("com.example/.Main".into()),
            windows: vec![],
        }])
        .unwrap();
        assert!(WindowManagerTraceSubject::assert_that(&trace)
            .is_focused("Main")
            .and()
            .hides_window("Main")
            .test()
            .is_ok());
        assert!(WindowManagerTraceSubject::assert_that(&trace)
            .is_focused("Settings")
            .test()
            .is_err());
    }

    #[test]
    fn empty_trace_fails() {
        let trace = LayersTrace::empty();
        let failure = LayersTraceSubject::assert_that(&trace)
            .shows_layer("A")
            .test()
            .unwrap_err();
        assert!(failure.message.contains("trace ended before group 0"));
    }
}
