// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tagging: finds the intervals of a recording worth asserting on.
//!
//! Both traces are merged into [`Frame`]s, then every [`TagRule`] scans
//! consecutive frame pairs. A run of matching pairs becomes one tag that
//! spans from the earlier frame of the first pair to the later frame of the
//! last pair. Output is sorted by `(start, end, name)` and numbered from 0,
//! so identical inputs always give identical tag traces.

use std::fmt;

use flicker_trace::{LayersTrace, Timestamp, WindowManagerTrace};

use crate::frame::{merge_frames, Frame};
use crate::log::{emit, LogSink};
use crate::tag::{Tag, TagTrace};

/// A transition detector.
///
/// Rules must be pure: the verdict for a pair may depend only on the two
/// frames.
pub trait TagRule: Send + Sync {
    /// Tag name emitted by this rule.
    fn name(&self) -> &str;

    /// Returns `true` if the transition `previous -> current` is interesting.
    fn matches(&self, previous: &Frame<'_>, current: &Frame<'_>) -> bool;
}

/// The focused window changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusChangeRule;

impl TagRule for FocusChangeRule {
    fn name(&self) -> &str {
        "focus-change"
    }

    fn matches(&self, previous: &Frame<'_>, current: &Frame<'_>) -> bool {
        match (previous.window, current.window) {
            (Some(a), Some(b)) => a.focused_window != b.focused_window,
            _ => false,
        }
    }
}

/// The set of visible layers changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerVisibilityRule;

impl TagRule for LayerVisibilityRule {
    fn name(&self) -> &str {
        "layer-visibility"
    }

    fn matches(&self, previous: &Frame<'_>, current: &Frame<'_>) -> bool {
        match (previous.layers, current.layers) {
            (Some(a), Some(b)) => a.visible_layer_names() != b.visible_layer_names(),
            _ => false,
        }
    }
}

/// A layer visible in both frames moved or resized.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerGeometryRule;

impl TagRule for LayerGeometryRule {
    fn name(&self) -> &str {
        "layer-geometry"
    }

    fn matches(&self, previous: &Frame<'_>, current: &Frame<'_>) -> bool {
        let (Some(a), Some(b)) = (previous.layers, current.layers) else {
            return false;
        };
        b.layers.iter().filter(|l| l.visible).any(|now| {
            a.layers
                .iter()
                .find(|before| before.visible && before.name == now.name)
                .is_some_and(|before| before.visible_region != now.visible_region)
        })
    }
}

/// Runs a rule table over merged frames.
pub struct TaggingEngine {
    rules: Vec<Box<dyn TagRule>>,
    sink: Option<LogSink>,
}

impl Default for TaggingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaggingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggingEngine")
            .field("rules", &self.rule_names())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl TaggingEngine {
    /// Engine with the built-in rules: focus change, layer visibility and
    /// layer geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rules(vec![
            Box::new(FocusChangeRule),
            Box::new(LayerVisibilityRule),
            Box::new(LayerGeometryRule),
        ])
    }

    /// Engine with a caller-supplied rule table.
    #[must_use]
    pub fn with_rules(rules: Vec<Box<dyn TagRule>>) -> Self {
        Self { rules, sink: None }
    }

    /// Installs a diagnostic sink.
    #[must_use]
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Names of the configured rules, in table order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Tags a pair of traces.
    #[must_use]
    pub fn run(&self, wm: &WindowManagerTrace, layers: &LayersTrace) -> TagTrace {
        let frames = merge_frames(wm, layers);
        emit(self.sink.as_ref(), || {
            format!(
                "tagging {} frames ({} window, {} layer entries) with {} rules",
                frames.len(),
                wm.len(),
                layers.len(),
                self.rules.len()
            )
        });
        self.tag_frames(&frames)
    }

    /// Tags already-merged frames.
    #[must_use]
    pub fn tag_frames(&self, frames: &[Frame<'_>]) -> TagTrace {
        let mut spans: Vec<(Timestamp, Timestamp, &str)> = Vec::new();
        for rule in &self.rules {
            let mut open: Option<(Timestamp, Timestamp)> = None;
            for pair in frames.windows(2) {
                let (previous, current) = (&pair[0], &pair[1]);
                if rule.matches(previous, current) {
                    open = Some(match open {
                        Some((start, _)) => (start, current.timestamp),
                        None => (previous.timestamp, current.timestamp),
                    });
                } else if let Some((start, end)) = open.take() {
                    spans.push((start, end, rule.name()));
                }
            }
            if let Some((start, end)) = open {
                spans.push((start, end, rule.name()));
            }
        }
        spans.sort();

        let tags: Vec<Tag> = spans
            .into_iter()
            .zip(0u32..)
            .map(|((start, end, name), id)| Tag::new(id, name, start, end))
            .collect();
        for tag in &tags {
            emit(self.sink.as_ref(), || format!("tag {tag}"));
        }
        TagTrace::new(tags)
    }
}
