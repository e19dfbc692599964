// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ready-made trace pairs and plans shared by the core, service and CLI
//! suites.

use flicker_core::{AssertionDescriptor, AssertionPlan, CheckSpec, Frame, SnapshotKind, TagRule};
use flicker_trace::{LayersTrace, Rect, WindowManagerTrace};

use crate::traces::{layers_trace, wm_trace, LayerEntryBuilder, WindowStateBuilder};

/// Status bar layer name (instance suffix included).
pub const STATUS_BAR: &str = "StatusBar#0";

/// Where the status bar settles at the end of the transition.
pub const STATUS_BAR_REGION: Rect = Rect::new(0, 0, 1080, 100);

/// Five snapshots (10ns..=50ns) with the status bar visible throughout and
/// animating towards [`STATUS_BAR_REGION`].
///
/// With `settles` the last snapshot reaches the final region; otherwise the
/// bar stops short and never gets there.
pub fn status_bar_traces(settles: bool) -> (WindowManagerTrace, LayersTrace) {
    let wm = wm_trace(vec![WindowStateBuilder::at(10)
        .focused("Launcher")
        .window("Launcher", true)
        .build()]);
    let entries = (0..5)
        .map(|i| {
            let bottom = if i == 4 && settles { 100 } else { 40 + 10 * i };
            LayerEntryBuilder::at(10 * (i64::from(i) + 1))
                .with_display()
                .visible(STATUS_BAR, Rect::new(0, 0, 1080, bottom))
                .visible("Launcher#0", Rect::new(0, 100, 1080, 2340))
                .build()
        })
        .collect();
    (wm, layers_trace(entries))
}

/// `[G0: status bar visible] then [G1: status bar at final rect]`, both
/// declared for `tag`.
pub fn status_bar_plan(tag: &str) -> AssertionPlan {
    let visible = CheckSpec::LayerVisible {
        layer: "StatusBar".into(),
    };
    let settled = CheckSpec::LayerCoversExactly {
        layer: "StatusBar".into(),
        rect: STATUS_BAR_REGION,
    };
    AssertionPlan::builder()
        .check(
            AssertionDescriptor::new("G0", [tag], move |s| visible.evaluate(s))
                .reading(SnapshotKind::Layers),
        )
        .then()
        .check(
            AssertionDescriptor::new("G1", [tag], move |s| settled.evaluate(s))
                .reading(SnapshotKind::Layers),
        )
        .build()
}

/// Tag rule matching every consecutive frame pair, so the whole recording
/// becomes a single tag.
#[derive(Debug, Clone)]
pub struct WholeTraceRule {
    name: String,
}

impl WholeTraceRule {
    /// Rule emitting tags called `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl TagRule for WholeTraceRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, _previous: &Frame<'_>, _current: &Frame<'_>) -> bool {
        true
    }
}
