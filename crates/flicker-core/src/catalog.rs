// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative checks loadable from configuration.
//!
//! A small, closed vocabulary of frame checks that can be written as JSON and
//! turned into [`AssertionPlan`]s. Anything richer is written in code as an
//! [`AssertionDescriptor`] closure.
//!
//! ```json
//! {
//!   "plans": [{
//!     "tags": ["layer-visibility"],
//!     "skip_until_first_pass": true,
//!     "groups": [
//!       [{ "name": "status-bar-visible", "check": { "kind": "layer_visible", "layer": "StatusBar" } }],
//!       [{ "name": "status-bar-at-end", "check": {
//!         "kind": "layer_covers_exactly",
//!         "layer": "StatusBar",
//!         "rect": { "left": 0, "top": 0, "right": 1080, "bottom": 100 }
//!       } }]
//!     ]
//!   }]
//! }
//! ```
//!
//! Names match by substring, since live layer and window names carry
//! instance suffixes (`StatusBar#0`).

use flicker_trace::{LayerTraceEntry, Rect};
use serde::{Deserialize, Serialize};

use crate::assertion::{ensure, AssertionDescriptor, AssertionError};
use crate::checker::CheckPolicy;
use crate::engine::{AssertionEngine, AssertionPlan};
use crate::error::AnalysisError;
use crate::frame::{FrameSubject, SnapshotKind};

/// One declarative frame check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckSpec {
    /// A layer matching `layer` is visible.
    LayerVisible {
        /// Layer name fragment.
        layer: String,
    },
    /// No layer matching `layer` is visible.
    LayerHidden {
        /// Layer name fragment.
        layer: String,
    },
    /// A layer matching `layer` exists, visible or not.
    LayerExists {
        /// Layer name fragment.
        layer: String,
    },
    /// The visible region of `layer` equals `rect`.
    LayerCoversExactly {
        /// Layer name fragment.
        layer: String,
        /// Expected region.
        rect: Rect,
    },
    /// The visible region of `layer` equals the bounds of the first
    /// physical display. Full-screen layers only; a status bar strip needs
    /// [`CheckSpec::LayerCoversExactly`] with its own rect.
    LayerCoversDisplay {
        /// Layer name fragment.
        layer: String,
    },
    /// A window matching `window` is visible.
    WindowVisible {
        /// Window name fragment.
        window: String,
    },
    /// No window matching `window` is visible.
    WindowHidden {
        /// Window name fragment.
        window: String,
    },
    /// The focused window matches `window`.
    WindowFocused {
        /// Window name fragment.
        window: String,
    },
}

impl CheckSpec {
    /// The name fragment the check looks for.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::LayerVisible { layer }
            | Self::LayerHidden { layer }
            | Self::LayerExists { layer }
            | Self::LayerCoversExactly { layer, .. }
            | Self::LayerCoversDisplay { layer } => layer,
            Self::WindowVisible { window }
            | Self::WindowHidden { window }
            | Self::WindowFocused { window } => window,
        }
    }

    /// The only snapshot kind the check reads.
    #[must_use]
    pub fn reads(&self) -> SnapshotKind {
        match self {
            Self::LayerVisible { .. }
            | Self::LayerHidden { .. }
            | Self::LayerExists { .. }
            | Self::LayerCoversExactly { .. }
            | Self::LayerCoversDisplay { .. } => SnapshotKind::Layers,
            Self::WindowVisible { .. } | Self::WindowHidden { .. } | Self::WindowFocused { .. } => {
                SnapshotKind::Window
            }
        }
    }

    /// Rejects checks that could never be meaningful.
    pub fn validate(&self, name: &str) -> Result<(), AnalysisError> {
        let invalid = |reason: &str| AnalysisError::InvalidCheck {
            name: name.to_owned(),
            reason: reason.to_owned(),
        };
        if self.target().trim().is_empty() {
            return Err(invalid("target name must not be empty"));
        }
        if let Self::LayerCoversExactly { rect, .. } = self {
            if rect.is_empty() {
                return Err(invalid("expected region must not be empty"));
            }
        }
        Ok(())
    }

    /// Evaluates the check against one frame.
    pub fn evaluate(&self, subject: &FrameSubject<'_>) -> Result<(), AssertionError> {
        match self {
            Self::LayerVisible { layer } => {
                let entry = subject.layers()?;
                ensure(entry.is_visible(layer), || format!("{layer} is not visible"))
            }
            Self::LayerHidden { layer } => {
                let entry = subject.layers()?;
                ensure(!entry.is_visible(layer), || format!("{layer} is visible"))
            }
            Self::LayerExists { layer } => {
                let entry = subject.layers()?;
                ensure(entry.exists(layer), || format!("{layer} does not exist"))
            }
            Self::LayerCoversExactly { layer, rect } => {
                covers_exactly(subject.layers()?, layer, *rect)
            }
            Self::LayerCoversDisplay { layer } => {
                let entry = subject.layers()?;
                let display = entry
                    .physical_display()
                    .map(|d| d.size)
                    .ok_or_else(|| AssertionError::failed("no physical display"))?;
                covers_exactly(entry, layer, display)
            }
            Self::WindowVisible { window } => {
                let state = subject.window()?;
                ensure(state.is_visible(window), || format!("{window} is not visible"))
            }
            Self::WindowHidden { window } => {
                let state = subject.window()?;
                ensure(!state.is_visible(window), || format!("{window} is visible"))
            }
            Self::WindowFocused { window } => {
                let state = subject.window()?;
                ensure(state.is_focused(window), || {
                    format!(
                        "{window} is not focused (focus: {})",
                        state.focused_window.as_deref().unwrap_or("none")
                    )
                })
            }
        }
    }
}

fn covers_exactly(
    entry: &LayerTraceEntry,
    layer: &str,
    expected: Rect,
) -> Result<(), AssertionError> {
    let actual = entry
        .visible_region(layer)
        .ok_or_else(|| AssertionError::failed(format!("{layer} is not visible")))?;
    ensure(actual == expected, || {
        format!("{layer} covers {actual}, expected exactly {expected}")
    })
}

/// A named declarative check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredAssertion {
    /// Assertion name, used as the metric key.
    pub name: String,
    /// What to check.
    pub check: CheckSpec,
}

impl ConfiguredAssertion {
    /// Builds a descriptor applying to `tags`.
    pub fn descriptor(&self, tags: &[String]) -> Result<AssertionDescriptor, AnalysisError> {
        self.check.validate(&self.name)?;
        let check = self.check.clone();
        let reads = check.reads();
        Ok(AssertionDescriptor::new(
            self.name.clone(),
            tags.iter().cloned(),
            move |subject| check.evaluate(subject),
        )
        .reading(reads))
    }
}

/// One plan: ordered groups evaluated under every listed tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Tag names the plan applies to.
    pub tags: Vec<String>,
    /// Tolerate leading snapshots that fail the first group.
    #[serde(default)]
    pub skip_until_first_pass: bool,
    /// Stop at the first recorded failure.
    #[serde(default)]
    pub fail_fast: bool,
    /// Groups in "then" order; each group is a conjunction.
    pub groups: Vec<Vec<ConfiguredAssertion>>,
}

impl PlanConfig {
    /// Builds the executable plan.
    pub fn to_plan(&self) -> Result<AssertionPlan, AnalysisError> {
        let groups = self
            .groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|a| a.descriptor(&self.tags))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AssertionPlan::from_groups(
            groups,
            CheckPolicy {
                skip_until_first_pass: self.skip_until_first_pass,
                fail_fast: self.fail_fast,
            },
        ))
    }
}

/// Whole assertion configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionConfig {
    /// Plans, evaluated independently.
    #[serde(default)]
    pub plans: Vec<PlanConfig>,
}

impl AssertionConfig {
    /// Builds every plan.
    pub fn to_plans(&self) -> Result<Vec<AssertionPlan>, AnalysisError> {
        self.plans.iter().map(PlanConfig::to_plan).collect()
    }

    /// Builds a validated engine.
    pub fn to_engine(&self) -> Result<AssertionEngine, AnalysisError> {
        AssertionEngine::new(self.to_plans()?)
    }

    /// Number of configured assertions.
    #[must_use]
    pub fn assertion_count(&self) -> usize {
        self.plans
            .iter()
            .flat_map(|p| p.groups.iter())
            .map(Vec::len)
            .sum()
    }
}
