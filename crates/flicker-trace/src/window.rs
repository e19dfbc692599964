// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Window-hierarchy snapshots.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::time::Timestamp;
use crate::trace::{Trace, TraceEntry};

/// Trace of window-hierarchy snapshots.
pub type WindowManagerTrace = Trace<WindowManagerState>;

/// One window in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    /// Window title / component name.
    pub name: String,
    /// Whether the window is visible to the user.
    #[serde(default)]
    pub visible: bool,
    /// Window frame on screen.
    #[serde(default)]
    pub frame: Rect,
}

/// Full window-hierarchy state at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowManagerState {
    /// Capture time.
    pub timestamp: Timestamp,
    /// Name of the window holding input focus, if any.
    #[serde(default)]
    pub focused_window: Option<String>,
    /// Windows in z-order, top first.
    #[serde(default)]
    pub windows: Vec<WindowState>,
}

impl WindowManagerState {
    /// First window whose name contains `name`.
    #[must_use]
    pub fn window(&self, name: &str) -> Option<&WindowState> {
        self.windows.iter().find(|w| w.name.contains(name))
    }

    /// Returns `true` if some window matching `name` is visible.
    #[must_use]
    pub fn is_visible(&self, name: &str) -> bool {
        self.windows
            .iter()
            .any(|w| w.visible && w.name.contains(name))
    }

    /// Returns `true` if the focused window matches `name`.
    #[must_use]
    pub fn is_focused(&self, name: &str) -> bool {
        self.focused_window
            .as_deref()
            .is_some_and(|focused| focused.contains(name))
    }
}

impl TraceEntry for WindowManagerState {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
