// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compositor (layer-hierarchy) snapshots.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::time::Timestamp;
use crate::trace::{Trace, TraceEntry};

/// Trace of compositor snapshots.
pub type LayersTrace = Trace<LayerTraceEntry>;

/// A physical or virtual display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    /// Display id.
    pub id: u64,
    /// Virtual displays (screen recording, casting) are ignored by most checks.
    #[serde(default)]
    pub is_virtual: bool,
    /// Display bounds.
    pub size: Rect,
}

/// One compositor layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Layer id, unique within one entry.
    pub id: i32,
    /// Layer name (component name plus instance suffix).
    pub name: String,
    /// Whether the layer contributes pixels.
    #[serde(default)]
    pub visible: bool,
    /// Bounds of the visible region.
    #[serde(default)]
    pub visible_region: Rect,
    /// Z-order; larger is on top.
    #[serde(default)]
    pub z: i32,
}

/// Full layer-hierarchy state at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTraceEntry {
    /// Capture time.
    pub timestamp: Timestamp,
    /// Displays known to the compositor.
    #[serde(default)]
    pub displays: Vec<Display>,
    /// Layers in the hierarchy.
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl LayerTraceEntry {
    /// First layer whose name contains `name`.
    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name.contains(name))
    }

    /// Returns `true` if a layer matching `name` exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.layer(name).is_some()
    }

    /// Returns `true` if some layer matching `name` is visible.
    #[must_use]
    pub fn is_visible(&self, name: &str) -> bool {
        self.layers
            .iter()
            .any(|l| l.visible && l.name.contains(name))
    }

    /// Visible region of the first visible layer matching `name`.
    #[must_use]
    pub fn visible_region(&self, name: &str) -> Option<Rect> {
        self.layers
            .iter()
            .find(|l| l.visible && l.name.contains(name))
            .map(|l| l.visible_region)
    }

    /// Names of all visible layers, sorted.
    #[must_use]
    pub fn visible_layer_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .layers
            .iter()
            .filter(|l| l.visible)
            .map(|l| l.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Returns `true` if the union of visible layer regions covers `rect`.
    #[must_use]
    pub fn covers_region(&self, rect: Rect) -> bool {
        let parts: Vec<Rect> = self
            .layers
            .iter()
            .filter(|l| l.visible)
            .filter_map(|l| l.visible_region.intersection(&rect))
            .collect();
        if rect.is_empty() {
            return true;
        }
        // Split `rect` on every clipped edge; each resulting cell is either
        // fully inside some part or fully outside all of them.
        let mut xs: Vec<i32> = vec![rect.left, rect.right];
        let mut ys: Vec<i32> = vec![rect.top, rect.bottom];
        for p in &parts {
            xs.extend([p.left, p.right]);
            ys.extend([p.top, p.bottom]);
        }
        xs.sort_unstable();
        xs.dedup();
        ys.sort_unstable();
        ys.dedup();
        xs.windows(2).all(|x| {
            ys.windows(2).all(|y| {
                let cell = Rect::new(x[0], y[0], x[1], y[1]);
                parts.iter().any(|p| p.contains(&cell))
            })
        })
    }

    /// First non-virtual display.
    #[must_use]
    pub fn physical_display(&self) -> Option<&Display> {
        self.displays.iter().find(|d| !d.is_virtual)
    }
}

impl TraceEntry for LayerTraceEntry {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
