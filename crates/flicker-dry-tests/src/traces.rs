// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshot builders and trace helpers for tests.

use flicker_trace::{
    Display, Layer, LayerTraceEntry, LayersTrace, Rect, Timestamp, Trace, TraceEntry,
    WindowManagerState, WindowManagerTrace, WindowState,
};
use serde::Serialize;

/// Default physical display used by [`LayerEntryBuilder::with_display`].
pub const DISPLAY_BOUNDS: Rect = Rect::new(0, 0, 1080, 2340);

/// Builder for [`LayerTraceEntry`] values.
///
/// # Example
///
/// ```
/// use flicker_dry_tests::LayerEntryBuilder;
/// use flicker_trace::Rect;
///
/// let entry = LayerEntryBuilder::at(10)
///     .visible("StatusBar#0", Rect::new(0, 0, 1080, 100))
///     .hidden("Wallpaper#0")
///     .build();
///
/// assert!(entry.is_visible("StatusBar"));
/// assert!(entry.exists("Wallpaper"));
/// assert!(!entry.is_visible("Wallpaper"));
/// ```
#[derive(Debug, Clone)]
pub struct LayerEntryBuilder {
    entry: LayerTraceEntry,
}

impl LayerEntryBuilder {
    /// Empty entry at `ts` nanoseconds.
    pub fn at(ts: i64) -> Self {
        Self {
            entry: LayerTraceEntry {
                timestamp: Timestamp(ts),
                displays: Vec::new(),
                layers: Vec::new(),
            },
        }
    }

    /// Adds the default physical display.
    pub fn with_display(self) -> Self {
        self.display(0, false, DISPLAY_BOUNDS)
    }

    /// Adds a display.
    pub fn display(mut self, id: u64, is_virtual: bool, size: Rect) -> Self {
        self.entry.displays.push(Display {
            id,
            is_virtual,
            size,
        });
        self
    }

    /// Adds a visible layer covering `region`.
    pub fn visible(self, name: &str, region: Rect) -> Self {
        self.layer(name, true, region)
    }

    /// Adds an invisible layer.
    pub fn hidden(self, name: &str) -> Self {
        self.layer(name, false, Rect::EMPTY)
    }

    fn layer(mut self, name: &str, visible: bool, visible_region: Rect) -> Self {
        let id = i32::try_from(self.entry.layers.len()).unwrap_or(i32::MAX);
        self.entry.layers.push(Layer {
            id,
            name: name.to_string(),
            visible,
            visible_region,
            z: id,
        });
        self
    }

    /// Builds the entry.
    pub fn build(self) -> LayerTraceEntry {
        self.entry
    }
}

/// Builder for [`WindowManagerState`] values.
#[derive(Debug, Clone)]
pub struct WindowStateBuilder {
    state: WindowManagerState,
}

impl WindowStateBuilder {
    /// Empty hierarchy at `ts` nanoseconds.
    pub fn at(ts: i64) -> Self {
        Self {
            state: WindowManagerState {
                timestamp: Timestamp(ts),
                focused_window: None,
                windows: Vec::new(),
            },
        }
    }

    /// Sets the focused window.
    pub fn focused(mut self, name: &str) -> Self {
        self.state.focused_window = Some(name.to_string());
        self
    }

    /// Adds a window.
    pub fn window(mut self, name: &str, visible: bool) -> Self {
        self.state.windows.push(WindowState {
            name: name.to_string(),
            visible,
            frame: if visible { DISPLAY_BOUNDS } else { Rect::EMPTY },
        });
        self
    }

    /// Builds the state.
    pub fn build(self) -> WindowManagerState {
        self.state
    }
}

fn sorted_trace<E: TraceEntry>(mut entries: Vec<E>) -> Trace<E> {
    entries.sort_by_key(TraceEntry::timestamp);
    match Trace::new(entries) {
        Ok(trace) => trace,
        Err(_) => Trace::empty(),
    }
}

/// Layer trace from entries in any order.
pub fn layers_trace(entries: Vec<LayerTraceEntry>) -> LayersTrace {
    sorted_trace(entries)
}

/// Window trace from entries in any order.
pub fn wm_trace(entries: Vec<WindowManagerState>) -> WindowManagerTrace {
    sorted_trace(entries)
}

/// Serializes entries as a trace document (`{"entries": [...]}`), the shape
/// `flicker_trace::decode_trace` reads.
pub fn trace_json<E: Serialize>(entries: &[E]) -> Vec<u8> {
    #[derive(Serialize)]
    struct Document<'a, E> {
        entries: &'a [E],
    }
    serde_json::to_vec_pretty(&Document { entries }).unwrap_or_default()
}
