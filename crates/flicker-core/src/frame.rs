// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Composite frames binding both traces at a common timestamp.
//!
//! The two traces are captured independently, so their timestamps rarely
//! line up. Every source entry yields one [`Frame`], paired with the latest
//! entry of the other kind at or before it. Entries of both kinds sharing a
//! timestamp are paired in order, so `n` window entries and `m` layer entries
//! at one instant give `max(n, m)` consecutive frames.
//!
//! Plans whose checks only read one kind run over that kind's own frames
//! (see [`Frame::is_snapshot_of`]); the composite timeline is what mixed
//! checks and tag rules see.

use flicker_trace::{
    LayerTraceEntry, LayersTrace, Timestamp, TraceEntry, WindowManagerState, WindowManagerTrace,
};

use crate::assertion::AssertionError;
use crate::tag::Tag;

/// The two snapshot kinds a frame can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    /// Window-hierarchy snapshots.
    Window,
    /// Layer-hierarchy snapshots.
    Layers,
}

/// Which trace contributed a new entry to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameOrigin {
    /// Only the window trace advanced.
    Window,
    /// Only the layer trace advanced.
    Layers,
    /// Both traces advanced at this timestamp.
    Both,
}

/// Window and layer state current at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Frame timestamp.
    pub timestamp: Timestamp,
    /// Window state at or before `timestamp`, if any was captured yet.
    pub window: Option<&'a WindowManagerState>,
    /// Layer state at or before `timestamp`, if any was captured yet.
    pub layers: Option<&'a LayerTraceEntry>,
    /// Trace(s) whose entry produced this frame.
    pub origin: FrameOrigin,
}

impl Frame<'_> {
    /// Returns `true` if this frame was produced by an entry of `kind`
    /// rather than carried over from an earlier one.
    #[must_use]
    pub fn is_snapshot_of(&self, kind: SnapshotKind) -> bool {
        matches!(
            (self.origin, kind),
            (FrameOrigin::Both, _)
                | (FrameOrigin::Window, SnapshotKind::Window)
                | (FrameOrigin::Layers, SnapshotKind::Layers)
        )
    }
}

impl TraceEntry for Frame<'_> {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Entries at the front of `entries` stamped `at`.
fn run_at<E: TraceEntry>(entries: &[E], at: Timestamp) -> &[E] {
    let len = entries.iter().take_while(|e| e.timestamp() == at).count();
    &entries[..len]
}

/// Merges both traces into frames in a single pass.
///
/// No entry is dropped: each one produces a frame. Output timestamps are
/// non-decreasing.
#[must_use]
pub fn merge_frames<'a>(wm: &'a WindowManagerTrace, layers: &'a LayersTrace) -> Vec<Frame<'a>> {
    let wm = wm.entries();
    let sf = layers.entries();
    let mut frames = Vec::with_capacity(wm.len() + sf.len());
    let (mut i, mut j) = (0usize, 0usize);
    let mut window = None;
    let mut layer = None;

    loop {
        let next = match (wm.get(i), sf.get(j)) {
            (Some(w), Some(l)) => w.timestamp.min(l.timestamp),
            (Some(w), None) => w.timestamp,
            (None, Some(l)) => l.timestamp,
            (None, None) => break,
        };
        let windows = run_at(&wm[i..], next);
        let layer_entries = run_at(&sf[j..], next);
        for k in 0..windows.len().max(layer_entries.len()) {
            let new_window = windows.get(k);
            let new_layers = layer_entries.get(k);
            window = new_window.or(window);
            layer = new_layers.or(layer);
            let origin = match (new_window, new_layers) {
                (Some(_), None) => FrameOrigin::Window,
                (None, Some(_)) => FrameOrigin::Layers,
                _ => FrameOrigin::Both,
            };
            frames.push(Frame {
                timestamp: next,
                window,
                layers: layer,
                origin,
            });
        }
        i += windows.len();
        j += layer_entries.len();
    }
    frames
}

/// Frames whose timestamp lies in `[start, end]`.
#[must_use]
pub fn frames_between<'f, 'a>(
    frames: &'f [Frame<'a>],
    start: Timestamp,
    end: Timestamp,
) -> &'f [Frame<'a>] {
    if end < start {
        return &[];
    }
    let lo = frames.partition_point(|f| f.timestamp < start);
    let hi = frames.partition_point(|f| f.timestamp <= end);
    &frames[lo..hi]
}

/// What an [`crate::AssertionDescriptor`] sees: the tag being checked plus
/// the window subject and layer subject of one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameSubject<'a> {
    tag: &'a Tag,
    frame: Frame<'a>,
}

impl<'a> FrameSubject<'a> {
    /// Binds a frame to the tag it is evaluated under.
    #[must_use]
    pub fn new(tag: &'a Tag, frame: Frame<'a>) -> Self {
        Self { tag, frame }
    }

    /// Tag under evaluation.
    #[must_use]
    pub fn tag(&self) -> &'a Tag {
        self.tag
    }

    /// Underlying frame.
    #[must_use]
    pub fn frame(&self) -> Frame<'a> {
        self.frame
    }

    /// Window-hierarchy subject; a normal failure when none was captured yet.
    pub fn window(&self) -> Result<&'a WindowManagerState, AssertionError> {
        self.frame.window.ok_or_else(|| {
            AssertionError::failed(format!(
                "no window-hierarchy snapshot at or before {}",
                self.frame.timestamp
            ))
        })
    }

    /// Layer-hierarchy subject; a normal failure when none was captured yet.
    pub fn layers(&self) -> Result<&'a LayerTraceEntry, AssertionError> {
        self.frame.layers.ok_or_else(|| {
            AssertionError::failed(format!(
                "no layer snapshot at or before {}",
                self.frame.timestamp
            ))
        })
    }
}

impl TraceEntry for FrameSubject<'_> {
    fn timestamp(&self) -> Timestamp {
        self.frame.timestamp
    }
}
