// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Integer screen rectangles.

use serde::{Deserialize, Serialize};

/// Axis-aligned screen rectangle in pixels, half-open on the right/bottom edge.
///
/// A rectangle with `right <= left` or `bottom <= top` is empty. Empty
/// rectangles compare equal only when all four edges match; use
/// [`Rect::is_empty`] for emptiness checks.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (inclusive).
    pub left: i32,
    /// Top edge (inclusive).
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Rect {
    /// The empty rectangle at the origin.
    pub const EMPTY: Self = Self::new(0, 0, 0, 0);

    /// Creates a rectangle from its four edges.
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width in pixels (zero when empty).
    #[must_use]
    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    /// Height in pixels (zero when empty).
    #[must_use]
    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Returns `true` if `other` lies entirely inside `self`.
    ///
    /// The empty rectangle is contained in every rectangle.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.is_empty()
            || (self.left <= other.left
                && self.top <= other.top
                && self.right >= other.right
                && self.bottom >= other.bottom)
    }

    /// Returns the overlap of two rectangles, or `None` when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let r = Self::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rect({}, {} - {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rect_has_no_area() {
        assert!(Rect::EMPTY.is_empty());
        assert!(Rect::new(10, 10, 5, 20).is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn contains_is_inclusive_of_edges() {
        let outer = Rect::new(0, 0, 100, 100);
        assert!(outer.contains(&Rect::new(0, 0, 100, 100)));
        assert!(outer.contains(&Rect::new(10, 10, 20, 20)));
        assert!(!outer.contains(&Rect::new(90, 90, 110, 110)));
        assert!(outer.contains(&Rect::EMPTY));
    }

    #[test]
    fn intersection_of_disjoint_rects_is_none() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 20, 10);
        assert_eq!(a.intersection(&b), None);
        assert_eq!(
            a.intersection(&Rect::new(5, 5, 15, 15)),
            Some(Rect::new(5, 5, 10, 10))
        );
    }
}
