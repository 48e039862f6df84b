// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding boxes of queued geometry.

/// A half-open bounding box `[x, x2) × [y, y2)` accumulated from rectangles.
///
/// An empty region holds the sentinel `(i32::MAX, i32::MAX, i32::MIN, i32::MIN)`, so the first
/// real growth replaces every edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirtyRegion {
    /// The left edge.
    pub x: i32,
    /// The top edge.
    pub y: i32,
    /// The right edge (exclusive).
    pub x2: i32,
    /// The bottom edge (exclusive).
    pub y2: i32,
}

impl Default for DirtyRegion {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl DirtyRegion {
    /// The empty region.
    pub const EMPTY: Self = Self {
        x: i32::MAX,
        y: i32::MAX,
        x2: i32::MIN,
        y2: i32::MIN,
    };

    /// Create a new, empty region.
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Reset the region to the empty sentinel.
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    /// Whether the region never grew since the last [`clear`](Self::clear).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x == i32::MAX
    }

    /// Grow the region so it covers `[x, x2) × [y, y2)`.
    #[inline]
    pub fn grow(&mut self, x: i32, y: i32, x2: i32, y2: i32) {
        self.x = self.x.min(x);
        self.y = self.y.min(y);
        self.x2 = self.x2.max(x2);
        self.y2 = self.y2.max(y2);
    }

    /// Grow the region inside a tile of size `limit`.
    ///
    /// An edge is only updated if the incoming edge lies further out, and the new value is
    /// clamped into `[0, limit]`. Edges that are never updated keep their sentinel value.
    #[inline]
    pub fn grow_clamped(&mut self, x: i32, y: i32, x2: i32, y2: i32, limit: i32) {
        if x < self.x {
            self.x = x.max(0);
        }
        if y < self.y {
            self.y = y.max(0);
        }
        if x2 > self.x2 {
            self.x2 = x2.min(limit);
        }
        if y2 > self.y2 {
            self.y2 = y2.min(limit);
        }
    }

    /// Overwrite the region with the bounding box of a line's endpoints.
    ///
    /// The resulting box is inclusive of both endpoints, so a single-pixel line has a width
    /// and height of zero.
    pub fn set_line_endpoints(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        (self.x, self.x2) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
        (self.y, self.y2) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
    }

    /// The union of two regions.
    pub fn union(a: &Self, b: &Self) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            x2: a.x2.max(b.x2),
            y2: a.y2.max(b.y2),
        }
    }

    /// Translate a non-empty region by `(dx, dy)`.
    #[inline]
    pub fn translate(&mut self, dx: i32, dy: i32) {
        if !self.is_empty() {
            self.x += dx;
            self.x2 += dx;
            self.y += dy;
            self.y2 += dy;
        }
    }

    /// The width of the region.
    #[inline]
    pub fn width(&self) -> i32 {
        self.x2.wrapping_sub(self.x)
    }

    /// The height of the region.
    #[inline]
    pub fn height(&self) -> i32 {
        self.y2.wrapping_sub(self.y)
    }
}
