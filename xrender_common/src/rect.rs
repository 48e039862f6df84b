// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel-aligned integer rectangles and coordinate clamping.

use bytemuck::{Pod, Zeroable};

/// A pixel-aligned rectangle, as stored in a [`RectList`](crate::growable::RectList).
///
/// The layout matches one cell of a rectangle list, so a list can be viewed as a slice of
/// `IntRect` without copying.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct IntRect {
    /// The left edge.
    pub x: i32,
    /// The top edge.
    pub y: i32,
    /// The width in pixels.
    pub width: i32,
    /// The height in pixels.
    pub height: i32,
}

impl IntRect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The exclusive right edge.
    #[inline]
    pub const fn x2(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// The exclusive bottom edge.
    #[inline]
    pub const fn y2(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Whether the rectangle covers no pixel.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// The number of pixels covered by the rectangle.
    #[inline]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width) * i64::from(self.height)
        }
    }

    /// Whether the pixel at `(x, y)` is covered.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x2() && y >= self.y && y < self.y2()
    }

    /// Intersect the rectangle with a clip box.
    ///
    /// The result may be empty.
    pub fn intersect(&self, clip: &ClipBox) -> Self {
        let x = self.x.max(clip.lo_x);
        let y = self.y.max(clip.lo_y);
        let x2 = self.x2().min(clip.hi_x);
        let y2 = self.y2().min(clip.hi_y);

        Self::new(x, y, x2.saturating_sub(x).max(0), y2.saturating_sub(y).max(0))
    }
}

/// A half-open clip box `[lo_x, hi_x) × [lo_y, hi_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClipBox {
    /// The left edge (inclusive).
    pub lo_x: i32,
    /// The top edge (inclusive).
    pub lo_y: i32,
    /// The right edge (exclusive).
    pub hi_x: i32,
    /// The bottom edge (exclusive).
    pub hi_y: i32,
}

impl ClipBox {
    /// Create a new clip box from its edges.
    #[inline]
    pub const fn new(lo_x: i32, lo_y: i32, hi_x: i32, hi_y: i32) -> Self {
        Self {
            lo_x,
            lo_y,
            hi_x,
            hi_y,
        }
    }

    /// The clip box of a surface of the given size.
    #[inline]
    pub fn from_size(width: u16, height: u16) -> Self {
        Self::new(0, 0, i32::from(width), i32::from(height))
    }

    /// Whether the clip box contains no pixel.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.hi_x <= self.lo_x || self.hi_y <= self.lo_y
    }

    /// The intersection of two clip boxes.
    pub fn intersect(&self, other: &Self) -> Self {
        Self::new(
            self.lo_x.max(other.lo_x),
            self.lo_y.max(other.lo_y),
            self.hi_x.min(other.hi_x),
            self.hi_y.min(other.hi_y),
        )
    }

    /// The clip box as a rectangle.
    #[inline]
    pub fn to_rect(&self) -> IntRect {
        IntRect::new(
            self.lo_x,
            self.lo_y,
            self.hi_x.saturating_sub(self.lo_x).max(0),
            self.hi_y.saturating_sub(self.lo_y).max(0),
        )
    }
}

/// Add a translation to a coordinate, saturating on overflow.
#[inline]
pub fn clip_add(v: i32, dv: i32) -> i32 {
    v.saturating_add(dv)
}

/// Compute the far edge of a span starting at `start` with the given dimension.
///
/// Non-positive dimensions yield `start`, overflow saturates at `i32::MAX`.
#[inline]
pub fn dim_add(start: i32, dim: i32) -> i32 {
    if dim <= 0 {
        start
    } else {
        start.saturating_add(dim)
    }
}

/// Clamp a coordinate into the signed 16-bit range of the drawing protocol.
#[inline]
pub fn clamp_to_short(v: i32) -> i32 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX))
}

/// Clamp a dimension into the unsigned 16-bit range of the drawing protocol.
#[inline]
pub fn clamp_to_ushort(v: i32) -> i32 {
    v.clamp(0, i32::from(u16::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_clips_each_side() {
        let rect = IntRect::new(-10, 5, 30, 30);
        let clip = ClipBox::new(0, 0, 15, 20);

        assert_eq!(rect.intersect(&clip), IntRect::new(0, 5, 15, 15));
    }

    #[test]
    fn far_edges_saturate() {
        let rect = IntRect::new(i32::MAX - 2, -5, 10, i32::MAX);
        assert_eq!(rect.x2(), i32::MAX);
        assert_eq!(rect.y2(), i32::MAX - 5);

        let clip = ClipBox::new(i32::MIN, 0, i32::MAX, 4);
        assert_eq!(clip.to_rect().width, i32::MAX);
        assert_eq!(
            rect.intersect(&ClipBox::from_size(20, 20)),
            IntRect::new(i32::MAX - 2, 0, 0, 20)
        );
        assert_eq!(
            IntRect::new(-5, 3, i32::MAX, 1).intersect(&ClipBox::from_size(20, 20)),
            IntRect::new(0, 3, 20, 1)
        );
    }

    #[test]
    fn intersect_disjoint_is_empty() {
        let rect = IntRect::new(100, 100, 5, 5);
        let clip = ClipBox::from_size(50, 50);

        assert!(rect.intersect(&clip).is_empty());
    }

    #[test]
    fn dim_add_saturates() {
        assert_eq!(dim_add(10, 5), 15);
        assert_eq!(dim_add(10, -5), 10);
        assert_eq!(dim_add(i32::MAX - 1, 5), i32::MAX);
    }

    #[test]
    fn protocol_clamps() {
        assert_eq!(clamp_to_short(40_000), 32_767);
        assert_eq!(clamp_to_short(-40_000), -32_768);
        assert_eq!(clamp_to_ushort(70_000), 65_535);
        assert_eq!(clamp_to_ushort(-1), 0);
        assert_eq!(clip_add(i32::MAX, 1), i32::MAX);
        assert_eq!(clip_add(i32::MIN, -1), i32::MIN);
    }
}
