// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Growable buffers of fixed-size `i32` cells.
//!
//! All buffers in this module share the same storage strategy: a flat `Vec<i32>` that is
//! organized into cells of `STRIDE` integers. Clearing a buffer only resets its length, so the
//! storage is reused from one batch of geometry to the next.

use crate::rect::IntRect;

/// The smallest storage size (in `i32`s) a buffer grows to.
pub const MIN_STORAGE: usize = 10;

/// A growable flat array of `i32`, organized into cells of `STRIDE` integers.
#[derive(Clone, Debug, Default)]
pub struct GrowableBuffer<const STRIDE: usize> {
    data: Vec<i32>,
    size: usize,
}

impl<const STRIDE: usize> GrowableBuffer<STRIDE> {
    /// Create a new buffer with room for `cells` cells.
    pub fn with_capacity(cells: usize) -> Self {
        Self {
            data: vec![0; cells * STRIDE],
            size: 0,
        }
    }

    /// Reserve the next cell and return its index.
    ///
    /// The storage grows to at least twice its size (and at least [`MIN_STORAGE`] integers)
    /// once it is exhausted.
    #[inline]
    pub fn next_index(&mut self) -> usize {
        let old_size = self.size;
        self.size += STRIDE;
        if self.size >= self.data.len() {
            self.grow();
        }

        old_size / STRIDE
    }

    /// Convert a cell index into an offset into the flat storage.
    #[inline(always)]
    pub const fn cell_index(&self, index: usize) -> usize {
        index * STRIDE
    }

    /// Read field `field` of cell `index`.
    ///
    /// Panics if the cell was never reserved.
    #[inline(always)]
    pub fn get(&self, index: usize, field: usize) -> i32 {
        debug_assert!(field < STRIDE, "field {field} out of range for stride {STRIDE}");
        self.as_slice()[self.cell_index(index) + field]
    }

    /// Write field `field` of cell `index`.
    ///
    /// Panics if the cell was never reserved.
    #[inline(always)]
    pub fn set(&mut self, index: usize, field: usize, value: i32) {
        debug_assert!(field < STRIDE, "field {field} out of range for stride {STRIDE}");
        let offset = self.cell_index(index) + field;
        self.as_mut_slice()[offset] = value;
    }

    /// The number of cells reserved since the last [`clear`](Self::clear).
    #[inline]
    pub fn len(&self) -> usize {
        self.size / STRIDE
    }

    /// Returns `true` if no cell is reserved.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The number of cells that fit into the current storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len() / STRIDE
    }

    /// Reset the length to zero, keeping the storage.
    #[inline]
    pub fn clear(&mut self) {
        self.size = 0;
    }

    /// The used part of the storage.
    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.data[..self.size]
    }

    /// The used part of the storage, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [i32] {
        &mut self.data[..self.size]
    }

    /// Copy the used part of the storage into a new vector.
    pub fn to_sized_vec(&self) -> Vec<i32> {
        self.as_slice().to_vec()
    }

    fn grow(&mut self) {
        let mut new_len = (self.data.len() * 2).max(MIN_STORAGE);
        while new_len < self.size {
            new_len *= 2;
        }
        self.data.resize(new_len, 0);
    }
}

// Field offsets of rectangle cells.
const X: usize = 0;
const Y: usize = 1;
const WIDTH: usize = 2;
const HEIGHT: usize = 3;

// Field offsets of glyph element cells.
const CHAR_COUNT: usize = 0;
const X_OFFSET: usize = 1;
const Y_OFFSET: usize = 2;
const GLYPH_SET: usize = 3;

/// An ordered list of `(x, y, width, height)` rectangles.
///
/// Insertion order is preserved, and the whole list can be handed to a single backend call via
/// [`as_rects`](Self::as_rects).
#[derive(Clone, Debug, Default)]
pub struct RectList {
    buf: GrowableBuffer<4>,
}

impl RectList {
    /// Create a new list with room for `rects` rectangles.
    pub fn with_capacity(rects: usize) -> Self {
        Self {
            buf: GrowableBuffer::with_capacity(rects),
        }
    }

    /// Reserve the next rectangle and return its index.
    ///
    /// The reserved rectangle holds stale values until its fields are set.
    #[inline]
    pub fn next_index(&mut self) -> usize {
        self.buf.next_index()
    }

    /// Append a rectangle.
    #[inline]
    pub fn push(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let index = self.buf.next_index();
        self.set(index, IntRect::new(x, y, width, height));
    }

    /// Append a rectangle.
    #[inline]
    pub fn push_rect(&mut self, rect: IntRect) {
        self.push(rect.x, rect.y, rect.width, rect.height);
    }

    /// The x coordinate of rectangle `index`.
    #[inline]
    pub fn x(&self, index: usize) -> i32 {
        self.buf.get(index, X)
    }

    /// The y coordinate of rectangle `index`.
    #[inline]
    pub fn y(&self, index: usize) -> i32 {
        self.buf.get(index, Y)
    }

    /// The width of rectangle `index`.
    #[inline]
    pub fn width(&self, index: usize) -> i32 {
        self.buf.get(index, WIDTH)
    }

    /// The height of rectangle `index`.
    #[inline]
    pub fn height(&self, index: usize) -> i32 {
        self.buf.get(index, HEIGHT)
    }

    /// Set the x coordinate of rectangle `index`.
    #[inline]
    pub fn set_x(&mut self, index: usize, x: i32) {
        self.buf.set(index, X, x);
    }

    /// Set the y coordinate of rectangle `index`.
    #[inline]
    pub fn set_y(&mut self, index: usize, y: i32) {
        self.buf.set(index, Y, y);
    }

    /// Set the width of rectangle `index`.
    #[inline]
    pub fn set_width(&mut self, index: usize, width: i32) {
        self.buf.set(index, WIDTH, width);
    }

    /// Set the height of rectangle `index`.
    #[inline]
    pub fn set_height(&mut self, index: usize, height: i32) {
        self.buf.set(index, HEIGHT, height);
    }

    /// Rectangle `index`.
    #[inline]
    pub fn get(&self, index: usize) -> IntRect {
        self.as_rects()[index]
    }

    /// Overwrite rectangle `index`.
    #[inline]
    pub fn set(&mut self, index: usize, rect: IntRect) {
        self.as_rects_mut()[index] = rect;
    }

    /// Translate every rectangle by `(dx, dy)`.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        for rect in self.as_rects_mut() {
            rect.x += dx;
            rect.y += dy;
        }
    }

    /// View the list as a slice of rectangles.
    #[inline]
    pub fn as_rects(&self) -> &[IntRect] {
        bytemuck::cast_slice(self.buf.as_slice())
    }

    /// View the list as a mutable slice of rectangles.
    #[inline]
    pub fn as_rects_mut(&mut self) -> &mut [IntRect] {
        bytemuck::cast_slice_mut(self.buf.as_mut_slice())
    }

    /// Iterate over the rectangles in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = IntRect> + '_ {
        self.as_rects().iter().copied()
    }

    /// The number of rectangles.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the list holds no rectangle.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The number of rectangles that fit into the current storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Remove all rectangles, keeping the storage.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// The raw `i32` storage of the used rectangles.
    #[inline]
    pub fn as_raw(&self) -> &[i32] {
        self.buf.as_slice()
    }
}

/// A growable list of plain integers.
#[derive(Clone, Debug, Default)]
pub struct IntList {
    buf: GrowableBuffer<1>,
}

impl IntList {
    /// Create a new list with room for `len` integers.
    pub fn with_capacity(len: usize) -> Self {
        Self {
            buf: GrowableBuffer::with_capacity(len),
        }
    }

    /// Append an integer.
    #[inline]
    pub fn push(&mut self, value: i32) {
        let index = self.buf.next_index();
        self.buf.set(index, 0, value);
    }

    /// Integer `index`.
    #[inline]
    pub fn get(&self, index: usize) -> i32 {
        self.buf.get(index, 0)
    }

    /// Overwrite integer `index`.
    #[inline]
    pub fn set(&mut self, index: usize, value: i32) {
        self.buf.set(index, 0, value);
    }

    /// The used integers.
    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        self.buf.as_slice()
    }

    /// The number of integers.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Remove all integers, keeping the storage.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Glyph layout records: one `(char_count, x_offset, y_offset, glyph_set)` element per run,
/// plus the flat list of glyph ids the runs index into.
#[derive(Clone, Debug, Default)]
pub struct GlyphEltList {
    elts: GrowableBuffer<4>,
    glyphs: IntList,
}

impl GlyphEltList {
    /// Create a new list with room for `elts` elements and eight glyphs per element.
    pub fn with_capacity(elts: usize) -> Self {
        Self {
            elts: GrowableBuffer::with_capacity(elts),
            glyphs: IntList::with_capacity(elts * 8),
        }
    }

    /// Append an element.
    pub fn push(&mut self, char_count: i32, x_offset: i32, y_offset: i32, glyph_set: i32) {
        let index = self.elts.next_index();
        self.elts.set(index, CHAR_COUNT, char_count);
        self.elts.set(index, X_OFFSET, x_offset);
        self.elts.set(index, Y_OFFSET, y_offset);
        self.elts.set(index, GLYPH_SET, glyph_set);
    }

    /// The number of glyphs of element `index`.
    #[inline]
    pub fn char_count(&self, index: usize) -> i32 {
        self.elts.get(index, CHAR_COUNT)
    }

    /// Set the number of glyphs of element `index`.
    #[inline]
    pub fn set_char_count(&mut self, index: usize, char_count: i32) {
        self.elts.set(index, CHAR_COUNT, char_count);
    }

    /// The horizontal offset of element `index`.
    #[inline]
    pub fn x_offset(&self, index: usize) -> i32 {
        self.elts.get(index, X_OFFSET)
    }

    /// The vertical offset of element `index`.
    #[inline]
    pub fn y_offset(&self, index: usize) -> i32 {
        self.elts.get(index, Y_OFFSET)
    }

    /// The glyph set of element `index`.
    #[inline]
    pub fn glyph_set(&self, index: usize) -> i32 {
        self.elts.get(index, GLYPH_SET)
    }

    /// The glyph ids referenced by the elements.
    #[inline]
    pub fn glyphs(&self) -> &IntList {
        &self.glyphs
    }

    /// The glyph ids referenced by the elements, mutably.
    #[inline]
    pub fn glyphs_mut(&mut self) -> &mut IntList {
        &mut self.glyphs
    }

    /// The number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.elts.len()
    }

    /// Returns `true` if there is no element.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elts.is_empty()
    }

    /// Remove all elements and glyphs, keeping the storage.
    pub fn clear(&mut self) {
        self.elts.clear();
        self.glyphs.clear();
    }
}
