// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batching rectangles into alpha masks.
//!
//! Rectangles are queued in the main tile. On flush, if the composite needs a coverage mask,
//! the rectangles are rendered into a `mask_size × mask_size` scratch mask and the source is
//! composited through it. Batches whose bounding box is larger than the mask are split into a
//! grid of mask-sized tiles, each composited separately.

use crate::backend::{
    Backend, CompositeArea, Destination, PictFormat, PictureId, PixmapId, XrColor,
};
use crate::composite::CompositeManager;
use crate::{Error, Result};
use log::{debug, trace};
use peniko::Compose;
use xrender_common::dirty::DirtyRegion;
use xrender_common::growable::RectList;
use xrender_common::rect::IntRect;

/// The initial rectangle capacity of a tile.
const TILE_CAPACITY: usize = 128;

/// A list of rectangles and their bounding box.
#[derive(Clone, Debug)]
pub struct MaskTile {
    rects: RectList,
    dirty: DirtyRegion,
}

impl Default for MaskTile {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskTile {
    /// Create a new, empty tile.
    pub fn new() -> Self {
        Self {
            rects: RectList::with_capacity(TILE_CAPACITY),
            dirty: DirtyRegion::new(),
        }
    }

    /// Queue a rectangle.
    #[inline]
    pub fn add_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.rects.push(x, y, width, height);
    }

    /// Recompute the dirty area as the bounding box of all rectangles.
    pub fn calculate_dirty_area(&mut self) {
        self.dirty.clear();
        for rect in self.rects.iter() {
            self.dirty.grow(rect.x, rect.y, rect.x2(), rect.y2());
        }
    }

    /// Remove all rectangles and clear the dirty area, keeping the storage.
    pub fn reset(&mut self) {
        self.rects.clear();
        self.dirty.clear();
    }

    /// Translate the rectangles and the dirty area.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.rects.translate(dx, dy);
        self.dirty.translate(dx, dy);
    }

    /// The queued rectangles.
    pub fn rects(&self) -> &RectList {
        &self.rects
    }

    /// The queued rectangles, mutably.
    pub fn rects_mut(&mut self) -> &mut RectList {
        &mut self.rects
    }

    /// The dirty area.
    pub fn dirty_area(&self) -> &DirtyRegion {
        &self.dirty
    }
}

/// The scratch alpha mask rectangles are rendered into.
#[derive(Debug)]
struct ScratchMask {
    pixmap: PixmapId,
    picture: PictureId,
    size: i32,
}

impl ScratchMask {
    /// Composite one tile through the mask.
    ///
    /// The tile's rectangles are relative to `offset`, which is itself relative to the origin
    /// of `dirty`. The tile is reset afterwards.
    fn composite_tile<B: Backend>(
        &self,
        comp: &mut CompositeManager<B>,
        dst: &Destination,
        tile: &mut MaskTile,
        dirty: &DirtyRegion,
        offset: (i32, i32),
    ) -> Result<()> {
        let rect_count = tile.rects.len();
        if rect_count == 0 {
            return Ok(());
        }

        let tile_dirty = tile.dirty;
        let x = tile_dirty.x + offset.0 + dirty.x;
        let y = tile_dirty.y + offset.1 + dirty.y;
        let width = tile_dirty.width().min(self.size);
        let height = tile_dirty.height().min(self.size);
        let area = CompositeArea {
            src_x: x,
            src_y: y,
            mask_x: tile_dirty.x,
            mask_y: tile_dirty.y,
            dst_x: x,
            dst_y: y,
            width,
            height,
        };

        if rect_count > 1 {
            let mask_color = comp.mask_color();
            comp.backend_mut().render_rectangles(
                self.picture,
                Compose::Copy,
                mask_color,
                tile.rects.as_rects(),
            )?;
            let composited = comp.composite(None, Some(self.picture), dst.picture, area);
            // The mask is cleared even if compositing failed.
            comp.backend_mut().render_rectangle(
                self.picture,
                Compose::Clear,
                XrColor::TRANSPARENT,
                IntRect::new(tile_dirty.x, tile_dirty.y, width, height),
            )?;
            composited?;
        } else {
            // The dirty area is the rectangle itself, so no mask is needed for coverage.
            let mask = comp.extra_alpha_mask();
            comp.composite(None, mask, dst.picture, area)?;
        }

        tile.reset();
        Ok(())
    }
}

/// Queues rectangles and composites them through a reusable scratch mask.
#[derive(Debug)]
pub struct MaskTileManager {
    main_tile: MaskTile,
    /// Grid tiles in row-major order. Never shrinks.
    tiles: Vec<MaskTile>,
    mask: ScratchMask,
    x_tiles: usize,
    y_tiles: usize,
}

impl MaskTileManager {
    /// Allocate the scratch mask and clear it.
    ///
    /// Fails with [`Error::ZeroMaskSize`] if `mask_size` is zero.
    pub fn new<B: Backend>(backend: &mut B, parent: PixmapId, mask_size: u16) -> Result<Self> {
        if mask_size == 0 {
            return Err(Error::ZeroMaskSize);
        }
        let pixmap = backend.create_pixmap(parent, 8, mask_size, mask_size)?;
        let picture = match backend.create_picture(pixmap, PictFormat::A8) {
            Ok(picture) => picture,
            Err(e) => {
                backend.free_pixmap(pixmap);
                return Err(e);
            }
        };
        let size = i32::from(mask_size);
        if let Err(e) = backend.render_rectangle(
            picture,
            Compose::Clear,
            XrColor::TRANSPARENT,
            IntRect::new(0, 0, size, size),
        ) {
            backend.free_picture(picture);
            backend.free_pixmap(pixmap);
            return Err(e);
        }
        debug!("created {mask_size}x{mask_size} scratch mask");

        Ok(Self {
            main_tile: MaskTile::new(),
            tiles: Vec::new(),
            mask: ScratchMask {
                pixmap,
                picture,
                size,
            },
            x_tiles: 0,
            y_tiles: 0,
        })
    }

    /// Queue a rectangle in destination coordinates.
    #[inline]
    pub fn add_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.main_tile.add_rect(x, y, width, height);
    }

    /// The tile rectangles are queued in.
    pub fn main_tile(&self) -> &MaskTile {
        &self.main_tile
    }

    /// The tile rectangles are queued in, mutably.
    pub fn main_tile_mut(&mut self) -> &mut MaskTile {
        &mut self.main_tile
    }

    /// The number of grid columns used by the last flush.
    pub fn x_tiles(&self) -> usize {
        self.x_tiles
    }

    /// The number of grid rows used by the last flush.
    pub fn y_tiles(&self) -> usize {
        self.y_tiles
    }

    /// The width and height of the scratch mask.
    pub fn mask_size(&self) -> i32 {
        self.mask.size
    }

    /// The scratch mask picture.
    pub fn mask_picture(&self) -> PictureId {
        self.mask.picture
    }

    /// Draw all queued rectangles onto `dst` and empty the main tile.
    ///
    /// The main tile is emptied even if a backend request fails. Tiles composited before the
    /// failure stay drawn.
    pub fn flush<B: Backend>(
        &mut self,
        comp: &mut CompositeManager<B>,
        dst: &Destination,
    ) -> Result<()> {
        let result = self.flush_main_tile(comp, dst);
        self.main_tile.reset();
        result
    }

    fn flush_main_tile<B: Backend>(
        &mut self,
        comp: &mut CompositeManager<B>,
        dst: &Destination,
    ) -> Result<()> {
        if self.main_tile.rects.is_empty() {
            return Ok(());
        }

        if !(comp.mask_required() && comp.is_mask_evaluated()) {
            trace!(
                "rendering {} rectangles without mask",
                self.main_tile.rects.len()
            );
            return comp.composite_rectangles(dst, self.main_tile.rects.as_rects());
        }

        self.main_tile.calculate_dirty_area();
        let dirty = self.main_tile.dirty;
        self.main_tile.translate(-dirty.x, -dirty.y);

        if dirty.width() <= self.mask.size && dirty.height() <= self.mask.size {
            self.x_tiles = 1;
            self.y_tiles = 1;
            trace!(
                "compositing {} rectangles through a single mask",
                self.main_tile.rects.len()
            );
            return self
                .mask
                .composite_tile(comp, dst, &mut self.main_tile, &dirty, (0, 0));
        }

        self.alloc_tiles(&dirty);
        self.tile_rects();
        trace!(
            "compositing {} rectangles through {}x{} tiles",
            self.main_tile.rects.len(),
            self.x_tiles,
            self.y_tiles
        );

        let size = self.mask.size;
        for row in 0..self.y_tiles {
            for col in 0..self.x_tiles {
                let tile = &mut self.tiles[row * self.x_tiles + col];
                let offset = (col as i32 * size, row as i32 * size);
                self.mask.composite_tile(comp, dst, tile, &dirty, offset)?;
            }
        }
        Ok(())
    }

    /// Size the grid for `dirty` and reset the tiles it needs.
    fn alloc_tiles(&mut self, dirty: &DirtyRegion) {
        let size = self.mask.size;
        self.x_tiles = (dirty.width() / size + 1) as usize;
        self.y_tiles = (dirty.height() / size + 1) as usize;
        let tile_count = self.x_tiles * self.y_tiles;

        if self.tiles.len() < tile_count {
            self.tiles.resize_with(tile_count, MaskTile::new);
        }
        for tile in &mut self.tiles[..tile_count] {
            tile.reset();
        }
    }

    /// Route every rectangle of the main tile into the grid tiles it overlaps.
    ///
    /// Pieces are translated into tile-local coordinates and clamped to the tile.
    fn tile_rects(&mut self) {
        let size = self.mask.size;

        for rect in self.main_tile.rects.iter() {
            let start_col = rect.x / size;
            let start_row = rect.y / size;
            let cols = rect.x2() / size + 1 - start_col;
            let rows = rect.y2() / size + 1 - start_row;

            for n in 0..rows {
                for m in 0..cols {
                    let col = start_col + m;
                    let row = start_row + n;
                    let local =
                        IntRect::new(rect.x - col * size, rect.y - row * size, rect.width, rect.height);
                    let piece = limit_rect(local, size);
                    // Rectangles ending exactly on a tile edge leave an empty piece behind.
                    if piece.is_empty() {
                        continue;
                    }

                    let tile = &mut self.tiles[row as usize * self.x_tiles + col as usize];
                    tile.rects.push_rect(piece);
                    tile.dirty
                        .grow_clamped(piece.x, piece.y, piece.x2(), piece.y2(), size);
                }
            }
        }
    }

    /// Free the scratch mask.
    ///
    /// The manager must not be used afterwards.
    pub fn dispose<B: Backend>(&mut self, backend: &mut B) {
        backend.free_picture(self.mask.picture);
        backend.free_pixmap(self.mask.pixmap);
        debug!("disposed scratch mask");
    }
}

/// Clamp a tile-local rectangle to `[0, size)` in both directions.
fn limit_rect(mut rect: IntRect, size: i32) -> IntRect {
    if rect.x + rect.width > size {
        rect.width = size - rect.x;
    }
    if rect.y + rect.height > size {
        rect.height = size - rect.y;
    }
    if rect.x < 0 {
        rect.width += rect.x;
        rect.x = 0;
    }
    if rect.y < 0 {
        rect.height += rect.y;
        rect.y = 0;
    }
    rect
}
