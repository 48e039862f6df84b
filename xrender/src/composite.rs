// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint and composite state, and the low-level composite requests built from it.

use crate::backend::{
    Backend, CompositeArea, Destination, PictFormat, PictureId, PixmapId, Repeat, XrColor,
};
use crate::paint::Paint;
use crate::{Error, RenderSettings, Result};
use log::{debug, warn};
use peniko::color::palette;
use peniko::kurbo::Affine;
use peniko::{Color, Compose};
use xrender_common::rect::IntRect;

/// How drawn pixels are combined with the destination.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Composite {
    /// Porter-Duff compositing with an additional constant alpha.
    Alpha {
        /// The operator.
        op: Compose,
        /// The constant alpha all drawing is multiplied with, in `[0, 1]`.
        extra_alpha: f32,
    },
    /// The destination pixels are XORed with the paint color and `xor_color`.
    Xor {
        /// The color combined with the paint color into the XOR pixel.
        xor_color: Color,
    },
}

impl Default for Composite {
    fn default() -> Self {
        Self::Alpha {
            op: Compose::SrcOver,
            extra_alpha: 1.0,
        }
    }
}

/// Whether the operator needs the coverage mask to be evaluated, as opposed to operators
/// whose result can be produced by rendering the covered rectangles directly.
pub(crate) fn is_mask_evaluated(op: Compose) -> bool {
    matches!(
        op,
        Compose::SrcOver | Compose::DestOver | Compose::SrcAtop | Compose::Xor
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Solid,
    Texture(PictureId),
    Gradient(PictureId),
}

/// A square pixmap with a picture on top of it.
#[derive(Debug)]
struct Cell {
    pixmap: PixmapId,
    picture: PictureId,
}

impl Cell {
    /// Allocate a `size × size` cell, freeing whatever was allocated if a request fails.
    fn new<B: Backend>(
        backend: &mut B,
        parent: PixmapId,
        format: PictFormat,
        size: u16,
        repeat: Repeat,
    ) -> Result<Self> {
        let pixmap = backend.create_pixmap(parent, format.depth(), size, size)?;
        let picture = match backend.create_picture(pixmap, format) {
            Ok(picture) => picture,
            Err(e) => {
                backend.free_pixmap(pixmap);
                return Err(e);
            }
        };
        let cell = Self { pixmap, picture };
        if repeat != Repeat::None {
            if let Err(e) = backend.set_picture_repeat(picture, repeat) {
                cell.free(backend);
                return Err(e);
            }
        }
        Ok(cell)
    }

    fn fill<B: Backend>(&self, backend: &mut B, op: Compose, color: XrColor) -> Result<()> {
        backend.render_rectangle(self.picture, op, color, IntRect::new(0, 0, 1, 1))
    }

    fn free<B: Backend>(&self, backend: &mut B) {
        backend.free_picture(self.picture);
        backend.free_pixmap(self.pixmap);
    }
}

/// The paint and composite state, and owner of the [`Backend`].
///
/// The solid source is a 1×1 repeating picture that is only re-rendered when its pixel
/// changes. The extra alpha of the composite lives in a 1×1 repeating alpha picture, which is
/// used as mask where no coverage mask is involved.
#[derive(Debug)]
pub struct CompositeManager<B: Backend> {
    backend: B,
    source: Source,
    op: Compose,
    extra_alpha: f32,
    xor_color: Option<Color>,
    color: Color,
    solid: Cell,
    solid_pixel: Option<XrColor>,
    alpha_mask: Cell,
    gradient_cache: Option<Cell>,
    cache_size: i32,
    mask_color: XrColor,
}

impl<B: Backend> CompositeManager<B> {
    /// Create the source pictures on `backend`.
    ///
    /// Fails with [`Error::ZeroMaskSize`] if `settings.mask_size` is zero.
    pub fn new(mut backend: B, parent: PixmapId, settings: &RenderSettings) -> Result<Self> {
        let size = settings.mask_size;
        if size == 0 {
            return Err(Error::ZeroMaskSize);
        }
        let (solid, alpha_mask, gradient_cache) =
            create_cells(&mut backend, parent, size, settings.gradient_cache)?;
        debug!(
            "created composite sources, gradient cache {}",
            if gradient_cache.is_some() { "enabled" } else { "disabled" }
        );

        Ok(Self {
            backend,
            source: Source::Solid,
            op: Compose::SrcOver,
            extra_alpha: 1.0,
            xor_color: None,
            color: palette::css::BLACK,
            solid,
            solid_pixel: None,
            alpha_mask,
            gradient_cache,
            cache_size: i32::from(size),
            mask_color: XrColor::OPAQUE,
        })
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Set the composite mode.
    pub fn set_composite(&mut self, composite: Composite) -> Result<()> {
        match composite {
            Composite::Alpha { op, extra_alpha } => {
                let extra_alpha = extra_alpha.clamp(0.0, 1.0);
                self.xor_color = None;
                self.op = op;
                if extra_alpha != self.extra_alpha {
                    self.extra_alpha = extra_alpha;
                    if extra_alpha == 1.0 {
                        self.alpha_mask
                            .fill(&mut self.backend, Compose::Clear, XrColor::TRANSPARENT)?;
                    } else {
                        self.alpha_mask.fill(
                            &mut self.backend,
                            Compose::Copy,
                            XrColor::from_alpha(extra_alpha),
                        )?;
                    }
                }
            }
            Composite::Xor { xor_color } => {
                self.xor_color = Some(xor_color);
                self.op = Compose::SrcOver;
            }
        }
        self.update_mask_color();
        Ok(())
    }

    /// The current composite mode.
    pub fn composite_mode(&self) -> Composite {
        match self.xor_color {
            Some(xor_color) => Composite::Xor { xor_color },
            None => Composite::Alpha {
                op: self.op,
                extra_alpha: self.extra_alpha,
            },
        }
    }

    /// Paint with a solid color.
    pub fn set_color(&mut self, color: Color) {
        self.release_gradient();
        self.source = Source::Solid;
        self.color = color;
        self.update_mask_color();
    }

    /// Paint with `paint`, drawn with `user_transform`.
    pub fn set_paint(&mut self, paint: &Paint, user_transform: Affine) -> Result<()> {
        match paint {
            Paint::Solid(color) => self.set_color(*color),
            Paint::Texture(texture) => {
                let picture = texture.picture;
                let transform = inverse(user_transform * texture.transform);
                self.backend.set_picture_transform(picture, transform)?;
                self.backend.set_filter(picture, texture.filter)?;
                self.backend.set_picture_repeat(picture, texture.repeat)?;
                self.release_gradient();
                self.source = Source::Texture(picture);
            }
            Paint::Linear(gradient) => {
                let picture = self.backend.create_linear_gradient(
                    gradient.start,
                    gradient.end,
                    &gradient.stops,
                    gradient.extend.into(),
                )?;
                let transform = inverse(user_transform * gradient.transform);
                self.replace_gradient(picture, transform)?;
            }
            Paint::Radial(gradient) => {
                let picture = self.backend.create_radial_gradient(
                    gradient.center,
                    gradient.inner_radius,
                    gradient.outer_radius,
                    &gradient.stops,
                    gradient.extend.into(),
                )?;
                let transform = inverse(user_transform * gradient.transform);
                self.replace_gradient(picture, transform)?;
            }
        }
        self.update_mask_color();
        Ok(())
    }

    /// Go back to the solid color paint.
    pub fn reset_paint(&mut self) {
        self.release_gradient();
        self.source = Source::Solid;
        self.update_mask_color();
    }

    /// The current solid color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// The current operator.
    pub fn op(&self) -> Compose {
        self.op
    }

    /// The current extra alpha.
    pub fn extra_alpha(&self) -> f32 {
        self.extra_alpha
    }

    /// Whether drawing needs to go through a coverage mask to produce the right result.
    pub fn mask_required(&self) -> bool {
        self.xor_color.is_none()
            && (self.source != Source::Solid
                || self.color.components[3] < 1.0
                || self.extra_alpha != 1.0)
    }

    /// Whether the current operator evaluates the coverage mask.
    pub fn is_mask_evaluated(&self) -> bool {
        is_mask_evaluated(self.op)
    }

    /// Whether the current source is an image or gradient.
    pub fn is_texture_paint_active(&self) -> bool {
        self.source != Source::Solid
    }

    /// The color coverage masks are rendered with.
    pub fn mask_color(&self) -> XrColor {
        self.mask_color
    }

    /// The mask carrying the extra alpha, if a non-solid paint needs one.
    ///
    /// For solid paint the extra alpha is folded into the source pixel instead.
    pub fn extra_alpha_mask(&self) -> Option<PictureId> {
        (self.is_texture_paint_active() && self.extra_alpha < 1.0)
            .then_some(self.alpha_mask.picture)
    }

    /// The premultiplied solid pixel: the paint color with the extra alpha applied.
    pub fn solid_pixel(&self) -> XrColor {
        let alpha = self.color.components[3] * self.extra_alpha;
        XrColor::from_color(self.color.with_alpha(alpha))
    }

    /// Composite `src` (or the current source) through `mask` onto `dst`.
    pub fn composite(
        &mut self,
        src: Option<PictureId>,
        mask: Option<PictureId>,
        dst: PictureId,
        area: CompositeArea,
    ) -> Result<()> {
        let src = match src {
            Some(src) => src,
            None => self.source_picture()?,
        };

        let cache = self.gradient_cache.as_ref().map(|cache| cache.picture);
        match (self.source, cache) {
            (Source::Gradient(gradient), Some(cache)) if gradient == src => {
                self.composite_cached_gradient(gradient, cache, mask, dst, area)
            }
            _ => self
                .backend
                .render_composite(self.op, src, mask, dst, area),
        }
    }

    /// Draw `rects` (in destination coordinates) without a coverage mask.
    pub fn composite_rectangles(&mut self, dst: &Destination, rects: &[IntRect]) -> Result<()> {
        if rects.is_empty() {
            return Ok(());
        }

        if let Some(xor_color) = self.xor_color {
            let pixel = to_argb(self.color) ^ to_argb(xor_color);
            self.backend.set_gc_xor(dst.gc, pixel)?;
            return self.backend.gc_rectangles(dst.pixmap, dst.gc, rects);
        }

        match self.source {
            Source::Solid => {
                let pixel = self.solid_pixel();
                if let [rect] = rects {
                    self.backend
                        .render_rectangle(dst.picture, self.op, pixel, *rect)
                } else {
                    self.backend
                        .render_rectangles(dst.picture, self.op, pixel, rects)
                }
            }
            Source::Texture(_) | Source::Gradient(_) => {
                let mask = self.extra_alpha_mask();
                for rect in rects {
                    let area = CompositeArea::at(rect.x, rect.y, rect.width, rect.height);
                    self.composite(None, mask, dst.picture, area)?;
                }
                Ok(())
            }
        }
    }

    /// Blit `src` onto `dst` with the current operator and extra alpha.
    pub fn composite_blit(
        &mut self,
        src: PictureId,
        dst: PictureId,
        area: CompositeArea,
    ) -> Result<()> {
        let mask = (self.extra_alpha < 1.0).then_some(self.alpha_mask.picture);
        let area = CompositeArea {
            mask_x: 0,
            mask_y: 0,
            ..area
        };
        self.backend.render_composite(self.op, src, mask, dst, area)
    }

    /// Free every backend resource owned by the manager.
    ///
    /// The manager must not be used afterwards.
    pub fn dispose(&mut self) {
        self.release_gradient();
        self.solid.free(&mut self.backend);
        self.alpha_mask.free(&mut self.backend);
        if let Some(cache) = self.gradient_cache.take() {
            cache.free(&mut self.backend);
        }
        debug!("disposed composite sources");
    }

    /// Consume the manager, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn update_mask_color(&mut self) {
        self.mask_color = match self.source {
            Source::Solid => XrColor::OPAQUE,
            Source::Texture(_) | Source::Gradient(_) => XrColor::from_alpha(self.extra_alpha),
        };
    }

    /// The picture of the current source, revalidating the solid source if its pixel changed.
    fn source_picture(&mut self) -> Result<PictureId> {
        match self.source {
            Source::Solid => {
                let pixel = self.solid_pixel();
                if self.solid_pixel != Some(pixel) {
                    self.solid.fill(&mut self.backend, Compose::Copy, pixel)?;
                    self.solid_pixel = Some(pixel);
                }
                Ok(self.solid.picture)
            }
            Source::Texture(picture) | Source::Gradient(picture) => Ok(picture),
        }
    }

    /// Render the gradient into the cache picture first, then composite from the cache.
    fn composite_cached_gradient(
        &mut self,
        gradient: PictureId,
        cache: PictureId,
        mask: Option<PictureId>,
        dst: PictureId,
        area: CompositeArea,
    ) -> Result<()> {
        let size = self.cache_size;
        let mut y = 0;
        while y < area.height {
            let height = (area.height - y).min(size);
            let mut x = 0;
            while x < area.width {
                let width = (area.width - x).min(size);
                self.backend.render_composite(
                    Compose::Copy,
                    gradient,
                    None,
                    cache,
                    CompositeArea {
                        src_x: area.src_x + x,
                        src_y: area.src_y + y,
                        mask_x: 0,
                        mask_y: 0,
                        dst_x: 0,
                        dst_y: 0,
                        width,
                        height,
                    },
                )?;
                self.backend.render_composite(
                    self.op,
                    cache,
                    mask,
                    dst,
                    CompositeArea {
                        src_x: 0,
                        src_y: 0,
                        mask_x: area.mask_x + x,
                        mask_y: area.mask_y + y,
                        dst_x: area.dst_x + x,
                        dst_y: area.dst_y + y,
                        width,
                        height,
                    },
                )?;
                x += size;
            }
            y += size;
        }
        Ok(())
    }

    /// Make the freshly created `picture` the source, freeing it instead if it can't be set up.
    fn replace_gradient(&mut self, picture: PictureId, transform: Affine) -> Result<()> {
        if let Err(e) = self.backend.set_picture_transform(picture, transform) {
            self.backend.free_picture(picture);
            return Err(e);
        }
        self.release_gradient();
        self.source = Source::Gradient(picture);
        Ok(())
    }

    fn release_gradient(&mut self) {
        if let Source::Gradient(picture) = self.source {
            self.backend.free_picture(picture);
            self.source = Source::Solid;
        }
    }
}

/// Allocate the solid cell, the extra-alpha cell and the optional gradient cache.
///
/// On failure, the cells allocated so far are freed again.
fn create_cells<B: Backend>(
    backend: &mut B,
    parent: PixmapId,
    cache_size: u16,
    gradient_cache: bool,
) -> Result<(Cell, Cell, Option<Cell>)> {
    let solid = Cell::new(backend, parent, PictFormat::Argb32, 1, Repeat::Normal)?;
    let alpha_mask = match Cell::new(backend, parent, PictFormat::A8, 1, Repeat::Normal) {
        Ok(cell) => cell,
        Err(e) => {
            solid.free(backend);
            return Err(e);
        }
    };
    let cache = if gradient_cache {
        match Cell::new(backend, parent, PictFormat::Argb32, cache_size, Repeat::None) {
            Ok(cell) => Some(cell),
            Err(e) => {
                alpha_mask.free(backend);
                solid.free(backend);
                return Err(e);
            }
        }
    } else {
        None
    };
    Ok((solid, alpha_mask, cache))
}

/// The inverse of `transform`, falling back to the identity for singular transforms.
fn inverse(transform: Affine) -> Affine {
    let det = transform.determinant();
    if det.abs() <= f64::EPSILON || !det.is_finite() {
        warn!("paint transform {transform:?} is not invertible, using the identity");
        return Affine::IDENTITY;
    }
    transform.inverse()
}

/// The unpremultiplied `0xAARRGGBB` pixel of `color`.
fn to_argb(color: Color) -> u32 {
    let [r, g, b, a] = color.components;
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    q(a) << 24 | q(r) << 16 | q(g) << 8 | q(b)
}
