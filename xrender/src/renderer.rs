// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing verbs.

use crate::backend::{Backend, CompositeArea, Destination, PictureId};
use crate::composite::{Composite, CompositeManager};
use crate::mask_tile::MaskTileManager;
use crate::paint::Paint;
use crate::spans::ShapeSpans;
use crate::{RenderSettings, Result};
use log::warn;
use peniko::kurbo::{
    self, Affine, Arc, BezPath, Ellipse, Line, PathEl, Point, Rect, RoundedRect, Shape, Stroke,
    StrokeOpts, Vec2,
};
use peniko::{Color, Fill};
use xrender_common::line::LineRasterizer;
use xrender_common::rect::{clamp_to_short, clamp_to_ushort, clip_add, dim_add, ClipBox, IntRect};

/// Draws shapes onto a [`Destination`].
///
/// Every drawing verb rasterizes its shape into pixel-aligned rectangles and flushes them
/// before returning. Integer verbs take a fast path when the transform is an integer
/// translation, and fall back to path rendering otherwise.
///
/// Strokes no wider than one device pixel are drawn as single-pixel lines. Wider strokes are
/// expanded into their outline and filled.
#[derive(Debug)]
pub struct Renderer<B: Backend> {
    composite: CompositeManager<B>,
    tiles: MaskTileManager,
    lines: LineRasterizer,
    dst: Destination,
    settings: RenderSettings,
    clip: ClipBox,
    transform: Affine,
    stroke: Stroke,
    fill_rule: Fill,
    /// The current non-solid paint, revalidated when the transform changes.
    paint: Option<Paint>,
}

impl<B: Backend> Renderer<B> {
    /// Create a renderer drawing onto `dst`.
    ///
    /// Fails if the backend can't allocate the scratch pictures, or if the mask size in
    /// `settings` is zero.
    pub fn new(backend: B, dst: Destination, settings: RenderSettings) -> Result<Self> {
        let mut composite = CompositeManager::new(backend, dst.pixmap, &settings)?;
        let tiles = MaskTileManager::new(composite.backend_mut(), dst.pixmap, settings.mask_size);
        let tiles = match tiles {
            Ok(tiles) => tiles,
            Err(e) => {
                composite.dispose();
                return Err(e);
            }
        };

        Ok(Self {
            composite,
            tiles,
            lines: LineRasterizer::new(),
            dst,
            settings,
            clip: ClipBox::from_size(dst.width, dst.height),
            transform: Affine::IDENTITY,
            stroke: Stroke::new(1.0),
            fill_rule: Fill::NonZero,
            paint: None,
        })
    }

    /// The destination.
    pub fn destination(&self) -> &Destination {
        &self.dst
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        self.composite.backend()
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        self.composite.backend_mut()
    }

    /// The paint and composite state.
    pub fn composite_manager(&self) -> &CompositeManager<B> {
        &self.composite
    }

    /// The mask tiling state.
    pub fn mask_tiles(&self) -> &MaskTileManager {
        &self.tiles
    }

    /// The mask tiling state, mutably, for queueing device-space rectangles directly.
    pub fn mask_tiles_mut(&mut self) -> &mut MaskTileManager {
        &mut self.tiles
    }

    /// The settings the renderer was created with.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Paint with a solid color.
    pub fn set_color(&mut self, color: Color) {
        self.paint = None;
        self.composite.set_color(color);
    }

    /// Set the paint.
    pub fn set_paint(&mut self, paint: Paint) -> Result<()> {
        self.composite.set_paint(&paint, self.transform)?;
        self.paint = (!paint.is_solid()).then_some(paint);
        Ok(())
    }

    /// Set the composite mode.
    pub fn set_composite(&mut self, composite: Composite) -> Result<()> {
        self.composite.set_composite(composite)
    }

    /// Set the user-to-device transform.
    pub fn set_transform(&mut self, transform: Affine) -> Result<()> {
        self.transform = transform;
        if let Some(paint) = &self.paint {
            self.composite.set_paint(paint, transform)?;
        }
        Ok(())
    }

    /// The user-to-device transform.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Set the stroke style used by the `draw_*` verbs.
    pub fn set_stroke(&mut self, stroke: Stroke) {
        self.stroke = stroke;
    }

    /// Set the fill rule used by [`fill_path`](Self::fill_path).
    pub fn set_fill_rule(&mut self, fill_rule: Fill) {
        self.fill_rule = fill_rule;
    }

    /// Restrict drawing to `clip` (in device space), or to the whole destination for `None`.
    pub fn set_clip(&mut self, clip: Option<IntRect>) -> Result<()> {
        let bounds = ClipBox::from_size(self.dst.width, self.dst.height);
        self.clip = match clip {
            Some(r) => ClipBox::new(r.x, r.y, r.x2(), r.y2()).intersect(&bounds),
            None => bounds,
        };
        let rect = self.clip.to_rect();
        self.composite
            .backend_mut()
            .set_clip_rectangles(self.dst.picture, 0, 0, &[rect])
    }

    /// The device-space clip box.
    pub fn clip(&self) -> ClipBox {
        self.clip
    }

    /// Draw a one-pixel line between two points, both inclusive.
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
        let Some((tx, ty)) = self.integer_translation().filter(|_| self.is_hairline()) else {
            return self.draw_path(&Line::new(point(x1, y1), point(x2, y2)));
        };

        self.lines.rasterize(
            self.tiles.main_tile_mut().rects_mut(),
            (clip_add(x1, tx), clip_add(y1, ty)),
            (clip_add(x2, tx), clip_add(y2, ty)),
            Some(self.clip),
            true,
        );
        self.flush()
    }

    /// Draw the outline of a rectangle covering `width + 1` by `height + 1` pixels.
    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        if width < 0 || height < 0 {
            return Ok(());
        }
        let Some((tx, ty)) = self.integer_translation().filter(|_| self.is_hairline()) else {
            return self.draw_path(&int_rect(x, y, width, height));
        };

        let (x, y) = (clip_add(x, tx), clip_add(y, ty));
        if width < 2 || height < 2 {
            self.add_clamped_rect(x, y, width.saturating_add(1), height.saturating_add(1));
        } else {
            self.add_clamped_rect(x, y, width.saturating_add(1), 1);
            self.add_clamped_rect(x, clip_add(y, height), width.saturating_add(1), 1);
            self.add_clamped_rect(x, clip_add(y, 1), 1, height - 1);
            self.add_clamped_rect(clip_add(x, width), clip_add(y, 1), 1, height - 1);
        }
        self.flush()
    }

    /// Fill a rectangle.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        let Some((tx, ty)) = self.integer_translation() else {
            return self.fill_path(&int_rect(x, y, width, height));
        };

        self.add_clamped_rect(clip_add(x, tx), clip_add(y, ty), width, height);
        self.flush()
    }

    /// Draw connected lines through `points`.
    pub fn draw_polyline(&mut self, points: &[(i32, i32)]) -> Result<()> {
        self.draw_path(&polygon(points, false))
    }

    /// Draw the closed outline through `points`.
    pub fn draw_polygon(&mut self, points: &[(i32, i32)]) -> Result<()> {
        self.draw_path(&polygon(points, true))
    }

    /// Fill the polygon through `points`, using the current fill rule.
    pub fn fill_polygon(&mut self, points: &[(i32, i32)]) -> Result<()> {
        self.fill_path(&polygon(points, true))
    }

    /// Draw the outline of a rectangle with rounded corners.
    pub fn draw_round_rect(
        &mut self,
        rect: IntRect,
        arc_width: i32,
        arc_height: i32,
    ) -> Result<()> {
        self.draw_path(&round_rect(rect, arc_width, arc_height))
    }

    /// Fill a rectangle with rounded corners.
    pub fn fill_round_rect(
        &mut self,
        rect: IntRect,
        arc_width: i32,
        arc_height: i32,
    ) -> Result<()> {
        self.fill_path(&round_rect(rect, arc_width, arc_height))
    }

    /// Draw the outline of the ellipse inscribed in `rect`.
    pub fn draw_oval(&mut self, rect: IntRect) -> Result<()> {
        self.draw_path(&Ellipse::from_rect(to_rect(rect)))
    }

    /// Fill the ellipse inscribed in `rect`.
    pub fn fill_oval(&mut self, rect: IntRect) -> Result<()> {
        self.fill_path(&Ellipse::from_rect(to_rect(rect)))
    }

    /// Draw an elliptical arc inscribed in `rect`.
    ///
    /// Angles are in degrees, counterclockwise on screen, with 0° at three o'clock.
    pub fn draw_arc(&mut self, rect: IntRect, start_angle: f64, arc_angle: f64) -> Result<()> {
        self.draw_path(&arc(rect, start_angle, arc_angle))
    }

    /// Fill the pie-shaped wedge of an elliptical arc inscribed in `rect`.
    pub fn fill_arc(&mut self, rect: IntRect, start_angle: f64, arc_angle: f64) -> Result<()> {
        let arc = arc(rect, start_angle, arc_angle);
        let mut pie = BezPath::new();
        pie.move_to(arc.center);
        let (sin, cos) = arc.start_angle.sin_cos();
        pie.line_to(arc.center + Vec2::new(cos * arc.radii.x, sin * arc.radii.y));
        pie.extend(arc.append_iter(self.settings.tolerance));
        pie.close_path();
        self.fill_path(&pie)
    }

    /// Composite `area` of `src` onto the destination with the current operator and extra
    /// alpha, ignoring the transform and the paint.
    pub fn blit(&mut self, src: PictureId, area: CompositeArea) -> Result<()> {
        self.composite.composite_blit(src, self.dst.picture, area)
    }

    /// Stroke a shape with the current stroke style.
    pub fn draw_path(&mut self, shape: &impl Shape) -> Result<()> {
        let tolerance = self.settings.tolerance;

        if self.stroke.width * self.device_scale() <= 1.0 {
            let mut path = shape.to_path(tolerance);
            if !self.stroke.dash_pattern.is_empty() {
                path = kurbo::dash(
                    path.iter(),
                    self.stroke.dash_offset,
                    &self.stroke.dash_pattern,
                )
                .collect();
            }
            self.push_hairline(&(self.transform * path));
        } else {
            // Flatten the outline finely enough for the device resolution.
            let tolerance = tolerance / self.device_scale().max(1.0);
            let outline = kurbo::stroke(
                shape.path_elements(tolerance),
                &self.stroke,
                &StrokeOpts::default(),
                tolerance,
            );
            self.push_fill((self.transform * outline).iter(), Fill::NonZero);
        }
        self.flush()
    }

    /// Fill a shape using the current fill rule.
    pub fn fill_path(&mut self, shape: &impl Shape) -> Result<()> {
        let path = self.transform * shape.to_path(self.settings.tolerance);
        self.push_fill(path.iter(), self.fill_rule);
        self.flush()
    }

    /// Fill device-space spans, ignoring the transform.
    pub fn fill_spans(&mut self, spans: impl IntoIterator<Item = IntRect>) -> Result<()> {
        for span in spans {
            self.add_clamped_rect(span.x, span.y, span.width, span.height);
        }
        self.flush()
    }

    /// Draw the queued rectangles.
    ///
    /// All drawing verbs flush on their own. This is only needed after queueing rectangles
    /// through [`mask_tiles_mut`](Self::mask_tiles_mut).
    pub fn flush(&mut self) -> Result<()> {
        self.tiles.flush(&mut self.composite, &self.dst)
    }

    /// Free the backend resources created by the renderer.
    ///
    /// The destination stays alive. The renderer must not be used afterwards.
    pub fn dispose(&mut self) {
        self.tiles.dispose(self.composite.backend_mut());
        self.composite.dispose();
    }

    /// Consume the renderer, returning the backend.
    pub fn into_backend(self) -> B {
        self.composite.into_backend()
    }

    /// The factor the transform scales areas by, as a length.
    fn device_scale(&self) -> f64 {
        self.transform.determinant().abs().sqrt()
    }

    /// Whether strokes are drawn as undashed single-pixel lines.
    fn is_hairline(&self) -> bool {
        self.stroke.width * self.device_scale() <= 1.0 && self.stroke.dash_pattern.is_empty()
    }

    /// The translation, if the transform is a translation by whole pixels.
    fn integer_translation(&self) -> Option<(i32, i32)> {
        let [a, b, c, d, e, f] = self.transform.as_coeffs();
        let is_integer = |v: f64| v.fract() == 0.0 && v.abs() <= f64::from(i32::MAX);
        if a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0 && is_integer(e) && is_integer(f) {
            Some((e as i32, f as i32))
        } else {
            None
        }
    }

    /// Queue a device-space rectangle, clamped to the coordinate range of the backend and
    /// clipped.
    fn add_clamped_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width <= 0 || height <= 0 {
            return;
        }
        let x2 = dim_add(x, width);
        let y2 = dim_add(y, height);
        if x2 < 0 || y2 < 0 {
            return;
        }

        let x = clamp_to_short(x);
        let y = clamp_to_short(y);
        let width = clamp_to_ushort(x2.saturating_sub(x));
        let height = clamp_to_ushort(y2.saturating_sub(y));
        let rect = IntRect::new(x, y, width, height).intersect(&self.clip);
        if !rect.is_empty() {
            self.tiles.main_tile_mut().rects_mut().push_rect(rect);
        }
    }

    /// Queue the single-pixel outline of a device-space path.
    fn push_hairline(&mut self, path: &BezPath) {
        let mut segments = Vec::new();
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;
        let mut is_nan = false;

        kurbo::flatten(path.iter(), self.settings.tolerance, |el| match el {
            PathEl::MoveTo(p) => {
                is_nan |= p.is_nan();
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                is_nan |= p.is_nan();
                segments.push((last, p));
                last = p;
            }
            PathEl::ClosePath => {
                if last != start {
                    segments.push((last, start));
                }
                last = start;
            }
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        });

        // A path that contains NaN is ill-defined, so ignore it.
        if is_nan {
            warn!("A path contains NaN, ignoring it.");
            return;
        }

        for (p0, p1) in segments {
            self.push_segment(pixel(p0), pixel(p1));
        }
    }

    /// Queue a device-space line segment, picking the cheapest representation.
    fn push_segment(&mut self, (x1, y1): (i32, i32), (x2, y2): (i32, i32)) {
        let clip = self.clip;
        let dx = (i64::from(x2) - i64::from(x1)).abs();
        let dy = (i64::from(y2) - i64::from(y1)).abs();
        let rects = self.tiles.main_tile_mut().rects_mut();

        if dx == 0 || dy == 0 {
            // A single row or column.
            let x = i64::from(x1.min(x2)).max(i64::from(clip.lo_x));
            let y = i64::from(y1.min(y2)).max(i64::from(clip.lo_y));
            let x2 = (i64::from(x1.max(x2)) + 1).min(i64::from(clip.hi_x));
            let y2 = (i64::from(y1.max(y2)) + 1).min(i64::from(clip.hi_y));
            if x2 > x && y2 > y {
                // Bounded by the clip box, so everything fits into i32.
                rects.push(x as i32, y as i32, (x2 - x) as i32, (y2 - y) as i32);
            }
        } else if dx == 1 && dy == 1 {
            let bounds = clip.to_rect();
            for (x, y) in [(x1, y1), (x2, y2)] {
                if bounds.contains(x, y) {
                    rects.push(x, y, 1, 1);
                }
            }
        } else {
            self.lines
                .rasterize(rects, (x1, y1), (x2, y2), Some(clip), true);
        }
    }

    /// Queue the spans of a device-space path.
    fn push_fill(&mut self, path: impl IntoIterator<Item = PathEl>, fill: Fill) {
        let rects = self.tiles.main_tile_mut().rects_mut();
        for span in ShapeSpans::new(path, fill, self.clip, self.settings.tolerance) {
            rects.push_rect(span);
        }
    }
}

fn point(x: i32, y: i32) -> Point {
    Point::new(f64::from(x), f64::from(y))
}

/// The pixel containing `p`.
fn pixel(p: Point) -> (i32, i32) {
    (p.x.floor() as i32, p.y.floor() as i32)
}

fn int_rect(x: i32, y: i32, width: i32, height: i32) -> Rect {
    Rect::from_origin_size(point(x, y), (f64::from(width), f64::from(height)))
}

fn to_rect(rect: IntRect) -> Rect {
    int_rect(rect.x, rect.y, rect.width, rect.height)
}

fn polygon(points: &[(i32, i32)], close: bool) -> BezPath {
    let mut path = BezPath::new();
    let mut points = points.iter().map(|&(x, y)| point(x, y));
    if let Some(first) = points.next() {
        path.move_to(first);
        for p in points {
            path.line_to(p);
        }
        if close {
            path.close_path();
        }
    }
    path
}

fn round_rect(rect: IntRect, arc_width: i32, arc_height: i32) -> RoundedRect {
    let radius = f64::from(arc_width.min(arc_height).max(0)) / 2.0;
    RoundedRect::from_rect(to_rect(rect), radius)
}

fn arc(rect: IntRect, start_angle: f64, arc_angle: f64) -> Arc {
    let bounds = to_rect(rect);
    // Device space points down, so counterclockwise angles are negative.
    Arc {
        center: bounds.center(),
        radii: Vec2::new(bounds.width() / 2.0, bounds.height() / 2.0),
        start_angle: -start_angle.to_radians(),
        sweep_angle: -arc_angle.to_radians(),
        x_rotation: 0.0,
    }
}
