// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory reference implementation of [`Backend`].

use super::{
    Backend, CompositeArea, GcId, PictFormat, PictureId, PixmapId, Repeat, ResourceId, XrColor,
};
use crate::paint::GradientStop;
use crate::{Error, Result};
use log::trace;
use peniko::color::PremulRgba8;
use peniko::kurbo::{Affine, Point};
use peniko::{Compose, ImageQuality};
use std::collections::HashMap;
use xrender_common::rect::IntRect;

/// Premultiplied RGBA with components in `[0, 1]`.
type Rgba = [f32; 4];

const TRANSPARENT: Rgba = [0.0; 4];

#[derive(Debug)]
struct Surface {
    width: u16,
    height: u16,
    depth: u8,
    data: Vec<PremulRgba8>,
}

impl Surface {
    fn new(width: u16, height: u16, depth: u8) -> Self {
        Self {
            width,
            height,
            depth,
            data: vec![PremulRgba8::from_u32(0); usize::from(width) * usize::from(height)],
        }
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < i32::from(self.width) && y < i32::from(self.height)
    }

    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * usize::from(self.width) + x as usize
    }

    fn load(&self, x: i32, y: i32) -> Rgba {
        let p = self.data[self.index(x, y)];
        let c = |v: u8| f32::from(v) / 255.0;
        [c(p.r), c(p.g), c(p.b), c(p.a)]
    }

    fn store(&mut self, x: i32, y: i32, color: Rgba) {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        let index = self.index(x, y);
        self.data[index] = if self.depth == 8 {
            // Alpha-only surfaces drop the color channels.
            PremulRgba8 {
                r: 0,
                g: 0,
                b: 0,
                a: q(color[3]),
            }
        } else {
            PremulRgba8 {
                r: q(color[0]),
                g: q(color[1]),
                b: q(color[2]),
                a: q(color[3]),
            }
        };
    }
}

#[derive(Debug)]
enum Source {
    Pixmap(PixmapId),
    Linear {
        p1: Point,
        p2: Point,
        stops: Vec<GradientStop>,
    },
    Radial {
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        stops: Vec<GradientStop>,
    },
}

#[derive(Debug)]
struct Picture {
    source: Source,
    transform: Affine,
    repeat: Repeat,
    /// Clip rectangles in picture space.
    clip: Option<Vec<IntRect>>,
}

impl Picture {
    fn new(source: Source, repeat: Repeat) -> Self {
        Self {
            source,
            transform: Affine::IDENTITY,
            repeat,
            clip: None,
        }
    }

    fn clip_allows(&self, x: i32, y: i32) -> bool {
        self.clip
            .as_ref()
            .map_or(true, |rects| rects.iter().any(|r| r.contains(x, y)))
    }
}

#[derive(Debug)]
struct Gc {
    drawable: PixmapId,
    xor: u32,
}

/// A backend that renders into premultiplied RGBA8 pixmaps held in memory.
///
/// Sources are sampled at pixel centers with nearest-neighbor filtering, whatever filter is
/// requested. Graphics contexts only support XOR fills.
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    next_id: u32,
    pixmaps: HashMap<u32, Surface>,
    pictures: HashMap<u32, Picture>,
    gcs: HashMap<u32, Gc>,
}

impl SoftwareBackend {
    /// Create a new backend without any resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// The premultiplied pixel at `(x, y)` of `pixmap`.
    ///
    /// Returns `None` for unknown pixmaps and out-of-bounds coordinates.
    pub fn pixel(&self, pixmap: PixmapId, x: i32, y: i32) -> Option<PremulRgba8> {
        let surface = self.pixmaps.get(&pixmap.0)?;
        surface
            .contains(x, y)
            .then(|| surface.data[surface.index(x, y)])
    }

    /// Overwrite the pixel at `(x, y)` of `pixmap`.
    pub fn put_pixel(&mut self, pixmap: PixmapId, x: i32, y: i32, pixel: PremulRgba8) -> Result<()> {
        let surface = self.surface_mut(pixmap)?;
        if surface.contains(x, y) {
            let index = surface.index(x, y);
            surface.data[index] = pixel;
        }
        Ok(())
    }

    /// The number of live pixmaps, pictures and graphics contexts.
    pub fn resource_count(&self) -> usize {
        self.pixmaps.len() + self.pictures.len() + self.gcs.len()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn picture(&self, picture: PictureId) -> Result<&Picture> {
        self.pictures
            .get(&picture.0)
            .ok_or(Error::UnknownResource(ResourceId::Picture(picture)))
    }

    fn picture_mut(&mut self, picture: PictureId) -> Result<&mut Picture> {
        self.pictures
            .get_mut(&picture.0)
            .ok_or(Error::UnknownResource(ResourceId::Picture(picture)))
    }

    fn surface_mut(&mut self, pixmap: PixmapId) -> Result<&mut Surface> {
        self.pixmaps
            .get_mut(&pixmap.0)
            .ok_or(Error::UnknownResource(ResourceId::Pixmap(pixmap)))
    }

    /// The pixmap behind a destination picture.
    fn target(&self, picture: PictureId) -> Result<PixmapId> {
        match self.picture(picture)?.source {
            Source::Pixmap(pixmap) => Ok(pixmap),
            _ => Err(Error::UnknownResource(ResourceId::Picture(picture))),
        }
    }

    /// Sample `picture` at the center of pixel `(x, y)`.
    fn sample(&self, picture: &Picture, x: i32, y: i32) -> Rgba {
        let p = picture.transform * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);

        match &picture.source {
            Source::Pixmap(pixmap) => {
                let Some(surface) = self.pixmaps.get(&pixmap.0) else {
                    return TRANSPARENT;
                };
                let (Some(sx), Some(sy)) = (
                    wrap(p.x.floor() as i32, i32::from(surface.width), picture.repeat),
                    wrap(p.y.floor() as i32, i32::from(surface.height), picture.repeat),
                ) else {
                    return TRANSPARENT;
                };
                surface.load(sx, sy)
            }
            Source::Linear { p1, p2, stops } => {
                let d = *p2 - *p1;
                let len2 = d.hypot2();
                let t = if len2 == 0.0 {
                    0.0
                } else {
                    (p - *p1).dot(d) / len2
                };
                gradient_color(stops, t, picture.repeat)
            }
            Source::Radial {
                center,
                inner_radius,
                outer_radius,
                stops,
            } => {
                let span = outer_radius - inner_radius;
                let t = if span == 0.0 {
                    0.0
                } else {
                    ((p - *center).hypot() - inner_radius) / span
                };
                gradient_color(stops, t, picture.repeat)
            }
        }
    }
}

/// Map a sample coordinate into `[0, len)` according to `repeat`.
fn wrap(v: i32, len: i32, repeat: Repeat) -> Option<i32> {
    if len == 0 {
        return None;
    }
    match repeat {
        Repeat::None => (0..len).contains(&v).then_some(v),
        Repeat::Normal => Some(v.rem_euclid(len)),
        Repeat::Pad => Some(v.clamp(0, len - 1)),
        Repeat::Reflect => {
            let m = v.rem_euclid(2 * len);
            Some(if m >= len { 2 * len - 1 - m } else { m })
        }
    }
}

fn gradient_color(stops: &[GradientStop], t: f64, repeat: Repeat) -> Rgba {
    let t = match repeat {
        Repeat::None if !(0.0..=1.0).contains(&t) => return TRANSPARENT,
        Repeat::None | Repeat::Pad => t.clamp(0.0, 1.0),
        Repeat::Normal => t - t.floor(),
        Repeat::Reflect => {
            let m = t.rem_euclid(2.0);
            if m > 1.0 {
                2.0 - m
            } else {
                m
            }
        }
    } as f32;

    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return TRANSPARENT;
    };
    let [r, g, b, a] = if t <= first.offset {
        first.color.components
    } else if t >= last.offset {
        last.color.components
    } else {
        let i = stops.partition_point(|s| s.offset <= t).max(1);
        let (s0, s1) = (&stops[i - 1], &stops[i]);
        let span = s1.offset - s0.offset;
        let f = if span > 0.0 { (t - s0.offset) / span } else { 1.0 };
        let (c0, c1) = (s0.color.components, s1.color.components);
        core::array::from_fn(|k| c0[k] + (c1[k] - c0[k]) * f)
    };
    [r * a, g * a, b * a, a]
}

/// Porter-Duff compositing of premultiplied colors.
fn compose(op: Compose, src: Rgba, dst: Rgba) -> Rgba {
    let (sa, da) = (src[3], dst[3]);
    let (fa, fb) = match op {
        Compose::Clear => (0.0, 0.0),
        Compose::Copy => (1.0, 0.0),
        Compose::Dest => (0.0, 1.0),
        Compose::SrcOver => (1.0, 1.0 - sa),
        Compose::DestOver => (1.0 - da, 1.0),
        Compose::SrcIn => (da, 0.0),
        Compose::DestIn => (0.0, sa),
        Compose::SrcOut => (1.0 - da, 0.0),
        Compose::DestOut => (0.0, 1.0 - sa),
        Compose::SrcAtop => (da, 1.0 - sa),
        Compose::DestAtop => (1.0 - da, sa),
        Compose::Xor => (1.0 - da, 1.0 - sa),
        Compose::Plus | Compose::PlusLighter => (1.0, 1.0),
    };
    core::array::from_fn(|i| (src[i] * fa + dst[i] * fb).min(1.0))
}

fn to_rgba(color: XrColor) -> Rgba {
    let c = |v: u16| f32::from(v) / f32::from(u16::MAX);
    [c(color.red), c(color.green), c(color.blue), c(color.alpha)]
}

impl Backend for SoftwareBackend {
    fn create_pixmap(
        &mut self,
        _parent: PixmapId,
        depth: u8,
        width: u16,
        height: u16,
    ) -> Result<PixmapId> {
        if depth != 8 && depth != 32 {
            return Err(Error::PixmapAllocation {
                width,
                height,
                depth,
            });
        }
        let id = self.next_id();
        self.pixmaps.insert(id, Surface::new(width, height, depth));
        trace!("created {width}x{height} pixmap {id} of depth {depth}");
        Ok(PixmapId(id))
    }

    fn create_picture(&mut self, pixmap: PixmapId, format: PictFormat) -> Result<PictureId> {
        let surface = self.surface_mut(pixmap)?;
        if surface.depth != format.depth() {
            return Err(Error::PictureAllocation);
        }
        let id = self.next_id();
        self.pictures
            .insert(id, Picture::new(Source::Pixmap(pixmap), Repeat::None));
        Ok(PictureId(id))
    }

    fn free_picture(&mut self, picture: PictureId) {
        self.pictures.remove(&picture.0);
    }

    fn free_pixmap(&mut self, pixmap: PixmapId) {
        self.pixmaps.remove(&pixmap.0);
    }

    fn create_gc(&mut self, drawable: PixmapId) -> Result<GcId> {
        self.surface_mut(drawable)?;
        let id = self.next_id();
        self.gcs.insert(id, Gc { drawable, xor: 0 });
        Ok(GcId(id))
    }

    fn free_gc(&mut self, gc: GcId) {
        self.gcs.remove(&gc.0);
    }

    fn render_rectangle(
        &mut self,
        dst: PictureId,
        op: Compose,
        color: XrColor,
        rect: IntRect,
    ) -> Result<()> {
        self.render_rectangles(dst, op, color, &[rect])
    }

    fn render_rectangles(
        &mut self,
        dst: PictureId,
        op: Compose,
        color: XrColor,
        rects: &[IntRect],
    ) -> Result<()> {
        let pixmap = self.target(dst)?;
        let src = to_rgba(color);
        let picture = self
            .pictures
            .get(&dst.0)
            .ok_or(Error::UnknownResource(ResourceId::Picture(dst)))?;
        let surface = self
            .pixmaps
            .get_mut(&pixmap.0)
            .ok_or(Error::UnknownResource(ResourceId::Pixmap(pixmap)))?;

        for rect in rects {
            for y in rect.y.max(0)..rect.y2().min(i32::from(surface.height)) {
                for x in rect.x.max(0)..rect.x2().min(i32::from(surface.width)) {
                    if picture.clip_allows(x, y) {
                        let d = surface.load(x, y);
                        surface.store(x, y, compose(op, src, d));
                    }
                }
            }
        }
        Ok(())
    }

    fn render_composite(
        &mut self,
        op: Compose,
        src: PictureId,
        mask: Option<PictureId>,
        dst: PictureId,
        area: CompositeArea,
    ) -> Result<()> {
        let pixmap = self.target(dst)?;
        let width = area.width.max(0);
        let height = area.height.max(0);

        // Sample first, so that a picture can be composited onto its own pixmap.
        let src_picture = self.picture(src)?;
        let mask_picture = mask.map(|m| self.picture(m)).transpose()?;
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for j in 0..height {
            for i in 0..width {
                let s = self.sample(src_picture, area.src_x + i, area.src_y + j);
                let m = mask_picture.map_or(1.0, |mask| {
                    self.sample(mask, area.mask_x + i, area.mask_y + j)[3]
                });
                samples.push(s.map(|c| c * m));
            }
        }

        let picture = self.picture(dst)?;
        let clip = picture.clip.clone();
        let surface = self.surface_mut(pixmap)?;
        for j in 0..height {
            for i in 0..width {
                let (x, y) = (area.dst_x + i, area.dst_y + j);
                let allowed = clip
                    .as_ref()
                    .map_or(true, |rects| rects.iter().any(|r| r.contains(x, y)));
                if surface.contains(x, y) && allowed {
                    let d = surface.load(x, y);
                    let s = samples[(j * width + i) as usize];
                    surface.store(x, y, compose(op, s, d));
                }
            }
        }
        Ok(())
    }

    fn set_picture_transform(&mut self, picture: PictureId, transform: Affine) -> Result<()> {
        self.picture_mut(picture)?.transform = transform;
        Ok(())
    }

    fn set_picture_repeat(&mut self, picture: PictureId, repeat: Repeat) -> Result<()> {
        self.picture_mut(picture)?.repeat = repeat;
        Ok(())
    }

    fn set_filter(&mut self, picture: PictureId, filter: ImageQuality) -> Result<()> {
        self.picture(picture)?;
        trace!("sampling picture {} nearest instead of {filter:?}", picture.0);
        Ok(())
    }

    fn set_clip_rectangles(
        &mut self,
        picture: PictureId,
        x_origin: i32,
        y_origin: i32,
        rects: &[IntRect],
    ) -> Result<()> {
        let rects = rects
            .iter()
            .map(|r| IntRect::new(r.x + x_origin, r.y + y_origin, r.width, r.height))
            .collect();
        self.picture_mut(picture)?.clip = Some(rects);
        Ok(())
    }

    fn set_gc_xor(&mut self, gc: GcId, pixel: u32) -> Result<()> {
        self.gcs
            .get_mut(&gc.0)
            .ok_or(Error::UnknownResource(ResourceId::Gc(gc)))?
            .xor = pixel;
        Ok(())
    }

    fn gc_rectangles(&mut self, drawable: PixmapId, gc: GcId, rects: &[IntRect]) -> Result<()> {
        let gc_state = self
            .gcs
            .get(&gc.0)
            .ok_or(Error::UnknownResource(ResourceId::Gc(gc)))?;
        debug_assert_eq!(gc_state.drawable, drawable, "GC used on a foreign drawable");
        let [a, r, g, b] = gc_state.xor.to_be_bytes();
        let surface = self.surface_mut(drawable)?;

        for rect in rects {
            for y in rect.y.max(0)..rect.y2().min(i32::from(surface.height)) {
                for x in rect.x.max(0)..rect.x2().min(i32::from(surface.width)) {
                    let index = surface.index(x, y);
                    let p = &mut surface.data[index];
                    p.r ^= r;
                    p.g ^= g;
                    p.b ^= b;
                    p.a ^= a;
                }
            }
        }
        Ok(())
    }

    fn create_linear_gradient(
        &mut self,
        p1: Point,
        p2: Point,
        stops: &[GradientStop],
        repeat: Repeat,
    ) -> Result<PictureId> {
        if stops.is_empty() {
            return Err(Error::GradientAllocation);
        }
        let id = self.next_id();
        let source = Source::Linear {
            p1,
            p2,
            stops: stops.to_vec(),
        };
        self.pictures.insert(id, Picture::new(source, repeat));
        Ok(PictureId(id))
    }

    fn create_radial_gradient(
        &mut self,
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        stops: &[GradientStop],
        repeat: Repeat,
    ) -> Result<PictureId> {
        if stops.is_empty() {
            return Err(Error::GradientAllocation);
        }
        let id = self.next_id();
        let source = Source::Radial {
            center,
            inner_radius,
            outer_radius,
            stops: stops.to_vec(),
        };
        self.pictures.insert(id, Picture::new(source, repeat));
        Ok(PictureId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::{compose, wrap, SoftwareBackend};
    use crate::backend::{Backend, CompositeArea, PictFormat, PixmapId, Repeat, XrColor};
    use peniko::Compose;
    use xrender_common::rect::IntRect;

    #[test]
    fn wrap_modes() {
        assert_eq!(wrap(-1, 4, Repeat::None), None);
        assert_eq!(wrap(5, 4, Repeat::Normal), Some(1));
        assert_eq!(wrap(-1, 4, Repeat::Normal), Some(3));
        assert_eq!(wrap(9, 4, Repeat::Pad), Some(3));
        assert_eq!(wrap(4, 4, Repeat::Reflect), Some(3));
        assert_eq!(wrap(-1, 4, Repeat::Reflect), Some(0));
    }

    #[test]
    fn src_over_half_alpha() {
        let out = compose(
            Compose::SrcOver,
            [0.5, 0.0, 0.0, 0.5],
            [0.0, 0.0, 1.0, 1.0],
        );
        assert_eq!(out, [0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn rectangles_respect_clip() {
        let mut backend = SoftwareBackend::new();
        let pixmap = backend.create_pixmap(PixmapId::ROOT, 32, 8, 8).unwrap();
        let picture = backend.create_picture(pixmap, PictFormat::Argb32).unwrap();
        backend
            .set_clip_rectangles(picture, 2, 0, &[IntRect::new(0, 0, 2, 8)])
            .unwrap();

        backend
            .render_rectangle(picture, Compose::Copy, XrColor::OPAQUE, IntRect::new(0, 0, 8, 8))
            .unwrap();

        assert_eq!(backend.pixel(pixmap, 1, 1).unwrap().a, 0);
        assert_eq!(backend.pixel(pixmap, 2, 1).unwrap().a, 255);
        assert_eq!(backend.pixel(pixmap, 3, 7).unwrap().a, 255);
        assert_eq!(backend.pixel(pixmap, 4, 1).unwrap().a, 0);
    }

    #[test]
    fn composite_through_mask() {
        let mut backend = SoftwareBackend::new();
        let dst_pixmap = backend.create_pixmap(PixmapId::ROOT, 32, 4, 4).unwrap();
        let dst = backend.create_picture(dst_pixmap, PictFormat::Argb32).unwrap();
        let src_pixmap = backend.create_pixmap(PixmapId::ROOT, 32, 1, 1).unwrap();
        let src = backend.create_picture(src_pixmap, PictFormat::Argb32).unwrap();
        backend.set_picture_repeat(src, Repeat::Normal).unwrap();
        backend
            .render_rectangle(src, Compose::Copy, XrColor::OPAQUE, IntRect::new(0, 0, 1, 1))
            .unwrap();
        let mask_pixmap = backend.create_pixmap(PixmapId::ROOT, 8, 4, 4).unwrap();
        let mask = backend.create_picture(mask_pixmap, PictFormat::A8).unwrap();
        backend
            .render_rectangle(mask, Compose::Copy, XrColor::OPAQUE, IntRect::new(1, 1, 2, 1))
            .unwrap();

        backend
            .render_composite(
                Compose::SrcOver,
                src,
                Some(mask),
                dst,
                CompositeArea::at(0, 0, 4, 4),
            )
            .unwrap();

        assert_eq!(backend.pixel(dst_pixmap, 0, 0).unwrap().a, 0);
        assert_eq!(backend.pixel(dst_pixmap, 1, 1).unwrap().a, 255);
        assert_eq!(backend.pixel(dst_pixmap, 2, 1).unwrap().a, 255);
        assert_eq!(backend.pixel(dst_pixmap, 3, 1).unwrap().a, 0);
    }

    #[test]
    fn mismatched_format_fails() {
        let mut backend = SoftwareBackend::new();
        let pixmap = backend.create_pixmap(PixmapId::ROOT, 8, 4, 4).unwrap();
        assert!(backend.create_picture(pixmap, PictFormat::Argb32).is_err());
        assert!(backend.create_pixmap(PixmapId::ROOT, 24, 4, 4).is_err());
    }
}
