// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing backend the compositor issues its requests to.
//!
//! The backend speaks in terms of server-side resources: pixmaps (pixel storage), pictures
//! (pixmaps or gradients bundled with a format, transform, repeat mode, filter and clip) and
//! graphics contexts (used for XOR fills). All resources are identified by opaque ids handed
//! out by the backend.

mod recording;
mod software;

pub use recording::{Call, RecordingBackend};
pub use software::SoftwareBackend;

use crate::paint::GradientStop;
use crate::Result;
use peniko::kurbo::{Affine, Point};
use peniko::{Color, Compose, Extend, ImageQuality};
use xrender_common::rect::IntRect;

/// A pixmap on the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixmapId(pub u32);

impl PixmapId {
    /// The root drawable, used as the parent of pixmaps that have no other natural parent.
    pub const ROOT: Self = Self(0);
}

/// A picture on the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PictureId(pub u32);

/// A graphics context on the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcId(pub u32);

/// Any backend resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// A pixmap.
    Pixmap(PixmapId),
    /// A picture.
    Picture(PictureId),
    /// A graphics context.
    Gc(GcId),
}

/// The pixel format of a picture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PictFormat {
    /// 8-bit alpha only.
    A8,
    /// 32-bit premultiplied ARGB.
    Argb32,
}

impl PictFormat {
    /// The depth in bits of pixmaps holding this format.
    pub const fn depth(self) -> u8 {
        match self {
            Self::A8 => 8,
            Self::Argb32 => 32,
        }
    }
}

/// How a picture is sampled outside of its bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Repeat {
    /// Transparent outside of the bounds.
    #[default]
    None,
    /// Tiled.
    Normal,
    /// The edge pixels extend outward.
    Pad,
    /// Tiled with every other tile mirrored.
    Reflect,
}

impl From<Extend> for Repeat {
    fn from(extend: Extend) -> Self {
        match extend {
            Extend::Pad => Self::Pad,
            Extend::Repeat => Self::Normal,
            Extend::Reflect => Self::Reflect,
        }
    }
}

/// A premultiplied color with 16 bits per channel, as used by rectangle fills.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct XrColor {
    /// The premultiplied red channel.
    pub red: u16,
    /// The premultiplied green channel.
    pub green: u16,
    /// The premultiplied blue channel.
    pub blue: u16,
    /// The alpha channel.
    pub alpha: u16,
}

impl XrColor {
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black, also used as a full-coverage mask color.
    pub const OPAQUE: Self = Self::new(0, 0, 0, u16::MAX);

    /// Create a new color from premultiplied channels.
    pub const fn new(red: u16, green: u16, blue: u16, alpha: u16) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// A color that only carries an alpha value, for rendering into alpha masks.
    pub fn from_alpha(alpha: f32) -> Self {
        Self::new(0, 0, 0, to_u16(alpha))
    }

    /// Premultiply `color` and widen it to 16 bits per channel.
    pub fn from_color(color: Color) -> Self {
        let [r, g, b, a] = color.components;
        let a = a.clamp(0.0, 1.0);
        Self::new(to_u16(r * a), to_u16(g * a), to_u16(b * a), to_u16(a))
    }

    /// Widen a premultiplied `0xAARRGGBB` pixel.
    pub const fn from_premul_argb(pixel: u32) -> Self {
        const fn widen(v: u32) -> u16 {
            let v = (v & 0xff) as u16;
            v << 8 | v
        }

        Self::new(
            widen(pixel >> 16),
            widen(pixel >> 8),
            widen(pixel),
            widen(pixel >> 24),
        )
    }

    /// Whether the color is fully opaque.
    pub const fn is_opaque(&self) -> bool {
        self.alpha == u16::MAX
    }
}

fn to_u16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16
}

/// The source, mask and destination rectangles of a composite request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CompositeArea {
    /// Left edge in source space.
    pub src_x: i32,
    /// Top edge in source space.
    pub src_y: i32,
    /// Left edge in mask space.
    pub mask_x: i32,
    /// Top edge in mask space.
    pub mask_y: i32,
    /// Left edge in destination space.
    pub dst_x: i32,
    /// Top edge in destination space.
    pub dst_y: i32,
    /// The width of the composited area.
    pub width: i32,
    /// The height of the composited area.
    pub height: i32,
}

impl CompositeArea {
    /// An area that uses the same coordinates for source and destination, and the mask origin.
    pub const fn at(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            src_x: x,
            src_y: y,
            mask_x: 0,
            mask_y: 0,
            dst_x: x,
            dst_y: y,
            width,
            height,
        }
    }
}

/// An XRender-style drawing backend.
///
/// Creation requests may fail with an [`Error`](crate::Error). Drawing requests return a
/// [`Result`](crate::Error) too, so that backends which validate their arguments can report
/// unknown resources. Freeing is infallible.
pub trait Backend {
    /// Create a pixmap of the given depth (8 or 32 bits).
    fn create_pixmap(&mut self, parent: PixmapId, depth: u8, width: u16, height: u16)
        -> Result<PixmapId>;

    /// Create a picture on top of `pixmap`.
    fn create_picture(&mut self, pixmap: PixmapId, format: PictFormat) -> Result<PictureId>;

    /// Free a picture.
    fn free_picture(&mut self, picture: PictureId);

    /// Free a pixmap.
    fn free_pixmap(&mut self, pixmap: PixmapId);

    /// Create a graphics context for `drawable`.
    fn create_gc(&mut self, drawable: PixmapId) -> Result<GcId>;

    /// Free a graphics context.
    fn free_gc(&mut self, gc: GcId);

    /// Fill one rectangle of `dst` with `color`, using the operator `op`.
    fn render_rectangle(
        &mut self,
        dst: PictureId,
        op: Compose,
        color: XrColor,
        rect: IntRect,
    ) -> Result<()>;

    /// Fill a batch of rectangles of `dst` with `color`, using the operator `op`.
    fn render_rectangles(
        &mut self,
        dst: PictureId,
        op: Compose,
        color: XrColor,
        rects: &[IntRect],
    ) -> Result<()>;

    /// Composite `src` (optionally through `mask`) onto `dst`.
    fn render_composite(
        &mut self,
        op: Compose,
        src: PictureId,
        mask: Option<PictureId>,
        dst: PictureId,
        area: CompositeArea,
    ) -> Result<()>;

    /// Set the transform mapping destination space to the picture's space.
    fn set_picture_transform(&mut self, picture: PictureId, transform: Affine) -> Result<()>;

    /// Set how the picture is sampled outside of its bounds.
    fn set_picture_repeat(&mut self, picture: PictureId, repeat: Repeat) -> Result<()>;

    /// Set the sampling filter of the picture.
    fn set_filter(&mut self, picture: PictureId, filter: ImageQuality) -> Result<()>;

    /// Restrict drawing into `picture` to the union of `rects`, offset by the origin.
    fn set_clip_rectangles(
        &mut self,
        picture: PictureId,
        x_origin: i32,
        y_origin: i32,
        rects: &[IntRect],
    ) -> Result<()>;

    /// Switch `gc` to XOR drawing with the given pixel value.
    fn set_gc_xor(&mut self, gc: GcId, pixel: u32) -> Result<()>;

    /// Fill rectangles of `drawable` using `gc`.
    fn gc_rectangles(&mut self, drawable: PixmapId, gc: GcId, rects: &[IntRect]) -> Result<()>;

    /// Create a linear gradient picture between `p1` and `p2`.
    fn create_linear_gradient(
        &mut self,
        p1: Point,
        p2: Point,
        stops: &[GradientStop],
        repeat: Repeat,
    ) -> Result<PictureId>;

    /// Create a radial gradient picture between two concentric circles.
    fn create_radial_gradient(
        &mut self,
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        stops: &[GradientStop],
        repeat: Repeat,
    ) -> Result<PictureId>;
}

/// A drawing destination: a 32-bit pixmap with a picture and a graphics context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Destination {
    /// The pixmap holding the pixels.
    pub pixmap: PixmapId,
    /// The ARGB picture on top of the pixmap.
    pub picture: PictureId,
    /// The graphics context used for XOR fills.
    pub gc: GcId,
    /// The width in pixels.
    pub width: u16,
    /// The height in pixels.
    pub height: u16,
}

impl Destination {
    /// Allocate a new destination of the given size.
    pub fn create(backend: &mut impl Backend, width: u16, height: u16) -> Result<Self> {
        let pixmap = backend.create_pixmap(PixmapId::ROOT, 32, width, height)?;
        let picture = match backend.create_picture(pixmap, PictFormat::Argb32) {
            Ok(picture) => picture,
            Err(e) => {
                backend.free_pixmap(pixmap);
                return Err(e);
            }
        };
        let gc = match backend.create_gc(pixmap) {
            Ok(gc) => gc,
            Err(e) => {
                backend.free_picture(picture);
                backend.free_pixmap(pixmap);
                return Err(e);
            }
        };

        Ok(Self {
            pixmap,
            picture,
            gc,
            width,
            height,
        })
    }

    /// Free the resources of the destination.
    pub fn dispose(&self, backend: &mut impl Backend) {
        backend.free_gc(self.gc);
        backend.free_picture(self.picture);
        backend.free_pixmap(self.pixmap);
    }

    /// The bounds of the destination.
    pub fn bounds(&self) -> IntRect {
        IntRect::new(0, 0, i32::from(self.width), i32::from(self.height))
    }
}
