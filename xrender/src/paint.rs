// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint descriptions.

use crate::backend::{PictureId, Repeat};
use peniko::kurbo::{Affine, Point};
use peniko::{Color, Extend, ImageQuality};

/// A color stop of a gradient.
#[derive(Clone, Copy, Debug)]
pub struct GradientStop {
    /// The position of the stop, in `[0, 1]`.
    pub offset: f32,
    /// The color at the stop.
    pub color: Color,
}

impl GradientStop {
    /// Create a new stop.
    pub fn new(offset: f32, color: Color) -> Self {
        Self { offset, color }
    }
}

/// A linear gradient between two points.
#[derive(Clone, Debug)]
pub struct LinearGradient {
    /// The start point, where the offset is 0.
    pub start: Point,
    /// The end point, where the offset is 1.
    pub end: Point,
    /// The color stops, sorted by offset.
    pub stops: Vec<GradientStop>,
    /// How the gradient continues outside of `[0, 1]`.
    pub extend: Extend,
    /// The gradient's own transform, applied before the user transform.
    pub transform: Affine,
}

/// A radial gradient between two concentric circles.
#[derive(Clone, Debug)]
pub struct RadialGradient {
    /// The center of both circles.
    pub center: Point,
    /// The radius where the offset is 0.
    pub inner_radius: f64,
    /// The radius where the offset is 1.
    pub outer_radius: f64,
    /// The color stops, sorted by offset.
    pub stops: Vec<GradientStop>,
    /// How the gradient continues outside of `[0, 1]`.
    pub extend: Extend,
    /// The gradient's own transform, applied before the user transform.
    pub transform: Affine,
}

/// An image paint backed by an existing picture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexturePaint {
    /// The picture to sample from. It stays owned by the caller.
    pub picture: PictureId,
    /// Maps texture space to user space.
    pub transform: Affine,
    /// The sampling filter.
    pub filter: ImageQuality,
    /// How the texture is sampled outside of its bounds.
    pub repeat: Repeat,
}

/// The paint used to fill and stroke shapes.
#[derive(Clone, Debug)]
pub enum Paint {
    /// A solid color.
    Solid(Color),
    /// An image.
    Texture(TexturePaint),
    /// A linear gradient.
    Linear(LinearGradient),
    /// A radial gradient.
    Radial(RadialGradient),
}

impl Paint {
    /// Whether this is a solid color.
    pub fn is_solid(&self) -> bool {
        matches!(self, Self::Solid(_))
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Self::Solid(color)
    }
}

impl From<LinearGradient> for Paint {
    fn from(gradient: LinearGradient) -> Self {
        Self::Linear(gradient)
    }
}

impl From<RadialGradient> for Paint {
    fn from(gradient: RadialGradient) -> Self {
        Self::Radial(gradient)
    }
}

impl From<TexturePaint> for Paint {
    fn from(texture: TexturePaint) -> Self {
        Self::Texture(texture)
    }
}
