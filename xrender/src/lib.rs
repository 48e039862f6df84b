// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate batches the rectangle geometry of 2D drawing operations into alpha masks and
//! composites them through an XRender-style drawing [`Backend`].
//!
//! Shapes are rasterized into pixel-aligned rectangles (see [`xrender_common`]), which are
//! queued in the main tile of a [`MaskTileManager`]. On flush, the queued rectangles are either
//! sent to the backend directly, rendered into a single scratch mask, or split into a grid of
//! mask-sized tiles that are composited one after another. Only the dirty part of the scratch
//! mask is cleared after each composite, so the mask can be reused without reallocation.
//!
//! The [`Renderer`] offers the usual drawing verbs on top of this machinery:
//!
//! ```
//! use xrender::backend::RecordingBackend;
//! use xrender::peniko::color::palette;
//! use xrender::{Destination, RenderSettings, Renderer};
//!
//! # fn main() -> Result<(), xrender::Error> {
//! let mut backend = RecordingBackend::new();
//! let dst = Destination::create(&mut backend, 640, 480)?;
//! let mut renderer = Renderer::new(backend, dst, RenderSettings::default())?;
//!
//! renderer.set_color(palette::css::REBECCA_PURPLE.with_alpha(0.5));
//! renderer.fill_rect(10, 10, 300, 300)?;
//! renderer.draw_line(0, 0, 639, 479)?;
//! # Ok(())
//! # }
//! ```
//!
//! Two backends are included: [`SoftwareBackend`](backend::SoftwareBackend), an in-memory
//! reference rasterizer, and [`RecordingBackend`](backend::RecordingBackend), which logs every
//! call it receives.

// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
#![forbid(unsafe_code)]

pub mod backend;
mod composite;
mod mask_tile;
mod paint;
mod renderer;
mod spans;

pub use composite::{Composite, CompositeManager};
pub use mask_tile::{MaskTile, MaskTileManager};
pub use paint::{GradientStop, LinearGradient, Paint, RadialGradient, TexturePaint};
pub use renderer::Renderer;
pub use spans::ShapeSpans;

pub use backend::{Backend, Destination};
pub use peniko;
pub use peniko::kurbo;
pub use xrender_common;

use backend::ResourceId;
use thiserror::Error;

/// Errors that can occur in the compositor.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The backend could not allocate a pixmap.
    #[error("Couldn't allocate a {width}x{height} pixmap of depth {depth}")]
    PixmapAllocation {
        /// The requested width.
        width: u16,
        /// The requested height.
        height: u16,
        /// The requested depth in bits.
        depth: u8,
    },
    /// The backend could not create a picture.
    #[error("Couldn't create a picture")]
    PictureAllocation,
    /// The backend could not create a graphics context.
    #[error("Couldn't create a graphics context")]
    GcAllocation,
    /// The backend could not create a gradient picture.
    #[error("Couldn't create a gradient picture")]
    GradientAllocation,
    /// The mask size in the [`RenderSettings`] was zero.
    #[error("The mask size must be at least 1")]
    ZeroMaskSize,
    /// A resource was used that the backend does not know about.
    ///
    /// This usually means it was freed before its last usage.
    #[error("Unknown backend resource {0:?}")]
    UnknownResource(ResourceId),
}

pub(crate) type Result<T, E = Error> = core::result::Result<T, E>;

/// Options which are set at construction time, used in [`Renderer::new`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    /// The width and height of the scratch alpha mask, and thus of one grid tile.
    ///
    /// Must not be zero.
    pub mask_size: u16,
    /// Whether gradient paints are pre-rendered into a cache picture before compositing.
    pub gradient_cache: bool,
    /// The flattening tolerance for curves, in device pixels.
    pub tolerance: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mask_size: 256,
            gradient_cache: true,
            tolerance: 0.1,
        }
    }
}
