// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A backend that records every request it receives.

use super::{Backend, CompositeArea, GcId, PictFormat, PictureId, PixmapId, Repeat, XrColor};
use crate::paint::GradientStop;
use crate::{Error, Result};
use peniko::kurbo::{Affine, Point};
use peniko::{Compose, ImageQuality};
use xrender_common::rect::IntRect;

/// A request received by a [`RecordingBackend`].
///
/// The fields mirror the arguments of the corresponding [`Backend`] method.
#[derive(Clone, Debug)]
pub enum Call {
    CreatePixmap {
        id: PixmapId,
        parent: PixmapId,
        depth: u8,
        width: u16,
        height: u16,
    },
    CreatePicture {
        id: PictureId,
        pixmap: PixmapId,
        format: PictFormat,
    },
    FreePicture(PictureId),
    FreePixmap(PixmapId),
    CreateGc {
        id: GcId,
        drawable: PixmapId,
    },
    FreeGc(GcId),
    RenderRectangle {
        dst: PictureId,
        op: Compose,
        color: XrColor,
        rect: IntRect,
    },
    RenderRectangles {
        dst: PictureId,
        op: Compose,
        color: XrColor,
        rects: Vec<IntRect>,
    },
    Composite {
        op: Compose,
        src: PictureId,
        mask: Option<PictureId>,
        dst: PictureId,
        area: CompositeArea,
    },
    SetTransform {
        picture: PictureId,
        transform: Affine,
    },
    SetRepeat {
        picture: PictureId,
        repeat: Repeat,
    },
    SetFilter {
        picture: PictureId,
        filter: ImageQuality,
    },
    SetClipRectangles {
        picture: PictureId,
        x_origin: i32,
        y_origin: i32,
        rects: Vec<IntRect>,
    },
    SetGcXor {
        gc: GcId,
        pixel: u32,
    },
    GcRectangles {
        drawable: PixmapId,
        gc: GcId,
        rects: Vec<IntRect>,
    },
    CreateLinearGradient {
        id: PictureId,
        p1: Point,
        p2: Point,
        stops: Vec<GradientStop>,
        repeat: Repeat,
    },
    CreateRadialGradient {
        id: PictureId,
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        stops: Vec<GradientStop>,
        repeat: Repeat,
    },
}

impl Call {
    /// Whether this call draws pixels.
    pub fn is_drawing(&self) -> bool {
        matches!(
            self,
            Self::RenderRectangle { .. }
                | Self::RenderRectangles { .. }
                | Self::Composite { .. }
                | Self::GcRectangles { .. }
        )
    }
}

/// A backend that performs no rendering and records every request instead.
///
/// Resource ids are handed out sequentially, starting at 1. Allocations can be made to fail
/// with [`fail_allocation`](Self::fail_allocation).
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    next_id: u32,
    allocations: usize,
    fail_at: Option<usize>,
}

impl RecordingBackend {
    /// Create a new, empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// The calls received so far.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Take the calls received so far, leaving the log empty.
    pub fn take_calls(&mut self) -> Vec<Call> {
        core::mem::take(&mut self.calls)
    }

    /// Clear the call log.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Make the `n`th allocation from now on fail, counting from zero.
    pub fn fail_allocation(&mut self, n: usize) {
        self.fail_at = Some(self.allocations + n);
    }

    fn allocate(&mut self) -> Option<u32> {
        let index = self.allocations;
        self.allocations += 1;
        if self.fail_at == Some(index) {
            self.fail_at = None;
            return None;
        }
        self.next_id += 1;
        Some(self.next_id)
    }
}

impl Backend for RecordingBackend {
    fn create_pixmap(
        &mut self,
        parent: PixmapId,
        depth: u8,
        width: u16,
        height: u16,
    ) -> Result<PixmapId> {
        let id = PixmapId(self.allocate().ok_or(Error::PixmapAllocation {
            width,
            height,
            depth,
        })?);
        self.calls.push(Call::CreatePixmap {
            id,
            parent,
            depth,
            width,
            height,
        });
        Ok(id)
    }

    fn create_picture(&mut self, pixmap: PixmapId, format: PictFormat) -> Result<PictureId> {
        let id = PictureId(self.allocate().ok_or(Error::PictureAllocation)?);
        self.calls.push(Call::CreatePicture { id, pixmap, format });
        Ok(id)
    }

    fn free_picture(&mut self, picture: PictureId) {
        self.calls.push(Call::FreePicture(picture));
    }

    fn free_pixmap(&mut self, pixmap: PixmapId) {
        self.calls.push(Call::FreePixmap(pixmap));
    }

    fn create_gc(&mut self, drawable: PixmapId) -> Result<GcId> {
        let id = GcId(self.allocate().ok_or(Error::GcAllocation)?);
        self.calls.push(Call::CreateGc { id, drawable });
        Ok(id)
    }

    fn free_gc(&mut self, gc: GcId) {
        self.calls.push(Call::FreeGc(gc));
    }

    fn render_rectangle(
        &mut self,
        dst: PictureId,
        op: Compose,
        color: XrColor,
        rect: IntRect,
    ) -> Result<()> {
        self.calls.push(Call::RenderRectangle {
            dst,
            op,
            color,
            rect,
        });
        Ok(())
    }

    fn render_rectangles(
        &mut self,
        dst: PictureId,
        op: Compose,
        color: XrColor,
        rects: &[IntRect],
    ) -> Result<()> {
        self.calls.push(Call::RenderRectangles {
            dst,
            op,
            color,
            rects: rects.to_vec(),
        });
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
        self.calls.push(Call::Composite {
            op,
            src,
            mask,
            dst,
            area,
        });
        Ok(())
    }

    fn set_picture_transform(&mut self, picture: PictureId, transform: Affine) -> Result<()> {
        self.calls.push(Call::SetTransform { picture, transform });
        Ok(())
    }

    fn set_picture_repeat(&mut self, picture: PictureId, repeat: Repeat) -> Result<()> {
        self.calls.push(Call::SetRepeat { picture, repeat });
        Ok(())
    }

    fn set_filter(&mut self, picture: PictureId, filter: ImageQuality) -> Result<()> {
        self.calls.push(Call::SetFilter { picture, filter });
        Ok(())
    }

    fn set_clip_rectangles(
        &mut self,
        picture: PictureId,
        x_origin: i32,
        y_origin: i32,
        rects: &[IntRect],
    ) -> Result<()> {
        self.calls.push(Call::SetClipRectangles {
            picture,
            x_origin,
            y_origin,
            rects: rects.to_vec(),
        });
        Ok(())
    }

    fn set_gc_xor(&mut self, gc: GcId, pixel: u32) -> Result<()> {
        self.calls.push(Call::SetGcXor { gc, pixel });
        Ok(())
    }

    fn gc_rectangles(&mut self, drawable: PixmapId, gc: GcId, rects: &[IntRect]) -> Result<()> {
        self.calls.push(Call::GcRectangles {
            drawable,
            gc,
            rects: rects.to_vec(),
        });
        Ok(())
    }

    fn create_linear_gradient(
        &mut self,
        p1: Point,
        p2: Point,
        stops: &[GradientStop],
        repeat: Repeat,
    ) -> Result<PictureId> {
        let id = PictureId(self.allocate().ok_or(Error::GradientAllocation)?);
        self.calls.push(Call::CreateLinearGradient {
            id,
            p1,
            p2,
            stops: stops.to_vec(),
            repeat,
        });
        Ok(id)
    }

    fn create_radial_gradient(
        &mut self,
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        stops: &[GradientStop],
        repeat: Repeat,
    ) -> Result<PictureId> {
        let id = PictureId(self.allocate().ok_or(Error::GradientAllocation)?);
        self.calls.push(Call::CreateRadialGradient {
            id,
            center,
            inner_radius,
            outer_radius,
            stops: stops.to_vec(),
            repeat,
        });
        Ok(id)
    }
}
