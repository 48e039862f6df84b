// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility functions shared across different tests.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use xrender::backend::{Call, RecordingBackend, SoftwareBackend};
use xrender::peniko::color::PremulRgba8;
use xrender::{Destination, RenderSettings, Renderer};

pub(crate) fn recording_renderer(width: u16, height: u16) -> Renderer<RecordingBackend> {
    let mut backend = RecordingBackend::new();
    let dst = Destination::create(&mut backend, width, height).unwrap();
    let mut renderer = Renderer::new(backend, dst, RenderSettings::default()).unwrap();
    renderer.backend_mut().clear();
    renderer
}

pub(crate) fn software_renderer(width: u16, height: u16) -> Renderer<SoftwareBackend> {
    let mut backend = SoftwareBackend::new();
    let dst = Destination::create(&mut backend, width, height).unwrap();
    Renderer::new(backend, dst, RenderSettings::default()).unwrap()
}

/// The destination pixel at `(x, y)`.
pub(crate) fn pixel(renderer: &Renderer<SoftwareBackend>, x: i32, y: i32) -> PremulRgba8 {
    let dst = renderer.destination();
    renderer.backend().pixel(dst.pixmap, x, y).unwrap()
}

/// The coordinates of all destination pixels that are not fully transparent.
pub(crate) fn painted(renderer: &Renderer<SoftwareBackend>) -> Vec<(i32, i32)> {
    let dst = renderer.destination();
    let mut painted = Vec::new();
    for y in 0..i32::from(dst.height) {
        for x in 0..i32::from(dst.width) {
            if pixel(renderer, x, y).a != 0 {
                painted.push((x, y));
            }
        }
    }
    painted
}

/// The calls that draw pixels.
pub(crate) fn drawing_calls(renderer: &Renderer<RecordingBackend>) -> Vec<Call> {
    renderer
        .backend()
        .calls()
        .iter()
        .filter(|c| c.is_drawing())
        .cloned()
        .collect()
}

/// The composite requests.
pub(crate) fn composites(renderer: &Renderer<RecordingBackend>) -> Vec<Call> {
    renderer
        .backend()
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Composite { .. }))
        .cloned()
        .collect()
}
