// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for how backend failures are reported.

mod util;

use util::{painted, pixel, recording_renderer, software_renderer};
use xrender::backend::{Call, PictFormat, PictureId, PixmapId, RecordingBackend, ResourceId};
use xrender::kurbo::{Affine, Point};
use xrender::peniko::color::palette::css::{BLUE, RED, WHITE};
use xrender::peniko::{Extend, ImageQuality};
use xrender::xrender_common::rect::IntRect;
use xrender::{
    Backend, Destination, Error, GradientStop, LinearGradient, Paint, RadialGradient,
    RenderSettings, Renderer, TexturePaint,
};

fn radial() -> Paint {
    Paint::Radial(RadialGradient {
        center: Point::new(10.0, 10.0),
        inner_radius: 0.0,
        outer_radius: 10.0,
        stops: vec![GradientStop::new(0.0, RED), GradientStop::new(1.0, BLUE)],
        extend: Extend::Pad,
        transform: Affine::IDENTITY,
    })
}

#[test]
fn mask_allocation_failure_is_reported() {
    let mut backend = RecordingBackend::new();
    let dst = Destination::create(&mut backend, 64, 64).unwrap();
    // The composite sources are allocated before the scratch mask.
    backend.fail_allocation(6);

    let err = Renderer::new(backend, dst, RenderSettings::default()).unwrap_err();

    assert!(matches!(
        err,
        Error::PixmapAllocation {
            width: 256,
            height: 256,
            depth: 8
        }
    ));
    assert_eq!(err.to_string(), "Couldn't allocate a 256x256 pixmap of depth 8");
}

#[test]
fn every_allocation_failure_is_reported() {
    // The two source cells, the gradient cache and the scratch mask.
    for n in 0..8 {
        let mut backend = RecordingBackend::new();
        let dst = Destination::create(&mut backend, 64, 64).unwrap();
        backend.fail_allocation(n);

        let result = Renderer::new(backend, dst, RenderSettings::default());
        assert!(result.is_err(), "allocation {n}");
    }

    let mut backend = RecordingBackend::new();
    let dst = Destination::create(&mut backend, 64, 64).unwrap();
    backend.fail_allocation(8);
    assert!(Renderer::new(backend, dst, RenderSettings::default()).is_ok());
}

#[test]
fn zero_mask_size_is_rejected() {
    let mut backend = RecordingBackend::new();
    let dst = Destination::create(&mut backend, 64, 64).unwrap();
    let settings = RenderSettings {
        mask_size: 0,
        ..Default::default()
    };

    let err = Renderer::new(backend, dst, settings).unwrap_err();

    assert!(matches!(err, Error::ZeroMaskSize));
}

#[test]
fn destination_failure_frees_partial_allocations() {
    let mut backend = RecordingBackend::new();
    backend.fail_allocation(2);

    let err = Destination::create(&mut backend, 64, 64).unwrap_err();

    assert!(matches!(err, Error::GcAllocation));
    let freed = backend
        .calls()
        .iter()
        .filter(|c| {
            matches!(c, Call::FreePicture(_) | Call::FreePixmap(_))
        })
        .count();
    assert_eq!(freed, 2);
}

#[test]
fn failed_gradient_keeps_the_previous_paint() {
    let mut renderer = recording_renderer(64, 64);
    renderer.set_color(WHITE);
    renderer.backend_mut().fail_allocation(0);

    let err = renderer.set_paint(radial()).unwrap_err();

    assert!(matches!(err, Error::GradientAllocation));
    assert!(!renderer.composite_manager().is_texture_paint_active());
    assert_eq!(renderer.composite_manager().color(), WHITE);
    renderer.fill_rect(0, 0, 4, 4).unwrap();

    // The next attempt succeeds.
    renderer.set_paint(radial()).unwrap();
    assert!(renderer.composite_manager().is_texture_paint_active());
}

#[test]
fn freed_texture_is_reported_and_the_queue_is_emptied() {
    let mut renderer = software_renderer(16, 16);
    let pixmap = renderer
        .backend_mut()
        .create_pixmap(PixmapId::ROOT, 32, 2, 2)
        .unwrap();
    let texture = renderer
        .backend_mut()
        .create_picture(pixmap, PictFormat::Argb32)
        .unwrap();
    renderer
        .set_paint(Paint::Texture(TexturePaint {
            picture: texture,
            transform: Affine::IDENTITY,
            filter: ImageQuality::Medium,
            repeat: Default::default(),
        }))
        .unwrap();
    renderer.backend_mut().free_picture(texture);

    let err = renderer
        .fill_spans([IntRect::new(0, 0, 4, 1), IntRect::new(0, 2, 4, 1)])
        .unwrap_err();

    assert!(matches!(
        err,
        Error::UnknownResource(ResourceId::Picture(p)) if p == texture
    ));
    assert!(renderer.mask_tiles().main_tile().rects().is_empty());
    assert!(painted(&renderer).is_empty());

    // The scratch mask was cleared, so the next draw only covers its own pixels.
    renderer.set_color(RED.with_alpha(0.5));
    renderer
        .fill_spans([IntRect::new(8, 8, 1, 1), IntRect::new(8, 10, 3, 1)])
        .unwrap();
    assert_eq!(painted(&renderer), vec![(8, 8), (8, 10), (9, 10), (10, 10)]);
}

#[test]
fn unknown_texture_is_rejected_by_set_paint() {
    let mut renderer = software_renderer(16, 16);
    let missing = PictureId(1000);

    let err = renderer
        .set_paint(Paint::Texture(TexturePaint {
            picture: missing,
            transform: Affine::IDENTITY,
            filter: ImageQuality::Low,
            repeat: Default::default(),
        }))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::UnknownResource(ResourceId::Picture(p)) if p == missing
    ));
    assert!(!renderer.composite_manager().is_texture_paint_active());
}

#[test]
fn rejected_texture_keeps_the_previous_gradient() {
    let mut renderer = software_renderer(16, 16);
    renderer
        .set_paint(Paint::Linear(LinearGradient {
            start: Point::new(0.0, 0.0),
            end: Point::new(16.0, 0.0),
            stops: vec![GradientStop::new(0.0, RED), GradientStop::new(1.0, BLUE)],
            extend: Extend::Pad,
            transform: Affine::IDENTITY,
        }))
        .unwrap();

    let err = renderer
        .set_paint(Paint::Texture(TexturePaint {
            picture: PictureId(1000),
            transform: Affine::IDENTITY,
            filter: ImageQuality::Low,
            repeat: Default::default(),
        }))
        .unwrap_err();

    assert!(matches!(err, Error::UnknownResource(_)));
    assert!(renderer.composite_manager().is_texture_paint_active());
    renderer.fill_rect(0, 0, 16, 1).unwrap();
    let left = pixel(&renderer, 0, 0);
    assert!(left.r > 200 && left.b < 50, "{left:?}");
}

#[test]
fn singular_paint_transform_falls_back_to_identity() {
    let mut renderer = recording_renderer(64, 64);

    renderer.set_transform(Affine::scale(0.0)).unwrap();
    renderer.set_paint(radial()).unwrap();

    assert!(renderer.backend().calls().iter().any(|c| matches!(
        c,
        Call::SetTransform { transform, .. } if *transform == Affine::IDENTITY
    )));
}
