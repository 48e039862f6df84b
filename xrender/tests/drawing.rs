// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel-level tests of the drawing verbs, rendered with the software backend.

mod util;

use util::{painted, pixel, software_renderer};
use xrender::backend::{CompositeArea, PictFormat, PixmapId, Repeat};
use xrender::kurbo::{Affine, Point, Stroke};
use xrender::peniko::color::palette::css::{BLUE, LIME, RED, WHITE};
use xrender::peniko::color::PremulRgba8;
use xrender::peniko::{Compose, Extend, Fill, ImageQuality};
use xrender::xrender_common::rect::IntRect;
use xrender::{Backend, Composite, GradientStop, LinearGradient, Paint, TexturePaint};

#[test]
fn fill_rect_covers_exactly_its_pixels() {
    let mut renderer = software_renderer(20, 20);
    renderer.set_color(RED);

    renderer.fill_rect(2, 3, 4, 5).unwrap();

    let painted = painted(&renderer);
    assert_eq!(painted.len(), 20);
    assert!(painted
        .iter()
        .all(|&(x, y)| (2..6).contains(&x) && (3..8).contains(&y)));
    assert_eq!(pixel(&renderer, 2, 3), PremulRgba8::from_u32(0xff00_00ff));
}

#[test]
fn tiled_fill_covers_every_pixel_once() {
    let mut renderer = software_renderer(600, 300);
    renderer.set_color(RED.with_alpha(0.5));

    renderer
        .fill_spans([
            IntRect::new(0, 0, 300, 50),
            IntRect::new(0, 200, 300, 50),
            IntRect::new(250, 250, 300, 40),
        ])
        .unwrap();
    assert_eq!(renderer.mask_tiles().x_tiles(), 3);
    assert_eq!(renderer.mask_tiles().y_tiles(), 2);

    let expected = 300 * 50 * 2 + 300 * 40;
    let painted = painted(&renderer);
    assert_eq!(painted.len(), expected);
    for (x, y) in painted {
        // Painting a pixel twice would make it more opaque.
        assert_eq!(pixel(&renderer, x, y).a, 128, "pixel ({x}, {y})");
    }
}

#[test]
fn fill_spans_with_far_edges_are_clamped() {
    let mut renderer = software_renderer(20, 20);
    renderer.set_color(RED);

    renderer
        .fill_spans([
            IntRect::new(i32::MAX - 2, 0, 10, 1),
            IntRect::new(-5, 3, i32::MAX, 1),
        ])
        .unwrap();

    let painted = painted(&renderer);
    assert_eq!(painted.len(), 20);
    assert!(painted.iter().all(|&(_, y)| y == 3));
}

#[test]
fn clip_reaching_past_i32_is_clamped() {
    let mut renderer = software_renderer(20, 20);
    renderer.set_color(RED);

    renderer
        .set_clip(Some(IntRect::new(5, 5, i32::MAX, i32::MAX)))
        .unwrap();
    renderer.fill_rect(0, 0, 20, 20).unwrap();

    let painted = painted(&renderer);
    assert_eq!(painted.len(), 15 * 15);
    assert_eq!(painted[0], (5, 5));
}

#[test]
fn draw_line_plots_both_endpoints() {
    let mut renderer = software_renderer(10, 10);
    renderer.set_color(WHITE);

    renderer.draw_line(0, 0, 3, 3).unwrap();

    assert_eq!(painted(&renderer), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
}

#[test]
fn draw_rect_outlines_one_extra_pixel() {
    let mut renderer = software_renderer(20, 20);
    renderer.set_color(WHITE);

    renderer.draw_rect(2, 2, 5, 5).unwrap();

    let painted = painted(&renderer);
    // The outline of a 6×6 square.
    assert_eq!(painted.len(), 20);
    assert!(painted.contains(&(7, 7)));
    assert!(!painted.contains(&(4, 4)));
}

#[test]
fn clip_restricts_every_verb() {
    let mut renderer = software_renderer(100, 100);
    renderer.set_color(WHITE);
    renderer.set_clip(Some(IntRect::new(10, 10, 20, 20))).unwrap();

    renderer.fill_rect(0, 0, 100, 100).unwrap();
    assert_eq!(painted(&renderer).len(), 400);

    renderer.set_color(RED.with_alpha(0.5));
    renderer.draw_line(0, 50, 99, 0).unwrap();
    renderer.fill_oval(IntRect::new(0, 0, 50, 50)).unwrap();
    assert!(painted(&renderer)
        .iter()
        .all(|&(x, y)| (10..30).contains(&x) && (10..30).contains(&y)));

    renderer.set_clip(None).unwrap();
    renderer.fill_rect(90, 90, 5, 5).unwrap();
    assert_eq!(painted(&renderer).len(), 425);
}

#[test]
fn translation_offsets_integer_verbs() {
    let mut renderer = software_renderer(20, 20);
    renderer.set_color(WHITE);
    renderer.set_transform(Affine::translate((5.0, 6.0))).unwrap();

    renderer.fill_rect(0, 0, 2, 2).unwrap();

    assert_eq!(painted(&renderer), vec![(5, 6), (6, 6), (5, 7), (6, 7)]);
}

#[test]
fn scaled_fill_rect_goes_through_paths() {
    let mut renderer = software_renderer(20, 20);
    renderer.set_color(WHITE);
    renderer.set_transform(Affine::scale(2.0)).unwrap();

    renderer.fill_rect(1, 1, 3, 2).unwrap();

    let painted = painted(&renderer);
    assert_eq!(painted.len(), 24);
    assert_eq!(painted.first(), Some(&(2, 2)));
    assert_eq!(painted.last(), Some(&(7, 5)));
}

#[test]
fn wide_strokes_are_filled_outlines() {
    let mut renderer = software_renderer(60, 40);
    renderer.set_color(WHITE);
    renderer.set_stroke(Stroke::new(4.0));

    renderer.draw_line(10, 20, 50, 20).unwrap();

    for y in 18..22 {
        assert_eq!(pixel(&renderer, 30, y).a, 255, "row {y}");
    }
    assert_eq!(pixel(&renderer, 30, 17).a, 0);
    assert_eq!(pixel(&renderer, 30, 22).a, 0);
}

#[test]
fn dashed_hairlines_leave_gaps() {
    let mut renderer = software_renderer(40, 10);
    renderer.set_color(WHITE);
    renderer.set_stroke(Stroke::new(1.0).with_dashes(0.0, [5.0, 5.0]));

    renderer.draw_line(0, 5, 39, 5).unwrap();

    assert_eq!(pixel(&renderer, 2, 5).a, 255);
    assert_eq!(pixel(&renderer, 7, 5).a, 0);
    assert_eq!(pixel(&renderer, 12, 5).a, 255);
}

#[test]
fn polygons_use_the_fill_rule() {
    // A pentagram, whose center is only covered with the non-zero rule.
    let star = [(50, 0), (79, 90), (2, 35), (98, 35), (21, 90)];
    let mut renderer = software_renderer(100, 100);
    renderer.set_color(WHITE);

    renderer.fill_polygon(&star).unwrap();
    assert_eq!(pixel(&renderer, 50, 50).a, 255);

    let mut renderer = software_renderer(100, 100);
    renderer.set_color(WHITE);
    renderer.set_fill_rule(Fill::EvenOdd);
    renderer.fill_polygon(&star).unwrap();
    assert_eq!(pixel(&renderer, 50, 50).a, 0);
    assert_eq!(pixel(&renderer, 50, 10).a, 255);
}

#[test]
fn draw_polygon_closes_the_outline() {
    let mut renderer = software_renderer(20, 20);
    renderer.set_color(WHITE);

    renderer.draw_polyline(&[(2, 2), (12, 2), (12, 12)]).unwrap();
    assert_eq!(pixel(&renderer, 7, 7).a, 0);

    renderer.draw_polygon(&[(2, 2), (12, 2), (12, 12)]).unwrap();
    assert_eq!(pixel(&renderer, 7, 7).a, 255);
}

#[test]
fn fill_arc_is_a_pie_wedge() {
    let mut renderer = software_renderer(40, 40);
    renderer.set_color(WHITE);

    renderer.fill_arc(IntRect::new(0, 0, 40, 40), 0.0, 90.0).unwrap();

    // The quarter above and to the right of the center.
    assert_eq!(pixel(&renderer, 30, 10).a, 255);
    assert_eq!(pixel(&renderer, 10, 10).a, 0);
    assert_eq!(pixel(&renderer, 10, 30).a, 0);
    assert_eq!(pixel(&renderer, 30, 30).a, 0);
}

#[test]
fn rounded_rects_and_ovals_cut_corners() {
    let mut renderer = software_renderer(40, 40);
    renderer.set_color(WHITE);

    renderer
        .fill_round_rect(IntRect::new(0, 0, 40, 20), 16, 16)
        .unwrap();
    renderer.fill_oval(IntRect::new(0, 20, 40, 20)).unwrap();

    assert_eq!(pixel(&renderer, 0, 0).a, 0);
    assert_eq!(pixel(&renderer, 20, 1).a, 255);
    assert_eq!(pixel(&renderer, 0, 21).a, 0);
    assert_eq!(pixel(&renderer, 20, 30).a, 255);

    let mut renderer = software_renderer(40, 40);
    renderer.set_color(WHITE);
    renderer.draw_oval(IntRect::new(0, 0, 39, 39)).unwrap();
    renderer.draw_round_rect(IntRect::new(5, 5, 29, 29), 8, 8).unwrap();
    assert_eq!(pixel(&renderer, 20, 20).a, 0);
    assert_eq!(pixel(&renderer, 20, 5).a, 255);
}

#[test]
fn xor_twice_restores_the_destination() {
    let mut renderer = software_renderer(10, 10);
    renderer.set_color(LIME);
    renderer.fill_rect(0, 0, 10, 10).unwrap();
    let before = pixel(&renderer, 3, 3);

    renderer.set_color(RED);
    renderer
        .set_composite(Composite::Xor { xor_color: BLUE })
        .unwrap();
    renderer.fill_rect(2, 2, 4, 4).unwrap();
    assert_ne!(pixel(&renderer, 3, 3), before);
    renderer.fill_rect(2, 2, 4, 4).unwrap();

    assert_eq!(pixel(&renderer, 3, 3), before);
}

#[test]
fn extra_alpha_is_applied_once() {
    let mut renderer = software_renderer(10, 10);
    renderer.set_color(WHITE);
    renderer
        .set_composite(Composite::Alpha {
            op: Compose::SrcOver,
            extra_alpha: 0.5,
        })
        .unwrap();

    renderer.fill_rect(0, 0, 2, 2).unwrap();
    renderer
        .fill_spans([IntRect::new(5, 0, 2, 1), IntRect::new(5, 2, 2, 1)])
        .unwrap();

    assert_eq!(pixel(&renderer, 0, 0).a, 128);
    assert_eq!(pixel(&renderer, 5, 0).a, 128);
    assert_eq!(pixel(&renderer, 5, 1).a, 0);
}

#[test]
fn linear_gradient_spans_the_fill() {
    let mut renderer = software_renderer(300, 4);
    renderer
        .set_paint(Paint::Linear(LinearGradient {
            start: Point::new(0.0, 0.0),
            end: Point::new(300.0, 0.0),
            stops: vec![GradientStop::new(0.0, RED), GradientStop::new(1.0, BLUE)],
            extend: Extend::Pad,
            transform: Affine::IDENTITY,
        }))
        .unwrap();

    // Wider than the gradient cache, so it is rendered in two chunks.
    renderer.fill_rect(0, 0, 300, 4).unwrap();

    let left = pixel(&renderer, 0, 2);
    let right = pixel(&renderer, 299, 2);
    assert!(left.r > 250 && left.b < 5, "{left:?}");
    assert!(right.b > 250 && right.r < 5, "{right:?}");
    let middle = pixel(&renderer, 150, 2);
    assert!(middle.r.abs_diff(middle.b) < 4, "{middle:?}");
    assert_eq!(painted(&renderer).len(), 1200);
}

#[test]
fn draw_rect_with_maximal_width_is_clamped() {
    let mut renderer = software_renderer(20, 20);
    renderer.set_color(WHITE);

    renderer.draw_rect(2, 2, i32::MAX, 5).unwrap();

    let painted = painted(&renderer);
    // Both horizontal edges run to the right border; the right edge is off-screen.
    assert_eq!(painted.len(), 18 + 18 + 4);
    assert!(painted.contains(&(19, 2)));
    assert!(painted.contains(&(19, 7)));
    assert!(painted.contains(&(2, 5)));
    assert!(!painted.contains(&(3, 5)));
}

#[test]
fn blit_applies_extra_alpha_and_offsets() {
    let mut renderer = software_renderer(10, 10);
    let pixmap = renderer
        .backend_mut()
        .create_pixmap(PixmapId::ROOT, 32, 4, 4)
        .unwrap();
    let texture = renderer
        .backend_mut()
        .create_picture(pixmap, PictFormat::Argb32)
        .unwrap();
    renderer
        .backend_mut()
        .put_pixel(pixmap, 1, 1, PremulRgba8::from_u32(0xff00_00ff))
        .unwrap();
    renderer
        .set_composite(Composite::Alpha {
            op: Compose::SrcOver,
            extra_alpha: 0.5,
        })
        .unwrap();

    renderer
        .blit(
            texture,
            CompositeArea {
                src_x: 1,
                src_y: 1,
                mask_x: 0,
                mask_y: 0,
                dst_x: 5,
                dst_y: 6,
                width: 2,
                height: 2,
            },
        )
        .unwrap();

    assert_eq!(
        pixel(&renderer, 5, 6),
        PremulRgba8 {
            r: 128,
            g: 0,
            b: 0,
            a: 128
        }
    );
    assert_eq!(painted(&renderer), vec![(5, 6)]);
}

#[test]
fn texture_paint_repeats() {
    let mut renderer = software_renderer(8, 8);
    let pixmap = renderer
        .backend_mut()
        .create_pixmap(PixmapId::ROOT, 32, 2, 2)
        .unwrap();
    let texture = renderer
        .backend_mut()
        .create_picture(pixmap, PictFormat::Argb32)
        .unwrap();
    let red = PremulRgba8::from_u32(0xff00_00ff);
    renderer
        .backend_mut()
        .put_pixel(pixmap, 0, 0, red)
        .unwrap();
    renderer
        .set_paint(Paint::Texture(TexturePaint {
            picture: texture,
            transform: Affine::IDENTITY,
            filter: ImageQuality::Low,
            repeat: Repeat::Normal,
        }))
        .unwrap();

    renderer.fill_rect(0, 0, 8, 8).unwrap();

    assert_eq!(pixel(&renderer, 0, 0), red);
    assert_eq!(pixel(&renderer, 2, 4), red);
    assert_eq!(pixel(&renderer, 1, 0).a, 0);
    assert_eq!(painted(&renderer).len(), 16);
}

#[test]
fn dispose_releases_renderer_resources() {
    let mut renderer = software_renderer(10, 10);
    renderer.dispose();

    let dst = *renderer.destination();
    let mut backend = renderer.into_backend();
    // Only the destination pixmap, picture and GC are left.
    assert_eq!(backend.resource_count(), 3);
    dst.dispose(&mut backend);
    assert_eq!(backend.resource_count(), 0);
}
