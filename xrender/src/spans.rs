// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scan conversion of filled paths into span rectangles.

use log::warn;
use peniko::kurbo::{self, PathEl, Point};
use peniko::Fill;
use smallvec::SmallVec;
use xrender_common::rect::{ClipBox, IntRect};

/// A non-horizontal path segment, oriented downward.
#[derive(Clone, Copy, Debug)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    /// `1` if the segment originally pointed downward, `-1` otherwise.
    winding: i32,
}

#[derive(Clone, Copy, Debug)]
struct Crossing {
    x: f64,
    winding: i32,
}

/// An iterator over the one-pixel-high spans covered by a filled path.
///
/// A pixel is covered if its center lies inside the path according to the fill rule. Spans
/// are produced top to bottom, and left to right within a row, clipped to the clip box.
#[derive(Clone, Debug)]
pub struct ShapeSpans {
    edges: Vec<Edge>,
    fill: Fill,
    clip: ClipBox,
    y: i32,
    y_end: i32,
    crossings: SmallVec<[Crossing; 16]>,
    row: SmallVec<[IntRect; 4]>,
    row_pos: usize,
}

impl ShapeSpans {
    /// Flatten `path` with the given tolerance and prepare it for scan conversion.
    ///
    /// Open subpaths are closed implicitly. A path containing NaN produces no spans.
    pub fn new(
        path: impl IntoIterator<Item = PathEl>,
        fill: Fill,
        clip: ClipBox,
        tolerance: f64,
    ) -> Self {
        let mut edges = Vec::new();
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;
        let mut is_nan = false;

        kurbo::flatten(path, tolerance, |el| match el {
            PathEl::MoveTo(p) => {
                push_edge(&mut edges, last, start);
                is_nan |= p.is_nan();
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                is_nan |= p.is_nan();
                push_edge(&mut edges, last, p);
                last = p;
            }
            PathEl::ClosePath => {
                push_edge(&mut edges, last, start);
                last = start;
            }
            // Flattening only produces lines.
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        });
        push_edge(&mut edges, last, start);

        // A path that contains NaN is ill-defined, so ignore it.
        if is_nan {
            warn!("A path contains NaN, ignoring it.");
            edges.clear();
        }

        let (y, y_end) = if edges.is_empty() {
            (0, 0)
        } else {
            let top = edges.iter().map(|e| e.y0).fold(f64::INFINITY, f64::min);
            let bottom = edges.iter().map(|e| e.y1).fold(f64::NEG_INFINITY, f64::max);
            (
                (top.floor() as i32).max(clip.lo_y),
                (bottom.ceil() as i32).min(clip.hi_y),
            )
        };

        Self {
            edges,
            fill,
            clip,
            y,
            y_end,
            crossings: SmallVec::new(),
            row: SmallVec::new(),
            row_pos: 0,
        }
    }

    fn is_inside(&self, winding: i32) -> bool {
        match self.fill {
            Fill::NonZero => winding != 0,
            Fill::EvenOdd => winding % 2 != 0,
        }
    }

    /// Compute the spans of row `y`.
    fn scan_row(&mut self, y: i32) {
        let center = f64::from(y) + 0.5;

        self.crossings.clear();
        for e in &self.edges {
            if e.y0 <= center && center < e.y1 {
                let x = e.x0 + (center - e.y0) * (e.x1 - e.x0) / (e.y1 - e.y0);
                self.crossings.push(Crossing {
                    x,
                    winding: e.winding,
                });
            }
        }
        self.crossings.sort_unstable_by(|a, b| a.x.total_cmp(&b.x));

        self.row.clear();
        self.row_pos = 0;
        let mut winding = 0;
        let mut span_start = 0.0;
        for i in 0..self.crossings.len() {
            let crossing = self.crossings[i];
            let was_inside = self.is_inside(winding);
            winding += crossing.winding;
            let inside = self.is_inside(winding);

            if !was_inside && inside {
                span_start = crossing.x;
            } else if was_inside && !inside {
                self.push_span(span_start, crossing.x, y);
            }
        }
    }

    /// Queue the pixels whose centers lie in `[x0, x1)`.
    fn push_span(&mut self, x0: f64, x1: f64, y: i32) {
        let start = ((x0 - 0.5).ceil() as i32).max(self.clip.lo_x);
        let end = ((x1 - 0.5).ceil() as i32).min(self.clip.hi_x);
        if end <= start {
            return;
        }

        match self.row.last_mut() {
            Some(last) if last.x2() == start => last.width = end - last.x,
            _ => self.row.push(IntRect::new(start, y, end - start, 1)),
        }
    }
}

impl Iterator for ShapeSpans {
    type Item = IntRect;

    fn next(&mut self) -> Option<IntRect> {
        loop {
            if let Some(&span) = self.row.get(self.row_pos) {
                self.row_pos += 1;
                return Some(span);
            }
            if self.y >= self.y_end {
                return None;
            }
            self.scan_row(self.y);
            self.y += 1;
        }
    }
}

fn push_edge(edges: &mut Vec<Edge>, p0: Point, p1: Point) {
    if p0.y == p1.y {
        return;
    }
    let (top, bottom, winding) = if p0.y < p1.y {
        (p0, p1, 1)
    } else {
        (p1, p0, -1)
    };
    edges.push(Edge {
        x0: top.x,
        y0: top.y,
        x1: bottom.x,
        y1: bottom.y,
        winding,
    });
}

#[cfg(test)]
mod tests {
    use super::ShapeSpans;
    use peniko::kurbo::{BezPath, Ellipse, Rect, Shape};
    use peniko::Fill;
    use xrender_common::rect::{ClipBox, IntRect};

    const CLIP: ClipBox = ClipBox::new(0, 0, 100, 100);

    fn spans(path: &BezPath, fill: Fill, clip: ClipBox) -> Vec<IntRect> {
        ShapeSpans::new(path.iter(), fill, clip, 0.1).collect()
    }

    #[test]
    fn rect_gives_one_span_per_row() {
        let path = Rect::new(2.0, 1.0, 12.0, 4.0).to_path(0.1);

        assert_eq!(
            spans(&path, Fill::NonZero, CLIP),
            vec![
                IntRect::new(2, 1, 10, 1),
                IntRect::new(2, 2, 10, 1),
                IntRect::new(2, 3, 10, 1),
            ]
        );
    }

    #[test]
    fn fill_rules_differ_on_holes() {
        let mut path = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
        path.extend(Rect::new(3.0, 3.0, 7.0, 7.0).path_elements(0.1));

        let nonzero = spans(&path, Fill::NonZero, CLIP);
        let evenodd = spans(&path, Fill::EvenOdd, CLIP);

        assert!(nonzero.contains(&IntRect::new(0, 5, 10, 1)));
        assert!(evenodd.contains(&IntRect::new(0, 5, 3, 1)));
        assert!(evenodd.contains(&IntRect::new(7, 5, 3, 1)));
        assert_eq!(nonzero.len(), 10);
        assert_eq!(evenodd.len(), 14);
    }

    #[test]
    fn spans_are_clipped() {
        let path = Rect::new(-5.0, -5.0, 50.0, 50.0).to_path(0.1);
        let spans = spans(&path, Fill::NonZero, ClipBox::new(10, 20, 30, 22));

        assert_eq!(
            spans,
            vec![IntRect::new(10, 20, 20, 1), IntRect::new(10, 21, 20, 1)]
        );
    }

    #[test]
    fn ellipse_is_symmetric() {
        let path = Ellipse::new((20.0, 20.0), (10.0, 6.0), 0.0).to_path(0.01);
        let spans = spans(&path, Fill::NonZero, CLIP);

        assert_eq!(spans.len(), 12);
        for (top, bottom) in spans.iter().zip(spans.iter().rev()) {
            assert_eq!((top.x, top.width), (bottom.x, bottom.width));
            assert_eq!(top.y - 20, 19 - bottom.y);
        }
    }

    #[test]
    fn nan_path_is_ignored() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((f64::NAN, 10.0));
        path.line_to((10.0, 10.0));

        assert!(spans(&path, Fill::NonZero, CLIP).is_empty());
    }
}
