// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterizing one-pixel-wide lines into covering rectangles.
//!
//! Lines are walked with Bresenham's algorithm. Consecutive steps along the major axis are
//! merged into a single rectangle, so a shallow or steep line produces one rectangle per run
//! instead of one per pixel. Lines close to 45° are emitted as individual points, since merging
//! would not save anything there.

use crate::dirty::DirtyRegion;
use crate::growable::RectList;
use crate::rect::{ClipBox, IntRect};
use log::trace;

/// The largest coordinate that is safe for the 30-bit stepping arithmetic.
const BIG_MAX: i32 = (1 << 29) - 1;
/// The smallest coordinate that is safe for the 30-bit stepping arithmetic.
const BIG_MIN: i32 = -(1 << 29);

const OUTCODE_TOP: u8 = 1;
const OUTCODE_BOTTOM: u8 = 2;
const OUTCODE_LEFT: u8 = 4;
const OUTCODE_RIGHT: u8 = 8;

/// Lines whose ratio `|dx| / |dy|` lies strictly inside this range are emitted as points.
const POINT_RATIO_MIN: f32 = 0.9;
const POINT_RATIO_MAX: f32 = 1.1;

/// A reusable line rasterizer.
///
/// The rasterizer keeps the clipped and unclipped endpoints of the line being rasterized, which
/// is what keeps clipped lines on exactly the same pixels as their unclipped counterparts.
#[derive(Clone, Debug, Default)]
pub struct LineRasterizer {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    uc_x1: i32,
    uc_y1: i32,
    uc_x2: i32,
    uc_y2: i32,
    region: DirtyRegion,
}

/// The state of a Bresenham walk.
struct Walk {
    x: i32,
    y: i32,
    steps: i64,
    error: i64,
    err_major: i64,
    err_minor: i64,
    x_step: i32,
    y_step: i32,
    major_x_step: i32,
    major_y_step: i32,
}

impl Walk {
    #[inline(always)]
    fn advance(&mut self) {
        if self.error < 0 {
            self.error += self.err_major;
            self.x += self.major_x_step;
            self.y += self.major_y_step;
        } else {
            self.error -= self.err_minor;
            self.x += self.x_step;
            self.y += self.y_step;
        }
    }
}

impl LineRasterizer {
    /// Create a new rasterizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterize the line from `p1` to `p2` (both endpoints inclusive) into `rects`.
    ///
    /// If `clip` is given, only the pixels inside the clip box are emitted. With
    /// `overflow_check`, endpoints too large for the stepping arithmetic are first pulled
    /// back along the line into a 30-bit range; without it the caller must guarantee that
    /// coordinate differences fit into 30 bits.
    pub fn rasterize(
        &mut self,
        rects: &mut RectList,
        p1: (i32, i32),
        p2: (i32, i32),
        clip: Option<ClipBox>,
        overflow_check: bool,
    ) {
        self.init_coordinates(p1, p2, overflow_check);

        let dx = i64::from(self.x2) - i64::from(self.x1);
        let dy = i64::from(self.y2) - i64::from(self.y1);
        let mut ax = dx.abs();
        let mut ay = dy.abs();
        let x_major = ax >= ay;
        let diag = ax as f32 / ay as f32;

        if let Some(clip) = clip {
            if clip.is_empty() || !self.clip_coordinates(&clip, x_major, dx, dy, ax, ay) {
                return;
            }
        }

        self.region
            .set_line_endpoints(self.x1, self.y1, self.x2, self.y2);
        let x_diff = self.region.width();
        let y_diff = self.region.height();

        if x_diff == 0 || y_diff == 0 {
            // A single row or column.
            rects.push(self.region.x, self.region.y, x_diff + 1, y_diff + 1);
            return;
        }

        let (err_major, mut err_minor, steps) = if x_major {
            let setup = (ay * 2, ax * 2, i64::from(self.x2) - i64::from(self.x1));
            ax = -ax;
            setup
        } else {
            let setup = (ax * 2, ay * 2, i64::from(self.y2) - i64::from(self.y1));
            ay = -ay;
            setup
        };
        let steps = steps.abs() + 1;

        // Start from the error of the unclipped line, advanced to the clipped endpoint.
        let mut error = -(err_minor / 2);
        if self.y1 != self.uc_y1 {
            let y_steps = (i64::from(self.y1) - i64::from(self.uc_y1)).abs();
            error += y_steps * ax * 2;
        }
        if self.x1 != self.uc_x1 {
            let x_steps = (i64::from(self.x1) - i64::from(self.uc_x1)).abs();
            error += x_steps * ay * 2;
        }
        error += err_major;
        err_minor -= err_major;

        let x_step = if dx > 0 { 1 } else { -1 };
        let y_step = if dy > 0 { 1 } else { -1 };
        let walk = Walk {
            x: self.x1,
            y: self.y1,
            steps,
            error,
            err_major,
            err_minor,
            x_step,
            y_step,
            major_x_step: if x_major { x_step } else { 0 },
            major_y_step: if x_major { 0 } else { y_step },
        };

        if diag <= POINT_RATIO_MIN || diag >= POINT_RATIO_MAX {
            line_to_rects(rects, walk);
        } else {
            line_to_points(rects, walk);
        }
    }

    fn init_coordinates(&mut self, p1: (i32, i32), p2: (i32, i32), overflow_check: bool) {
        let (mut x1, mut y1) = p1;
        let (mut x2, mut y2) = p2;

        // The stepping parameters hold values of twice the magnitude of the coordinate
        // differences, so coordinates are pre-clipped to 30 bits before the real clipping.
        // The pre-clip only depends on the line itself, which keeps a huge line on the same
        // pixels regardless of the clip in effect.
        if overflow_check
            && (overflows_big(x1) || overflows_big(y1) || overflows_big(x2) || overflows_big(y2))
        {
            trace!("pre-clipping line ({x1}, {y1}) -> ({x2}, {y2}) to 30 bits");

            let (x1f, y1f, x2f, y2f) = (
                f64::from(x1),
                f64::from(y1),
                f64::from(x2),
                f64::from(y2),
            );
            let (big_min, big_max) = (f64::from(BIG_MIN), f64::from(BIG_MAX));
            let dxf = x2f - x1f;
            let dyf = y2f - y1f;

            let (mut x1d, mut y1d, mut x2d, mut y2d) = (x1f, y1f, x2f, y2f);

            if x1 < BIG_MIN {
                y1d = y1f + (big_min - x1f) * dyf / dxf;
                x1d = big_min;
            } else if x1 > BIG_MAX {
                y1d = y1f - (x1f - big_max) * dyf / dxf;
                x1d = big_max;
            }
            if y1d < big_min {
                x1d = x1f + (big_min - y1f) * dxf / dyf;
                y1d = big_min;
            } else if y1d > big_max {
                x1d = x1f - (y1f - big_max) * dxf / dyf;
                y1d = big_max;
            }
            if x2 < BIG_MIN {
                y2d = y2f + (big_min - x2f) * dyf / dxf;
                x2d = big_min;
            } else if x2 > BIG_MAX {
                y2d = y2f - (x2f - big_max) * dyf / dxf;
                x2d = big_max;
            }
            if y2d < big_min {
                x2d = x2f + (big_min - y2f) * dxf / dyf;
                y2d = big_min;
            } else if y2d > big_max {
                x2d = x2f - (y2f - big_max) * dxf / dyf;
                y2d = big_max;
            }

            x1 = x1d as i32;
            y1 = y1d as i32;
            x2 = x2d as i32;
            y2 = y2d as i32;
        }

        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self.uc_x1 = x1;
        self.uc_y1 = y1;
        self.uc_x2 = x2;
        self.uc_y2 = y2;
    }

    /// Clip the endpoints against `clip`, keeping them on the Bresenham steps of the unclipped
    /// line. Returns `false` if the whole line lies outside.
    fn clip_coordinates(
        &mut self,
        clip: &ClipBox,
        x_major: bool,
        dx: i64,
        dy: i64,
        ax: i64,
        ay: i64,
    ) -> bool {
        let (xmin, ymin) = (clip.lo_x, clip.lo_y);
        let (xmax, ymax) = (clip.hi_x - 1, clip.hi_y - 1);
        let outcode = |x: i32, y: i32| {
            out(y, ymin, ymax, OUTCODE_TOP, OUTCODE_BOTTOM)
                | out(x, xmin, xmax, OUTCODE_LEFT, OUTCODE_RIGHT)
        };

        let mut outcode1 = outcode(self.x1, self.y1);
        let mut outcode2 = outcode(self.x2, self.y2);

        while (outcode1 | outcode2) != 0 {
            if (outcode1 & outcode2) != 0 {
                return false;
            }

            if outcode1 != 0 {
                if outcode1 & (OUTCODE_TOP | OUTCODE_BOTTOM) != 0 {
                    self.y1 = if outcode1 & OUTCODE_TOP != 0 {
                        ymin
                    } else {
                        ymax
                    };
                    let y_steps = (i64::from(self.y1) - i64::from(self.uc_y1)).abs();
                    let mut x_steps = 2 * y_steps * ax + ay;
                    if x_major {
                        x_steps += ay - ax - 1;
                    }
                    x_steps /= 2 * ay;
                    if dx < 0 {
                        x_steps = -x_steps;
                    }
                    self.x1 = (i64::from(self.uc_x1) + x_steps) as i32;
                } else {
                    self.x1 = if outcode1 & OUTCODE_LEFT != 0 {
                        xmin
                    } else {
                        xmax
                    };
                    let x_steps = (i64::from(self.x1) - i64::from(self.uc_x1)).abs();
                    let mut y_steps = 2 * x_steps * ay + ax;
                    if !x_major {
                        y_steps += ax - ay - 1;
                    }
                    y_steps /= 2 * ax;
                    if dy < 0 {
                        y_steps = -y_steps;
                    }
                    self.y1 = (i64::from(self.uc_y1) + y_steps) as i32;
                }
                outcode1 = outcode(self.x1, self.y1);
            } else {
                if outcode2 & (OUTCODE_TOP | OUTCODE_BOTTOM) != 0 {
                    self.y2 = if outcode2 & OUTCODE_TOP != 0 {
                        ymin
                    } else {
                        ymax
                    };
                    let y_steps = (i64::from(self.y2) - i64::from(self.uc_y2)).abs();
                    let mut x_steps = 2 * y_steps * ax + ay;
                    if x_major {
                        x_steps += ay - ax;
                    } else {
                        x_steps -= 1;
                    }
                    x_steps /= 2 * ay;
                    if dx > 0 {
                        x_steps = -x_steps;
                    }
                    self.x2 = (i64::from(self.uc_x2) + x_steps) as i32;
                } else {
                    self.x2 = if outcode2 & OUTCODE_LEFT != 0 {
                        xmin
                    } else {
                        xmax
                    };
                    let x_steps = (i64::from(self.x2) - i64::from(self.uc_x2)).abs();
                    let mut y_steps = 2 * x_steps * ay + ax;
                    if x_major {
                        y_steps -= 1;
                    } else {
                        y_steps += ax - ay;
                    }
                    y_steps /= 2 * ax;
                    if dy > 0 {
                        y_steps = -y_steps;
                    }
                    self.y2 = (i64::from(self.uc_y2) + y_steps) as i32;
                }
                outcode2 = outcode(self.x2, self.y2);
            }
        }

        true
    }
}

/// Emit every step of the walk as a 1×1 rectangle.
fn line_to_points(rects: &mut RectList, mut walk: Walk) {
    for _ in 0..walk.steps {
        rects.push(walk.x, walk.y, 1, 1);
        walk.advance();
    }
}

/// Emit the walk as rectangles, merging consecutive steps along the same row or column.
fn line_to_rects(rects: &mut RectList, mut walk: Walk) {
    let mut pending: Option<IntRect> = None;

    for _ in 0..walk.steps {
        let (x, y) = (walk.x, walk.y);

        match pending.as_mut() {
            Some(rect) if y == rect.y && x == rect.x2() => rect.width += 1,
            Some(rect) if y == rect.y && x == rect.x - 1 => {
                rect.x -= 1;
                rect.width += 1;
            }
            Some(rect) if x == rect.x && y == rect.y2() => rect.height += 1,
            Some(rect) if x == rect.x && y == rect.y - 1 => {
                rect.y -= 1;
                rect.height += 1;
            }
            _ => {
                // Diagonal step: flush the run so far and start a new one.
                if let Some(rect) = pending {
                    rects.push_rect(rect);
                }
                pending = Some(IntRect::new(x, y, 1, 1));
            }
        }

        walk.advance();
    }

    if let Some(rect) = pending {
        rects.push_rect(rect);
    }
}

#[inline(always)]
fn overflows_big(v: i32) -> bool {
    v != (v.wrapping_shl(2) >> 2)
}

#[inline(always)]
fn out(v: i32, vmin: i32, vmax: i32, cmin: u8, cmax: u8) -> u8 {
    if v < vmin {
        cmin
    } else if v > vmax {
        cmax
    } else {
        0
    }
}
