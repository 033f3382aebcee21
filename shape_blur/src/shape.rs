// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry of the shape modes.
//!
//! These are pure functions of the destination size, the blurred buffer size and the
//! shape parameters. [`ShapeCompositor`](crate::ShapeCompositor) turns them into draw calls.

use core::f64::consts::{FRAC_PI_2, PI};

use crate::config::CornerRadii;
use crate::kurbo::{Affine, Arc, BezPath, Circle, Ellipse, Point, Rect, Size, Vec2};

/// Tolerance used when flattening corner arcs into cubic segments.
const ARC_TOLERANCE: f64 = 0.1;

/// The transform mapping blurred buffer pixels onto a destination of size `dst`.
///
/// # Panics
///
/// Panics in debug builds if the buffer is empty.
pub fn buffer_transform(dst: Size, buffer: Size) -> Affine {
    debug_assert!(
        buffer.width > 0.0 && buffer.height > 0.0,
        "blurred buffers are never empty"
    );
    Affine::scale_non_uniform(dst.width / buffer.width, dst.height / buffer.height)
}

/// A clockwise rounded rectangle with elliptical corners.
///
/// Negative radii count as zero, and a corner with one zero component is sharp. When
/// the radii along a side add up to more than its length, all radii are scaled down by
/// the same factor until they fit. With all radii zero the path is exactly
/// [`Rect::to_path`].
pub fn rounded_rect_path(rect: Rect, radii: &CornerRadii) -> BezPath {
    let rect = rect.abs();
    let [tl, tr, br, bl] = fit_radii(rect.size(), radii);

    let mut path = BezPath::new();
    let start = Point::new(rect.x0 + tl.x, rect.y0);
    path.move_to(start);
    // (line end, arc center, radii, start angle, arc end) for each corner after the first.
    let corners = [
        (
            Point::new(rect.x1 - tr.x, rect.y0),
            Point::new(rect.x1 - tr.x, rect.y0 + tr.y),
            tr,
            -FRAC_PI_2,
            Point::new(rect.x1, rect.y0 + tr.y),
        ),
        (
            Point::new(rect.x1, rect.y1 - br.y),
            Point::new(rect.x1 - br.x, rect.y1 - br.y),
            br,
            0.0,
            Point::new(rect.x1 - br.x, rect.y1),
        ),
        (
            Point::new(rect.x0 + bl.x, rect.y1),
            Point::new(rect.x0 + bl.x, rect.y1 - bl.y),
            bl,
            FRAC_PI_2,
            Point::new(rect.x0, rect.y1 - bl.y),
        ),
        (
            Point::new(rect.x0, rect.y0 + tl.y),
            Point::new(rect.x0 + tl.x, rect.y0 + tl.y),
            tl,
            PI,
            start,
        ),
    ];
    let mut current = start;
    for (line_end, center, radii, start_angle, arc_end) in corners {
        if line_end != current && line_end != start {
            path.line_to(line_end);
        }
        current = line_end;
        if radii != Vec2::ZERO {
            let arc = Arc::new(center, radii, start_angle, FRAC_PI_2, 0.0);
            path.extend(arc.append_iter(ARC_TOLERANCE));
            current = arc_end;
        }
    }
    path.close_path();
    path
}

/// Clamp the radii to valid values and scale them to fit `size`.
fn fit_radii(size: Size, radii: &CornerRadii) -> [Vec2; 4] {
    let mut corners = radii.as_array().map(|r| {
        let r = Vec2::new(r.x.max(0.0), r.y.max(0.0));
        if r.x == 0.0 || r.y == 0.0 || !r.is_finite() {
            Vec2::ZERO
        } else {
            r
        }
    });
    let [tl, tr, br, bl] = corners;
    let mut scale = 1.0_f64;
    for (length, sum) in [
        (size.width, tl.x + tr.x),
        (size.width, bl.x + br.x),
        (size.height, tl.y + bl.y),
        (size.height, tr.y + br.y),
    ] {
        if sum > length {
            scale = scale.min(length / sum);
        }
    }
    if scale < 1.0 {
        for r in &mut corners {
            *r *= scale;
        }
    }
    corners
}

/// The ellipse outlining an oval border of width `border_width` inside `dst`.
pub fn oval_border_rect(dst: Rect, border_width: f64) -> Rect {
    dst.inset(-border_width / 2.0)
}

/// Geometry of the circle mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleGeometry {
    /// The blurred disc.
    pub circle: Circle,
    /// The square the border is inscribed in, before accounting for the border width.
    pub border_square: Rect,
}

impl CircleGeometry {
    /// Compute the circle for a destination of size `dst` showing a buffer of size
    /// `buffer`.
    ///
    /// The circle is based on the destination, unless the destination is narrower than
    /// the buffer, in which case the buffer size is used.
    pub fn new(dst: Size, buffer: Size) -> Self {
        let basis = if dst.width >= buffer.width { dst } else { buffer };
        let (w, h) = (basis.width, basis.height);
        let min = w.min(h);
        let dif = (w - h).abs() / 2.0;
        let border_square = if w > h {
            Rect::new(dif, 0.0, h + dif, h)
        } else if h > w {
            Rect::new(0.0, dif, w, w + dif)
        } else {
            Rect::new(0.0, 0.0, min, min)
        };
        Self {
            circle: Circle::new((w / 2.0, h / 2.0), min / 2.0),
            border_square,
        }
    }

    /// The ellipse to stroke for a border of `border_width`.
    pub fn border_ellipse(&self, border_width: f64) -> Ellipse {
        Ellipse::from_rect(self.border_square.inset(-border_width / 2.0))
    }
}
