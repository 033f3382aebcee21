// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host draw surface.

use std::sync::Arc;

use crate::error::DrawError;
use crate::kurbo::{Affine, BezPath, Circle, Ellipse, Rect, Stroke};
use crate::peniko::{Color, Extend};
use crate::pixmap::Pixmap;

/// Maps an image onto the plane.
///
/// `transform` takes image pixel coordinates to user space; samples outside of the image
/// are resolved with `extend`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageShader {
    /// Image space to user space.
    pub transform: Affine,
    /// How to sample outside of the image.
    pub extend: Extend,
}

impl ImageShader {
    /// A clamping shader with the given transform.
    pub fn clamped(transform: Affine) -> Self {
        Self {
            transform,
            extend: Extend::Pad,
        }
    }
}

/// What a fill is painted with.
#[derive(Debug, Clone, Copy)]
pub enum Paint<'a> {
    /// A solid color.
    Solid(Color),
    /// An image seen through a shader.
    Image {
        /// The pixels.
        image: &'a Arc<Pixmap>,
        /// Placement of the pixels.
        shader: ImageShader,
    },
}

impl From<Color> for Paint<'_> {
    fn from(color: Color) -> Self {
        Self::Solid(color)
    }
}

/// A drawing surface with a transform stack and clipping.
///
/// Geometry is given in user space, which the current transform maps to device pixels.
/// [`save`](Self::save) pushes the transform and clip and returns the depth *before* the
/// push, which [`restore_to_count`](Self::restore_to_count) accepts to pop back to that
/// state.
pub trait Canvas {
    /// Push the current transform and clip. Returns the depth to restore to.
    fn save(&mut self) -> usize;

    /// Pop saved states until the stack has `count` entries.
    fn restore_to_count(&mut self, count: usize);

    /// Pre-multiply the current transform with a scale.
    fn scale(&mut self, sx: f64, sy: f64);

    /// Pre-multiply the current transform with a translation.
    fn translate(&mut self, dx: f64, dy: f64);

    /// Intersect the clip with the interior of `path` (non-zero winding).
    fn clip_path(&mut self, path: &BezPath) -> Result<(), DrawError>;

    /// Overwrite every pixel with `color`, ignoring transform and clip.
    fn clear(&mut self, color: Color);

    /// Draw the `src` part of `image` stretched into `dst`.
    fn draw_image(&mut self, image: &Arc<Pixmap>, src: Rect, dst: Rect) -> Result<(), DrawError>;

    /// Fill a rectangle.
    fn fill_rect(&mut self, rect: Rect, paint: &Paint<'_>) -> Result<(), DrawError>;

    /// Fill a path (non-zero winding).
    fn fill_path(&mut self, path: &BezPath, paint: &Paint<'_>) -> Result<(), DrawError>;

    /// Fill a circle.
    fn fill_circle(&mut self, circle: Circle, paint: &Paint<'_>) -> Result<(), DrawError>;

    /// Fill an ellipse.
    fn fill_ellipse(&mut self, ellipse: Ellipse, paint: &Paint<'_>) -> Result<(), DrawError>;

    /// Stroke a path.
    fn stroke_path(&mut self, path: &BezPath, stroke: &Stroke, color: Color)
        -> Result<(), DrawError>;

    /// Stroke an ellipse.
    fn stroke_ellipse(
        &mut self,
        ellipse: Ellipse,
        stroke: &Stroke,
        color: Color,
    ) -> Result<(), DrawError>;
}
