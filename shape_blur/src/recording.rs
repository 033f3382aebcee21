// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording API for inspecting draw calls

use std::sync::Arc;

use smallvec::SmallVec;

use crate::canvas::{Canvas, ImageShader, Paint};
use crate::error::DrawError;
use crate::kurbo::{Affine, BezPath, Circle, Ellipse, Rect, Stroke};
use crate::peniko::Color;
use crate::pixmap::Pixmap;

/// A [`Paint`] without the borrowed pixels.
#[derive(Debug, Clone, Copy)]
pub enum RecordedPaint {
    /// A solid color.
    Solid(Color),
    /// An image of the given size seen through `shader`.
    Image {
        /// Width of the image in pixels.
        width: u16,
        /// Height of the image in pixels.
        height: u16,
        /// Placement of the pixels.
        shader: ImageShader,
    },
}

impl From<&Paint<'_>> for RecordedPaint {
    fn from(paint: &Paint<'_>) -> Self {
        match *paint {
            Paint::Solid(color) => Self::Solid(color),
            Paint::Image { image, shader } => Self::Image {
                width: image.width(),
                height: image.height(),
                shader,
            },
        }
    }
}

/// Individual draw commands that can be recorded.
///
/// Geometry is stored in user space together with the transform that was current when it
/// was issued.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// `save`
    Save,
    /// `restore_to_count`
    RestoreToCount(usize),
    /// `scale`
    Scale(f64, f64),
    /// `translate`
    Translate(f64, f64),
    /// Intersect the clip with a path.
    ClipPath {
        /// The clip path.
        path: BezPath,
        /// Transform at the time of the call.
        transform: Affine,
    },
    /// Overwrite every pixel.
    Clear(Color),
    /// Draw part of an image into a rectangle.
    DrawImage {
        /// Size of the image.
        image_size: (u16, u16),
        /// Source rectangle in image pixels.
        src: Rect,
        /// Destination rectangle in user space.
        dst: Rect,
        /// Transform at the time of the call.
        transform: Affine,
    },
    /// Fill a rectangle.
    FillRect {
        /// The rectangle.
        rect: Rect,
        /// The paint.
        paint: RecordedPaint,
        /// Transform at the time of the call.
        transform: Affine,
    },
    /// Fill a path.
    FillPath {
        /// The path.
        path: BezPath,
        /// The paint.
        paint: RecordedPaint,
        /// Transform at the time of the call.
        transform: Affine,
    },
    /// Fill a circle.
    FillCircle {
        /// The circle.
        circle: Circle,
        /// The paint.
        paint: RecordedPaint,
        /// Transform at the time of the call.
        transform: Affine,
    },
    /// Fill an ellipse.
    FillEllipse {
        /// The ellipse.
        ellipse: Ellipse,
        /// The paint.
        paint: RecordedPaint,
        /// Transform at the time of the call.
        transform: Affine,
    },
    /// Stroke a path.
    StrokePath {
        /// The path.
        path: BezPath,
        /// Stroke width.
        width: f64,
        /// Stroke color.
        color: Color,
        /// Transform at the time of the call.
        transform: Affine,
    },
    /// Stroke an ellipse.
    StrokeEllipse {
        /// The ellipse.
        ellipse: Ellipse,
        /// Stroke width.
        width: f64,
        /// Stroke color.
        color: Color,
        /// Transform at the time of the call.
        transform: Affine,
    },
}

/// A [`Canvas`] which records every call instead of drawing.
///
/// Useful for checking what a compositor asked for, and, with
/// [`fail_draws`](Self::fail_draws), for exercising error paths.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
    transform: Affine,
    stack: SmallVec<[Affine; 4]>,
    fail_draws: bool,
}

impl RecordingCanvas {
    /// Create an empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every drawing call fail with [`DrawError::Failed`] after being recorded.
    pub fn fail_draws(&mut self, fail: bool) {
        self.fail_draws = fail;
    }

    /// The commands recorded so far.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the recording empty.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        core::mem::take(&mut self.commands)
    }

    /// The current transform.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Number of saved states.
    pub fn save_count(&self) -> usize {
        self.stack.len()
    }

    fn record_draw(&mut self, command: DrawCommand) -> Result<(), DrawError> {
        self.commands.push(command);
        if self.fail_draws {
            Err(DrawError::Failed("recording canvas set to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl Canvas for RecordingCanvas {
    fn save(&mut self) -> usize {
        let count = self.stack.len();
        self.stack.push(self.transform);
        self.commands.push(DrawCommand::Save);
        count
    }

    fn restore_to_count(&mut self, count: usize) {
        while self.stack.len() > count {
            if let Some(transform) = self.stack.pop() {
                self.transform = transform;
            }
        }
        self.commands.push(DrawCommand::RestoreToCount(count));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform *= Affine::scale_non_uniform(sx, sy);
        self.commands.push(DrawCommand::Scale(sx, sy));
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform *= Affine::translate((dx, dy));
        self.commands.push(DrawCommand::Translate(dx, dy));
    }

    fn clip_path(&mut self, path: &BezPath) -> Result<(), DrawError> {
        self.record_draw(DrawCommand::ClipPath {
            path: path.clone(),
            transform: self.transform,
        })
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn draw_image(&mut self, image: &Arc<Pixmap>, src: Rect, dst: Rect) -> Result<(), DrawError> {
        self.record_draw(DrawCommand::DrawImage {
            image_size: (image.width(), image.height()),
            src,
            dst,
            transform: self.transform,
        })
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint<'_>) -> Result<(), DrawError> {
        self.record_draw(DrawCommand::FillRect {
            rect,
            paint: paint.into(),
            transform: self.transform,
        })
    }

    fn fill_path(&mut self, path: &BezPath, paint: &Paint<'_>) -> Result<(), DrawError> {
        self.record_draw(DrawCommand::FillPath {
            path: path.clone(),
            paint: paint.into(),
            transform: self.transform,
        })
    }

    fn fill_circle(&mut self, circle: Circle, paint: &Paint<'_>) -> Result<(), DrawError> {
        self.record_draw(DrawCommand::FillCircle {
            circle,
            paint: paint.into(),
            transform: self.transform,
        })
    }

    fn fill_ellipse(&mut self, ellipse: Ellipse, paint: &Paint<'_>) -> Result<(), DrawError> {
        self.record_draw(DrawCommand::FillEllipse {
            ellipse,
            paint: paint.into(),
            transform: self.transform,
        })
    }

    fn stroke_path(
        &mut self,
        path: &BezPath,
        stroke: &Stroke,
        color: Color,
    ) -> Result<(), DrawError> {
        self.record_draw(DrawCommand::StrokePath {
            path: path.clone(),
            width: stroke.width,
            color,
            transform: self.transform,
        })
    }

    fn stroke_ellipse(
        &mut self,
        ellipse: Ellipse,
        stroke: &Stroke,
        color: Color,
    ) -> Result<(), DrawError> {
        self.record_draw(DrawCommand::StrokeEllipse {
            ellipse,
            width: stroke.width,
            color,
            transform: self.transform,
        })
    }
}
