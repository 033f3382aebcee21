// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Canvas`] on top of the Vello CPU renderer.
//!
//! Draw calls are forwarded to a [`RenderContext`] and rendered into the owned [`Pixmap`]
//! when the pixels are asked for. Clips become clip layers, kept in device space so that
//! they can be pushed again after a render or a clear.

use std::sync::Arc;

use smallvec::SmallVec;
use vello_common::paint::Image;
use vello_cpu::{RenderContext, RenderMode};

use crate::canvas::{Canvas, ImageShader, Paint};
use crate::error::DrawError;
use crate::kurbo::{Affine, BezPath, Circle, Ellipse, Rect, Shape, Stroke};
use crate::peniko::{Color, ImageQuality};
use crate::pixmap::Pixmap;

/// Flattening tolerance for shapes turned into paths, in user space.
const TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
struct Saved {
    transform: Affine,
    clips: usize,
}

/// A [`Canvas`] drawing into an owned [`Pixmap`] with `vello_cpu`.
pub struct PixmapCanvas {
    ctx: RenderContext,
    pixmap: Pixmap,
    transform: Affine,
    /// Active clips in device space, one pushed layer each.
    clips: SmallVec<[BezPath; 4]>,
    stack: SmallVec<[Saved; 4]>,
    /// Draws were issued since the pixmap was last rendered.
    pending: bool,
}

impl core::fmt::Debug for PixmapCanvas {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PixmapCanvas")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("transform", &self.transform)
            .field("clips", &self.clips.len())
            .field("saved", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl PixmapCanvas {
    /// A transparent canvas of `width` by `height` pixels.
    pub fn new(width: u16, height: u16) -> Self {
        Self::from_pixmap(Pixmap::new(width, height))
    }

    /// Draw into `pixmap`, which is expected to be transparent.
    ///
    /// Rendering replaces every pixel, so earlier content does not survive the first draw.
    pub(crate) fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            ctx: RenderContext::new(pixmap.width(), pixmap.height()),
            pixmap,
            transform: Affine::IDENTITY,
            clips: SmallVec::new(),
            stack: SmallVec::new(),
            pending: false,
        }
    }

    /// The pixels drawn so far.
    pub fn pixmap(&mut self) -> &Pixmap {
        self.render();
        &self.pixmap
    }

    /// Give back the pixels.
    pub fn into_pixmap(mut self) -> Pixmap {
        self.render();
        self.pixmap
    }

    /// The current user-to-device transform.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Number of saved states.
    pub fn save_count(&self) -> usize {
        self.stack.len()
    }

    fn render(&mut self) {
        if !self.pending {
            return;
        }
        // Open layers are only composited once they are popped.
        for _ in 0..self.clips.len() {
            self.ctx.pop_layer();
        }
        self.ctx
            .render_to_pixmap(&mut self.pixmap, RenderMode::OptimizeQuality);
        self.push_clips();
        self.pending = false;
    }

    fn push_clips(&mut self) {
        self.ctx.set_transform(Affine::IDENTITY);
        for clip in &self.clips {
            self.ctx.push_clip_layer(clip);
        }
    }

    fn check_transform(transform: Affine) -> Result<(), DrawError> {
        if !transform.is_finite() {
            return Err(DrawError::InvalidGeometry("non-finite transform"));
        }
        Ok(())
    }

    fn check_path(path: &BezPath) -> Result<(), DrawError> {
        if !path.bounding_box().is_finite() {
            return Err(DrawError::InvalidGeometry("non-finite path"));
        }
        Ok(())
    }

    fn fill(&mut self, path: &BezPath, paint: &Paint<'_>) -> Result<(), DrawError> {
        Self::check_transform(self.transform)?;
        Self::check_path(path)?;
        match *paint {
            Paint::Solid(color) => {
                self.ctx.set_transform(self.transform);
                self.ctx.set_paint(color);
                self.ctx.fill_path(path);
            }
            Paint::Image {
                image,
                shader: ImageShader { transform, extend },
            } => {
                if image.width() == 0 || image.height() == 0 {
                    return Err(DrawError::InvalidGeometry("empty image"));
                }
                let full = self.transform * transform;
                if !full.is_finite() || transform.determinant() == 0.0 || full.determinant() == 0.0
                {
                    return Err(DrawError::InvalidGeometry("singular image transform"));
                }
                // Image pixels are placed at the origin of the paint space, so the path is
                // drawn in image space and the shader transform moves into the context.
                let mut in_image = path.clone();
                in_image.apply_affine(transform.inverse());
                self.ctx.set_transform(full);
                self.ctx.set_paint(Image {
                    pixmap: Arc::clone(image),
                    x_extend: extend,
                    y_extend: extend,
                    quality: ImageQuality::Medium,
                });
                self.ctx.fill_path(&in_image);
            }
        }
        self.pending = true;
        Ok(())
    }
}

impl Canvas for PixmapCanvas {
    fn save(&mut self) -> usize {
        let count = self.stack.len();
        self.stack.push(Saved {
            transform: self.transform,
            clips: self.clips.len(),
        });
        count
    }

    fn restore_to_count(&mut self, count: usize) {
        while self.stack.len() > count {
            let Some(saved) = self.stack.pop() else {
                break;
            };
            while self.clips.len() > saved.clips {
                self.clips.pop();
                self.ctx.pop_layer();
            }
            self.transform = saved.transform;
        }
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform *= Affine::scale_non_uniform(sx, sy);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform *= Affine::translate((dx, dy));
    }

    fn clip_path(&mut self, path: &BezPath) -> Result<(), DrawError> {
        Self::check_transform(self.transform)?;
        Self::check_path(path)?;
        let mut device = path.clone();
        device.apply_affine(self.transform);
        self.ctx.set_transform(Affine::IDENTITY);
        self.ctx.push_clip_layer(&device);
        self.clips.push(device);
        self.pending = true;
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        // Everything recorded so far is covered, so start from an empty scene.
        self.ctx.reset();
        if color.components[3] > 0.0 {
            let bounds = Rect::new(
                0.0,
                0.0,
                f64::from(self.pixmap.width()),
                f64::from(self.pixmap.height()),
            );
            self.ctx.set_paint(color);
            self.ctx.fill_rect(&bounds);
        }
        self.push_clips();
        self.pending = true;
    }

    fn draw_image(&mut self, image: &Arc<Pixmap>, src: Rect, dst: Rect) -> Result<(), DrawError> {
        if src.width() <= 0.0 || src.height() <= 0.0 {
            return Err(DrawError::InvalidGeometry("empty source rectangle"));
        }
        let transform = Affine::translate(dst.origin().to_vec2())
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate(-src.origin().to_vec2());
        let paint = Paint::Image {
            image,
            shader: ImageShader::clamped(transform),
        };
        self.fill_rect(dst, &paint)
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint<'_>) -> Result<(), DrawError> {
        self.fill(&rect.to_path(TOLERANCE), paint)
    }

    fn fill_path(&mut self, path: &BezPath, paint: &Paint<'_>) -> Result<(), DrawError> {
        self.fill(path, paint)
    }

    fn fill_circle(&mut self, circle: Circle, paint: &Paint<'_>) -> Result<(), DrawError> {
        self.fill(&circle.to_path(TOLERANCE), paint)
    }

    fn fill_ellipse(&mut self, ellipse: Ellipse, paint: &Paint<'_>) -> Result<(), DrawError> {
        self.fill(&ellipse.to_path(TOLERANCE), paint)
    }

    fn stroke_path(
        &mut self,
        path: &BezPath,
        stroke: &Stroke,
        color: Color,
    ) -> Result<(), DrawError> {
        Self::check_transform(self.transform)?;
        Self::check_path(path)?;
        self.ctx.set_transform(self.transform);
        self.ctx.set_stroke(stroke.clone());
        self.ctx.set_paint(color);
        self.ctx.stroke_path(path);
        self.pending = true;
        Ok(())
    }

    fn stroke_ellipse(
        &mut self,
        ellipse: Ellipse,
        stroke: &Stroke,
        color: Color,
    ) -> Result<(), DrawError> {
        self.stroke_path(&ellipse.to_path(TOLERANCE), stroke, color)
    }
}
