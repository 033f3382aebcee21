// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing of a blurred buffer into its shape.

use std::sync::Arc;

use log::warn;

use crate::canvas::{Canvas, ImageShader, Paint};
use crate::config::BlurShape;
use crate::error::DrawError;
use crate::kurbo::{Ellipse, Size, Stroke};
use crate::peniko::Color;
use crate::pixmap::{duplicate, Pixmap};
use crate::shape::{buffer_transform, oval_border_rect, rounded_rect_path, CircleGeometry};

/// A blurred buffer together with its generation.
///
/// The generation changes whenever the pixels do, see
/// [`SnapshotBuffer::generation`](crate::SnapshotBuffer::generation).
#[derive(Debug, Clone, Copy)]
pub struct BlurredFrame<'a> {
    /// The blurred pixels.
    pub pixmap: &'a Pixmap,
    /// Identifies the content of `pixmap`.
    pub generation: u64,
}

impl BlurredFrame<'_> {
    /// The size of the buffer.
    pub fn size(&self) -> Size {
        Size::new(
            f64::from(self.pixmap.width()),
            f64::from(self.pixmap.height()),
        )
    }
}

/// Colors and border of a composite.
#[derive(Debug, Clone, Copy)]
pub struct CompositeStyle {
    /// Tint drawn over the blurred content.
    pub overlay: Color,
    /// Width of the border, `0` for none.
    pub border_width: f32,
    /// Color of the border.
    pub border_color: Color,
}

#[derive(Debug, Clone)]
struct CachedShader {
    generation: u64,
    dst: Size,
    /// Shared copy of the blurred pixels, handed to the canvas.
    image: Arc<Pixmap>,
    shader: ImageShader,
}

/// Draws a blurred buffer into a rectangle with rounded corners, a circle or an ellipse.
///
/// The image shader mapping the buffer onto the destination is kept between frames for
/// as long as neither the buffer generation nor the destination size change. The pixels
/// it samples are copied once per generation.
#[derive(Debug, Default)]
pub struct ShapeCompositor {
    cache: Option<CachedShader>,
}

impl ShapeCompositor {
    /// Create a compositor with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite `blurred` into the region `(0, 0, dst.width, dst.height)` of `canvas`.
    ///
    /// Nothing is drawn without a blurred buffer. Draw errors are logged and otherwise
    /// ignored; the canvas is always left with the state it had on entry.
    pub fn render(
        &mut self,
        canvas: &mut dyn Canvas,
        blurred: Option<BlurredFrame<'_>>,
        dst: Size,
        shape: &BlurShape,
        style: &CompositeStyle,
    ) {
        let Some(frame) = blurred else {
            return;
        };
        let mark = canvas.save();
        if let Err(err) = self.draw(canvas, frame, dst, shape, style) {
            warn!("Failed to draw blurred background: {err}");
        }
        canvas.restore_to_count(mark);
    }

    /// The `(generation, destination size)` the cached shader was built for.
    pub fn cache_key(&self) -> Option<(u64, Size)> {
        self.cache.as_ref().map(|c| (c.generation, c.dst))
    }

    /// Forget the cached shader.
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    fn shader(&mut self, frame: BlurredFrame<'_>, dst: Size) -> (Arc<Pixmap>, ImageShader) {
        let image = match &self.cache {
            Some(cached) if cached.generation == frame.generation => {
                if cached.dst == dst {
                    return (Arc::clone(&cached.image), cached.shader);
                }
                Arc::clone(&cached.image)
            }
            _ => Arc::new(duplicate(frame.pixmap)),
        };
        let shader = ImageShader::clamped(buffer_transform(dst, frame.size()));
        self.cache = Some(CachedShader {
            generation: frame.generation,
            dst,
            image: Arc::clone(&image),
            shader,
        });
        (image, shader)
    }

    fn draw(
        &mut self,
        canvas: &mut dyn Canvas,
        frame: BlurredFrame<'_>,
        dst: Size,
        shape: &BlurShape,
        style: &CompositeStyle,
    ) -> Result<(), DrawError> {
        let dst_rect = dst.to_rect();
        let (image, shader) = self.shader(frame, dst);
        let overlay = Paint::Solid(style.overlay);
        let border_width = f64::from(style.border_width);
        let border = (border_width > 0.0).then(|| Stroke::new(border_width));

        match shape {
            BlurShape::Rectangle(radii) => {
                let path = rounded_rect_path(dst_rect, radii);
                canvas.clip_path(&path)?;
                let src = frame.size().to_rect();
                canvas.draw_image(&image, src, dst_rect)?;
                canvas.fill_rect(dst_rect, &overlay)?;
                if border.is_some() {
                    // Half of the stroke is outside of the clip.
                    let stroke = Stroke::new(border_width * 2.0);
                    canvas.stroke_path(&path, &stroke, style.border_color)?;
                }
            }
            BlurShape::Oval => {
                let blurred = Paint::Image {
                    image: &image,
                    shader,
                };
                let ellipse = Ellipse::from_rect(dst_rect);
                canvas.fill_ellipse(ellipse, &blurred)?;
                canvas.fill_ellipse(ellipse, &overlay)?;
                if let Some(stroke) = border {
                    let outline = Ellipse::from_rect(oval_border_rect(dst_rect, border_width));
                    canvas.stroke_ellipse(outline, &stroke, style.border_color)?;
                }
            }
            BlurShape::Circle => {
                let blurred = Paint::Image {
                    image: &image,
                    shader,
                };
                let geometry = CircleGeometry::new(dst, frame.size());
                canvas.fill_circle(geometry.circle, &blurred)?;
                canvas.fill_circle(geometry.circle, &overlay)?;
                if let Some(stroke) = border {
                    let outline = geometry.border_ellipse(border_width);
                    canvas.stroke_ellipse(outline, &stroke, style.border_color)?;
                }
            }
        }
        Ok(())
    }
}
