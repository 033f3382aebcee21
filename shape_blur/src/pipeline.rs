// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame snapshot and blur.

use log::{debug, warn};

use crate::backend::{BlurBackend, CpuBlur};
use crate::canvas::Canvas;
use crate::compositor::BlurredFrame;
use crate::config::{validate_down_sample_factor, validate_radius, BlurConfig};
use crate::error::{BlurError, ConfigError, ReentrancyViolation};
use crate::guard::{DrawGate, DrawPermit, ReentrancyGuard, RenderingState};
use crate::kurbo::Vec2;
use crate::peniko::Color;
use crate::snapshot::SnapshotBuffer;
use crate::view::SnapshotSource;

/// The largest radius a [`BlurBackend`] is ever asked for.
pub const MAX_RADIUS: f32 = 25.0;

/// The radius and downsample factor actually used for a blur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveParams {
    /// Blur radius in pixels of the downsampled buffer, in `(0, 25]`.
    pub radius: f32,
    /// Downsample factor, at least the configured one.
    pub down_sample_factor: f32,
}

impl EffectiveParams {
    /// The buffer size for a view of `width` by `height` pixels.
    ///
    /// Each dimension is at least one pixel.
    pub fn buffer_size(&self, width: u32, height: u32) -> (u32, u32) {
        let scaled = |v: u32| ((v as f32 / self.down_sample_factor).floor() as u32).max(1);
        (scaled(width), scaled(height))
    }
}

/// Negotiate the radius fed to the backend.
///
/// The radius in downsampled pixels is `radius / down_sample_factor`. When that exceeds
/// [`MAX_RADIUS`], the factor grows instead, so that the effective radius is exactly
/// `MAX_RADIUS` and the blur still covers the same distance in view pixels.
pub fn effective_params(radius: f32, down_sample_factor: f32) -> EffectiveParams {
    let mut factor = down_sample_factor;
    let mut effective = radius / factor;
    if effective > MAX_RADIUS {
        factor *= effective / MAX_RADIUS;
        effective = MAX_RADIUS;
    }
    EffectiveParams {
        radius: effective,
        down_sample_factor: factor,
    }
}

/// Options for a [`BlurPipeline`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Refuse buffers with more than this many pixels in total.
    ///
    /// `None` only limits each dimension to what a [`Pixmap`](crate::Pixmap) can hold.
    pub max_buffer_pixels: Option<usize>,
    /// Panic when the backend reports an initialisation failure.
    ///
    /// A missing blur engine is a deployment problem which should be loud during
    /// development. When unset, the pipeline logs the failure and retries on the next frame.
    pub escalate_backend_errors: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_buffer_pixels: None,
            escalate_backend_errors: cfg!(debug_assertions),
        }
    }
}

/// Downsampling, snapshotting and blurring of one view's background.
///
/// Call [`prepare`](Self::prepare) with the view size once per frame, then
/// [`snapshot_and_blur`](Self::snapshot_and_blur) if it returned `true`. The result is
/// available from [`blurred`](Self::blurred).
#[derive(Debug)]
pub struct BlurPipeline<B: BlurBackend = CpuBlur> {
    radius: f32,
    down_sample_factor: f32,
    overlay_color: Color,
    backend: B,
    buffers: SnapshotBuffer,
    /// The backend must be (re)prepared before the next blur.
    dirty: bool,
    effective: Option<EffectiveParams>,
    view_size: (u32, u32),
    guard: ReentrancyGuard,
    options: PipelineOptions,
}

impl<B: BlurBackend> BlurPipeline<B> {
    /// Create a pipeline for the radius, downsample factor and overlay of `config`.
    pub fn new(config: &BlurConfig, backend: B) -> Result<Self, ConfigError> {
        Self::with_options(config, backend, PipelineOptions::default())
    }

    /// Create a pipeline with explicit options.
    pub fn with_options(
        config: &BlurConfig,
        backend: B,
        options: PipelineOptions,
    ) -> Result<Self, ConfigError> {
        validate_radius(config.radius)?;
        validate_down_sample_factor(config.down_sample_factor)?;
        Ok(Self {
            radius: config.radius,
            down_sample_factor: config.down_sample_factor,
            overlay_color: config.overlay_color,
            backend,
            buffers: SnapshotBuffer::with_budget(options.max_buffer_pixels),
            dirty: true,
            effective: None,
            view_size: (0, 0),
            guard: ReentrancyGuard::new(),
            options,
        })
    }

    /// Count snapshots into `state` instead of this thread's default.
    pub fn with_rendering_state(mut self, state: RenderingState) -> Self {
        self.guard = ReentrancyGuard::with_state(state);
        self
    }

    /// Size the buffers for a view of `width` by `height` pixels and get the backend
    /// ready.
    ///
    /// Returns `false` when no blur can be produced this frame: the radius is zero, the
    /// buffers could not be allocated or the backend refused the configuration.
    ///
    /// # Panics
    ///
    /// Panics if the backend reports an initialisation failure and
    /// [`PipelineOptions::escalate_backend_errors`] is set.
    pub fn prepare(&mut self, width: u32, height: u32) -> bool {
        if self.radius == 0.0 {
            self.release();
            return false;
        }
        let params = effective_params(self.radius, self.down_sample_factor);
        let (buffer_width, buffer_height) = params.buffer_size(width, height);
        match self.buffers.ensure_size(buffer_width, buffer_height) {
            Ok(true) => self.dirty = true,
            Ok(false) => {}
            Err(err) => {
                warn!("Blur disabled for a {width}x{height} view: {err}");
                self.release();
                return false;
            }
        }
        self.view_size = (width, height);
        self.effective = Some(params);

        if self.dirty {
            let Some(buffer) = self.buffers.result() else {
                return false;
            };
            match self.backend.prepare(buffer, params.radius) {
                Ok(()) => self.dirty = false,
                Err(err) if err.is_init_failure() && self.options.escalate_backend_errors => {
                    panic!("Blur backend failed to initialise: {err}");
                }
                Err(err) => {
                    warn!("Blur backend could not be prepared: {err}");
                    if err.is_init_failure() {
                        self.backend.release();
                    }
                    return false;
                }
            }
        }
        true
    }

    /// Redraw `source` into the downsampled buffer and blur it.
    ///
    /// `view_offset` is the position of the view relative to `source`. Errors from drawing
    /// the source abort the snapshot but are otherwise ignored; the blur then runs on
    /// whatever was drawn.
    pub fn snapshot_and_blur(
        &mut self,
        source: &dyn SnapshotSource,
        view_offset: Vec2,
    ) -> Result<(), BlurError> {
        if self.dirty {
            return Err(BlurError::NotPrepared);
        }
        let Some((canvas, result)) = self.buffers.parts_mut() else {
            return Err(BlurError::NotPrepared);
        };
        let (view_width, view_height) = self.view_size;
        let (buffer_width, buffer_height) = (result.width(), result.height());

        canvas.clear(self.overlay_color.with_alpha(0.0));
        let mark = canvas.save();
        canvas.scale(
            f64::from(buffer_width) / f64::from(view_width.max(1)),
            f64::from(buffer_height) / f64::from(view_height.max(1)),
        );
        canvas.translate(-view_offset.x, -view_offset.y);
        {
            let _scope = self.guard.begin_snapshot();
            let drawn = source
                .draw_background(canvas)
                .and_then(|()| source.draw(canvas));
            if let Err(err) = drawn {
                debug!("Snapshot of the blurred background stopped early: {err}");
            }
        }
        canvas.restore_to_count(mark);

        self.backend.blur(canvas.pixmap(), result)?;
        self.buffers.bump_generation();
        Ok(())
    }

    /// Whether the backend has to be prepared before the next blur.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Free the buffers and the backend's resources. A no-op when nothing is held.
    pub fn release(&mut self) {
        self.buffers.release();
        self.backend.release();
        self.dirty = true;
        self.effective = None;
    }

    /// Change the blur radius.
    pub fn set_blur_radius(&mut self, radius: f32) -> Result<(), ConfigError> {
        validate_radius(radius)?;
        if self.radius != radius {
            self.radius = radius;
            self.dirty = true;
        }
        Ok(())
    }

    /// Change the downsample factor. The buffers are resized on the next prepare.
    pub fn set_down_sample_factor(&mut self, factor: f32) -> Result<(), ConfigError> {
        validate_down_sample_factor(factor)?;
        if self.down_sample_factor != factor {
            self.down_sample_factor = factor;
            self.release();
        }
        Ok(())
    }

    /// Change the overlay color.
    pub fn set_overlay_color(&mut self, color: Color) {
        self.overlay_color = color;
    }

    /// The configured blur radius.
    pub fn blur_radius(&self) -> f32 {
        self.radius
    }

    /// The configured downsample factor.
    pub fn down_sample_factor(&self) -> f32 {
        self.down_sample_factor
    }

    /// The parameters negotiated by the last successful allocation.
    pub fn effective_params(&self) -> Option<EffectiveParams> {
        self.effective
    }

    /// The size of the snapshot buffers, if allocated.
    pub fn buffer_size(&self) -> Option<(u32, u32)> {
        self.buffers.size()
    }

    /// The snapshot buffers.
    pub fn buffers(&self) -> &SnapshotBuffer {
        &self.buffers
    }

    /// The latest blurred result.
    pub fn blurred(&self) -> Option<BlurredFrame<'_>> {
        self.buffers.blurred()
    }

    /// The blur backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Decide whether the view owning this pipeline may draw, see
    /// [`ReentrancyGuard::check_draw`].
    pub fn check_draw(&self) -> Result<DrawPermit, ReentrancyViolation> {
        self.guard.check_draw()
    }

    /// A handle for [`check_draw`](Self::check_draw) that outlives borrows of the pipeline.
    pub fn draw_gate(&self) -> DrawGate {
        self.guard.gate()
    }

    /// The guard marking this pipeline's snapshots.
    pub fn guard(&self) -> &ReentrancyGuard {
        &self.guard
    }
}
