// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The blur view: lifecycle, per-frame trigger and drawing.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

use crate::backend::{BlurBackend, CpuBlur};
use crate::canvas::Canvas;
use crate::compositor::{CompositeStyle, ShapeCompositor};
use crate::config::{BlurConfig, BlurShape, StateColors, ViewState};
use crate::error::{ConfigError, DrawError};
use crate::guard::{DrawGate, DrawPermit};
use crate::kurbo::{Point, Size};
use crate::observer::{ListenerId, PreDrawListener, PreDrawObserver};
use crate::peniko::Color;
use crate::pipeline::{BlurPipeline, PipelineOptions};

/// The content behind a blur view, usually the root of its window.
pub trait SnapshotSource {
    /// Position of the source's top-left corner in screen coordinates.
    fn origin_on_screen(&self) -> Point;

    /// Draw the background of the source, below its content.
    fn draw_background(&self, canvas: &mut dyn Canvas) -> Result<(), DrawError> {
        let _ = canvas;
        Ok(())
    }

    /// Draw the content of the source, including any blur views in it.
    ///
    /// Blur views report [`DrawError::Reentrancy`] when they are asked to draw into their
    /// own snapshot; implementations should return that error to stop the snapshot.
    fn draw(&self, canvas: &mut dyn Canvas) -> Result<(), DrawError>;

    /// Ask the source to be redrawn.
    fn invalidate(&self) {}
}

/// A view which shows a blurred, tinted copy of whatever is drawn behind it.
pub struct BlurView<B: BlurBackend = CpuBlur> {
    config: BlurConfig,
    pipeline: BlurPipeline<B>,
    compositor: ShapeCompositor,
    ancestor: Option<Rc<dyn SnapshotSource>>,
    listener: Option<ListenerId>,
    different_root: bool,
    origin: Point,
    size: (u32, u32),
    shown: bool,
    state: ViewState,
    needs_redraw: bool,
}

impl<B: BlurBackend + core::fmt::Debug> core::fmt::Debug for BlurView<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlurView")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("attached", &self.ancestor.is_some())
            .field("different_root", &self.different_root)
            .field("origin", &self.origin)
            .field("size", &self.size)
            .field("shown", &self.shown)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<B: BlurBackend> BlurView<B> {
    /// Create a detached, shown view of size zero.
    pub fn new(config: BlurConfig, backend: B) -> Result<Self, ConfigError> {
        Self::with_options(config, backend, PipelineOptions::default())
    }

    /// Create a view whose pipeline uses `options`.
    pub fn with_options(
        config: BlurConfig,
        backend: B,
        options: PipelineOptions,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pipeline = BlurPipeline::with_options(&config, backend, options)?;
        Ok(Self {
            config,
            pipeline,
            compositor: ShapeCompositor::new(),
            ancestor: None,
            listener: None,
            different_root: false,
            origin: Point::ZERO,
            size: (0, 0),
            shown: true,
            state: ViewState::NONE,
            needs_redraw: false,
        })
    }

    /// Replace the pipeline, for example to give it a different
    /// [`RenderingState`](crate::RenderingState).
    pub fn map_pipeline(mut self, f: impl FnOnce(BlurPipeline<B>) -> BlurPipeline<B>) -> Self {
        self.pipeline = f(self.pipeline);
        self
    }

    /// Start blurring `ancestor`.
    ///
    /// The view registers itself with `observer` and from then on snapshots the ancestor on
    /// every dispatch. `different_root` states that the view lives in another window than
    /// the ancestor, in which case the ancestor is invalidated now and the view requests a
    /// redraw after every snapshot.
    pub fn attach(
        view: &Rc<RefCell<Self>>,
        observer: &mut PreDrawObserver,
        ancestor: Rc<dyn SnapshotSource>,
        different_root: bool,
    ) where
        B: 'static,
    {
        let id = observer.add_listener(view);
        if different_root {
            ancestor.invalidate();
        }
        let mut this = view.borrow_mut();
        if let Some(previous) = this.listener.replace(id) {
            observer.remove_listener(previous);
        }
        this.ancestor = Some(ancestor);
        this.different_root = different_root;
    }

    /// Stop blurring and free all resources.
    pub fn detach(view: &Rc<RefCell<Self>>, observer: &mut PreDrawObserver) {
        let mut this = view.borrow_mut();
        if let Some(id) = this.listener.take() {
            observer.remove_listener(id);
        }
        this.ancestor = None;
        this.different_root = false;
        this.pipeline.release();
    }

    /// Whether the view is attached to an ancestor.
    pub fn is_attached(&self) -> bool {
        self.ancestor.is_some()
    }

    /// Place the view at `origin` (in screen coordinates) with the given size in pixels.
    pub fn set_layout(&mut self, origin: Point, width: u32, height: u32) {
        if (width, height) != self.size {
            self.needs_redraw = true;
        }
        self.origin = origin;
        self.size = (width, height);
    }

    /// Whether the view and all of its parents are visible.
    pub fn set_shown(&mut self, shown: bool) {
        self.shown = shown;
    }

    /// Change the interaction state, which selects the border color.
    pub fn set_state(&mut self, state: ViewState) {
        let colors = &self.config.border_color;
        let next = colors.color_for_state(state).to_rgba8();
        if next != colors.color_for_state(self.state).to_rgba8() {
            self.needs_redraw = true;
        }
        self.state = state;
    }

    /// Change the blur radius.
    pub fn set_blur_radius(&mut self, radius: f32) -> Result<(), ConfigError> {
        self.pipeline.set_blur_radius(radius)?;
        self.config.radius = radius;
        self.needs_redraw = true;
        Ok(())
    }

    /// Change the downsample factor.
    pub fn set_down_sample_factor(&mut self, factor: f32) -> Result<(), ConfigError> {
        self.pipeline.set_down_sample_factor(factor)?;
        self.config.down_sample_factor = factor;
        self.needs_redraw = true;
        Ok(())
    }

    /// Change the tint.
    pub fn set_overlay_color(&mut self, color: Color) {
        self.pipeline.set_overlay_color(color);
        self.config.overlay_color = color;
        self.needs_redraw = true;
    }

    /// Change the shape.
    pub fn set_shape(&mut self, shape: BlurShape) -> Result<(), ConfigError> {
        let config = BlurConfig {
            shape,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        self.needs_redraw = true;
        Ok(())
    }

    /// Change the border.
    pub fn set_border(&mut self, width: f32, colors: StateColors) -> Result<(), ConfigError> {
        let config = BlurConfig {
            border_width: width,
            border_color: colors,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        self.needs_redraw = true;
        Ok(())
    }

    /// The current configuration.
    pub fn config(&self) -> &BlurConfig {
        &self.config
    }

    /// The blur pipeline.
    pub fn pipeline(&self) -> &BlurPipeline<B> {
        &self.pipeline
    }

    /// A handle for checking whether the view may draw while it is borrowed elsewhere.
    pub fn draw_gate(&self) -> DrawGate {
        self.pipeline.draw_gate()
    }

    /// Whether the view asked to be redrawn since the last call.
    pub fn take_invalidation(&mut self) -> bool {
        core::mem::take(&mut self.needs_redraw)
    }

    /// Draw the blurred background into `canvas`, at the origin.
    ///
    /// While another blur view is snapshotting, nothing is drawn. While this view is
    /// snapshotting, [`DrawError::Reentrancy`] is returned; any other failure is logged.
    pub fn draw(&mut self, canvas: &mut dyn Canvas) -> Result<(), DrawError> {
        if self.pipeline.check_draw()? == DrawPermit::Skip {
            return Ok(());
        }
        let style = CompositeStyle {
            overlay: self.config.overlay_color,
            border_width: self.config.border_width,
            border_color: self.config.border_color.color_for_state(self.state),
        };
        let (width, height) = self.size;
        self.compositor.render(
            canvas,
            self.pipeline.blurred(),
            Size::new(f64::from(width), f64::from(height)),
            &self.config.shape,
            &style,
        );
        Ok(())
    }
}

impl<B: BlurBackend> PreDrawListener for BlurView<B> {
    fn on_pre_draw(&mut self) -> bool {
        let Some(ancestor) = self.ancestor.clone() else {
            return true;
        };
        let (width, height) = self.size;
        let allocations = self.pipeline.buffers().allocations();
        if !self.shown || !self.pipeline.prepare(width, height) {
            return true;
        }
        let offset = self.origin - ancestor.origin_on_screen();
        match self.pipeline.snapshot_and_blur(&*ancestor, offset) {
            Ok(()) => {
                if self.pipeline.buffers().allocations() != allocations || self.different_root {
                    self.needs_redraw = true;
                }
            }
            Err(err) => warn!("Blur skipped for this frame: {err}"),
        }
        true
    }
}
