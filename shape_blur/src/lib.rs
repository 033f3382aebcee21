// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live, shape-masked background blur for retained UI trees.
//!
//! A [`BlurView`] samples the pixels drawn by an ancestor surface, downsamples them, blurs
//! them with a Gaussian-like kernel and composites the result back into a rounded
//! rectangle, a circle or an ellipse, with a tint overlay and an optional border.
//!
//! The work for one frame happens in three steps, all on the render thread:
//!
//! 1. [`BlurPipeline::prepare`] negotiates the effective blur radius and the
//!    downsample factor, sizes the [`SnapshotBuffer`] and (re)configures the
//!    [`BlurBackend`] when the buffers changed.
//! 2. [`BlurPipeline::snapshot_and_blur`] redraws the ancestor into the small source
//!    buffer and blurs it into the result buffer.
//! 3. [`ShapeCompositor::render`] maps the result onto the destination region of the
//!    output [`Canvas`].
//!
//! The host integrates through narrow traits: [`Canvas`] for drawing, [`SnapshotSource`]
//! for the ancestor content and [`PreDrawListener`] for the per-frame trigger.
//! Reference implementations are provided for all of them: [`PixmapCanvas`] draws with
//! `vello_cpu`, [`RecordingCanvas`] captures draw commands, [`CpuBlur`] is a CPU blur
//! backend and [`PreDrawObserver`] dispatches pre-draw notifications.
//!
//! ## Nested blur
//!
//! A blur view that is part of the content it blurs must not draw itself while it is being
//! snapshotted. [`BlurView::draw`] reports this as [`DrawError::Reentrancy`], which aborts
//! the snapshot of whatever the ancestor would have drawn afterwards. Overlapping blur views
//! are not supported: while any view is snapshotting, every other blur view skips drawing.

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![expect(
    clippy::cast_possible_truncation,
    reason = "Buffer dimensions are bounded by `u16` and colors by `u8`; the casts only \
truncate in edge cases that are clamped beforehand."
)]

mod backend;
mod canvas;
mod compositor;
mod config;
mod error;
mod gaussian;
mod guard;
mod observer;
mod pipeline;
mod pixmap;
mod raster;
mod recording;
mod snapshot;
mod view;

pub mod shape;

pub use peniko;
pub use peniko::{color, kurbo};

pub use backend::{BlurBackend, CpuBlur};
pub use canvas::{Canvas, ImageShader, Paint};
pub use compositor::{BlurredFrame, CompositeStyle, ShapeCompositor};
pub use config::{
    color_from_argb, BlurAttributes, BlurConfig, BlurShape, CornerRadii, ShapeKind, StateColors,
    ViewState, DEFAULT_BLUR_RADIUS, DEFAULT_BORDER_COLOR, DEFAULT_DOWN_SAMPLE_FACTOR,
};
pub use error::{
    AllocationError, BackendError, BlurError, ConfigError, DrawError, ReentrancyViolation,
};
pub use guard::{DrawGate, DrawPermit, ReentrancyGuard, RenderingState, SnapshotScope};
pub use observer::{ListenerId, PreDrawListener, PreDrawObserver};
pub use pipeline::{effective_params, BlurPipeline, EffectiveParams, PipelineOptions, MAX_RADIUS};
pub use pixmap::{Pixmap, PixmapExt};
pub use raster::PixmapCanvas;
pub use recording::{DrawCommand, RecordedPaint, RecordingCanvas};
pub use snapshot::SnapshotBuffer;
pub use view::{BlurView, SnapshotSource};
