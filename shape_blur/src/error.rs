// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types, one per failure domain.

use thiserror::Error;

/// Failure to allocate a pixel buffer.
///
/// Always recoverable: the blur is simply unavailable until a later prepare succeeds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    /// A dimension does not fit into a pixmap.
    #[error("Buffer of {width}x{height} pixels exceeds the maximum pixmap extent")]
    TooLarge {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// The configured pixel budget would be exceeded.
    #[error("Buffers need {requested} pixels but the budget is {budget}")]
    OverBudget {
        /// Total pixels needed by all buffers.
        requested: usize,
        /// The configured budget.
        budget: usize,
    },
    /// The allocator refused the request.
    #[error("Out of memory while allocating {bytes} bytes")]
    OutOfMemory {
        /// Size of the refused allocation.
        bytes: usize,
    },
}

/// Failure reported by a [`BlurBackend`](crate::BlurBackend).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The backend could not be initialised at all.
    #[error("Blur backend unavailable: {0}")]
    Init(String),
    /// The radius is outside of `(0, 25]`.
    #[error("Blur radius {0} is outside of the supported range")]
    InvalidRadius(f32),
    /// `blur` was called before a successful `prepare`.
    #[error("Blur backend used before being prepared")]
    NotPrepared,
    /// The buffers passed to `blur` do not match the prepared size.
    #[error("Expected {expected:?} buffers but got {actual:?}")]
    SizeMismatch {
        /// Size the backend was prepared for.
        expected: (u16, u16),
        /// Size of the offending buffer.
        actual: (u16, u16),
    },
    /// The backend's working memory could not be allocated.
    #[error("Blur backend allocation failed")]
    Allocation(#[from] AllocationError),
}

impl BackendError {
    /// Whether this error means the backend itself is missing or misconfigured, rather
    /// than a problem with a single request.
    pub fn is_init_failure(&self) -> bool {
        matches!(self, Self::Init(_))
    }
}

/// A blur view tried to draw itself while it was being snapshotted.
///
/// This is a logic error in the view hierarchy, not a runtime condition, and is the only
/// error which [`BlurView::draw`](crate::BlurView::draw) propagates.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Blur view drawn while it is snapshotting its own ancestor")]
pub struct ReentrancyViolation;

/// Failure while issuing draw calls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DrawError {
    /// See [`ReentrancyViolation`].
    #[error(transparent)]
    Reentrancy(#[from] ReentrancyViolation),
    /// Geometry or transform with non-finite or degenerate values.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(&'static str),
    /// Any other failure of the host canvas.
    #[error("Draw failed: {0}")]
    Failed(String),
}

/// Invalid configuration value.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Blur radius must be finite and not negative.
    #[error("Invalid blur radius {0}")]
    InvalidRadius(f32),
    /// Downsample factor must be finite and at least 1.
    #[error("Invalid downsample factor {0}, must be at least 1")]
    InvalidDownSampleFactor(f32),
    /// Border width must be finite and not negative.
    #[error("Invalid border width {0}")]
    InvalidBorderWidth(f32),
    /// Corner radii must be finite and not negative.
    #[error("Invalid corner radius {0}")]
    InvalidCornerRadius(f32),
}

/// Errors from [`BlurPipeline`](crate::BlurPipeline) operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlurError {
    /// See [`AllocationError`].
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    /// See [`BackendError`].
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// A snapshot was requested without a successful prepare.
    #[error("Snapshot requested before buffers were prepared")]
    NotPrepared,
}
