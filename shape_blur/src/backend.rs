// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The blur engine seam, and a CPU implementation of it.

use crate::error::BackendError;
use crate::gaussian::{radius_to_sigma, BlurPlan};
use crate::pipeline::MAX_RADIUS;
use crate::pixmap::{try_alloc, Pixmap, PixmapExt};

/// An engine that blurs one buffer into another with a fixed radius.
///
/// The pipeline calls [`prepare`](Self::prepare) once per buffer generation, then
/// [`blur`](Self::blur) once per frame. Backends must accept repeated `prepare` calls
/// (reconfiguration) and repeated [`release`](Self::release) calls.
pub trait BlurBackend {
    /// Configure the backend for buffers shaped like `buffer` and the given radius in
    /// `(0, 25]`.
    fn prepare(&mut self, buffer: &Pixmap, radius: f32) -> Result<(), BackendError>;

    /// Blur `input` into `output`. Both must have the size of the prepared buffer.
    fn blur(&mut self, input: &Pixmap, output: &mut Pixmap) -> Result<(), BackendError>;

    /// Free all resources. A no-op when nothing is held.
    fn release(&mut self);
}

impl<B: BlurBackend + ?Sized> BlurBackend for Box<B> {
    fn prepare(&mut self, buffer: &Pixmap, radius: f32) -> Result<(), BackendError> {
        (**self).prepare(buffer, radius)
    }

    fn blur(&mut self, input: &Pixmap, output: &mut Pixmap) -> Result<(), BackendError> {
        (**self).blur(input, output)
    }

    fn release(&mut self) {
        (**self).release();
    }
}

#[derive(Debug)]
struct Prepared {
    size: (u16, u16),
    radius: f32,
    plan: BlurPlan,
    scratch: [Pixmap; 2],
}

/// A [`BlurBackend`] running a decimated separable Gaussian on the CPU.
///
/// Working memory is allocated by `prepare` and reused by every `blur` of the same size.
#[derive(Debug, Default)]
pub struct CpuBlur {
    prepared: Option<Prepared>,
}

impl CpuBlur {
    /// Create an unprepared backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// The radius of the current configuration, if prepared.
    pub fn radius(&self) -> Option<f32> {
        self.prepared.as_ref().map(|p| p.radius)
    }
}

impl BlurBackend for CpuBlur {
    fn prepare(&mut self, buffer: &Pixmap, radius: f32) -> Result<(), BackendError> {
        if !(radius > 0.0 && radius <= MAX_RADIUS) {
            return Err(BackendError::InvalidRadius(radius));
        }
        let size = buffer.size();
        let scratch = match self.prepared.take() {
            Some(prepared) if prepared.size == size => prepared.scratch,
            _ => [
                try_alloc(size.0, size.1)?,
                try_alloc(size.0, size.1)?,
            ],
        };
        self.prepared = Some(Prepared {
            size,
            radius,
            plan: BlurPlan::new(radius_to_sigma(radius)),
            scratch,
        });
        Ok(())
    }

    fn blur(&mut self, input: &Pixmap, output: &mut Pixmap) -> Result<(), BackendError> {
        let prepared = self.prepared.as_mut().ok_or(BackendError::NotPrepared)?;
        for actual in [input.size(), output.size()] {
            if actual != prepared.size {
                return Err(BackendError::SizeMismatch {
                    expected: prepared.size,
                    actual,
                });
            }
        }
        prepared.plan.apply(input, output, &mut prepared.scratch);
        Ok(())
    }

    fn release(&mut self) {
        self.prepared = None;
    }
}
