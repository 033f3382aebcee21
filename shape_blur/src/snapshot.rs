// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ownership of the downsampled source and blurred result buffers.

use crate::compositor::BlurredFrame;
use crate::error::AllocationError;
use crate::pixmap::{try_alloc, Pixmap};
use crate::raster::PixmapCanvas;

/// The two equally sized buffers a blur works on.
///
/// The source buffer is wrapped in a [`PixmapCanvas`] so that the ancestor can draw into
/// it. Both buffers are created and released together.
///
/// Every time the buffers are replaced, and every time the blurred result is rewritten,
/// the [`generation`](Self::generation) increases. It identifies the content of the
/// result buffer, so anything derived from it can be cached by generation.
#[derive(Debug, Default)]
pub struct SnapshotBuffer {
    buffers: Option<(PixmapCanvas, Pixmap)>,
    generation: u64,
    allocations: u64,
    max_pixels: Option<usize>,
}

impl SnapshotBuffer {
    /// Create an empty snapshot buffer without a pixel budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty snapshot buffer which refuses to hold more than `max_pixels` pixels
    /// in total (both buffers counted).
    pub fn with_budget(max_pixels: Option<usize>) -> Self {
        Self {
            max_pixels,
            ..Self::default()
        }
    }

    /// Make sure both buffers exist and are `width` by `height` pixels.
    ///
    /// Returns whether the buffers were (re)allocated. On failure nothing is held
    /// afterwards.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> Result<bool, AllocationError> {
        if self.size() == Some((width, height)) {
            return Ok(false);
        }
        self.release();
        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(AllocationError::TooLarge { width, height });
        };
        let requested = usize::from(w) * usize::from(h) * 2;
        if let Some(budget) = self.max_pixels {
            if requested > budget {
                return Err(AllocationError::OverBudget { requested, budget });
            }
        }
        // Both or neither: a failure on the second buffer drops the first.
        let source = try_alloc(w, h)?;
        let result = try_alloc(w, h)?;
        self.buffers = Some((PixmapCanvas::from_pixmap(source), result));
        self.allocations += 1;
        self.generation += 1;
        Ok(true)
    }

    /// Free both buffers. A no-op when nothing is held.
    pub fn release(&mut self) {
        self.buffers = None;
    }

    /// Whether the buffers are allocated.
    pub fn is_allocated(&self) -> bool {
        self.buffers.is_some()
    }

    /// The size of both buffers, if allocated.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.buffers
            .as_ref()
            .map(|(_, result)| (u32::from(result.width()), u32::from(result.height())))
    }

    /// Identifies the current content of the result buffer.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Counts how many times the buffers were allocated.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Record that the result buffer was rewritten.
    pub(crate) fn bump_generation(&mut self) {
        self.generation += 1;
    }

    /// The source buffer, as drawn by the last snapshot.
    pub fn source(&mut self) -> Option<&Pixmap> {
        self.buffers.as_mut().map(|(canvas, _)| canvas.pixmap())
    }

    /// The blurred result.
    pub fn result(&self) -> Option<&Pixmap> {
        self.buffers.as_ref().map(|(_, result)| result)
    }

    /// The blurred result tagged with its generation.
    pub fn blurred(&self) -> Option<BlurredFrame<'_>> {
        self.result().map(|pixmap| BlurredFrame {
            pixmap,
            generation: self.generation,
        })
    }

    /// The source canvas and the result buffer, for a snapshot and blur.
    pub(crate) fn parts_mut(&mut self) -> Option<(&mut PixmapCanvas, &mut Pixmap)> {
        self.buffers
            .as_mut()
            .map(|(canvas, result)| (canvas, result))
    }
}
