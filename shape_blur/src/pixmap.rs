// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel access on top of the Vello [`Pixmap`].

pub use vello_common::pixmap::Pixmap;

use crate::color::PremulRgba8;
use crate::error::AllocationError;

/// Transparent black.
pub(crate) const TRANSPARENT: PremulRgba8 = PremulRgba8 {
    r: 0,
    g: 0,
    b: 0,
    a: 0,
};

/// Create a transparent pixmap, reporting allocation failure instead of aborting.
pub(crate) fn try_alloc(width: u16, height: u16) -> Result<Pixmap, AllocationError> {
    let len = usize::from(width) * usize::from(height);
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| AllocationError::OutOfMemory {
            bytes: len * size_of::<PremulRgba8>(),
        })?;
    buf.resize(len, TRANSPARENT);
    Ok(Pixmap::from_parts(buf, width, height))
}

/// Copy `pixmap` into a new buffer.
pub(crate) fn duplicate(pixmap: &Pixmap) -> Pixmap {
    Pixmap::from_parts(pixmap.data().to_vec(), pixmap.width(), pixmap.height())
}

/// Per-pixel access used by the blur passes and by tests.
pub trait PixmapExt {
    /// Return `(width, height)`.
    fn size(&self) -> (u16, u16);

    /// The pixel at `(x, y)`.
    fn pixel(&self, x: u16, y: u16) -> PremulRgba8;

    /// The pixel at `(x, y)`, with out-of-bounds coordinates clamped to the nearest edge.
    fn pixel_clamped(&self, x: i32, y: i32) -> PremulRgba8;

    /// Overwrite the pixel at `(x, y)`.
    fn put_pixel(&mut self, x: u16, y: u16, pixel: PremulRgba8);

    /// Overwrite every pixel with `color`.
    fn fill(&mut self, color: PremulRgba8);
}

impl PixmapExt for Pixmap {
    fn size(&self) -> (u16, u16) {
        (self.width(), self.height())
    }

    #[inline(always)]
    fn pixel(&self, x: u16, y: u16) -> PremulRgba8 {
        self.data()[usize::from(self.width()) * usize::from(y) + usize::from(x)]
    }

    #[inline(always)]
    fn pixel_clamped(&self, x: i32, y: i32) -> PremulRgba8 {
        let x = x.clamp(0, i32::from(self.width()) - 1) as u16;
        let y = y.clamp(0, i32::from(self.height()) - 1) as u16;
        self.pixel(x, y)
    }

    #[inline(always)]
    fn put_pixel(&mut self, x: u16, y: u16, pixel: PremulRgba8) {
        let idx = usize::from(self.width()) * usize::from(y) + usize::from(x);
        self.data_mut()[idx] = pixel;
    }

    fn fill(&mut self, color: PremulRgba8) {
        self.data_mut().fill(color);
    }
}

#[cfg(test)]
mod tests {
    use super::{duplicate, try_alloc, PixmapExt, TRANSPARENT};
    use crate::color::PremulRgba8;

    const RED: PremulRgba8 = PremulRgba8 {
        r: 255,
        g: 0,
        b: 0,
        a: 255,
    };

    #[test]
    fn try_alloc_is_transparent() {
        let pixmap = try_alloc(3, 2).unwrap();
        assert_eq!(pixmap.size(), (3, 2));
        assert!(pixmap.data().iter().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn clamped_access() {
        let mut pixmap = try_alloc(2, 2).unwrap();
        pixmap.put_pixel(1, 1, RED);
        assert_eq!(pixmap.pixel_clamped(5, 9), RED);
        assert_eq!(pixmap.pixel_clamped(-3, -3), TRANSPARENT);
        assert_eq!(pixmap.data_as_u8_slice()[12..16], [255, 0, 0, 255]);
    }

    #[test]
    fn duplicate_is_independent() {
        let mut pixmap = try_alloc(2, 1).unwrap();
        pixmap.fill(RED);
        let copy = duplicate(&pixmap);
        pixmap.put_pixel(0, 0, TRANSPARENT);
        assert_eq!(copy.data(), &[RED, RED]);
    }
}
