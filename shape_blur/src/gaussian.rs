// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gaussian blur using multi-scale separable convolution.
//!
//! - **Small blurs** (σ ≤ 2): direct separable convolution at full resolution.
//! - **Large blurs** (σ > 2): downsample → blur → upsample pyramid.
//!
//! Each 2× decimation applies a \[1,3,3,1\]/8 binomial filter (adding variance 0.75 per
//! axis before the downsampling, 3.0 in the coordinates of the finer level). Variances add
//! up, `σ²_total = σ²_downsample + σ²_blur`, so most of the work happens at low resolution.
//!
//! All passes read one buffer and write another. The two scratch buffers are allocated
//! once at full size and only ever shrunk logically, and the sizes of the pyramid levels
//! live on the stack, which keeps [`BlurPlan::apply`] free of allocations.

use core::f32::consts::E;

use smallvec::SmallVec;

use crate::color::PremulRgba8;
use crate::pixmap::{Pixmap, PixmapExt};

/// Maximum size of the Gaussian kernel (must be odd).
///
/// Large blurs use decimation, so this limit only applies to the reduced blur at the
/// coarsest resolution.
pub(crate) const MAX_KERNEL_SIZE: usize = 17;

/// Decimation levels whose sizes [`BlurPlan::apply`] keeps on the stack.
///
/// A radius of 25 needs three.
pub(crate) const INLINE_DECIMATIONS: usize = 8;

/// Map a blur radius to the standard deviation of the Gaussian.
///
/// This is the mapping conventionally used by intrinsic blur kernels, so a radius of
/// `25` gives σ = 10.6.
pub(crate) fn radius_to_sigma(radius: f32) -> f32 {
    radius * 0.4 + 0.6
}

/// A precomputed blur: decimation depth and the kernel for the reduced blur.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlurPlan {
    /// Number of 2× decimation levels (0 means direct convolution).
    pub(crate) n_decimations: usize,
    kernel: [f32; MAX_KERNEL_SIZE],
    kernel_size: usize,
}

impl BlurPlan {
    /// Compute the blur execution plan for a standard deviation.
    pub(crate) fn new(std_deviation: f32) -> Self {
        if std_deviation <= 0.0 {
            let mut kernel = [0.0; MAX_KERNEL_SIZE];
            kernel[0] = 1.0;
            return Self {
                n_decimations: 0,
                kernel,
                kernel_size: 1,
            };
        }

        let mut n_decimations = 0;
        let mut remaining_variance = std_deviation * std_deviation;
        // Stop when the remaining σ is about 2; further decimation isn't worth it.
        while remaining_variance > 4.0 {
            remaining_variance = (remaining_variance - 3.0) * 0.25;
            n_decimations += 1;
        }
        let (kernel, kernel_size) = compute_gaussian_kernel(remaining_variance.sqrt());

        Self {
            n_decimations,
            kernel,
            kernel_size,
        }
    }

    pub(crate) fn kernel(&self) -> &[f32] {
        &self.kernel[..self.kernel_size]
    }

    /// Blur `input` into `output`, using `scratch` as working memory.
    ///
    /// `output` and both scratch buffers must have at least the capacity of `input`.
    pub(crate) fn apply(&self, input: &Pixmap, output: &mut Pixmap, scratch: &mut [Pixmap; 2]) {
        let kernel = self.kernel();
        let [tmp, cur] = scratch;

        if self.n_decimations == 0 {
            convolve_x(input, tmp, kernel);
            convolve_y(tmp, output, kernel);
            return;
        }

        let mut sizes: SmallVec<[(u16, u16); INLINE_DECIMATIONS]> = SmallVec::new();
        sizes.push(input.size());
        downscale_x(input, tmp);
        downscale_y(tmp, cur);
        for _ in 1..self.n_decimations {
            sizes.push(cur.size());
            downscale_x(cur, tmp);
            downscale_y(tmp, cur);
        }

        convolve_x(cur, tmp, kernel);
        convolve_y(tmp, cur, kernel);

        while let Some((width, height)) = sizes.pop() {
            upscale_x(cur, tmp, width);
            if sizes.is_empty() {
                upscale_y(tmp, output, height);
            } else {
                upscale_y(tmp, cur, height);
            }
        }
        debug_assert_eq!(output.size(), input.size(), "final size should match the input");
    }
}

/// Compute 1D Gaussian kernel weights for separable convolution.
///
/// Returns `(weights, kernel_size)` where `kernel_size = 2×radius + 1`, with
/// radius = 3σ, truncated to [`MAX_KERNEL_SIZE`]. Weights sum to 1.
pub(crate) fn compute_gaussian_kernel(std_deviation: f32) -> ([f32; MAX_KERNEL_SIZE], usize) {
    let radius = (3.0 * std_deviation).ceil() as usize;
    let kernel_size = (1 + radius * 2).min(MAX_KERNEL_SIZE);

    let mut kernel = [0.0; MAX_KERNEL_SIZE];
    let gaussian_denominator = 2.0 * std_deviation * std_deviation;
    let kernel_center = (kernel_size / 2) as f32;
    let mut sum = 0.0;
    for (i, weight) in kernel.iter_mut().enumerate().take(kernel_size) {
        let x = (i as f32) - kernel_center;
        *weight = E.powf(-x * x / gaussian_denominator);
        sum += *weight;
    }

    let scale = 1.0 / sum;
    for weight in kernel.iter_mut().take(kernel_size) {
        *weight *= scale;
    }

    (kernel, kernel_size)
}

/// Horizontal pass: `dst[x] = Σ k[j] × src[x + j − r]`, clamped at the edges.
fn convolve_x(src: &Pixmap, dst: &mut Pixmap, kernel: &[f32]) {
    let radius = (kernel.len() / 2) as i32;
    let (width, height) = src.size();
    dst.resize(width, height);
    for y in 0..height {
        for x in 0..width {
            let mut rgba = [0.0_f32; 4];
            for (j, &k) in kernel.iter().enumerate() {
                let p = src.pixel_clamped(i32::from(x) + j as i32 - radius, i32::from(y));
                accumulate(&mut rgba, p, k);
            }
            dst.put_pixel(x, y, quantize(rgba));
        }
    }
}

/// Vertical pass: `dst[y] = Σ k[j] × src[y + j − r]`, clamped at the edges.
fn convolve_y(src: &Pixmap, dst: &mut Pixmap, kernel: &[f32]) {
    let radius = (kernel.len() / 2) as i32;
    let (width, height) = src.size();
    dst.resize(width, height);
    for y in 0..height {
        for x in 0..width {
            let mut rgba = [0.0_f32; 4];
            for (j, &k) in kernel.iter().enumerate() {
                let p = src.pixel_clamped(i32::from(x), i32::from(y) + j as i32 - radius);
                accumulate(&mut rgba, p, k);
            }
            dst.put_pixel(x, y, quantize(rgba));
        }
    }
}

#[inline(always)]
fn accumulate(rgba: &mut [f32; 4], p: PremulRgba8, k: f32) {
    rgba[0] += f32::from(p.r) * k;
    rgba[1] += f32::from(p.g) * k;
    rgba[2] += f32::from(p.b) * k;
    rgba[3] += f32::from(p.a) * k;
}

#[inline(always)]
fn quantize(rgba: [f32; 4]) -> PremulRgba8 {
    let q = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    PremulRgba8 {
        r: q(rgba[0]),
        g: q(rgba[1]),
        b: q(rgba[2]),
        a: q(rgba[3]),
    }
}

/// Halve the width with the \[1,3,3,1\]/8 filter; taps at `2x-1 ..= 2x+2`.
fn downscale_x(src: &Pixmap, dst: &mut Pixmap) {
    let (width, height) = src.size();
    dst.resize(width.div_ceil(2), height);
    for y in 0..height {
        let y = i32::from(y);
        for x in 0..dst.width() {
            let sx = i32::from(x) * 2;
            let p = |dx: i32| src.pixel_clamped(sx + dx, y);
            dst.put_pixel(x, y as u16, decimate_weighted(p(-1), p(0), p(1), p(2)));
        }
    }
}

/// Halve the height with the \[1,3,3,1\]/8 filter; taps at `2y-1 ..= 2y+2`.
fn downscale_y(src: &Pixmap, dst: &mut Pixmap) {
    let (width, height) = src.size();
    dst.resize(width, height.div_ceil(2));
    for y in 0..dst.height() {
        let sy = i32::from(y) * 2;
        for x in 0..width {
            let p = |dy: i32| src.pixel_clamped(i32::from(x), sy + dy);
            dst.put_pixel(x, y, decimate_weighted(p(-1), p(0), p(1), p(2)));
        }
    }
}

/// Upsample to `target_width` using phase-aligned \[0.25, 0.75\] interpolation.
///
/// The \[1,3,3,1\] decimation puts the center of coarse pixel `k` at `2k + 0.5`, so
/// fine pixel `2k` is 0.5 away from it and 1.5 away from coarse pixel `k - 1`, and fine
/// pixel `2k + 1` is 0.5 away from it and 1.5 away from coarse pixel `k + 1`.
fn upscale_x(src: &Pixmap, dst: &mut Pixmap, target_width: u16) {
    let height = src.height();
    dst.resize(target_width, height);
    for y in 0..height {
        let sy = i32::from(y);
        for x in 0..target_width {
            let k = i32::from(x / 2);
            let p = |sx: i32| src.pixel_clamped(sx, sy);
            let pixel = if x % 2 == 0 {
                interpolate_25_75(p(k - 1), p(k))
            } else {
                interpolate_75_25(p(k), p(k + 1))
            };
            dst.put_pixel(x, y, pixel);
        }
    }
}

/// Vertical counterpart of [`upscale_x`].
fn upscale_y(src: &Pixmap, dst: &mut Pixmap, target_height: u16) {
    let width = src.width();
    dst.resize(width, target_height);
    for y in 0..target_height {
        let k = i32::from(y / 2);
        for x in 0..width {
            let p = |sy: i32| src.pixel_clamped(i32::from(x), sy);
            let pixel = if y % 2 == 0 {
                interpolate_25_75(p(k - 1), p(k))
            } else {
                interpolate_75_25(p(k), p(k + 1))
            };
            dst.put_pixel(x, y, pixel);
        }
    }
}

/// `(p0 + 3×p1 + 3×p2 + p3) / 8`.
#[inline(always)]
fn decimate_weighted(
    p0: PremulRgba8,
    p1: PremulRgba8,
    p2: PremulRgba8,
    p3: PremulRgba8,
) -> PremulRgba8 {
    let f = |a: u8, b: u8, c: u8, d: u8| {
        ((u32::from(a) + u32::from(b) * 3 + u32::from(c) * 3 + u32::from(d)) >> 3) as u8
    };
    PremulRgba8 {
        r: f(p0.r, p1.r, p2.r, p3.r),
        g: f(p0.g, p1.g, p2.g, p3.g),
        b: f(p0.b, p1.b, p2.b, p3.b),
        a: f(p0.a, p1.a, p2.a, p3.a),
    }
}

/// `0.25×p0 + 0.75×p1`.
#[inline(always)]
fn interpolate_25_75(p0: PremulRgba8, p1: PremulRgba8) -> PremulRgba8 {
    let f = |a: u8, b: u8| ((u32::from(a) + u32::from(b) * 3) >> 2) as u8;
    PremulRgba8 {
        r: f(p0.r, p1.r),
        g: f(p0.g, p1.g),
        b: f(p0.b, p1.b),
        a: f(p0.a, p1.a),
    }
}

/// `0.75×p0 + 0.25×p1`.
#[inline(always)]
fn interpolate_75_25(p0: PremulRgba8, p1: PremulRgba8) -> PremulRgba8 {
    interpolate_25_75(p1, p0)
}
