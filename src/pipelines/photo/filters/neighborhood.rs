// SPDX-License-Identifier: GPL-3.0-only

//! 3×3 neighbourhood filters
//!
//! Neighbours are one whole pixel away horizontally and one scanline away
//! vertically, sampled in the same channel. Pixels on the outer border are
//! copied through unchanged.

use super::point::copy_of;
use crate::constants::filters::DESPECKLE_THRESHOLD;
use crate::errors::FilterError;
use crate::media::raster::{Channels, Raster};

/// Read access to the 3×3 window around one byte
struct Window<'a> {
    data: &'a [u8],
    index: usize,
    stride: usize,
    step: usize,
}

impl Window<'_> {
    /// Byte at pixel offset (dx, dy) in the same channel
    #[inline]
    fn at(&self, dx: isize, dy: isize) -> i32 {
        let offset = dy * self.stride as isize + dx * self.step as isize;
        self.data[self.index.wrapping_add_signed(offset)] as i32
    }

    #[inline]
    fn center(&self) -> i32 {
        self.at(0, 0)
    }

    /// Sum of the eight surrounding bytes
    fn ring_sum(&self) -> i32 {
        let mut sum = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx != 0 || dy != 0 {
                    sum += self.at(dx, dy);
                }
            }
        }
        sum
    }
}

/// Apply `kernel` to every interior byte, copying the border
fn convolve(input: &Raster, kernel: impl Fn(&Window) -> u8) -> Result<Raster, FilterError> {
    let mut out = copy_of(input)?;
    let (width, height) = (input.width() as usize, input.height() as usize);
    if width < 3 || height < 3 {
        return Ok(out);
    }

    let step = input.channels().count();
    let stride = input.stride();
    let src = input.as_raw();
    let dst = out.as_raw_mut();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            for channel in 0..step {
                let index = y * stride + x * step + channel;
                dst[index] = kernel(&Window {
                    data: src,
                    index,
                    stride,
                    step,
                });
            }
        }
    }
    Ok(out)
}

/// 3×3 box blur
pub fn lowpass(input: &Raster) -> Result<Raster, FilterError> {
    convolve(input, |w| ((w.center() + w.ring_sum()) / 9) as u8)
}

/// Sharpen: `(8·center − Σ neighbours) / 9`, clamped
pub fn highpass(input: &Raster) -> Result<Raster, FilterError> {
    convolve(input, |w| {
        ((8 * w.center() - w.ring_sum()) / 9).clamp(0, 255) as u8
    })
}

/// `|4·center − left − right − up − down|`, clamped at 255
pub fn laplace(input: &Raster) -> Result<Raster, FilterError> {
    convolve(input, |w| {
        let response = 4 * w.center() - w.at(-1, 0) - w.at(1, 0) - w.at(0, -1) - w.at(0, 1);
        response.abs().min(255) as u8
    })
}

/// Inverted Sobel magnitude: dark edges on a light background
fn sobel_kernel(w: &Window) -> u8 {
    let dx = (w.at(1, -1) + 2 * w.at(1, 0) + w.at(1, 1))
        - (w.at(-1, -1) + 2 * w.at(-1, 0) + w.at(-1, 1));
    let dy = (w.at(-1, -1) + 2 * w.at(0, -1) + w.at(1, -1))
        - (w.at(-1, 1) + 2 * w.at(0, 1) + w.at(1, 1));
    let magnitude = ((dx.abs() + dy.abs()) / 3).min(255);
    (255 - magnitude) as u8
}

/// Sobel edge detection
///
/// Greyscale rasters receive the edge map directly. Color rasters compute the
/// edge map on luma and blend it into every channel as
/// `in + 0.5 × (edge − 128)`, so the image keeps its colors with edges
/// emphasised.
pub fn sobel(input: &Raster) -> Result<Raster, FilterError> {
    if input.channels() == Channels::Grey {
        return convolve(input, sobel_kernel);
    }

    let mut luma = Raster::try_new(input.width(), input.height(), Channels::Grey)?;
    for (dst, src) in luma
        .as_raw_mut()
        .iter_mut()
        .zip(input.as_raw().chunks_exact(3))
    {
        *dst = (0.3 * src[0] as f32 + 0.59 * src[1] as f32 + 0.11 * src[2] as f32) as u8;
    }
    let edges = convolve(&luma, sobel_kernel)?;

    let mut out = copy_of(input)?;
    let (width, height) = (input.width(), input.height());
    if width < 3 || height < 3 {
        return Ok(out);
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let edge = edges.pixel(x, y)[0] as f32;
            for value in out.pixel_mut(x, y) {
                let blended = (*value as f32 + 0.5 * (edge - 128.0)) as i32;
                *value = blended.clamp(0, 255) as u8;
            }
        }
    }
    Ok(out)
}

/// Deviation of one channel from the mean of the other two
#[inline]
fn channel_excess(pixel: &[u8], channel: usize) -> i32 {
    let a = pixel[(channel + 1) % 3] as i32;
    let b = pixel[(channel + 2) % 3] as i32;
    pixel[channel] as i32 - (a + b) / 2
}

/// Remove isolated colored specks
///
/// A channel that stands out from the other two by more than its left and
/// right neighbours combined plus a threshold is replaced by the mean of the
/// neighbours. The first and last column are copied. Greyscale rasters pass
/// through.
pub fn despeckle(input: &Raster) -> Result<Raster, FilterError> {
    let mut out = copy_of(input)?;
    if input.channels() == Channels::Grey || input.width() < 3 {
        return Ok(out);
    }

    for y in 0..input.height() {
        for x in 1..input.width() - 1 {
            let prev = input.pixel(x - 1, y);
            let cur = input.pixel(x, y);
            let next = input.pixel(x + 1, y);
            let dst = out.pixel_mut(x, y);

            for channel in 0..3 {
                let neighbours = channel_excess(prev, channel) + channel_excess(next, channel);
                if channel_excess(cur, channel) > DESPECKLE_THRESHOLD + neighbours {
                    dst[channel] = ((prev[channel] as u32 + next[channel] as u32) / 2) as u8;
                }
            }
        }
    }
    Ok(out)
}
