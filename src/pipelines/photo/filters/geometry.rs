// SPDX-License-Identifier: GPL-3.0-only

//! Geometric filters operating on whole pixels

use crate::errors::FilterError;
use crate::media::raster::Raster;

/// Vertical mirror: row `r` of the output is row `height - 1 - r` of the input
pub fn flip(input: &Raster) -> Result<Raster, FilterError> {
    let mut out = input.try_alloc_like()?;
    let stride = input.stride().max(1);
    for (dst, src) in out
        .as_raw_mut()
        .chunks_exact_mut(stride)
        .zip(input.rows().rev())
    {
        dst.copy_from_slice(src);
    }
    Ok(out)
}

/// Horizontal mirror, moving whole pixels so channel order is preserved
pub fn mirror(input: &Raster) -> Result<Raster, FilterError> {
    let mut out = input.try_alloc_like()?;
    let depth = input.channels().count();
    let stride = input.stride().max(1);
    for (dst, src) in out.as_raw_mut().chunks_exact_mut(stride).zip(input.rows()) {
        for (dst_pixel, src_pixel) in dst
            .chunks_exact_mut(depth)
            .zip(src.chunks_exact(depth).rev())
        {
            dst_pixel.copy_from_slice(src_pixel);
        }
    }
    Ok(out)
}

/// Round up, but treat values within floating error of an integer as exact
fn canvas_extent(value: f64) -> u32 {
    let nearest = value.round();
    if (value - nearest).abs() < 1e-6 {
        nearest as u32
    } else {
        value.ceil() as u32
    }
}

/// Rotate counterclockwise about the center by `degrees`
///
/// The canvas grows to the bounding box of the rotated image. Each source
/// pixel is placed at the nearest destination pixel of its polar remap, so
/// angles that are not multiples of 90 can leave unfilled (black) holes.
pub fn rotate(input: &Raster, degrees: i32) -> Result<Raster, FilterError> {
    let theta = (degrees as f64).to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (input.width() as f64, input.height() as f64);

    let new_width = canvas_extent(w * cos.abs() + h * sin.abs());
    let new_height = canvas_extent(w * sin.abs() + h * cos.abs());

    let mut out = Raster::try_new(new_width, new_height, input.channels())?;
    let (src_cx, src_cy) = (w / 2.0, h / 2.0);
    let (dst_cx, dst_cy) = (new_width as f64 / 2.0, new_height as f64 / 2.0);

    for y in 0..input.height() {
        for x in 0..input.width() {
            // Pixel centers relative to the rotation point
            let dx = x as f64 + 0.5 - src_cx;
            let dy = y as f64 + 0.5 - src_cy;
            let radius = dx.hypot(dy);
            let angle = dy.atan2(dx) - theta;

            let tx = (dst_cx + radius * angle.cos()).floor();
            let ty = (dst_cy + radius * angle.sin()).floor();
            if tx < 0.0 || ty < 0.0 || tx >= new_width as f64 || ty >= new_height as f64 {
                continue;
            }

            out.pixel_mut(tx as u32, ty as u32)
                .copy_from_slice(input.pixel(x, y));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::raster::Channels;

    fn grid(width: u32, height: u32) -> Raster {
        let data = (0..width * height * 3).map(|v| v as u8).collect();
        Raster::from_raw(width, height, Channels::Rgb, data).unwrap()
    }

    #[test]
    fn test_flip_reverses_rows() {
        let input = grid(2, 3);
        let out = flip(&input).unwrap();
        assert_eq!(out.pixel(0, 0), input.pixel(0, 2));
        assert_eq!(out.pixel(1, 2), input.pixel(1, 0));
        assert_eq!(flip(&out).unwrap(), input);
    }

    #[test]
    fn test_mirror_keeps_channel_order() {
        let input = Raster::from_raw(2, 1, Channels::Rgb, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let out = mirror(&input).unwrap();
        assert_eq!(out.as_raw(), &[4, 5, 6, 1, 2, 3]);
        assert_eq!(mirror(&out).unwrap(), input);
    }

    #[test]
    fn test_mirror_grey() {
        let input = Raster::from_raw(3, 1, Channels::Grey, vec![1, 2, 3]).unwrap();
        assert_eq!(mirror(&input).unwrap().as_raw(), &[3, 2, 1]);
    }

    #[test]
    fn test_rotate_zero_is_identity() {
        let input = grid(5, 3);
        assert_eq!(rotate(&input, 0).unwrap(), input);
        assert_eq!(rotate(&input, 360).unwrap(), input);
    }

    #[test]
    fn test_rotate_quarter_turn_swaps_dimensions() {
        let out = rotate(&grid(6, 4), 90).unwrap();
        assert_eq!((out.width(), out.height()), (4, 6));
        assert_eq!(out.len(), 4 * 6 * 3);
    }

    #[test]
    fn test_rotate_half_turn_reverses_row() {
        let input = Raster::from_raw(2, 1, Channels::Rgb, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let out = rotate(&input, 180).unwrap();
        assert_eq!(out.as_raw(), &[4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_rotate_diagonal_grows_canvas() {
        let out = rotate(&grid(10, 10), 45).unwrap();
        // 10·cos45 + 10·sin45 = 14.14…
        assert_eq!((out.width(), out.height()), (15, 15));
    }
}
