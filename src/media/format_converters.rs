// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format conversion from the captured frame into a raster
//!
//! The device delivers YUYV (YUV 4:2:2): every 4 bytes encode 2 horizontally
//! adjacent pixels as `Y0 U Y1 V`, the chroma pair shared by both pixels.

use super::raster::{Channels, Raster};

/// Convert one YUV sample to RGB (BT.601, full range)
#[inline]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    [r, g, b]
}

/// Convert tightly packed YUYV to an RGB raster
pub fn yuyv_to_rgb(packed: &[u8], width: u32, height: u32) -> Raster {
    yuyv_to_rgb_strided(packed, width, height, width as usize * 2)
}

/// Convert YUYV with `bytes_per_line` bytes per scanline to an RGB raster
///
/// Pixels the input does not cover (short frame) stay black; a missing chroma
/// byte on an odd trailing pixel reads as neutral 128.
pub fn yuyv_to_rgb_strided(
    packed: &[u8],
    width: u32,
    height: u32,
    bytes_per_line: usize,
) -> Raster {
    let mut raster = Raster::new(width, height, Channels::Rgb);
    let stride = raster.stride();
    let out = raster.as_raw_mut();

    for line in 0..height as usize {
        let row_start = line * bytes_per_line;
        let out_row = &mut out[line * stride..(line + 1) * stride];

        for column in 0..width as usize {
            // Luma advances every pixel, chroma every pixel pair
            let quad = row_start + (column / 2) * 4;
            let Some(&y) = packed.get(quad + (column & 1) * 2) else {
                break;
            };
            let u = packed.get(quad + 1).copied().unwrap_or(128);
            let v = packed.get(quad + 3).copied().unwrap_or(128);

            out_row[column * 3..column * 3 + 3].copy_from_slice(&yuv_to_rgb(y, u, v));
        }
    }

    raster
}

/// Extract the luma plane of YUYV as a greyscale raster
pub fn yuyv_to_luma_strided(
    packed: &[u8],
    width: u32,
    height: u32,
    bytes_per_line: usize,
) -> Raster {
    let mut raster = Raster::new(width, height, Channels::Grey);
    let stride = raster.stride();
    let out = raster.as_raw_mut();

    for line in 0..height as usize {
        let row_start = line * bytes_per_line;
        for column in 0..width as usize {
            let Some(&y) = packed.get(row_start + column * 2) else {
                break;
            };
            out[line * stride + column] = y;
        }
    }

    raster
}

/// Convert a captured YUYV frame into a raster of the requested depth
pub fn convert_yuyv(
    packed: &[u8],
    width: u32,
    height: u32,
    bytes_per_line: usize,
    channels: Channels,
) -> Raster {
    match channels {
        Channels::Rgb => yuyv_to_rgb_strided(packed, width, height, bytes_per_line),
        Channels::Grey => yuyv_to_luma_strided(packed, width, height, bytes_per_line),
    }
}
