// SPDX-License-Identifier: GPL-3.0-only

//! Per-pixel filters

use crate::errors::FilterError;
use crate::media::raster::{Channels, Raster};

/// Copy `input` into a freshly allocated raster
pub(super) fn copy_of(input: &Raster) -> Result<Raster, FilterError> {
    let mut out = input.try_alloc_like()?;
    out.as_raw_mut().copy_from_slice(input.as_raw());
    Ok(out)
}

fn map_bytes(input: &Raster, f: impl Fn(u8) -> u8) -> Result<Raster, FilterError> {
    let mut out = input.try_alloc_like()?;
    for (dst, &src) in out.as_raw_mut().iter_mut().zip(input.as_raw()) {
        *dst = f(src);
    }
    Ok(out)
}

pub fn brightness(input: &Raster, amount: u8) -> Result<Raster, FilterError> {
    map_bytes(input, |b| b.saturating_add(amount))
}

/// Lookup table for `255 × (a / 255)^(g / 255)`, rounded
pub fn gamma_table(g: u8) -> [u8; 256] {
    let exponent = g as f64 / 255.0;
    std::array::from_fn(|a| (255.0 * (a as f64 / 255.0).powf(exponent)).round() as u8)
}

pub fn gamma(input: &Raster, g: u8) -> Result<Raster, FilterError> {
    let table = gamma_table(g);
    map_bytes(input, |b| table[b as usize])
}

pub fn negative(input: &Raster) -> Result<Raster, FilterError> {
    map_bytes(input, |b| 255 - b)
}

/// Luminosity greyscale, written back to all three channels
///
/// Integer weights 21/71/7 over 99 with rounding, so a grey pixel maps to
/// itself and the filter is idempotent. Greyscale rasters pass through.
pub fn greyscale(input: &Raster) -> Result<Raster, FilterError> {
    if input.channels() == Channels::Grey {
        return copy_of(input);
    }

    let mut out = input.try_alloc_like()?;
    for (dst, src) in out
        .as_raw_mut()
        .chunks_exact_mut(3)
        .zip(input.as_raw().chunks_exact(3))
    {
        let luma = (21 * src[0] as u32 + 71 * src[1] as u32 + 7 * src[2] as u32 + 49) / 99;
        dst.fill(luma as u8);
    }
    Ok(out)
}

/// Salt-and-pepper noise
///
/// `size × density / 255` bytes are touched, rounded up to whole salt/pepper
/// pairs: one byte forced to 255 and one to 0, at uniformly random positions.
pub fn noise(input: &Raster, density: u8, rng: &mut fastrand::Rng) -> Result<Raster, FilterError> {
    let mut out = copy_of(input)?;
    let size = out.len();
    if size == 0 {
        return Ok(out);
    }

    let count = (size as f64 * density as f64 / 255.0) as usize;
    let data = out.as_raw_mut();
    for _ in 0..count.div_ceil(2) {
        data[rng.usize(..size)] = 255;
        data[rng.usize(..size)] = 0;
    }
    Ok(out)
}

/// Keep only the strictly dominant channel of each pixel
///
/// The unique maximum channel becomes 255 and the others 0; a pixel without a
/// unique maximum becomes black. Greyscale rasters pass through.
pub fn predator(input: &Raster) -> Result<Raster, FilterError> {
    if input.channels() == Channels::Grey {
        return copy_of(input);
    }

    let mut out = input.try_alloc_like()?;
    for (dst, src) in out
        .as_raw_mut()
        .chunks_exact_mut(3)
        .zip(input.as_raw().chunks_exact(3))
    {
        let (r, g, b) = (src[0], src[1], src[2]);
        let dominant = if r > g && r > b {
            Some(0)
        } else if g > r && g > b {
            Some(1)
        } else if b > r && b > g {
            Some(2)
        } else {
            None
        };
        // dst is already zeroed
        if let Some(channel) = dominant {
            dst[channel] = 255;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(data: Vec<u8>) -> Raster {
        let width = (data.len() / 3) as u32;
        Raster::from_raw(width, 1, Channels::Rgb, data).unwrap()
    }

    #[test]
    fn test_brightness_saturates() {
        let out = brightness(&rgb(vec![0, 100, 250]), 10).unwrap();
        assert_eq!(out.as_raw(), &[10, 110, 255]);
    }

    #[test]
    fn test_negative_is_involution() {
        let input = rgb(vec![0, 17, 255, 128, 64, 1]);
        let twice = negative(&negative(&input).unwrap()).unwrap();
        assert_eq!(twice, input);
    }

    #[test]
    fn test_gamma_table_endpoints() {
        let identity = gamma_table(255);
        assert!(identity.iter().enumerate().all(|(i, &v)| v as usize == i));

        // Exponent zero: everything, even 0, maps to white
        assert!(gamma_table(0).iter().all(|&v| v == 255));

        let half = gamma_table(128);
        assert_eq!(half[0], 0);
        assert_eq!(half[255], 255);
        assert!(half[64] > 64);
    }

    #[test]
    fn test_greyscale_weights() {
        let out = greyscale(&rgb(vec![255, 0, 0, 0, 255, 0, 0, 0, 255])).unwrap();
        // (21*255+49)/99 = 54, (71*255+49)/99 = 183, (7*255+49)/99 = 18
        assert_eq!(out.as_raw(), &[54, 54, 54, 183, 183, 183, 18, 18, 18]);
    }

    #[test]
    fn test_greyscale_is_idempotent() {
        let input = rgb(vec![12, 200, 77, 255, 255, 255, 3, 9, 250]);
        let once = greyscale(&input).unwrap();
        assert_eq!(greyscale(&once).unwrap(), once);
    }

    #[test]
    fn test_greyscale_on_grey_raster_copies() {
        let input = Raster::from_raw(2, 1, Channels::Grey, vec![5, 6]).unwrap();
        assert_eq!(greyscale(&input).unwrap(), input);
    }

    #[test]
    fn test_noise_density_zero_is_identity() {
        let input = rgb(vec![9; 30]);
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(noise(&input, 0, &mut rng).unwrap(), input);
    }

    #[test]
    fn test_noise_only_writes_extremes() {
        let input = rgb(vec![128; 300]);
        let mut rng = fastrand::Rng::with_seed(42);
        let out = noise(&input, 255, &mut rng).unwrap();
        assert!(out.as_raw().iter().all(|&b| b == 0 || b == 128 || b == 255));
        assert!(out.as_raw().iter().any(|&b| b != 128));
    }

    #[test]
    fn test_noise_single_pixel_at_full_density() {
        let grey = Raster::from_raw(1, 1, Channels::Grey, vec![128]).unwrap();
        let mut rng = fastrand::Rng::with_seed(3);
        assert_eq!(noise(&grey, 255, &mut rng).unwrap().as_raw(), &[0]);

        let mut rng = fastrand::Rng::with_seed(3);
        let out = noise(&rgb(vec![128; 3]), 255, &mut rng).unwrap();
        assert_ne!(out.as_raw(), &[128, 128, 128]);
    }

    #[test]
    fn test_predator_dominant_and_ties() {
        let out = predator(&rgb(vec![200, 10, 10, 10, 10, 200, 90, 90, 10])).unwrap();
        assert_eq!(out.as_raw(), &[255, 0, 0, 0, 0, 255, 0, 0, 0]);
    }

    #[test]
    fn test_predator_all_equal_is_black() {
        let out = predator(&rgb(vec![7, 7, 7, 255, 255, 255])).unwrap();
        assert_eq!(out.as_raw(), &[0; 6]);
    }
}
