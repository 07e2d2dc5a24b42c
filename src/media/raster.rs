// SPDX-License-Identifier: GPL-3.0-only

//! Owned row-major pixel buffers

use crate::errors::FilterError;
use serde::{Deserialize, Serialize};

/// Bytes per pixel of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    /// One luma byte per pixel
    Grey,
    /// Red, green, blue bytes per pixel
    #[default]
    Rgb,
}

impl Channels {
    /// Number of bytes per pixel
    pub const fn count(self) -> usize {
        match self {
            Channels::Grey => 1,
            Channels::Rgb => 3,
        }
    }
}

/// Row-major pixel buffer
///
/// The length of the backing buffer is always exactly
/// `width × height × channels`; every constructor enforces it and the buffer
/// is only handed out as a slice, so it cannot be resized in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl Raster {
    /// Create a black raster
    pub fn new(width: u32, height: u32, channels: Channels) -> Self {
        let len = Self::byte_len(width, height, channels);
        Self {
            width,
            height,
            channels,
            data: vec![0; len],
        }
    }

    /// Create a black raster, reporting allocation failure instead of aborting
    pub fn try_new(width: u32, height: u32, channels: Channels) -> Result<Self, FilterError> {
        let len = Self::byte_len(width, height, channels);
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| FilterError::Allocation { bytes: len })?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Wrap an existing buffer, returning `None` if its length does not match
    pub fn from_raw(width: u32, height: u32, channels: Channels, data: Vec<u8>) -> Option<Self> {
        (data.len() == Self::byte_len(width, height, channels)).then_some(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Allocate a black raster with the same geometry as this one
    pub fn try_alloc_like(&self) -> Result<Self, FilterError> {
        Self::try_new(self.width, self.height, self.channels)
    }

    fn byte_len(width: u32, height: u32, channels: Channels) -> usize {
        width as usize * height as usize * channels.count()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Bytes per scanline
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels.count()
    }

    /// Total size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Bytes of the pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels.count();
        let start = y as usize * self.stride() + x as usize * c;
        &self.data[start..start + c]
    }

    /// Mutable bytes of the pixel at (x, y)
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let c = self.channels.count();
        let start = y as usize * self.stride() + x as usize * c;
        &mut self.data[start..start + c]
    }

    /// Iterate scanlines top to bottom
    pub fn rows(&self) -> std::slice::ChunksExact<'_, u8> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.stride().max(1))
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Raster({}x{} {:?}, {} bytes)",
            self.width,
            self.height,
            self.channels,
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_raster_size() {
        let raster = Raster::new(4, 3, Channels::Rgb);
        assert_eq!(raster.len(), 36);
        assert_eq!(raster.stride(), 12);
        assert!(raster.as_raw().iter().all(|&b| b == 0));

        let grey = Raster::new(4, 3, Channels::Grey);
        assert_eq!(grey.len(), 12);
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        assert!(Raster::from_raw(2, 2, Channels::Rgb, vec![0; 11]).is_none());
        assert!(Raster::from_raw(2, 2, Channels::Rgb, vec![0; 12]).is_some());
    }

    #[test]
    fn test_pixel_access() {
        let data = (0..12).collect();
        let mut raster = Raster::from_raw(2, 2, Channels::Rgb, data).unwrap();
        assert_eq!(raster.pixel(1, 1), &[9, 10, 11]);
        raster.pixel_mut(0, 1).copy_from_slice(&[1, 2, 3]);
        assert_eq!(&raster.as_raw()[6..9], &[1, 2, 3]);
    }

    #[test]
    fn test_rows_of_empty_raster() {
        let raster = Raster::new(0, 0, Channels::Rgb);
        assert_eq!(raster.rows().count(), 0);
    }
}
