// SPDX-License-Identifier: GPL-3.0-only

//! Raster buffers and color conversion
//!
//! # Color Space Conversion
//!
//! Camera frames arrive as YUYV (YUV 4:2:2), which is converted to packed
//! RGB (or kept as luma for greyscale sessions) before any filtering:
//!
//! ```text
//! YUYV: Y0 U Y1 V | Y2 U Y3 V | ...
//!        └──┬───┘
//!      2 pixels sharing one U/V pair
//! ```

pub mod format_converters;
pub mod raster;

pub use raster::{Channels, Raster};
