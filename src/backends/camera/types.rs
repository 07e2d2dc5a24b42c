// SPDX-License-Identifier: GPL-3.0-only
// Shared types for the V4L2 capture backend

//! Shared types for the camera backend

use super::v4l2_utils::{V4L2_CAP_STREAMING, V4L2_CAP_VIDEO_CAPTURE};
use std::fmt;

/// Identity and capability bits reported by `VIDIOC_QUERYCAP`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceCapabilities {
    /// Kernel driver name (e.g. "uvcvideo")
    pub driver: String,
    /// Human readable device name
    pub card: String,
    pub bus_info: String,
    /// Effective capability flags (device caps when the driver reports them)
    pub capabilities: u32,
}

impl DeviceCapabilities {
    /// Device can capture single-planar video
    pub fn can_capture(&self) -> bool {
        self.capabilities & V4L2_CAP_VIDEO_CAPTURE != 0
    }

    /// Device supports streaming I/O
    pub fn can_stream(&self) -> bool {
        self.capabilities & V4L2_CAP_STREAMING != 0
    }
}

/// Negotiated YUYV frame geometry
///
/// `bytes_per_line` and `size_image` are already corrected for drivers that
/// under-report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub bytes_per_line: u32,
    pub size_image: u32,
}

impl CaptureFormat {
    /// Build a format from driver-reported values, raising stride and image
    /// size to the minimum a packed YUYV frame needs
    pub fn sanitized(width: u32, height: u32, bytes_per_line: u32, size_image: u32) -> Self {
        let bytes_per_line = bytes_per_line.max(width.saturating_mul(2));
        let size_image = size_image.max(bytes_per_line.saturating_mul(height));
        Self {
            width,
            height,
            bytes_per_line,
            size_image,
        }
    }
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} YUYV ({} bytes/line)",
            self.width, self.height, self.bytes_per_line
        )
    }
}
